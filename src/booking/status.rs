use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripStatus {
    PaymentPending,
    Confirmed,
    DriverAssigned,
    DriverEnRoute,
    Started,
    Completed,
    CancelledByCustomer,
    CancelledByVendor,
    PaymentFailed,
    Refunded,
    Unknown(i64),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusDisplay {
    pub code: i64,
    pub text: String,
    pub color: &'static str,
    pub can_cancel: bool,
    pub can_fetch_details: bool,
    pub can_leave_feedback: bool,
    pub progress: u8,
}

impl TripStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            100 => TripStatus::PaymentPending,
            101 => TripStatus::Confirmed,
            102 => TripStatus::DriverAssigned,
            103 => TripStatus::DriverEnRoute,
            104 => TripStatus::Started,
            105 => TripStatus::Completed,
            201 => TripStatus::CancelledByCustomer,
            202 => TripStatus::CancelledByVendor,
            203 => TripStatus::PaymentFailed,
            204 => TripStatus::Refunded,
            other => TripStatus::Unknown(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            TripStatus::PaymentPending => 100,
            TripStatus::Confirmed => 101,
            TripStatus::DriverAssigned => 102,
            TripStatus::DriverEnRoute => 103,
            TripStatus::Started => 104,
            TripStatus::Completed => 105,
            TripStatus::CancelledByCustomer => 201,
            TripStatus::CancelledByVendor => 202,
            TripStatus::PaymentFailed => 203,
            TripStatus::Refunded => 204,
            TripStatus::Unknown(code) => code,
        }
    }

    pub fn display(self) -> StatusDisplay {
        // (text, color, cancel, details, feedback, progress)
        let (text, color, can_cancel, can_fetch_details, can_leave_feedback, progress) = match self {
            TripStatus::PaymentPending => ("Payment Pending", "warning", true, false, false, 10),
            TripStatus::Confirmed => ("Booking Confirmed", "info", true, false, false, 25),
            TripStatus::DriverAssigned => ("Driver Assigned", "primary", true, true, false, 50),
            TripStatus::DriverEnRoute => ("Driver En Route", "primary", false, true, false, 65),
            TripStatus::Started => ("Trip Started", "primary", false, true, false, 80),
            TripStatus::Completed => ("Completed", "success", false, true, true, 100),
            TripStatus::CancelledByCustomer => ("Cancelled by Customer", "danger", false, false, false, 0),
            TripStatus::CancelledByVendor => ("Cancelled by Vendor", "danger", false, false, false, 0),
            TripStatus::PaymentFailed => ("Payment Failed", "danger", false, false, false, 0),
            TripStatus::Refunded => ("Refunded", "secondary", false, false, false, 0),
            TripStatus::Unknown(code) => {
                return StatusDisplay {
                    code,
                    text: format!("Unknown ({code})"),
                    color: "secondary",
                    can_cancel: false,
                    can_fetch_details: false,
                    can_leave_feedback: false,
                    progress: 0,
                };
            }
        };

        StatusDisplay {
            code: self.code(),
            text: text.to_string(),
            color,
            can_cancel,
            can_fetch_details,
            can_leave_feedback,
            progress,
        }
    }
}

pub fn resolve(code: i64) -> StatusDisplay {
    TripStatus::from_code(code).display()
}
