use crate::models::trip::{TripForm, TripRequest, TripType};

/// Shapes planner input into a trip request. Fields that do not apply to the
/// trip type are dropped; nothing is validated here.
pub fn assemble(form: TripForm) -> TripRequest {
    let trip_type = form.trip_type;
    let (destination, destination_coords) = if trip_type.needs_destination() {
        (form.destination, form.destination_coords)
    } else {
        (None, None)
    };

    TripRequest {
        trip_type,
        source: form.source,
        source_coords: form.source_coords,
        destination,
        destination_coords,
        hours: form.hours.filter(|_| trip_type == TripType::HourlyRental),
        pickup_datetime: form.pickup_datetime,
        return_datetime: form.return_datetime.filter(|_| trip_type == TripType::RoundTrip),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::assemble;
    use crate::models::location::Coordinates;
    use crate::models::trip::{TripForm, TripType};

    fn full_form(trip_type: TripType) -> TripForm {
        let pickup = Utc::now() + Duration::hours(2);
        TripForm {
            trip_type,
            source: "Koramangala".to_string(),
            source_coords: Some(Coordinates { lat: 12.93, lng: 77.62 }),
            destination: Some("Mysore".to_string()),
            destination_coords: Some(Coordinates { lat: 12.29, lng: 76.64 }),
            hours: Some(6),
            pickup_datetime: Some(pickup),
            return_datetime: Some(pickup + Duration::hours(10)),
        }
    }

    #[test]
    fn destination_present_iff_not_hourly() {
        for trip_type in TripType::ALL {
            let request = assemble(full_form(trip_type));
            let hourly = trip_type == TripType::HourlyRental;

            assert_eq!(request.destination.is_some(), !hourly, "{trip_type:?}");
            assert_eq!(request.destination_coords.is_some(), !hourly, "{trip_type:?}");
            assert_eq!(request.hours.is_some(), hourly, "{trip_type:?}");
        }
    }

    #[test]
    fn return_time_only_kept_for_round_trip() {
        assert!(assemble(full_form(TripType::RoundTrip)).return_datetime.is_some());
        assert!(assemble(full_form(TripType::OneWay)).return_datetime.is_none());
        assert!(assemble(full_form(TripType::HourlyRental)).return_datetime.is_none());
    }

    #[test]
    fn missing_fields_stay_missing() {
        let mut form = full_form(TripType::OneWay);
        form.source_coords = None;
        form.pickup_datetime = None;

        let request = assemble(form);
        assert!(request.source_coords.is_none());
        assert!(request.pickup_datetime.is_none());
        assert_eq!(request.source, "Koramangala");
    }
}
