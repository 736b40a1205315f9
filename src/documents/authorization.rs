use chrono::{DateTime, Utc};

use crate::models::customer::Customer;
use crate::models::fleet::{Driver, Vehicle};
use crate::models::trip::Trip;

/// Letter the customer can show at checkpoints, authorizing the assigned
/// driver to operate the vehicle for this trip.
pub fn render_authorization(
    customer: &Customer,
    trip: &Trip,
    driver: &Driver,
    vehicle: &Vehicle,
    issued_at: DateTime<Utc>,
) -> String {
    let mut lines = vec![
        "VEHICLE AUTHORIZATION LETTER".to_string(),
        String::new(),
        format!("Date of issue: {}", issued_at.format("%d %b %Y %H:%M UTC")),
        format!("Booking reference: {}", trip.id),
        String::new(),
        format!(
            "I, {}, holder of booking {} (phone {}), authorize the driver named below",
            customer.name, trip.id, customer.phone
        ),
        "to operate the vehicle named below on my behalf for the trip described here.".to_string(),
        String::new(),
        "Trip".to_string(),
        format!("  Type: {}", trip.trip_type.label()),
        format!("  Pickup: {}", trip.source),
    ];
    match (&trip.destination, trip.hours) {
        (Some(destination), _) => lines.push(format!("  Drop: {destination}")),
        (None, Some(hours)) => lines.push(format!("  Rental duration: {hours} hours")),
        (None, None) => {}
    }
    lines.push(format!("  Pickup time: {}", trip.pickup_datetime));
    lines.push(String::new());

    lines.push("Driver".to_string());
    lines.push(format!("  Name: {}", driver.name));
    if !driver.phone.is_empty() {
        lines.push(format!("  Phone: {}", driver.phone));
    }
    if let Some(license) = &driver.license_number {
        lines.push(format!("  Licence number: {license}"));
    }
    lines.push(String::new());

    lines.push("Vehicle".to_string());
    lines.push(format!("  Registration number: {}", vehicle.number));
    if !vehicle.model.is_empty() {
        lines.push(format!("  Model: {}", vehicle.model));
    }
    if let Some(color) = &vehicle.color {
        lines.push(format!("  Colour: {color}"));
    }
    lines.push(String::new());

    lines.extend([
        "Customer".to_string(),
        format!("  Name: {}", customer.name),
        format!("  Email: {}", customer.email),
        String::new(),
        "This authorization is valid only for the trip above and expires when it ends.".to_string(),
        String::new(),
    ]);

    lines.join("\n")
}
