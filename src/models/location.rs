use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// An address resolved by the maps provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedPlace {
    pub address: String,
    pub coords: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::Coordinates;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Coordinates { lat: 12.97, lng: 77.59 }.is_valid());
        assert!(!Coordinates { lat: 91.0, lng: 0.0 }.is_valid());
        assert!(!Coordinates { lat: 0.0, lng: -180.5 }.is_valid());
        assert!(!Coordinates { lat: f64::NAN, lng: 0.0 }.is_valid());
    }
}
