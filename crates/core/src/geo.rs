use serde::{Deserialize, Serialize};

use crate::errors::ApplicationError;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 point supplied by the client. Validated at the interface boundary
/// before any computation touches it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn validate(&self) -> Result<(), ApplicationError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(ApplicationError::InvalidInput(
                "location coordinates must be finite numbers".to_owned(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return Err(ApplicationError::InvalidInput(format!(
                "location out of range: lat {}, lng {}",
                self.lat, self.lng
            )));
        }
        Ok(())
    }
}

/// Great-circle distance in kilometers between two points.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlng = (dlng * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}
