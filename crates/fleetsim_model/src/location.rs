use geo::{Distance, Haversine};
use serde::{Deserialize, Serialize};

/// A geographic position. Stored as a `geo::Point` in lon/lat order,
/// exposed in lat/lon order to match the rest of the system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    point: geo::Point,
}

impl Location {
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self {
            point: geo::Point::new(lon, lat),
        }
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    /// Great-circle distance in meters.
    pub fn haversine_distance(&self, to: &Location) -> f64 {
        let haversine = Haversine;

        haversine.distance(self.point, to.point)
    }
}

impl From<&Location> for geo::Point<f64> {
    fn from(location: &Location) -> Self {
        location.point
    }
}
