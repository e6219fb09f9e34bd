use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A closed lat/lng box. All points with
/// `min_latitude <= lat <= max_latitude` and
/// `min_longitude <= lng <= max_longitude` are inside.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

/// Approximate bounds of the São Paulo metropolitan region, the area the
/// demo scatters its markers over.
pub const SAO_PAULO: BoundingBox = BoundingBox {
    min_latitude: -23.950088,
    max_latitude: -23.473297,
    min_longitude: -46.825662,
    max_longitude: -46.365583,
};

/// Sample a point uniformly from `bounds`. Latitude and longitude are drawn
/// independently. The rng is passed in so callers can use a seeded one.
pub fn random_point_in(bounds: &BoundingBox, rng: &mut impl Rng) -> GeoPoint {
    GeoPoint {
        latitude: rng.random_range(bounds.min_latitude..=bounds.max_latitude),
        longitude: rng.random_range(bounds.min_longitude..=bounds.max_longitude),
    }
}

impl BoundingBox {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_latitude
            && point.latitude <= self.max_latitude
            && point.longitude >= self.min_longitude
            && point.longitude <= self.max_longitude
    }
}
