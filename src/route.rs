use serde_json::json;

use crate::geo::GeoPoint;

/// Ordered polyline received from the directions service, kept verbatim
/// (no reordering, no axis swap).
#[derive(Clone, Debug, PartialEq)]
pub struct RouteGeometry {
    pub points: Vec<GeoPoint>,
}

pub const ROUTE_LAYER_ID: &str = "route";

impl RouteGeometry {
    /// Build from the wire format of the directions service, which uses
    /// `[longitude, latitude]` pairs.
    pub fn from_lon_lat_pairs(pairs: impl IntoIterator<Item = [f64; 2]>) -> Self {
        RouteGeometry {
            points: pairs
                .into_iter()
                .map(|[longitude, latitude]| GeoPoint {
                    latitude,
                    longitude,
                })
                .collect(),
        }
    }

    /// GeoJSON `Feature` with a `LineString` geometry, coordinates back in
    /// `[longitude, latitude]` order for the rendering layer.
    pub fn to_geojson(&self) -> serde_json::Value {
        let coordinates: Vec<[f64; 2]> = self
            .points
            .iter()
            .map(|p| [p.longitude, p.latitude])
            .collect();
        json!({
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates,
            },
        })
    }
}

/// The fixed visual style of the route layer. The frontend combines this
/// with the GeoJSON source when it first creates the layer.
pub fn route_layer_style() -> serde_json::Value {
    json!({
        "id": ROUTE_LAYER_ID,
        "type": "line",
        "layout": {
            "line-join": "round",
            "line-cap": "round",
        },
        "paint": {
            "line-color": "#222",
            "line-width": 5,
            "line-opacity": 0.75,
        },
    })
}
