use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::route::{route_layer_style, RouteGeometry};

/// Data shown in a marker popup. This is a plain record; the frontend owns
/// how it looks.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarkerCard {
    pub name: String,
    pub label: String,
    pub price_brl: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerKind {
    Origin,
    Poi { card: MarkerCard },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub id: Uuid,
    pub point: GeoPoint,
    #[serde(flatten)]
    pub kind: MarkerKind,
}

impl Marker {
    /// Only non-origin markers react to clicks.
    pub fn clickable(&self) -> bool {
        matches!(self.kind, MarkerKind::Poi { .. })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Ok,
    /// The last re-route failed. The previously drawn route (if any) stays
    /// on screen; the frontend shows a notice.
    Unavailable,
}

/// State of one map screen: a fixed marker set plus at most one named route
/// overlay. Changes bump a version counter that doubles as an HTTP ETag, so
/// the frontend can poll cheaply.
pub struct MapView {
    origin: GeoPoint,
    markers: Vec<Marker>,
    route: Option<RouteGeometry>,
    route_status: RouteStatus,
    version: u64,
}

impl MapView {
    /// One marker per entry in `pois` plus the origin marker. Markers are
    /// never added or removed after this.
    pub fn new(origin: GeoPoint, pois: Vec<(GeoPoint, MarkerCard)>) -> Self {
        let mut markers: Vec<Marker> = pois
            .into_iter()
            .map(|(point, card)| Marker {
                id: Uuid::new_v4(),
                point,
                kind: MarkerKind::Poi { card },
            })
            .collect();
        markers.push(Marker {
            id: Uuid::new_v4(),
            point: origin,
            kind: MarkerKind::Origin,
        });
        MapView {
            origin,
            markers,
            route: None,
            route_status: RouteStatus::Ok,
            version: 0,
        }
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, id: Uuid) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn route(&self) -> Option<&RouteGeometry> {
        self.route.as_ref()
    }

    pub fn route_status(&self) -> RouteStatus {
        self.route_status
    }

    /// Replace-or-create the single route overlay. Setting the geometry
    /// that is already shown is a no-op.
    pub fn set_route(&mut self, geometry: RouteGeometry) {
        if self.route_status == RouteStatus::Ok && self.route.as_ref() == Some(&geometry) {
            return;
        }
        self.route = Some(geometry);
        self.route_status = RouteStatus::Ok;
        self.bump();
    }

    /// Non-fatal failure state after a directions call went wrong. The route
    /// geometry itself is left untouched.
    pub fn set_route_unavailable(&mut self) {
        if self.route_status == RouteStatus::Unavailable {
            return;
        }
        self.route_status = RouteStatus::Unavailable;
        self.bump();
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub fn get_current_version(&self) -> u64 {
        self.version
    }

    pub fn get_version_string(&self) -> String {
        format!("\"{:x}\"", self.version)
    }

    pub fn parse_version_string(version_str: &str) -> Option<u64> {
        // Remove quotes if present
        let cleaned = version_str.trim_matches('"');
        u64::from_str_radix(cleaned, 16).ok()
    }

    /// Returns the state JSON and the new ETag, or `None` when the client's
    /// cached version is current.
    pub fn state_if_changed(
        &self,
        client_version: Option<&str>,
    ) -> Option<(serde_json::Value, String)> {
        match client_version {
            Some(v_str) if (Self::parse_version_string(v_str) == Some(self.version)) => None,
            _ => Some((self.to_state_json(), self.get_version_string())),
        }
    }

    pub fn to_state_json(&self) -> serde_json::Value {
        json!({
            "origin": self.origin,
            "markers": self.markers,
            "route": {
                "status": self.route_status,
                "geojson": self.route.as_ref().map(|r| r.to_geojson()),
            },
            "route_layer_style": route_layer_style(),
        })
    }
}
