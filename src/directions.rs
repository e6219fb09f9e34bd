use serde::Deserialize;
use thiserror::Error;

use crate::geo::GeoPoint;
use crate::route::RouteGeometry;

pub const MAPBOX_API_BASE: &str = "https://api.mapbox.com";

#[derive(Error, Debug)]
pub enum DirectionsError {
    #[error("directions request failed: {0}")]
    NetworkFailure(String),

    #[error("directions service returned no routes")]
    EmptyRoute,

    #[error("unexpected directions response: {0}")]
    MalformedResponse(String),
}

/// External route computation. The controller is generic over this so tests
/// can substitute an in-memory implementation.
pub trait Directions {
    async fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteGeometry, DirectionsError>;
}

/// Client for the Mapbox Directions API (`cycling` profile).
pub struct MapboxDirections {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MapboxDirections {
    pub fn new(access_token: &str) -> Self {
        Self::with_base_url(MAPBOX_API_BASE, access_token)
    }

    /// Point the client at a different host (self-hosted router, tests).
    pub fn with_base_url(base_url: &str, access_token: &str) -> Self {
        MapboxDirections {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn request_url(&self, origin: &GeoPoint, destination: &GeoPoint) -> String {
        format!(
            "{}/directions/v5/mapbox/cycling/{},{};{},{}?geometries=geojson&access_token={}",
            self.base_url,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude,
            self.access_token,
        )
    }
}

impl Directions for MapboxDirections {
    async fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteGeometry, DirectionsError> {
        let url = self.request_url(&origin, &destination);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DirectionsError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectionsError::NetworkFailure(format!(
                "directions service responded with {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DirectionsError::NetworkFailure(e.to_string()))?;
        parse_response(&body)
    }
}

#[derive(Deserialize)]
struct DirectionsResponse {
    routes: Vec<Route>,
}

#[derive(Deserialize)]
struct Route {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    coordinates: Vec<[f64; 2]>,
}

/// Parse a directions response body. Only `routes[0]` is used.
pub fn parse_response(body: &str) -> Result<RouteGeometry, DirectionsError> {
    let response: DirectionsResponse = serde_json::from_str(body)
        .map_err(|e| DirectionsError::MalformedResponse(e.to_string()))?;
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(DirectionsError::EmptyRoute)?;
    Ok(RouteGeometry::from_lon_lat_pairs(route.geometry.coordinates))
}
