use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use uuid::Uuid;

use crate::directions::{Directions, DirectionsError};
use crate::geo::GeoPoint;
use crate::map_view::{MapView, MarkerCard};

#[derive(Error, Debug)]
pub enum ClickError {
    #[error("no marker with id {0}")]
    UnknownMarker(Uuid),

    #[error("marker {0} is not clickable")]
    NotClickable(Uuid),

    #[error(transparent)]
    Directions(#[from] DirectionsError),
}

/// Keeps the single route overlay of a [`MapView`] synchronized with the
/// most recently requested origin/destination pair.
///
/// Re-routes can overlap: a marker click while a directions request is still
/// in flight starts a second one, and the responses may come back in either
/// order. Every request takes a ticket from a sequence counter and a response
/// is applied only if no newer ticket has been issued since, so the view
/// always ends up reflecting the latest request.
pub struct RouteController<D> {
    directions: D,
    origin: GeoPoint,
    view: Arc<Mutex<MapView>>,
    issued: AtomicU64,
}

impl<D: Directions> RouteController<D> {
    pub fn new(directions: D, origin: GeoPoint, pois: Vec<(GeoPoint, MarkerCard)>) -> Self {
        RouteController {
            directions,
            origin,
            view: Arc::new(Mutex::new(MapView::new(origin, pois))),
            issued: AtomicU64::new(0),
        }
    }

    /// Build the view and draw the initial route. A failed initial route is
    /// not fatal; the view starts in the unavailable state instead.
    pub async fn initialize(
        directions: D,
        origin: GeoPoint,
        destination: GeoPoint,
        pois: Vec<(GeoPoint, MarkerCard)>,
    ) -> Self {
        let controller = Self::new(directions, origin, pois);
        if let Err(err) = controller.reroute_to(destination).await {
            warn!("initial route unavailable: {err}");
        }
        controller
    }

    pub fn view(&self) -> Arc<Mutex<MapView>> {
        self.view.clone()
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    /// Request a route from the fixed origin to `destination` and apply it
    /// to the view, unless a newer request was issued while this one was in
    /// flight.
    pub async fn reroute_to(&self, destination: GeoPoint) -> Result<(), DirectionsError> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        match self.directions.route(self.origin, destination).await {
            Ok(geometry) => {
                if self.issued.load(Ordering::SeqCst) == ticket {
                    self.view.lock().unwrap().set_route(geometry);
                } else {
                    debug!("dropping stale route response (ticket {ticket})");
                }
                Ok(())
            }
            Err(err) => {
                warn!("route to {destination:?} unavailable: {err}");
                if self.issued.load(Ordering::SeqCst) == ticket {
                    self.view.lock().unwrap().set_route_unavailable();
                }
                Err(err)
            }
        }
    }

    /// The click binding of a non-origin marker: re-route from the fixed
    /// origin to that marker's point.
    pub async fn marker_clicked(&self, marker_id: Uuid) -> Result<(), ClickError> {
        let destination = {
            let view = self.view.lock().unwrap();
            let marker = view
                .marker(marker_id)
                .ok_or(ClickError::UnknownMarker(marker_id))?;
            if !marker.clickable() {
                return Err(ClickError::NotClickable(marker_id));
            }
            marker.point
        };
        self.reroute_to(destination).await?;
        Ok(())
    }
}
