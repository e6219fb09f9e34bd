use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use std::thread;
use tokio::runtime::Runtime;
use uuid::Uuid;

use crate::controller::{ClickError, RouteController};
use crate::directions::Directions;

/// The token is owned by whoever created a map screen. It resolves into the
/// url the frontend loads, and the view stays reachable over HTTP until the
/// token is dropped (or the controller itself is gone).
pub struct ViewToken<D> {
    id: Uuid,
    url: String,
    registry: Weak<RwLock<HashMap<Uuid, Weak<RouteController<D>>>>>,
}

impl<D> ViewToken<D> {
    pub fn url(&self) -> String {
        self.url.clone()
    }

    pub fn view_id(&self) -> String {
        self.id.to_string()
    }
}

impl<D> Drop for ViewToken<D> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            debug!("dropping view {} from registry", self.id);
            let mut items = registry.write().unwrap();
            items.remove(&self.id);
        }
    }
}

/// Registry of live map views, keyed by the uuid in the frontend url.
/// Only weak references are held; a dropped controller just disappears
/// from the HTTP surface.
pub struct Registry<D> {
    url_prefix: Arc<RwLock<String>>,
    items: Arc<RwLock<HashMap<Uuid, Weak<RouteController<D>>>>>,
}

// Derived Clone would put a `D: Clone` bound on the impl.
impl<D> Clone for Registry<D> {
    fn clone(&self) -> Self {
        Registry {
            url_prefix: self.url_prefix.clone(),
            items: self.items.clone(),
        }
    }
}

impl<D> Registry<D> {
    pub fn new(url_prefix: &str) -> Self {
        Registry {
            url_prefix: Arc::new(RwLock::new(url_prefix.to_string())),
            items: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn set_url_prefix(&self, url_prefix: &str) {
        let mut prefix = self.url_prefix.write().unwrap();
        *prefix = url_prefix.to_string();
    }

    pub fn register(&self, controller: Weak<RouteController<D>>) -> ViewToken<D> {
        let id = Uuid::new_v4();
        {
            let mut items = self.items.write().unwrap();
            items.insert(id, controller);
        }
        let url_prefix = self.url_prefix.read().unwrap();
        ViewToken {
            id,
            // the view id travels in the fragment, the page itself is shared
            url: format!("{}/#{}", *url_prefix, id),
            registry: Arc::downgrade(&self.items),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<RouteController<D>>> {
        let items = self.items.read().unwrap();
        items.get(id).and_then(|weak| weak.upgrade())
    }
}

struct AppState<D> {
    registry: Registry<D>,
    access_token: String,
}

fn lookup<D>(data: &web::Data<AppState<D>>, id: &str) -> Option<Arc<RouteController<D>>> {
    Uuid::parse_str(id)
        .ok()
        .and_then(|uuid| data.registry.get(&uuid))
}

/// Full view state (markers, route overlay, layer style) with ETag support,
/// so the frontend can poll with `If-None-Match` and mostly get 304s.
async fn serve_state<D: Directions>(
    id: web::Path<String>,
    req: HttpRequest,
    data: web::Data<AppState<D>>,
) -> HttpResponse {
    let controller = match lookup(&data, &id) {
        Some(controller) => controller,
        None => return HttpResponse::NotFound().finish(),
    };

    let client_version = req
        .headers()
        .get("If-None-Match")
        .and_then(|h| h.to_str().ok());

    let view = controller.view();
    let view = view.lock().unwrap();
    match view.state_if_changed(client_version) {
        None => HttpResponse::NotModified().finish(),
        Some((state, version)) => HttpResponse::Ok()
            .insert_header(("ETag", version))
            .json(state),
    }
}

async fn serve_token_json<D: Directions>(
    id: web::Path<String>,
    data: web::Data<AppState<D>>,
) -> HttpResponse {
    if lookup(&data, &id).is_none() {
        return HttpResponse::NotFound().finish();
    }
    HttpResponse::Ok().json(serde_json::json!({ "accessToken": data.access_token }))
}

/// Click binding of a marker: re-route from the view's origin to the
/// marker's point. A failed directions call leaves the view in the
/// unavailable state and maps to 502.
async fn handle_click<D: Directions>(
    path: web::Path<(String, String)>,
    data: web::Data<AppState<D>>,
) -> HttpResponse {
    let (id, marker_id) = path.into_inner();
    let controller = match lookup(&data, &id) {
        Some(controller) => controller,
        None => return HttpResponse::NotFound().finish(),
    };
    let marker_id = match Uuid::parse_str(&marker_id) {
        Ok(marker_id) => marker_id,
        Err(_) => return HttpResponse::BadRequest().finish(),
    };

    match controller.marker_clicked(marker_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(ClickError::UnknownMarker(_)) => HttpResponse::NotFound().finish(),
        Err(ClickError::NotClickable(_)) => HttpResponse::BadRequest().finish(),
        Err(ClickError::Directions(err)) => {
            HttpResponse::BadGateway().body(format!("route unavailable: {err}"))
        }
    }
}

const MAP_VIEW_HTML: &str = include_str!("../static/map-view.html");

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html")
        .body(MAP_VIEW_HTML)
}

pub struct MapServer<D> {
    host: String,
    port: u16,
    handle: Option<thread::JoinHandle<()>>,
    registry: Arc<Registry<D>>,
}

impl<D: Directions + Send + Sync + 'static> MapServer<D> {
    pub fn new(host: &str, port: u16) -> Self {
        MapServer {
            host: host.into(),
            port,
            handle: None,
            registry: Arc::new(Registry::new(&format!("http://{host}:{port}"))),
        }
    }

    pub fn register(&self, controller: Weak<RouteController<D>>) -> ViewToken<D> {
        self.registry.register(controller)
    }

    // Start the server in a separate thread
    pub fn start(&mut self, access_token: &str) -> std::io::Result<()> {
        let host = self.host.clone();
        let mut port = self.port;
        let registry = self.registry.clone();
        let access_token = access_token.to_string();
        let random_prefix = Uuid::new_v4().to_string();
        let random_prefix2 = random_prefix.clone();

        // Signals once the URL prefix is known (the port may be OS-assigned)
        let (tx, rx) = std::sync::mpsc::channel();

        let handle = thread::spawn(move || {
            let app_state = web::Data::new(AppState {
                registry: (*registry).clone(),
                access_token,
            });

            let runtime = Runtime::new().expect("Failed to create Tokio runtime");
            runtime.block_on(async move {
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(app_state.clone())
                        .route(&format!("/{random_prefix}/"), web::get().to(index))
                        .route(
                            &format!("/{random_prefix}/views/{{id}}/state"),
                            web::get().to(serve_state::<D>),
                        )
                        .route(
                            &format!("/{random_prefix}/views/{{id}}/token.json"),
                            web::get().to(serve_token_json::<D>),
                        )
                        .route(
                            &format!("/{random_prefix}/views/{{id}}/markers/{{marker_id}}/click"),
                            web::post().to(handle_click::<D>),
                        )
                })
                .bind(format!("{host}:{port}"))
                .expect("Failed to bind server");

                if port == 0 {
                    if let Some(addr) = server.addrs().first() {
                        port = addr.port();
                    }
                }

                registry.set_url_prefix(&format!("http://{host}:{port}/{random_prefix2}"));

                // Signal that the URL prefix is set
                tx.send(()).expect("Failed to send completion signal");

                info!("map server bound to {host}:{port}");
                server.run().await.expect("Server failed to run");
            });
        });

        // Wait for the URL prefix to be set
        rx.recv().expect("Failed to receive completion signal");

        self.handle = Some(handle);
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directions::DirectionsError;
    use crate::geo::GeoPoint;
    use crate::map_view::MarkerCard;
    use crate::route::RouteGeometry;
    use actix_web::{http::StatusCode, test};

    struct FixedDirections(RouteGeometry);

    impl Directions for FixedDirections {
        async fn route(
            &self,
            _origin: GeoPoint,
            _destination: GeoPoint,
        ) -> Result<RouteGeometry, DirectionsError> {
            Ok(self.0.clone())
        }
    }

    fn sample_controller() -> Arc<RouteController<FixedDirections>> {
        let directions = FixedDirections(RouteGeometry::from_lon_lat_pairs([
            [-46.6, -23.5],
            [-46.7, -23.6],
        ]));
        let origin = GeoPoint {
            latitude: -23.5,
            longitude: -46.6,
        };
        let poi = GeoPoint {
            latitude: -23.6,
            longitude: -46.7,
        };
        let card = MarkerCard {
            name: "Estação Sé".to_string(),
            label: "bike".to_string(),
            price_brl: 12.5,
        };
        Arc::new(RouteController::new(directions, origin, vec![(poi, card)]))
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state)
                    .route(
                        "/views/{id}/state",
                        web::get().to(serve_state::<FixedDirections>),
                    )
                    .route(
                        "/views/{id}/token.json",
                        web::get().to(serve_token_json::<FixedDirections>),
                    )
                    .route(
                        "/views/{id}/markers/{marker_id}/click",
                        web::post().to(handle_click::<FixedDirections>),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn state_endpoint_serves_etag_and_304() {
        let controller = sample_controller();
        let registry = Registry::new("http://localhost:0");
        let token = registry.register(Arc::downgrade(&controller));
        let state = web::Data::new(AppState {
            registry: registry.clone(),
            access_token: "pk.test".to_string(),
        });
        let app = test_app!(state);

        let uri = format!("/views/{}/state", token.view_id());
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let etag = resp
            .headers()
            .get("ETag")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["markers"].as_array().unwrap().len(), 2);
        assert_eq!(body["route"]["status"], "ok");

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&uri)
                .insert_header(("If-None-Match", etag.as_str()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

        let uri = format!("/views/{}/token.json", token.view_id());
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["accessToken"], "pk.test");
    }

    #[actix_web::test]
    async fn click_endpoints_validate_the_marker() {
        let controller = sample_controller();
        let registry = Registry::new("http://localhost:0");
        let token = registry.register(Arc::downgrade(&controller));
        let state = web::Data::new(AppState {
            registry,
            access_token: "pk.test".to_string(),
        });
        let app = test_app!(state);

        let (poi_id, origin_id) = {
            let view = controller.view();
            let view = view.lock().unwrap();
            let poi = view.markers().iter().find(|m| m.clickable()).unwrap().id;
            let origin = view.markers().iter().find(|m| !m.clickable()).unwrap().id;
            (poi, origin)
        };

        let uri = format!("/views/{}/markers/{}/click", token.view_id(), poi_id);
        let resp = test::call_service(&app, test::TestRequest::post().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(controller.view().lock().unwrap().route().is_some());

        let uri = format!("/views/{}/markers/{}/click", token.view_id(), origin_id);
        let resp = test::call_service(&app, test::TestRequest::post().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let uri = format!(
            "/views/{}/markers/{}/click",
            token.view_id(),
            Uuid::new_v4()
        );
        let resp = test::call_service(&app, test::TestRequest::post().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn dropped_token_unregisters_the_view() {
        let controller = sample_controller();
        let registry = Registry::new("http://localhost:0");
        let token = registry.register(Arc::downgrade(&controller));
        let id = Uuid::parse_str(&token.view_id()).unwrap();
        assert!(registry.get(&id).is_some());
        drop(token);
        assert!(registry.get(&id).is_none());
    }
}
