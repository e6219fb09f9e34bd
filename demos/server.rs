use cyclemap_core::config::Config;
use cyclemap_core::controller::RouteController;
use cyclemap_core::directions::MapboxDirections;
use cyclemap_core::geo::{self, SAO_PAULO};
use cyclemap_core::map_view::MarkerCard;
use cyclemap_core::server::MapServer;

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

const POI_COUNT: usize = 10;

const POI_NAMES: [&str; 10] = [
    "Estação Sé",
    "Parque Ibirapuera",
    "Mercado Municipal",
    "Avenida Paulista",
    "Vila Madalena",
    "Pinheiros",
    "Liberdade",
    "Mooca",
    "Santana",
    "Butantã",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_module_path(false)
        .init();

    // Missing access token is fatal before anything else happens.
    let config = Config::from_env()?;

    let mut rng = rand::rng();
    let origin = geo::random_point_in(&SAO_PAULO, &mut rng);
    let destination = geo::random_point_in(&SAO_PAULO, &mut rng);
    let pois = (0..POI_COUNT)
        .map(|i| {
            let point = geo::random_point_in(&SAO_PAULO, &mut rng);
            let card = MarkerCard {
                name: POI_NAMES[i % POI_NAMES.len()].to_string(),
                label: "bike station".to_string(),
                price_brl: rng.random_range(5.0..30.0_f64).round(),
            };
            (point, card)
        })
        .collect();

    let directions = MapboxDirections::new(&config.access_token);
    let controller = Arc::new(
        RouteController::initialize(directions, origin, destination, pois).await,
    );

    let mut server = MapServer::new(&config.host, config.port);
    server.start(&config.access_token)?;
    let token = server.register(Arc::downgrade(&controller));

    println!("================================================");
    println!("[Cycle Map]: {}", token.url());
    println!("Press Ctrl+C to exit");

    // Keep the controller and token alive while the server runs.
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}
