use axum::routing::get;
use axum::Router;
use channel_server::config::ServerConfig;
use channel_server::dispatch::{DisconnectOnUnknown, PacketDispatcher};
use channel_server::handler::HandlerRegistry;
use channel_server::handlers::channel_handlers;
use channel_server::world::WorldManager;
use channel_server::ws::{ws_handler, AppState};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid server configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let regions = match config.load_regions() {
        Ok(regions) => regions,
        Err(e) => {
            eprintln!("Failed to load region data: {}", e);
            std::process::exit(1);
        }
    };

    let world = Arc::new(WorldManager::new());
    if let Err(e) = world.initialize(&regions) {
        eprintln!("Failed to initialize world: {}", e);
        std::process::exit(1);
    }

    let registry = Arc::new(HandlerRegistry::from_table(&channel_handlers()));
    let dispatcher = if config.strict_protocol {
        PacketDispatcher::with_fallback(registry, DisconnectOnUnknown)
    } else {
        PacketDispatcher::new(registry)
    };

    let app_state = AppState {
        dispatcher: Arc::new(dispatcher),
        world,
        start_region: config.start_region,
        next_connection_id: Arc::new(AtomicU64::new(1)),
        connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
    };
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    tracing::info!("Starting channel server on {}", config.listen_addr);

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
