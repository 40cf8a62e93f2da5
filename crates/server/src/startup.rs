use std::{env, net::SocketAddr};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes;
use service::{runtime, DocumentStore};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load host/port from configs or env vars, with sensible fallbacks
fn load_bind_addr() -> anyhow::Result<SocketAddr> {
    let (host, port) = match configs::load_default() {
        Ok(cfg) => {
            let s = cfg.server;
            (s.host, s.port)
        }
        Err(_) => {
            let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
            let port = env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(4000);
            (host, port)
        }
    };
    Ok(format!("{}:{}", host, port).parse()?)
}

/// Load the storage root from configs or env vars, defaulting to `uploads`.
fn load_storage_root() -> String {
    match configs::load_default() {
        Ok(mut cfg) => {
            cfg.storage.normalize_from_env();
            cfg.storage.root
        }
        Err(_) => env::var("STORAGE_ROOT").unwrap_or_else(|_| "uploads".to_string()),
    }
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let storage_root = load_storage_root();
    runtime::ensure_env(&storage_root).await?;

    let store = DocumentStore::new(&storage_root).await?;

    let cors = build_cors();
    let app: Router = routes::build_router(store, cors);

    let addr = load_bind_addr()?;
    info!(%addr, %storage_root, "starting document store service");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
