mod config;
mod errors;
mod handlers;
mod models;
mod remedy;
mod resolver;
mod shape;
mod transport;
mod validator;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Mode, WidgetConfig};
use crate::handlers::AppState;
use crate::resolver::Resolver;
use crate::transport::HttpTransport;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LEAFCHECK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let config = WidgetConfig::load()?;
    let mode = config.mode();
    match &mode {
        Mode::Simulated => info!("using simulated predictions"),
        Mode::Remote { endpoint } if endpoint.is_empty() => {
            tracing::warn!("remote mode without backend_url; predictions will fail")
        }
        Mode::Remote { endpoint } => info!(%endpoint, "using remote predictions"),
    }

    let state = web::Data::new(
        AppState::new(Resolver::new(mode, Arc::new(HttpTransport::new())))
            .with_upload_limit(config.max_upload_bytes),
    );

    info!(bind = %config.bind, "server running");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(config.bind.as_str())?
    .run()
    .await
}
