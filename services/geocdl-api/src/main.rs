//! GeoCDL API service.
//!
//! HTTP server exposing dataset discovery, raster/point subset requests,
//! and the upload endpoint (§6.1).

mod handlers;
mod query;
mod state;

use anyhow::Result;
use axum::{extract::Extension, routing::get, routing::post, Router};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "geocdl-api")]
#[command(about = "GeoCDL dataset subset API server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8090")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory used to stage and retain uploaded clip/points files
    #[arg(long, default_value = "./geocdl_uploads")]
    upload_dir: String,

    /// Seconds an uploaded file may sit unused before `clean()` evicts it
    #[arg(long, default_value_t = 14_400)]
    upload_retention_secs: u64,

    /// Maximum accepted upload size, in bytes
    #[arg(long, default_value_t = 50 * 1024 * 1024)]
    max_upload_bytes: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).json().finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting GeoCDL API server");

    let state = Arc::new(AppState::new(
        args.upload_dir.into(),
        args.max_upload_bytes,
        std::time::Duration::from_secs(args.upload_retention_secs),
    )?);

    let app = Router::new()
        .route("/list_datasets", get(handlers::list_datasets_handler))
        .route("/ds_info", get(handlers::ds_info_handler))
        .route("/subset_polygon", get(handlers::subset_polygon_handler))
        .route("/subset_points", get(handlers::subset_points_handler))
        .route("/upload", post(handlers::upload_handler))
        .route("/health", get(handlers::health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
