// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, patch},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::annotation_service::AnnotationService;
use crate::application::series_cache::SeriesCache;
use crate::application::series_fetcher::SeriesFetcher;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::open_meteo::OpenMeteoSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    cache_stats, clear_regions, create_region, delete_region, get_region, get_rules,
    get_selection, health_check, list_regions, patch_rule, put_rules, put_selection,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_app_config().context("Failed to load configuration")?;

    // Data source and cache (infrastructure + application layers)
    let source = Arc::new(OpenMeteoSource::new(&config.source)?);
    let fetcher = SeriesFetcher::new(source, config.source.timeout());
    let cache = Arc::new(SeriesCache::new(fetcher));

    let annotation_service = Arc::new(AnnotationService::new(cache, config.engine_settings()));
    let state = AppState { annotation_service };

    let router = Router::new()
        .route("/healthz", get(health_check))
        .route(
            "/regions",
            get(list_regions).post(create_region).delete(clear_regions),
        )
        .route("/regions/:id", get(get_region).delete(delete_region))
        .route("/selection", get(get_selection).put(put_selection))
        .route("/rules", get(get_rules).put(put_rules))
        .route("/rules/:index", patch(patch_rule))
        .route("/cache/stats", get(cache_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting region-annotator service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
