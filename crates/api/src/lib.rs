//! HTTP API server with observability for the order and promocode services.
//!
//! Provides REST endpoints for baskets, order history, promocodes and guest
//! merge, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{FoodItem, InMemoryCatalog, OrderService, PromocodeService, ServiceConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::Store;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub order_service: OrderService<S, InMemoryCatalog>,
    pub promocode_service: PromocodeService<S>,
}

/// Creates the application state over one store shared by both services.
pub fn create_state<S: Store + Clone>(
    store: S,
    catalog: InMemoryCatalog,
    config: ServiceConfig,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        order_service: OrderService::with_config(store.clone(), catalog, config.clone()),
        promocode_service: PromocodeService::with_config(store, config),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/basket", get(routes::basket::get::<S>))
        .route(
            "/basket/food/{food_id}",
            post(routes::basket::add_food::<S>)
                .put(routes::basket::set_food_count::<S>)
                .delete(routes::basket::remove_food::<S>),
        )
        .route("/basket/place", post(routes::basket::place::<S>))
        .route(
            "/basket/promocode",
            post(routes::basket::apply_promocode::<S>)
                .delete(routes::basket::remove_promocode::<S>),
        )
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/deliver", post(routes::orders::deliver::<S>))
        .route("/orders/{id}/comment", post(routes::orders::comment::<S>))
        .route("/guests", post(routes::guests::create))
        .route("/guests/{token}/merge", post(routes::guests::merge::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Errors raised while loading the catalog file at start-up.
#[derive(Debug, Error)]
pub enum CatalogFileError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads a JSON array of food items into an in-memory catalog.
pub async fn load_catalog(path: &Path) -> Result<InMemoryCatalog, CatalogFileError> {
    let raw = tokio::fs::read(path).await?;
    let items: Vec<FoodItem> = serde_json::from_slice(&raw)?;
    tracing::info!(path = %path.display(), items = items.len(), "catalog loaded");
    Ok(InMemoryCatalog::with_items(items))
}
