use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers, negotiation_middleware, observability, state::AppState, versioning,
};

pub fn observability_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(handlers::metrics_endpoint))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health_check))
}

pub fn invoice_routes() -> Router<AppState> {
    Router::new().route("/api/:version/invoice", post(handlers::create_invoice))
}

pub fn taxpayer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/:version/taxpayer", post(handlers::create_taxpayer))
        .route("/api/:version/taxpayer/:id", get(handlers::get_taxpayer))
}

/// Versioned JSON API, guarded by version and content negotiation checks
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(invoice_routes())
        .merge(taxpayer_routes())
        .route_layer(middleware::from_fn(negotiation_middleware::require_json_accept))
        .route_layer(middleware::from_fn(versioning::require_api_version))
}

pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) if !origin.contains('*') => Some(value),
            _ => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::LOCATION, versioning::API_SUPPORTED_VERSIONS]);

    Router::new()
        .merge(api_routes())
        .merge(health_routes())
        .merge(observability_routes())
        .fallback(handlers::route_not_found)
        .layer(middleware::from_fn(observability::request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
