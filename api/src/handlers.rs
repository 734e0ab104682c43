use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use shared::models::{
    CreateInvoiceRequest, CreateInvoiceResponse, CreateTaxpayerRequest, CreateTaxpayerResponse,
    GetTaxpayerResponse,
};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    metrics,
    state::AppState,
    validation::ValidatedJson,
};

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let uptime = state.started_at.elapsed().as_secs();
    let now = chrono::Utc::now().to_rfc3339();

    tracing::debug!(uptime_secs = uptime, "health check passed");
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment.to_string(),
            "timestamp": now,
            "uptime_secs": uptime
        })),
    )
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let body = metrics::gather_metrics(&state.registry);
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

pub async fn create_invoice(
    ValidatedJson(req): ValidatedJson<CreateInvoiceRequest>,
) -> Json<CreateInvoiceResponse> {
    let id = Uuid::new_v4();
    metrics::INVOICES_CREATED.inc();
    tracing::info!(invoice_id = %id, number = %req.number, "invoice accepted");

    Json(CreateInvoiceResponse { id: id.to_string() })
}

pub async fn create_taxpayer(
    Path(version): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateTaxpayerRequest>,
) -> impl IntoResponse {
    let id = Uuid::now_v7();
    metrics::TAXPAYERS_CREATED.inc();
    tracing::info!(
        taxpayer_id = %id,
        status = ?req.status,
        has_correspondence_address = req.correspondence_address.is_some(),
        "taxpayer registered"
    );

    let location = format!("/api/{version}/taxpayer/{id}");
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CreateTaxpayerResponse { id }),
    )
}

pub async fn get_taxpayer(
    Path((_version, id)): Path<(String, String)>,
) -> ApiResult<Json<GetTaxpayerResponse>> {
    let id = Uuid::parse_str(&id).map_err(|_| {
        ApiError::bad_request("InvalidTaxpayerId", format!("Invalid taxpayer ID format: {id}"))
    })?;

    tracing::debug!(taxpayer_id = %id, "taxpayer lookup requested");
    Err(ApiError::not_implemented(format!(
        "Taxpayer lookup is not available yet (requested {id})"
    )))
}

pub async fn route_not_found() -> impl IntoResponse {
    ApiError::not_found("RouteNotFound", "Route not found")
}
