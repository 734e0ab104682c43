use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Answer 406 when the client's `Accept` header rules out JSON.
///
/// Requests without an `Accept` header are treated as accepting anything.
pub async fn require_json_accept(request: Request, next: Next) -> Response {
    let accept = request
        .headers()
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join(",");

    if !accept.trim().is_empty() && !accepts_json(&accept) {
        tracing::debug!(accept = %accept, "rejected non-json accept header");
        return ApiError::not_acceptable(
            "This endpoint produces only JSON. Send requests with Accept: application/json.",
        )
        .into_response();
    }

    next.run(request).await
}

fn accepts_json(accept: &str) -> bool {
    accept.split(',').any(|range| {
        let mut params = range.split(';');
        let media = params.next().unwrap_or("").trim().to_ascii_lowercase();
        let refused = params.any(|param| match param.split_once('=') {
            Some((name, weight)) if name.trim().eq_ignore_ascii_case("q") => {
                weight.trim().parse::<f32>().map_or(false, |q| q == 0.0)
            }
            _ => false,
        });
        !refused && matches!(media.as_str(), "application/json" | "application/*" | "*/*")
    })
}
