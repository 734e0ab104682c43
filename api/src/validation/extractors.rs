//! Custom Axum extractors for validated input
//!
//! This module provides `ValidatedJson<T>` - a drop-in replacement for `Json<T>`
//! that normalizes token fields and validates incoming JSON payloads.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::checker::check_token_graph;
use super::normalizer::{normalize_graph, Normalizable, WalkStats};
use crate::error::ApiError;
use crate::metrics;

/// A field-level validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validation error response body
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub message: String,
    pub errors: Vec<FieldError>,
    pub code: u16,
    pub timestamp: String,
    pub correlation_id: String,
}

impl ValidationErrorResponse {
    pub fn new(errors: Vec<FieldError>) -> Self {
        let error_summary = match errors.as_slice() {
            [single] => format!("Validation failed for field '{}'", single.field),
            _ => format!("Validation failed for {} fields", errors.len()),
        };

        Self {
            error: "ValidationError".to_string(),
            message: error_summary,
            errors,
            code: StatusCode::BAD_REQUEST.as_u16(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Validation error that converts to an HTTP response
#[derive(Debug)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let response = ValidationErrorResponse::new(self.errors);
        (StatusCode::BAD_REQUEST, Json(response)).into_response()
    }
}

/// Trait for request types that go through `ValidatedJson<T>`
///
/// Both steps have defaults driven by the type's `token_graph!` declaration;
/// override `validate` to add checks beyond token rules.
pub trait Validatable: Normalizable + Sized {
    /// Normalize token fields in place
    fn sanitize(&mut self) -> WalkStats {
        normalize_graph(self)
    }

    /// Validate the data and return any field errors
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        ValidationBuilder::with_token_checks(self).build()
    }
}

/// Custom JSON extractor that validates and sanitizes input
///
/// Use this instead of `Json<T>` to automatically:
/// 1. Parse JSON from the request body
/// 2. Normalize every token field in the object graph
/// 3. Validate fields against their rules
/// 4. Return detailed 400 errors for validation failures
///
/// A request without a JSON content type is answered with 415.
///
/// ```ignore
/// pub async fn create_taxpayer(
///     ValidatedJson(req): ValidatedJson<CreateTaxpayerRequest>,
/// ) -> impl IntoResponse {
///     // req is already normalized and validated
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validatable + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut data) = Json::<T>::from_request(req, state)
            .await
            .map_err(map_json_rejection)?;

        let stats = data.sanitize();
        metrics::record_normalization(&stats);
        tracing::debug!(
            request = request_name::<T>(),
            tokens = stats.tokens_normalized,
            changed = stats.tokens_changed,
            cycles_skipped = stats.cycles_skipped,
            "normalized request"
        );

        if let Err(errors) = data.validate() {
            metrics::VALIDATION_FAILURES
                .with_label_values(&[request_name::<T>()])
                .inc();
            tracing::info!(
                request = request_name::<T>(),
                failed_fields = errors.len(),
                "request rejected by validation"
            );
            return Err(ValidationError::new(errors).into_response());
        }

        Ok(ValidatedJson(data))
    }
}

fn map_json_rejection(err: JsonRejection) -> Response {
    let message = match err {
        JsonRejection::MissingJsonContentType(_) => {
            return ApiError::unsupported_media_type(
                "This endpoint accepts only JSON. Send requests with Content-Type: application/json.",
            )
            .into_response();
        }
        JsonRejection::JsonDataError(e) => format!("Invalid JSON data: {}", e.body_text()),
        JsonRejection::JsonSyntaxError(e) => format!("JSON syntax error: {}", e.body_text()),
        JsonRejection::BytesRejection(_) => "Failed to read request body".to_string(),
        _ => "Invalid JSON payload".to_string(),
    };
    ValidationError::single("body", message).into_response()
}

/// Last path segment of a type name, used as a metric label
fn request_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

impl<T> std::ops::Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::DerefMut for ValidatedJson<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Builder for accumulating validation errors
#[derive(Debug, Default)]
pub struct ValidationBuilder {
    errors: Vec<FieldError>,
}

impl ValidationBuilder {
    /// Start with every token rule violation found in `root`
    pub fn with_token_checks<T: Normalizable + ?Sized>(root: &T) -> Self {
        Self {
            errors: check_token_graph(root)
                .into_iter()
                .map(FieldError::from)
                .collect(),
        }
    }

    /// Add an error if the result is Err
    pub fn check<F>(&mut self, field: &str, validator: F) -> &mut Self
    where
        F: FnOnce() -> Result<(), String>,
    {
        if let Err(message) = validator() {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Finish building and return Result
    pub fn build(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
