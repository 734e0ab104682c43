//! URL-segment API versioning
//!
//! Versioned routes look like `/api/v1/taxpayer`. The version segment accepts
//! `v1` and `v1.0`; anything else is rejected before the handler runs.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

pub const API_SUPPORTED_VERSIONS: HeaderName = HeaderName::from_static("api-supported-versions");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl ApiVersion {
    pub const V1: ApiVersion = ApiVersion { major: 1, minor: 0 };

    pub const SUPPORTED: &'static [ApiVersion] = &[ApiVersion::V1];

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }

    fn supported_header() -> String {
        Self::SUPPORTED
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('v')
            .or_else(|| s.strip_prefix('V'))
            .ok_or_else(|| format!("version segment `{s}` must start with 'v'"))?;

        let (major, minor) = match digits.split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (digits, None),
        };
        let parse = |part: &str| {
            part.parse::<u16>()
                .map_err(|_| format!("version segment `{s}` is not numeric"))
        };

        Ok(ApiVersion {
            major: parse(major)?,
            minor: minor.map(parse).transpose()?.unwrap_or(0),
        })
    }
}

/// Reject unsupported versions and advertise the supported ones.
pub async fn require_api_version(request: Request, next: Next) -> Response {
    let segment = version_segment(request.uri().path()).map(str::to_string);

    let mut response = match segment.as_deref().map(ApiVersion::from_str) {
        Some(Ok(version)) if version.is_supported() => next.run(request).await,
        Some(Ok(version)) => {
            tracing::debug!(%version, "rejected unsupported api version");
            unsupported(&format!("API version {version} is not supported"))
        }
        Some(Err(reason)) => unsupported(&reason),
        None => unsupported("API version segment is missing"),
    };

    if let Ok(value) = HeaderValue::from_str(&ApiVersion::supported_header()) {
        response.headers_mut().insert(API_SUPPORTED_VERSIONS, value);
    }
    response
}

fn unsupported(detail: &str) -> Response {
    ApiError::bad_request(
        "UnsupportedApiVersion",
        format!(
            "{detail}. Supported versions: {}",
            ApiVersion::supported_header()
        ),
    )
    .into_response()
}

fn version_segment(path: &str) -> Option<&str> {
    // Match patterns like /api/{version}/...
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() >= 3 && parts[1] == "api" && !parts[2].is_empty() {
        Some(parts[2])
    } else {
        None
    }
}
