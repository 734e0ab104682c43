use once_cell::sync::Lazy;
use prometheus::{
    opts, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder,
};

use crate::validation::WalkStats;

macro_rules! counter_vec {
    ($name:expr, $help:expr, $labels:expr) => {
        Lazy::new(|| IntCounterVec::new(opts!($name, $help), $labels).unwrap())
    };
}
macro_rules! histogram_vec {
    ($name:expr, $help:expr, $labels:expr) => {
        Lazy::new(|| {
            HistogramVec::new(HistogramOpts::new($name, $help).buckets(LATENCY_BUCKETS.to_vec()), $labels)
                .unwrap()
        })
    };
}
macro_rules! counter {
    ($name:expr, $help:expr) => {
        Lazy::new(|| IntCounter::new($name, $help).unwrap())
    };
}

const LATENCY_BUCKETS: [f64; 10] = [0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

// ── HTTP ────────────────────────────────────────────────────────────────────
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("http_requests_total", "Total HTTP requests", &["method", "path", "status"]);
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> =
    histogram_vec!("http_request_duration_seconds", "HTTP request latency", &["method", "path"]);

// ── Validation ──────────────────────────────────────────────────────────────
pub static TOKEN_FIELDS_NORMALIZED: Lazy<IntCounter> =
    counter!("token_fields_normalized_total", "Token fields visited by the normalizer");
pub static TOKEN_FIELDS_CHANGED: Lazy<IntCounter> =
    counter!("token_fields_changed_total", "Token fields rewritten by the normalizer");
pub static VALIDATION_FAILURES: Lazy<IntCounterVec> =
    counter_vec!("validation_failures_total", "Requests rejected by validation", &["request"]);

// ── Registration ────────────────────────────────────────────────────────────
pub static INVOICES_CREATED: Lazy<IntCounter> = counter!("invoices_created_total", "Invoices created");
pub static TAXPAYERS_CREATED: Lazy<IntCounter> =
    counter!("taxpayers_created_total", "Taxpayers created");

pub fn register_all(r: &Registry) -> prometheus::Result<()> {
    r.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    r.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    r.register(Box::new(TOKEN_FIELDS_NORMALIZED.clone()))?;
    r.register(Box::new(TOKEN_FIELDS_CHANGED.clone()))?;
    r.register(Box::new(VALIDATION_FAILURES.clone()))?;
    r.register(Box::new(INVOICES_CREATED.clone()))?;
    r.register(Box::new(TAXPAYERS_CREATED.clone()))?;
    Ok(())
}

pub fn record_normalization(stats: &WalkStats) {
    TOKEN_FIELDS_NORMALIZED.inc_by(stats.tokens_normalized as u64);
    TOKEN_FIELDS_CHANGED.inc_by(stats.tokens_changed as u64);
}

pub fn observe_request(method: &str, path: &str, status: u16, seconds: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(seconds);
}

pub fn gather_metrics(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %err, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_registry() -> Registry {
        let r = Registry::new_custom(Some("test".into()), None).unwrap();
        register_all(&r).unwrap();
        r
    }

    #[test]
    fn test_http_request_counter() {
        let r = fresh_registry();
        observe_request("GET", "/health", 200, 0.002);
        let out = gather_metrics(&r);
        assert!(out.contains("test_http_requests_total"));
        assert!(out.contains("test_http_request_duration_seconds"));
    }

    #[test]
    fn test_record_normalization() {
        let r = fresh_registry();
        let before = TOKEN_FIELDS_CHANGED.get();
        record_normalization(&WalkStats {
            tokens_normalized: 3,
            tokens_changed: 2,
            ..WalkStats::default()
        });
        assert!(TOKEN_FIELDS_CHANGED.get() >= before + 2);
        assert!(gather_metrics(&r).contains("test_token_fields_normalized_total"));
    }

    #[test]
    fn test_double_registration_fails() {
        let r = fresh_registry();
        assert!(register_all(&r).is_err());
    }
}
