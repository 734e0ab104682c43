use anyhow::Result;
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use prometheus::Registry;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;
use crate::metrics;

const METRICS_NAMESPACE: &str = "simple_ksef";
const DEFAULT_LOG_FILTER: &str = "simple_ksef_api=debug,tower_http=debug";

pub struct Observability {
    pub registry: Registry,
}

impl Observability {
    /// Install the tracing subscriber and register every collector.
    pub fn init(config: &AppConfig) -> Result<Self> {
        let registry = build_registry(METRICS_NAMESPACE)?;

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

        // JSON lines for log shipping in production, readable output elsewhere
        if config.environment.is_production() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;
        }

        tracing::info!(
            environment = %config.environment,
            namespace = METRICS_NAMESPACE,
            "observability initialized"
        );
        Ok(Self { registry })
    }
}

/// Registry with every application collector registered under `namespace`
pub fn build_registry(namespace: &str) -> Result<Registry> {
    let registry = Registry::new_custom(Some(namespace.to_string()), None)?;
    metrics::register_all(&registry)?;
    Ok(registry)
}

/// Log each request and feed the HTTP metrics.
///
/// The route template is used as the metric label so path parameters do not
/// explode label cardinality.
pub async fn request_logger(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    metrics::observe_request(method.as_str(), &path, status, elapsed.as_secs_f64());

    tracing::info!("{method} {uri} {status} {}ms", elapsed.as_millis());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = build_registry("test").unwrap();
        let families = registry.gather();
        // labelled vectors only show up once observed
        assert!(families.len() >= 4, "got {} metric families", families.len());
    }

    #[test]
    fn test_metric_names_prefixed() {
        let registry = build_registry("test").unwrap();
        for family in registry.gather() {
            assert!(
                family.get_name().starts_with("test_"),
                "metric {} missing prefix",
                family.get_name()
            );
        }
    }
}
