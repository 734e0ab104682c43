use anyhow::Result;
use dotenv::dotenv;

use simple_ksef_api::config::AppConfig;
use simple_ksef_api::observability::Observability;
use simple_ksef_api::routes;
use simple_ksef_api::state::AppState;
use simple_ksef_api::validation::requests::registered_schemas;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    let config = AppConfig::from_env()?;
    let obs = Observability::init(&config)?;

    for (name, fields) in registered_schemas() {
        let tokens = fields.iter().filter(|field| field.rule.is_some()).count();
        tracing::debug!(
            schema = name,
            token_fields = tokens,
            nested_fields = fields.len() - tokens,
            "registered token schema"
        );
    }

    let addr = config.socket_addr();
    let state = AppState::new(config, obs.registry);
    let app = routes::build_router(state);

    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
