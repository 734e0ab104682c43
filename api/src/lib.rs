pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod negotiation_middleware;
pub mod observability;
pub mod routes;
pub mod state;
pub mod validation;
pub mod versioning;
