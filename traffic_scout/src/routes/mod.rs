mod health;
mod index;
mod metrics;
mod plan;

use crate::server::SharedState;
use axum::{routing::get, Router};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(index::index))
        .route("/plan", get(plan::plan_page))
        .route("/api/plan", get(plan::plan_json))
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
}
