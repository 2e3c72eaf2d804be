use crate::{
    planner::{PlanError, TripPlan, TripRequest},
    presenter::{render_error_page, render_plan_page, FormValues},
    server::SharedState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    pub radius_km: Option<f64>,
}

impl PlanError {
    fn status(&self) -> StatusCode {
        match self {
            PlanError::LocationNotFound { .. } => StatusCode::NOT_FOUND,
            PlanError::NoRoute => StatusCode::UNPROCESSABLE_ENTITY,
            PlanError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for PlanError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.to_string(),
            "kind": self.kind().as_str(),
        });
        (self.status(), Json(body)).into_response()
    }
}

async fn run_plan(state: &SharedState, query: &PlanQuery, route: &str) -> Result<TripPlan, PlanError> {
    let request = TripRequest {
        origin: query.origin.clone(),
        destination: query.destination.clone(),
        radius_km: query.radius_km,
    };

    match state.planner.plan(&request).await {
        Ok(plan) => {
            state.metrics.record_plan_request(route, "ok");
            state.metrics.record_scan(
                plan.scan_duration_ms,
                plan.snapshot.total_vehicles,
                plan.snapshot.feeds.len(),
            );
            Ok(plan)
        }
        Err(e) => {
            state.metrics.record_plan_request(route, e.kind().as_str());
            tracing::warn!(kind = e.kind().as_str(), "Trip plan failed: {}", e);
            Err(e)
        }
    }
}

#[instrument(skip(state))]
pub async fn plan_json(State(state): State<SharedState>, Query(query): Query<PlanQuery>) -> Response {
    match run_plan(&state, &query, "/api/plan").await {
        Ok(plan) => Json(plan).into_response(),
        Err(e) => e.into_response(),
    }
}

#[instrument(skip(state))]
pub async fn plan_page(State(state): State<SharedState>, Query(query): Query<PlanQuery>) -> Response {
    let scan = &state.scan_config;
    let values = FormValues {
        origin: &query.origin,
        destination: &query.destination,
        radius_km: scan.clamp_radius(query.radius_km),
    };

    match run_plan(&state, &query, "/plan").await {
        Ok(plan) => Html(render_plan_page(
            &values,
            &plan,
            &state.map,
            scan.min_radius_km,
            scan.max_radius_km,
        ))
        .into_response(),
        Err(e) => (
            e.status(),
            Html(render_error_page(
                &values,
                &e.to_string(),
                scan.min_radius_km,
                scan.max_radius_km,
            )),
        )
            .into_response(),
    }
}
