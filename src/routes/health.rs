// src/routes/health.rs
//! API health check endpoint.
//!
//! This module defines the `/health` route used by container orchestrators
//! and CI pipelines to verify that the service is up. Besides liveness it
//! reports which datasets and map layers were loaded at startup, since a
//! missing geometry file degrades the service rather than stopping it.
//! It follows the Explicit Module Boundary Pattern (EMBP):
//! - Internal to this file: endpoint handler(s) and related types
//! - Exports to the gateway (`mod.rs`): a subrouter containing the `/health` route

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    complaints: usize,
    assessments: Option<usize>,
    states_layer: bool,
    municipalities_layer: bool,
}

/// Handle `GET /health`.
///
/// Reads only the in-memory stores; never touches the filesystem.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    // ---
    let assessments = state.assessments.as_deref();
    Json(HealthResponse {
        status: "ok",
        complaints: state.complaints.store().len(),
        assessments: assessments.map(|a| a.store().len()),
        states_layer: state.complaints.geometry().is_some(),
        municipalities_layer: assessments.is_some_and(|a| a.geometry().is_some()),
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
