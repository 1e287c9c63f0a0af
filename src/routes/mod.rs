//! HTTP gateway (EMBP): each sibling module exports a subrouter, and this
//! module assembles them with the shared application state so `main.rs` never
//! needs to know about individual endpoints.

use std::sync::Arc;

use axum::Router;

use crate::dashboard::{AssessmentsDashboard, ComplaintsDashboard};

mod charts;
mod geometry;
mod health;

// ---

/// Immutable data shared by every request. Cloning only bumps the `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub complaints: Arc<ComplaintsDashboard>,
    pub assessments: Option<Arc<AssessmentsDashboard>>,
}

pub fn router(state: AppState) -> Router {
    // ---
    let complaints = charts::router::<ComplaintsDashboard>().with_state(state.complaints.clone());
    let assessments = match &state.assessments {
        Some(dashboard) => {
            charts::router::<AssessmentsDashboard>().with_state(dashboard.clone())
        }
        None => charts::unconfigured("assessments"),
    };

    Router::new()
        .nest("/complaints", complaints)
        .nest("/assessments", assessments)
        .merge(geometry::router())
        .merge(health::router())
        .with_state(state)
}
