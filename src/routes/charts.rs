// src/routes/charts.rs
//! Filter-options and chart endpoints, generic over the dashboard.
//!
//! Mounted by the gateway once per dataset:
//! - `GET  {prefix}/options` – values for the filter controls
//! - `POST {prefix}/charts`  – filter request in, `{chart_id: aggregate}` out
//!
//! Chart computation is CPU-bound, so it runs on the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::dashboard::Dashboard;
use crate::store::FilterOptions;

// ---

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

pub fn router<D: Dashboard>() -> Router<Arc<D>> {
    // ---
    Router::new()
        .route("/options", get(options::<D>))
        .route("/charts", post(charts::<D>))
}

/// Stand-in for a dataset that was not configured at startup.
pub fn unconfigured<S>(dataset: &'static str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // ---
    let handler = move || async move {
        error_response(
            StatusCode::NOT_FOUND,
            format!("the {dataset} dataset is not configured"),
        )
    };
    Router::new()
        .route("/options", get(handler.clone()))
        .route("/charts", post(handler))
}

async fn options<D: Dashboard>(State(dashboard): State<Arc<D>>) -> Json<FilterOptions> {
    Json(dashboard.options())
}

async fn charts<D: Dashboard>(
    State(dashboard): State<Arc<D>>,
    payload: Result<Json<D::Request>, JsonRejection>,
) -> Response {
    // ---
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected chart request: {}", rejection.body_text());
            return error_response(rejection.status(), rejection.body_text());
        }
    };

    if let Err(e) = dashboard.validate(&request) {
        warn!("Rejected chart request: {}", e);
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    match tokio::task::spawn_blocking(move || dashboard.on_filter_change(&request)).await {
        Ok(charts) => {
            debug!("Returning {} charts", charts.len());
            (StatusCode::OK, Json(charts)).into_response()
        }
        Err(e) => {
            error!("Chart computation failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "chart computation failed")
        }
    }
}
