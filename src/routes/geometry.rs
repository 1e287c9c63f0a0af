// src/routes/geometry.rs
//! Boundary layers for the choropleth maps.
//!
//! `GET /geometry/{layer}` returns the layer as a GeoJSON FeatureCollection
//! whose feature ids are the same join keys used in map chart rows, so the
//! front-end can match them without normalizing names itself.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use super::AppState;
use crate::geometry::GeometryTable;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/geometry/{layer}", get(layer))
}

async fn layer(Path(layer): Path<String>, State(state): State<AppState>) -> Response {
    // ---
    let table: Option<&GeometryTable> = match layer.as_str() {
        "states" => state.complaints.geometry(),
        "municipalities" => state.assessments.as_deref().and_then(|a| a.geometry()),
        _ => {
            return (StatusCode::NOT_FOUND, format!("unknown layer '{layer}'")).into_response();
        }
    };

    match table {
        Some(table) => Json(table.to_feature_collection()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("layer '{layer}' is not loaded"),
        )
            .into_response(),
    }
}
