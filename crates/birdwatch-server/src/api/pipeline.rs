//! Pipeline read and command handlers.
//!
//! - `GET  /api/v1/state`        current snapshot
//! - `POST /api/v1/search`       candidate search for the dropdown
//! - `POST /api/v1/select`       adopt a candidate and fetch
//! - `POST /api/v1/locate`       device position reported by the browser
//! - `POST /api/v1/locate/text`  geocode free text and fetch
//! - `PUT  /api/v1/radius`       change the search radius
//! - `PUT  /api/v1/location`     manual coordinate
//! - `POST /api/v1/refresh`      retry the last location and radius
//!
//! Commands answer once the cycle they started has settled. The cycle keeps
//! running if the client goes away first. Place names found by reverse lookup
//! can land after the answer; `GET /state` picks them up.

use axum::{extract::State, Extension, Json};
use birdwatch_core::{Coordinate, SearchRadius};
use birdwatch_geo::ReportedPosition;
use birdwatch_pipeline::{PipelineSnapshot, SearchState};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_pipeline_error, ApiError, ApiResponse, AppState};

type SnapshotResponse = Json<ApiResponse<PipelineSnapshot>>;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct SelectRequest {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub(super) struct RadiusRequest {
    pub radius_km: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub(super) async fn get_state(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> SnapshotResponse {
    ApiResponse::new(req_id.0, state.controller.snapshot())
}

pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<QueryRequest>,
) -> Json<ApiResponse<SearchState>> {
    let search = state.controller.search(&body.query).await;
    ApiResponse::new(req_id.0, search)
}

pub(super) async fn select_candidate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SelectRequest>,
) -> Result<SnapshotResponse, ApiError> {
    match state.controller.select_candidate(body.index).await {
        Ok(snapshot) => Ok(ApiResponse::new(req_id.0, snapshot)),
        Err(e) => Err(map_pipeline_error(req_id.0, &e)),
    }
}

pub(super) async fn locate_me(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(position): Json<ReportedPosition>,
) -> SnapshotResponse {
    let snapshot = state.controller.locate_me(position).await;
    ApiResponse::new(req_id.0, snapshot)
}

pub(super) async fn locate_by_text(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<QueryRequest>,
) -> Result<SnapshotResponse, ApiError> {
    if body.query.trim().is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "query must not be blank",
        ));
    }
    let snapshot = state.controller.locate_by_text(&body.query).await;
    Ok(ApiResponse::new(req_id.0, snapshot))
}

pub(super) async fn set_radius(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<RadiusRequest>,
) -> Result<SnapshotResponse, ApiError> {
    let radius = SearchRadius::new(body.radius_km)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;
    let snapshot = state.controller.set_radius(radius).await;
    Ok(ApiResponse::new(req_id.0, snapshot))
}

pub(super) async fn set_location(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<LocationRequest>,
) -> Result<SnapshotResponse, ApiError> {
    let coordinate = Coordinate::new(body.latitude, body.longitude)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;
    let snapshot = state.controller.set_location(coordinate).await;
    Ok(ApiResponse::new(req_id.0, snapshot))
}

pub(super) async fn refresh(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<SnapshotResponse, ApiError> {
    match state.controller.refresh().await {
        Ok(snapshot) => Ok(ApiResponse::new(req_id.0, snapshot)),
        Err(e) => Err(map_pipeline_error(req_id.0, &e)),
    }
}
