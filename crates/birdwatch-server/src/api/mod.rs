mod pipeline;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use birdwatch_pipeline::{Controller, PipelineError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Controller errors that a command can surface directly. Fetch and geocode
/// failures are not among them: those land in the snapshot's phase.
pub(super) fn map_pipeline_error(request_id: String, error: &PipelineError) -> ApiError {
    let code = match error {
        PipelineError::CandidateOutOfRange { .. } => "not_found",
        PipelineError::NoLocation | PipelineError::NoPlaceMatch { .. } => "bad_request",
        PipelineError::FetchFailed(_) | PipelineError::GeocodeFailed(_) => {
            tracing::error!(error = %error, "pipeline command failed");
            "internal_error"
        }
    };
    ApiError::new(request_id, code, error.to_string())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(pipeline::get_state))
        .route("/api/v1/search", post(pipeline::search))
        .route("/api/v1/select", post(pipeline::select_candidate))
        .route("/api/v1/locate", post(pipeline::locate_me))
        .route("/api/v1/locate/text", post(pipeline::locate_by_text))
        .route("/api/v1/radius", put(pipeline::set_radius))
        .route("/api/v1/location", put(pipeline::set_location))
        .route("/api/v1/refresh", post(pipeline::refresh))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    ApiResponse::new(req_id.0, HealthData { status: "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use birdwatch_core::{
        Coordinate, ObservationBundle, PlaceCandidate, SearchRadius, Sighting,
    };
    use birdwatch_ebird::EbirdError;
    use birdwatch_geo::GeocodeError;
    use birdwatch_pipeline::{ObservationSource, PlaceLookup};
    use futures::future::{self, BoxFuture, FutureExt};
    use tower::ServiceExt;

    struct StubSource;

    impl ObservationSource for StubSource {
        fn fetch(
            &self,
            _coordinate: Coordinate,
            _radius: SearchRadius,
        ) -> BoxFuture<'_, Result<ObservationBundle, EbirdError>> {
            future::ready(Ok(ObservationBundle {
                sightings: vec![Sighting {
                    species_common_name: "Asian Koel".to_string(),
                    species_scientific_name: "Eudynamys scolopaceus".to_string(),
                    observation_date: "2024-03-01 07:15".to_string(),
                    count: Some(3),
                    location_name: "Park Lake".to_string(),
                    submission_id: "S1".to_string(),
                    species_code: None,
                    location_id: None,
                    latitude: None,
                    longitude: None,
                }],
                raw_hotspot_text: "L123,x,y,z,16.50,80.49,Park Lake,2024-03-01,12\n".to_string(),
            }))
            .boxed()
        }
    }

    struct StubPlaces;

    impl PlaceLookup for StubPlaces {
        fn resolve_by_text<'a>(
            &'a self,
            query: &'a str,
        ) -> BoxFuture<'a, Result<Vec<PlaceCandidate>, GeocodeError>> {
            let candidates = if query == "park lake" {
                vec![PlaceCandidate {
                    display_name: "Park Lake, Vijayawada".to_string(),
                    coordinate: Coordinate::new(16.50, 80.49).unwrap(),
                    place_id: "42".to_string(),
                }]
            } else {
                Vec::new()
            };
            future::ready(Ok(candidates)).boxed()
        }

        fn name_for(&self, _coordinate: Coordinate) -> BoxFuture<'_, Option<String>> {
            future::ready(Some("Somewhere Nice".to_string())).boxed()
        }
    }

    fn test_app() -> Router {
        let controller = Controller::new(
            Arc::new(StubSource),
            Arc::new(StubPlaces),
            SearchRadius::default(),
        );
        build_app(AppState {
            controller: Arc::new(controller),
        })
    }

    fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).expect("json parse");
        (status, json)
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn candidate_out_of_range_maps_to_not_found() {
        let error = PipelineError::CandidateOutOfRange {
            index: 4,
            available: 0,
        };
        let response = map_pipeline_error("req-1".to_string(), &error).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_is_ok_and_carries_request_id() {
        let response = test_app()
            .oneshot(get_request("/api/v1/health"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn incoming_request_id_is_echoed() {
        let request = Request::builder()
            .uri("/api/v1/state")
            .header(REQUEST_ID_HEADER, "abc-123")
            .body(Body::empty())
            .expect("request");
        let response = test_app().oneshot(request).await.expect("response");
        assert_eq!(
            response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some("abc-123")
        );
    }

    #[tokio::test]
    async fn initial_state_is_idle() {
        let (status, json) = send(test_app(), get_request("/api/v1/state")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["phase"]["status"], "idle");
        assert_eq!(json["data"]["radius"], 25);
        assert!(json["data"]["location"].is_null());
        assert!(json["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn radius_outside_bounds_is_rejected() {
        let body = serde_json::json!({ "radius_km": 60 });
        let (status, json) = send(test_app(), json_request(Method::PUT, "/api/v1/radius", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn radius_within_bounds_is_stored() {
        let body = serde_json::json!({ "radius_km": 10 });
        let (status, json) = send(test_app(), json_request(Method::PUT, "/api/v1/radius", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["radius"], 10);
        assert_eq!(json["data"]["phase"]["status"], "idle");
    }

    #[tokio::test]
    async fn invalid_location_is_rejected() {
        let body = serde_json::json!({ "latitude": 95.0, "longitude": 10.0 });
        let (status, json) =
            send(test_app(), json_request(Method::PUT, "/api/v1/location", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn manual_location_reaches_ready() {
        let body = serde_json::json!({ "latitude": 16.4971, "longitude": 80.4992 });
        let (status, json) =
            send(test_app(), json_request(Method::PUT, "/api/v1/location", &body)).await;
        assert_eq!(status, StatusCode::OK);
        let data = &json["data"];
        assert_eq!(data["phase"]["status"], "ready");
        assert_eq!(data["location_source"], "manual");
        assert_eq!(data["observations"]["sightings"][0]["comName"], "Asian Koel");
        assert_eq!(data["observations"]["hotspots"][0]["location_id"], "L123");
        assert_eq!(data["observations"]["hotspots"][0]["species_count"], 12);
    }

    #[tokio::test]
    async fn denied_device_location_uses_fallback() {
        let body = serde_json::json!({ "status": "denied" });
        let (status, json) =
            send(test_app(), json_request(Method::POST, "/api/v1/locate", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["location_source"], "fallback");
        assert_eq!(json["data"]["phase"]["status"], "ready");
    }

    #[tokio::test]
    async fn search_then_select_adopts_candidate() {
        let app = test_app();

        let body = serde_json::json!({ "query": "park lake" });
        let (status, json) =
            send(app.clone(), json_request(Method::POST, "/api/v1/search", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["candidates"].as_array().map(Vec::len), Some(1));

        let body = serde_json::json!({ "index": 0 });
        let (status, json) = send(app, json_request(Method::POST, "/api/v1/select", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["location_name"], "Park Lake, Vijayawada");
        assert_eq!(json["data"]["location_source"], "search");
    }

    #[tokio::test]
    async fn select_without_candidates_is_not_found() {
        let body = serde_json::json!({ "index": 0 });
        let (status, json) =
            send(test_app(), json_request(Method::POST, "/api/v1/select", &body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn locate_by_unknown_text_reports_failed_phase() {
        let body = serde_json::json!({ "query": "atlantis" });
        let (status, json) =
            send(test_app(), json_request(Method::POST, "/api/v1/locate/text", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["phase"]["status"], "failed");
    }

    #[tokio::test]
    async fn blank_locate_text_is_rejected() {
        let body = serde_json::json!({ "query": "  " });
        let (status, _) =
            send(test_app(), json_request(Method::POST, "/api/v1/locate/text", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refresh_before_location_is_bad_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/refresh")
            .body(Body::empty())
            .expect("request");
        let (status, json) = send(test_app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "bad_request");
    }
}
