//! Integration tests for `NominatimClient` and `LocationResolver` using
//! wiremock HTTP mocks.

use birdwatch_core::Coordinate;
use birdwatch_geo::{GeocodeError, LocationResolver, NominatimClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> NominatimClient {
    NominatimClient::with_base_url(5, "birdwatch-test/0.1", base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn search_returns_candidates_in_provider_order() {
    let server = MockServer::start().await;

    let body = serde_json::json!([
        {
            "place_id": 101,
            "lat": "16.5062",
            "lon": "80.6480",
            "display_name": "Vijayawada, NTR, Andhra Pradesh, India",
            "type": "city"
        },
        {
            "place_id": 202,
            "lat": "16.3067",
            "lon": "80.4365",
            "display_name": "Guntur, Andhra Pradesh, India"
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "andhra"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let candidates = client.search("andhra").await.expect("should parse results");

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].place_id, "101");
    assert_eq!(
        candidates[0].display_name,
        "Vijayawada, NTR, Andhra Pradesh, India"
    );
    assert!((candidates[0].coordinate.latitude() - 16.5062).abs() < 1e-9);
    assert_eq!(candidates[1].place_id, "202");
}

#[tokio::test]
async fn search_skips_records_with_bad_coordinates() {
    let server = MockServer::start().await;

    let body = serde_json::json!([
        { "place_id": 1, "lat": "n/a", "lon": "80.0", "display_name": "Broken" },
        { "place_id": 2, "lat": "16.0", "lon": "80.0", "display_name": "Fine" }
    ]);

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let candidates = test_client(&server.uri())
        .search("anything")
        .await
        .expect("should parse results");

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].display_name, "Fine");
}

#[tokio::test]
async fn search_with_zero_matches_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let resolver = LocationResolver::new(test_client(&server.uri()));
    let candidates = resolver
        .resolve_by_text("nowhere in particular")
        .await
        .expect("empty result is not an error");
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn search_server_error_is_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = test_client(&server.uri()).search("lake").await;
    assert!(
        matches!(result, Err(GeocodeError::Http(_))),
        "expected Http error, got: {result:?}"
    );
}

#[tokio::test]
async fn search_non_json_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = test_client(&server.uri()).search("lake").await;
    assert!(
        matches!(result, Err(GeocodeError::Deserialize { .. })),
        "expected Deserialize error, got: {result:?}"
    );
}

#[tokio::test]
async fn blank_query_issues_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = LocationResolver::new(test_client(&server.uri()));
    assert!(resolver.resolve_by_text("").await.unwrap().is_empty());
    assert!(resolver.resolve_by_text("   \t").await.unwrap().is_empty());

    server.verify().await;
}

#[tokio::test]
async fn reverse_returns_display_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "16.4971"))
        .and(query_param("lon", "80.4992"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "place_id": 9,
            "display_name": "Mangalagiri, Guntur, Andhra Pradesh, India"
        })))
        .mount(&server)
        .await;

    let resolver = LocationResolver::new(test_client(&server.uri()));
    let name = resolver
        .name_for(Coordinate::new(16.4971, 80.4992).unwrap())
        .await;
    assert_eq!(
        name.as_deref(),
        Some("Mangalagiri, Guntur, Andhra Pradesh, India")
    );
}

#[tokio::test]
async fn reverse_unable_to_geocode_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "error": "Unable to geocode" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let name = client
        .reverse(Coordinate::new(0.0, -150.0).unwrap())
        .await
        .expect("provider answered");
    assert!(name.is_none());
}

#[tokio::test]
async fn name_for_absorbs_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let resolver = LocationResolver::new(test_client(&server.uri()));
    let name = resolver
        .name_for(Coordinate::new(10.0, 10.0).unwrap())
        .await;
    assert!(name.is_none());
}
