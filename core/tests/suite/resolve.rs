use poimap_core::PoiError;
use poimap_core::SourceOrigin;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::session_for;
use super::session_with_timeout;

#[tokio::test]
async fn remote_directory_wins_when_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Remote Cafe", "category": "카페", "rating": "4.2", "lat": 37.56, "lng": 126.97},
            {"name": "Remote Bar", "category": "바", "capacity": 40, "lat": "37.55", "lng": "126.99"},
            {"name": "Nowhere", "category": "카페"},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let report = session.resolve().await;

    assert_eq!(report.origin, SourceOrigin::Remote);
    assert!(report.remote_error.is_none());
    assert_eq!(report.records, 3);
    assert_eq!(report.map_eligible, 2);
    assert_eq!(session.directory()[0].rating, Some(4.2));
    assert_eq!(session.directory()[1].lat, Some(37.55));
    assert_eq!(session.categories().as_slice(), ["카페", "바"]);
}

#[tokio::test]
async fn server_error_falls_back_to_local_dataset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let report = session.resolve().await;

    assert_eq!(report.origin, SourceOrigin::Fallback);
    assert!(matches!(
        report.remote_error,
        Some(PoiError::SourceUnavailable { .. })
    ));
    let names: Vec<_> = session.directory().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Fallback Cafe", "Fallback Bap"]);
}

#[tokio::test]
async fn slow_remote_times_out_into_the_local_dataset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"name": "Too Late", "category": "카페"}]))
                .set_delay(std::time::Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut session = session_with_timeout(&server, std::time::Duration::from_millis(100));
    let report = session.resolve().await;

    assert_eq!(report.origin, SourceOrigin::Fallback);
    assert!(matches!(
        report.remote_error,
        Some(PoiError::SourceUnavailable { .. })
    ));
    let names: Vec<_> = session.directory().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Fallback Cafe", "Fallback Bap"]);
}

#[tokio::test]
async fn undecodable_remote_payload_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let report = session.resolve().await;

    assert_eq!(report.origin, SourceOrigin::Fallback);
    assert_eq!(report.records, 2);
}

#[tokio::test]
async fn resolving_twice_gives_the_same_directory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "A", "category": "카페", "lat": 37.5, "lng": 127.0},
            {"name": "B", "category": "한식", "lat": 37.4, "lng": 127.1},
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.resolve().await;
    let first = session.directory().to_vec();
    let first_categories = session.categories().clone();

    session.resolve().await;
    assert_eq!(session.directory(), first.as_slice());
    assert_eq!(session.categories(), &first_categories);
}
