use std::sync::Arc;

use poimap_core::DirectoryService;
use poimap_core::FallbackSource;
use poimap_core::Persistence;
use poimap_core::PoiError;
use poimap_core::PoiMapConfig;
use poimap_core::SearchService;
use poimap_core::Session;
use poimap_core::tabular;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::FALLBACK_CSV;
use super::client_for;
use super::session_for;
use super::session_with_timeout;

async fn mount_directory(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "A", "category": "카페", "lat": 37.5, "lng": 127.0},
        ])))
        .mount(server)
        .await;
}

fn server_directory() -> serde_json::Value {
    json!([
        {"name": "A", "category": "카페", "lat": 37.5, "lng": 127.0},
        {"name": "New Place", "category": "바", "lat": 37.55, "lng": 126.99},
    ])
}

fn fill_pending(session: &mut Session) {
    session.open_add_flow();
    let pending = session.pending_mut().expect("flow open");
    pending.name = Some("New Place".to_string());
    pending.category = "바".to_string();
    pending.rating = Some(4.0);
    pending.lat = Some(37.55);
    pending.lng = Some(126.99);
}

#[tokio::test]
async fn accepted_write_installs_the_server_directory() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    Mock::given(method("POST"))
        .and(path("/directory"))
        .and(body_partial_json(json!({"name": "New Place", "category": "바"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "A", "category": "카페", "lat": 37.5, "lng": 127.0},
            {"name": "Server Side", "category": "한식", "lat": 37.4, "lng": 127.1},
            {"name": "New Place", "category": "바", "rating": 4.0, "lat": 37.55, "lng": 126.99},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.resolve().await;
    fill_pending(&mut session);

    let outcome = session.commit().await.unwrap();

    assert!(matches!(outcome.persistence, Persistence::Remote));
    assert_eq!(session.directory().len(), 3);
    assert_eq!(session.directory()[1].name, "Server Side");
    assert_eq!(session.categories().as_slice(), ["카페", "한식", "바"]);
    assert_eq!(outcome.export.file_name, "restaurants_updated.csv");
    assert_eq!(
        tabular::parse(&outcome.export.contents).records,
        session.directory()
    );
    assert!(!session.is_add_flow_open());
}

#[tokio::test]
async fn rejected_write_keeps_record_locally_and_exports() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    Mock::given(method("POST"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        // writes are never retried
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.resolve().await;
    fill_pending(&mut session);

    let outcome = session.commit().await.unwrap();

    match &outcome.persistence {
        Persistence::LocalFallback(PoiError::PersistenceFailed { message }) => {
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected persistence {other:?}"),
    }
    let names: Vec<_> = session.directory().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["A", "New Place"]);
    assert_eq!(outcome.record.name, "New Place");
    assert!(outcome.export.contents.contains("New Place"));
}

#[tokio::test]
async fn missing_coordinates_block_commit_without_network() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    Mock::given(method("POST"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.resolve().await;
    fill_pending(&mut session);
    if let Some(pending) = session.pending_mut() {
        pending.lng = None;
    }

    assert!(matches!(
        session.commit().await,
        Err(PoiError::MissingCoordinates)
    ));
    assert!(session.is_add_flow_open());
    assert_eq!(session.directory().len(), 1);
}

#[tokio::test]
async fn export_lands_on_disk() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    Mock::given(method("POST"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.resolve().await;
    fill_pending(&mut session);
    let outcome = session.commit().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = outcome.export.write_to(dir.path()).unwrap();
    let reparsed = tabular::parse(&std::fs::read_to_string(written).unwrap());
    assert_eq!(reparsed.records, session.directory());
}

#[tokio::test]
async fn timed_out_write_keeps_record_locally_and_exports() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    Mock::given(method("POST"))
        .and(path("/directory"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(server_directory())
                .set_delay(std::time::Duration::from_secs(2)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_with_timeout(&server, std::time::Duration::from_millis(300));
    assert!(session.resolve().await.remote_error.is_none());
    fill_pending(&mut session);

    let outcome = session.commit().await.unwrap();

    assert!(matches!(
        outcome.persistence,
        Persistence::LocalFallback(PoiError::PersistenceFailed { .. })
    ));
    let names: Vec<_> = session.directory().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["A", "New Place"]);
    assert_eq!(
        tabular::parse(&outcome.export.contents).records,
        session.directory()
    );
    assert!(!session.is_add_flow_open());
}

#[tokio::test]
async fn failed_export_after_accepted_write_keeps_the_server_directory() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    Mock::given(method("POST"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(server_directory()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut config = PoiMapConfig::default();
    config.export.file_name = String::new();
    let mut session = Session::new(
        config,
        Some(Arc::clone(&client) as Arc<dyn DirectoryService>),
        Some(client as Arc<dyn SearchService>),
        FallbackSource::Inline(FALLBACK_CSV.to_string()),
    );
    session.resolve().await;
    fill_pending(&mut session);

    assert!(matches!(
        session.commit().await,
        Err(PoiError::Export { .. })
    ));
    let names: Vec<_> = session.directory().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["A", "New Place"]);
    assert_eq!(session.categories().as_slice(), ["카페", "바"]);
    assert!(!session.is_add_flow_open());
}
