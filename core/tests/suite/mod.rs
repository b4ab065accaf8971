use std::sync::Arc;
use std::time::Duration;

use poimap_core::ArtifactHandle;
use poimap_core::ArtifactSpec;
use poimap_core::BoundingRegion;
use poimap_core::DirectoryService;
use poimap_core::FallbackSource;
use poimap_core::HttpPoiClient;
use poimap_core::MapSurface;
use poimap_core::PoiMapConfig;
use poimap_core::SearchService;
use poimap_core::Session;
use poimap_core::config::RetryConfig;
use wiremock::MockServer;

mod commit;
mod render;
mod resolve;

pub const FALLBACK_CSV: &str = "\
category,name,rating,lat,lng,capacity,link
카페,Fallback Cafe,4.5,37.5665,126.9780,30,https://map.example.com/?lat=37.5665&lng=126.978
한식,Fallback Bap,,37.5700,126.9820,,
";

/// Fast retries so failure-path tests do not sleep.
pub fn quick_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 1,
        initial_backoff_ms: 1,
        max_backoff_ms: 2,
        backoff_multiplier: 1.0,
    }
}

pub fn client_for(server: &MockServer) -> Arc<HttpPoiClient> {
    Arc::new(HttpPoiClient::with_client(
        reqwest::Client::new(),
        &server.uri(),
        quick_retry(),
    ))
}

/// Session backed by `server` for both directory and search, with the inline
/// fallback dataset.
pub fn session_for(server: &MockServer) -> Session {
    let client = client_for(server);
    Session::new(
        PoiMapConfig::default(),
        Some(Arc::clone(&client) as Arc<dyn DirectoryService>),
        Some(client as Arc<dyn SearchService>),
        FallbackSource::Inline(FALLBACK_CSV.to_string()),
    )
}

/// Like [`session_for`], but through a real client whose requests give up
/// after `timeout`.
pub fn session_with_timeout(server: &MockServer, timeout: Duration) -> Session {
    let client = Arc::new(
        HttpPoiClient::new(&server.uri(), timeout, quick_retry()).expect("client builds"),
    );
    Session::new(
        PoiMapConfig::default(),
        Some(Arc::clone(&client) as Arc<dyn DirectoryService>),
        Some(client as Arc<dyn SearchService>),
        FallbackSource::Inline(FALLBACK_CSV.to_string()),
    )
}

/// In-memory map surface that records what the reconciler asked for.
#[derive(Debug, Default)]
pub struct RecordingMap {
    next: u64,
    pub live: Vec<(ArtifactHandle, ArtifactSpec)>,
    pub visible_overlays: Vec<ArtifactHandle>,
    pub bounds: Option<BoundingRegion>,
    pub zoom: i32,
}

impl RecordingMap {
    pub fn at_zoom(zoom: i32) -> Self {
        Self {
            zoom,
            ..Self::default()
        }
    }

    pub fn titles(&self) -> Vec<&str> {
        self.live.iter().map(|(_, spec)| spec.title.as_str()).collect()
    }
}

impl MapSurface for RecordingMap {
    fn create(&mut self, spec: &ArtifactSpec) -> ArtifactHandle {
        self.next += 1;
        let handle = ArtifactHandle(self.next);
        self.live.push((handle, spec.clone()));
        handle
    }

    fn dispose(&mut self, handle: ArtifactHandle) {
        self.live.retain(|(h, _)| *h != handle);
        self.visible_overlays.retain(|h| *h != handle);
    }

    fn set_overlay_visible(&mut self, handle: ArtifactHandle, visible: bool) {
        self.visible_overlays.retain(|h| *h != handle);
        if visible {
            self.visible_overlays.push(handle);
        }
    }

    fn fit_bounds(&mut self, bounds: &BoundingRegion) {
        self.bounds = Some(*bounds);
        self.zoom = 16;
    }

    fn set_zoom(&mut self, level: i32) {
        self.zoom = level;
    }

    fn zoom(&self) -> i32 {
        self.zoom
    }
}
