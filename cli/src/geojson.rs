//! A [`MapSurface`] that renders to a GeoJSON `FeatureCollection`.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use poimap_core::ArtifactHandle;
use poimap_core::ArtifactSpec;
use poimap_core::BoundingRegion;
use poimap_core::Coordinates;
use poimap_core::MapSurface;
use serde_json::Value;
use serde_json::json;

#[derive(Debug)]
pub struct GeoJsonMap {
    next: u64,
    markers: BTreeMap<ArtifactHandle, ArtifactSpec>,
    open_overlays: BTreeSet<ArtifactHandle>,
    center: Coordinates,
    bounds: Option<BoundingRegion>,
    zoom: i32,
}

/// Zoom a real widget would land on after fitting `bounds`. Roughly one
/// level per halving of the larger span, capped at street level.
fn fitted_zoom(bounds: &BoundingRegion) -> i32 {
    let span = (bounds.north - bounds.south).max(bounds.east - bounds.west);
    if span <= 0.0 {
        return 17;
    }
    let zoom = (360.0 / span).log2().floor();
    (zoom as i32).clamp(0, 17)
}

impl GeoJsonMap {
    pub fn new(center: Coordinates, zoom: i32) -> Self {
        Self {
            next: 0,
            markers: BTreeMap::new(),
            open_overlays: BTreeSet::new(),
            center,
            bounds: None,
            zoom,
        }
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .markers
            .iter()
            .map(|(handle, spec)| {
                json!({
                    "type": "Feature",
                    "id": handle.0,
                    "geometry": {
                        "type": "Point",
                        "coordinates": [spec.position.lng, spec.position.lat],
                    },
                    "properties": {
                        "title": spec.title,
                        "link": spec.overlay,
                        "overlay_open": self.open_overlays.contains(handle),
                    },
                })
            })
            .collect();

        let mut collection = json!({
            "type": "FeatureCollection",
            "features": features,
            "view": {
                "center": [self.center.lng, self.center.lat],
                "zoom": self.zoom,
            },
        });
        if let Some(b) = &self.bounds {
            collection["bbox"] = json!([b.west, b.south, b.east, b.north]);
        }
        collection
    }
}

impl MapSurface for GeoJsonMap {
    fn create(&mut self, spec: &ArtifactSpec) -> ArtifactHandle {
        self.next += 1;
        let handle = ArtifactHandle(self.next);
        self.markers.insert(handle, spec.clone());
        handle
    }

    fn dispose(&mut self, handle: ArtifactHandle) {
        self.markers.remove(&handle);
        self.open_overlays.remove(&handle);
    }

    fn set_overlay_visible(&mut self, handle: ArtifactHandle, visible: bool) {
        if visible {
            self.open_overlays.insert(handle);
        } else {
            self.open_overlays.remove(&handle);
        }
    }

    fn fit_bounds(&mut self, bounds: &BoundingRegion) {
        self.bounds = Some(*bounds);
        self.center = bounds.center();
        self.zoom = fitted_zoom(bounds);
    }

    fn set_zoom(&mut self, level: i32) {
        self.zoom = level;
    }

    fn zoom(&self) -> i32 {
        self.zoom
    }
}
