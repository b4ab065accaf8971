//! Render reconciler
//!
//! Owns the set of map artifacts (markers and their info overlays) for the
//! most recent filtered result. Each [`RenderReconciler::render`] call tears
//! the previous set down completely before creating the new one. Because the
//! reconciler and the map are both borrowed mutably for the whole call, no
//! caller can observe a half-replaced set.
//!
//! The map widget itself is an external collaborator reached only through
//! the narrow [`MapSurface`] trait.

use crate::model::{Coordinates, PoiRecord};

/// Opaque id the map surface hands out for a created artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactHandle(pub u64);

/// What the map needs to draw one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSpec {
    pub position: Coordinates,
    pub title: String,
    /// Overlay body shown on click; present only for records with a link.
    pub overlay: Option<String>,
}

/// Minimal lat/lng rectangle containing a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRegion {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingRegion {
    pub fn from_point(point: Coordinates) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    pub fn extend(&mut self, point: Coordinates) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lng)
    }

    pub fn center(&self) -> Coordinates {
        Coordinates {
            lat: (self.south + self.north) / 2.0,
            lng: (self.west + self.east) / 2.0,
        }
    }

    fn covering(points: impl IntoIterator<Item = Coordinates>) -> Option<Self> {
        let mut points = points.into_iter();
        let mut region = Self::from_point(points.next()?);
        for point in points {
            region.extend(point);
        }
        Some(region)
    }
}

/// The surface a map widget exposes to the reconciler.
pub trait MapSurface {
    fn create(&mut self, spec: &ArtifactSpec) -> ArtifactHandle;
    fn dispose(&mut self, handle: ArtifactHandle);
    fn set_overlay_visible(&mut self, handle: ArtifactHandle, visible: bool);
    fn fit_bounds(&mut self, bounds: &BoundingRegion);
    fn set_zoom(&mut self, level: i32);
    fn zoom(&self) -> i32;
}

#[derive(Debug, Clone)]
struct RenderedArtifact {
    handle: ArtifactHandle,
    has_overlay: bool,
}

/// Result of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub created: usize,
    /// Records without valid coordinates, logged and left off the map.
    pub skipped: usize,
    /// `None` when nothing was drawn and the viewport was left alone.
    pub bounds: Option<BoundingRegion>,
}

#[derive(Debug)]
pub struct RenderReconciler {
    artifacts: Vec<RenderedArtifact>,
    open_overlay: Option<ArtifactHandle>,
    zoom_out_step: i32,
}

impl RenderReconciler {
    pub fn new(zoom_out_step: i32) -> Self {
        Self {
            artifacts: Vec::new(),
            open_overlay: None,
            zoom_out_step,
        }
    }

    /// Replace the rendered set with one marker per eligible record.
    ///
    /// 1. Dispose every artifact from the previous call.
    /// 2. Create markers in the given (directory) order.
    /// 3. Fit the viewport to the created markers, then zoom out one fixed step.
    /// 4. With nothing to draw, leave the viewport unchanged.
    pub fn render<'a, M>(
        &mut self,
        map: &mut M,
        records: impl IntoIterator<Item = &'a PoiRecord>,
    ) -> RenderSummary
    where
        M: MapSurface + ?Sized,
    {
        self.clear(map);

        let mut skipped = 0;
        let mut positions = Vec::new();
        for record in records {
            let Some(position) = record.coordinates() else {
                tracing::warn!(
                    name = %record.name,
                    lat = ?record.lat,
                    lng = ?record.lng,
                    "Skipping record without valid coordinates"
                );
                skipped += 1;
                continue;
            };

            let spec = ArtifactSpec {
                position,
                title: record.name.clone(),
                overlay: record.link.clone(),
            };
            let handle = map.create(&spec);
            self.artifacts.push(RenderedArtifact {
                handle,
                has_overlay: spec.overlay.is_some(),
            });
            positions.push(position);
        }

        let bounds = BoundingRegion::covering(positions);
        if let Some(bounds) = &bounds {
            map.fit_bounds(bounds);
            let zoom = map.zoom().saturating_sub(self.zoom_out_step).max(0);
            map.set_zoom(zoom);
        }

        tracing::debug!(
            created = self.artifacts.len(),
            skipped,
            fitted = bounds.is_some(),
            "Rendered filtered result"
        );

        RenderSummary {
            created: self.artifacts.len(),
            skipped,
            bounds,
        }
    }

    /// Dispose every artifact. Used between renders and at session end.
    pub fn clear<M>(&mut self, map: &mut M)
    where
        M: MapSurface + ?Sized,
    {
        for artifact in self.artifacts.drain(..) {
            map.dispose(artifact.handle);
        }
        self.open_overlay = None;
    }

    /// React to a click on a marker: open its overlay, or close it if it is
    /// already open. Opening closes whichever overlay was open before.
    ///
    /// Returns the overlay's visibility after the toggle; `false` for a
    /// handle that is not ours or has no overlay.
    pub fn toggle_overlay<M>(&mut self, map: &mut M, handle: ArtifactHandle) -> bool
    where
        M: MapSurface + ?Sized,
    {
        let owned_with_overlay = self
            .artifacts
            .iter()
            .any(|a| a.handle == handle && a.has_overlay);
        if !owned_with_overlay {
            return false;
        }

        if self.open_overlay == Some(handle) {
            map.set_overlay_visible(handle, false);
            self.open_overlay = None;
            return false;
        }

        if let Some(previous) = self.open_overlay.take() {
            map.set_overlay_visible(previous, false);
        }
        map.set_overlay_visible(handle, true);
        self.open_overlay = Some(handle);
        true
    }

    pub fn handles(&self) -> Vec<ArtifactHandle> {
        self.artifacts.iter().map(|a| a.handle).collect()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn open_overlay(&self) -> Option<ArtifactHandle> {
        self.open_overlay
    }
}
