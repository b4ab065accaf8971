//! Session state
//!
//! One `Session` owns everything a running directory view needs: the
//! directory, its category index, the rendered artifact set, the pending
//! candidate of an open add flow, and the search bridge. It is created at
//! session start and torn down at session end; no component reaches for
//! global state.
//!
//! Directory changes are always wholesale: the new directory is built in full
//! (resolve, commit) and then swapped in, followed by a category rebuild.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::bridge::{SelectionBridge, SelectionReporter};
use crate::category::CategoryIndex;
use crate::client::{DirectoryService, HttpPoiClient, SearchService};
use crate::config::PoiMapConfig;
use crate::errors::{PoiError, Result};
use crate::filter::filter;
use crate::link::parse_map_link;
use crate::model::{Candidate, Coordinates, Directory, PendingCandidate, PoiRecord};
use crate::pipeline::{CommitOutcome, CommitPipeline};
use crate::render::{ArtifactHandle, MapSurface, RenderReconciler, RenderSummary};
use crate::resolver::{DirectorySourceResolver, FallbackSource, Resolution, SourceOrigin};

/// Summary of a resolve call, without the directory itself.
#[derive(Debug)]
pub struct ResolveReport {
    pub origin: SourceOrigin,
    pub records: usize,
    pub map_eligible: usize,
    pub remote_error: Option<PoiError>,
    pub skipped: Vec<PoiError>,
}

#[derive(Debug)]
struct AddFlow {
    pending: PendingCandidate,
    cancel: CancellationToken,
}

impl AddFlow {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

pub struct Session {
    config: PoiMapConfig,
    resolver: DirectorySourceResolver,
    pipeline: CommitPipeline,
    search: Option<Arc<dyn SearchService>>,
    directory: Directory,
    categories: CategoryIndex,
    origin: Option<SourceOrigin>,
    reconciler: RenderReconciler,
    bridge: SelectionBridge,
    add_flow: Option<AddFlow>,
}

impl Session {
    /// Build a session with explicit collaborators.
    pub fn new(
        config: PoiMapConfig,
        directory_service: Option<Arc<dyn DirectoryService>>,
        search: Option<Arc<dyn SearchService>>,
        fallback: FallbackSource,
    ) -> Self {
        let resolver = DirectorySourceResolver::new(directory_service.clone(), fallback);
        let pipeline = CommitPipeline::new(directory_service, config.export.file_name.clone());
        let reconciler = RenderReconciler::new(config.map.zoom_out_step);
        let bridge = SelectionBridge::new(config.search.coordinate_scale);
        Self {
            config,
            resolver,
            pipeline,
            search,
            directory: Directory::new(),
            categories: CategoryIndex::default(),
            origin: None,
            reconciler,
            bridge,
            add_flow: None,
        }
    }

    /// Build a session with HTTP services from the configured URLs.
    pub fn from_config(config: PoiMapConfig) -> Result<Self> {
        let timeout = config.remote.timeout();
        let directory_client = config
            .remote
            .directory_url
            .as_deref()
            .map(|url| HttpPoiClient::new(url, timeout, config.retry.clone()))
            .transpose()?
            .map(Arc::new);

        let search_client: Option<Arc<dyn SearchService>> =
            match (config.remote.resolved_search_url(), &directory_client) {
                (Some(url), Some(client)) if client.base_url() == url.trim_end_matches('/') => {
                    Some(Arc::clone(client) as Arc<dyn SearchService>)
                }
                (Some(url), _) => Some(Arc::new(HttpPoiClient::new(
                    url,
                    timeout,
                    config.retry.clone(),
                )?)),
                (None, _) => None,
            };

        let fallback = FallbackSource::File(config.resolved_fallback_path());
        let directory_service = directory_client.map(|c| c as Arc<dyn DirectoryService>);
        Ok(Self::new(config, directory_service, search_client, fallback))
    }

    pub fn config(&self) -> &PoiMapConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Directory
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve the directory from its source and replace the current one.
    pub async fn resolve(&mut self) -> ResolveReport {
        let Resolution {
            directory,
            origin,
            remote_error,
            skipped,
        } = self.resolver.resolve().await;

        self.install_directory(directory);
        self.origin = Some(origin);

        ResolveReport {
            origin,
            records: self.directory.len(),
            map_eligible: self.directory.iter().filter(|r| r.is_map_eligible()).count(),
            remote_error,
            skipped,
        }
    }

    fn install_directory(&mut self, directory: Directory) {
        self.directory = directory;
        self.categories = CategoryIndex::rebuild(&self.directory);
    }

    pub fn directory(&self) -> &[PoiRecord] {
        &self.directory
    }

    pub fn categories(&self) -> &CategoryIndex {
        &self.categories
    }

    /// Where the current directory came from; `None` before the first resolve.
    pub fn origin(&self) -> Option<SourceOrigin> {
        self.origin
    }

    pub fn filter<S>(&self, selected: &HashSet<S>) -> Vec<&PoiRecord>
    where
        S: std::borrow::Borrow<str> + std::hash::Hash + Eq,
    {
        filter(&self.directory, selected)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Map
    // ─────────────────────────────────────────────────────────────────────────

    /// Centre and zoom a freshly created map should start with.
    pub fn initial_viewport(&self) -> (Coordinates, i32) {
        let center = self.config.map_center().unwrap_or(Coordinates {
            lat: 37.5665,
            lng: 126.9780,
        });
        (center, self.config.map.zoom)
    }

    /// Filter by `selected` and replace the rendered markers with the result.
    pub fn render<M, S>(&mut self, map: &mut M, selected: &HashSet<S>) -> RenderSummary
    where
        M: MapSurface + ?Sized,
        S: std::borrow::Borrow<str> + std::hash::Hash + Eq,
    {
        let filtered = filter(&self.directory, selected);
        self.reconciler.render(map, filtered)
    }

    pub fn toggle_overlay<M>(&mut self, map: &mut M, handle: ArtifactHandle) -> bool
    where
        M: MapSurface + ?Sized,
    {
        self.reconciler.toggle_overlay(map, handle)
    }

    pub fn rendered(&self) -> &RenderReconciler {
        &self.reconciler
    }

    /// End of session: dispose all artifacts and abandon any add flow.
    pub fn teardown<M>(&mut self, map: &mut M)
    where
        M: MapSurface + ?Sized,
    {
        self.reconciler.clear(map);
        self.cancel_add_flow();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Add flow
    // ─────────────────────────────────────────────────────────────────────────

    /// Open the add flow with an empty pending candidate. Re-opening an open
    /// flow keeps its state. The returned token cancels the flow from
    /// another task: once cancelled, the pending candidate is discarded and
    /// the flow's search round rejects reports.
    pub fn open_add_flow(&mut self) -> CancellationToken {
        self.reap_cancelled_flow();
        let flow = self.add_flow.get_or_insert_with(|| {
            tracing::debug!("Add flow opened");
            AddFlow {
                pending: PendingCandidate::default(),
                cancel: CancellationToken::new(),
            }
        });
        flow.cancel.clone()
    }

    /// Token of the open add flow; cancelling it closes the flow.
    pub fn cancel_token(&self) -> Option<CancellationToken> {
        self.live_flow().map(|flow| flow.cancel.clone())
    }

    pub fn is_add_flow_open(&self) -> bool {
        self.live_flow().is_some()
    }

    pub fn pending(&self) -> Option<&PendingCandidate> {
        self.live_flow().map(|flow| &flow.pending)
    }

    /// Manual edits (rating, capacity, name fixes) to the pending candidate.
    pub fn pending_mut(&mut self) -> Option<&mut PendingCandidate> {
        self.reap_cancelled_flow();
        self.add_flow.as_mut().map(|flow| &mut flow.pending)
    }

    fn live_flow(&self) -> Option<&AddFlow> {
        self.add_flow.as_ref().filter(|flow| flow.is_live())
    }

    /// Finish closing a flow whose token was cancelled elsewhere. Returns
    /// whether a flow was reaped.
    fn reap_cancelled_flow(&mut self) -> bool {
        if self.add_flow.as_ref().is_some_and(|flow| !flow.is_live()) {
            self.cancel_add_flow();
            return true;
        }
        false
    }

    /// Search for candidates, opening the add flow if needed.
    pub async fn request_search(&mut self, query: &str) -> Result<Vec<Candidate>> {
        if query.trim().is_empty() {
            return Err(PoiError::EmptyQuery);
        }
        let cancel = self.open_add_flow();
        let Some(search) = self.search.clone() else {
            return Err(PoiError::SearchUnavailable {
                message: "search service is not configured".to_string(),
            });
        };

        let result = self
            .bridge
            .request_search(search.as_ref(), query, &cancel)
            .await;
        if matches!(result, Err(PoiError::FlowClosed)) {
            self.cancel_add_flow();
        }
        result
    }

    /// Candidates of the current search round.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.bridge.candidates()
    }

    /// Producer handle for the current round, for a separate search context.
    pub fn selection_reporter(&self) -> Option<SelectionReporter> {
        self.bridge.reporter()
    }

    /// Report a selection from within the session and apply it.
    pub fn report_selection(&mut self, index: usize) -> Result<&PendingCandidate> {
        if self.reap_cancelled_flow() {
            return Err(PoiError::FlowClosed);
        }
        if self.add_flow.is_none() {
            return Err(PoiError::invalid_selection("no add flow is open"));
        }
        self.bridge.report_selection(index)?;
        self.sync_selection();
        self.pending().ok_or(PoiError::FlowClosed)
    }

    /// Apply a selection reported from another context, if one arrived.
    pub fn sync_selection(&mut self) -> bool {
        if self.reap_cancelled_flow() {
            return false;
        }
        let Some(flow) = self.add_flow.as_mut() else {
            return false;
        };
        match self.bridge.try_take_selection() {
            Some(selected) => {
                merge_selection(&mut flow.pending, selected);
                true
            }
            None => false,
        }
    }

    /// Wait for the current round's selection and apply it.
    pub async fn await_selection(&mut self) -> Result<&PendingCandidate> {
        self.reap_cancelled_flow();
        let Some(cancel) = self.cancel_token() else {
            return Err(PoiError::FlowClosed);
        };
        let selected = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = self.bridge.wait_selection() => Some(res),
        };
        let Some(selected) = selected else {
            self.cancel_add_flow();
            return Err(PoiError::FlowClosed);
        };
        let selected = selected?;
        let flow = self.add_flow.as_mut().ok_or(PoiError::FlowClosed)?;
        merge_selection(&mut flow.pending, selected);
        Ok(&flow.pending)
    }

    /// Fill the pending position from a pasted map link.
    pub fn fill_pending_from_link(&mut self, link: &str) -> Result<Coordinates> {
        self.open_add_flow();
        let coords = parse_map_link(link).ok_or(PoiError::MissingCoordinates)?;
        if let Some(pending) = self.pending_mut() {
            pending.lat = Some(coords.lat);
            pending.lng = Some(coords.lng);
            if pending.link.is_none() {
                pending.link = Some(link.trim().to_string());
            }
        }
        Ok(coords)
    }

    /// Close the add flow without committing. Any in-flight search for the
    /// flow is cancelled and late selection reports are rejected.
    pub fn cancel_add_flow(&mut self) {
        if let Some(flow) = self.add_flow.take() {
            flow.cancel.cancel();
            tracing::debug!("Add flow cancelled");
        }
        self.bridge.close();
    }

    /// Commit the pending candidate.
    ///
    /// On success (remote or local fallback) the directory is replaced, the
    /// category index rebuilt and the add flow closed. On validation failure
    /// the flow stays open for correction. An `Export` error is returned
    /// after the new directory is installed.
    pub async fn commit(&mut self) -> Result<CommitOutcome> {
        if self.reap_cancelled_flow() {
            return Err(PoiError::FlowClosed);
        }
        self.sync_selection();
        let pending = self.pending().cloned().ok_or(PoiError::FlowClosed)?;

        let persisted = self.pipeline.persist(&self.directory, &pending).await?;

        // The persisted directory stands even if the export fails.
        self.install_directory(persisted.directory);
        self.add_flow = None;
        self.bridge.close();

        let export = self.pipeline.export(&self.directory)?;
        Ok(CommitOutcome {
            directory: self.directory.clone(),
            record: persisted.record,
            persistence: persisted.persistence,
            export,
        })
    }
}

/// Overlay what the search produced onto what the user already entered.
fn merge_selection(pending: &mut PendingCandidate, selected: PendingCandidate) {
    pending.name = selected.name.or(pending.name.take());
    if !selected.category.is_empty() {
        pending.category = selected.category;
    }
    pending.address = selected.address.or(pending.address.take());
    pending.lat = selected.lat;
    pending.lng = selected.lng;
    pending.link = selected.link.or(pending.link.take());
    pending.rating = selected.rating.or(pending.rating);
    pending.capacity = selected.capacity.or(pending.capacity);
}
