//! External selection bridge
//!
//! The search UI runs in its own loosely coupled context (a second window,
//! another task) and reports the user's pick back to the session. Each
//! search round is a single-slot, fire-once channel:
//!
//! ```text
//! request_search ──► round N open ──report_selection──► reported ──► consumer
//!                        │                                  │
//!                        └──── close / new search ──────────┴──► closed
//! ```
//!
//! Only the first report of a round is accepted. Reports arriving after that,
//! after the round was closed, or from a superseded round are rejected with
//! `AlreadyReported`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::client::SearchService;
use crate::errors::{PoiError, Result};
use crate::model::{Candidate, PendingCandidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundState {
    Awaiting,
    Reported,
    Closed,
}

#[derive(Debug)]
struct RoundSlot {
    round: u64,
    candidates: Vec<Candidate>,
    state: RoundState,
    tx: Option<oneshot::Sender<PendingCandidate>>,
    /// Token of the add flow the round belongs to.
    cancel: Option<CancellationToken>,
}

impl RoundSlot {
    fn is_open(&self) -> bool {
        self.state == RoundState::Awaiting
            && self.cancel.as_ref().is_none_or(|c| !c.is_cancelled())
    }
}

type SharedSlot = Arc<Mutex<Option<RoundSlot>>>;

fn lock(slot: &SharedSlot) -> MutexGuard<'_, Option<RoundSlot>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Producer handle for one search round. Cheap to clone and safe to move
/// into whatever context displays the candidates.
#[derive(Debug, Clone)]
pub struct SelectionReporter {
    round: u64,
    scale: f64,
    slot: SharedSlot,
}

impl SelectionReporter {
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Report the chosen candidate by its index in the round's result list.
    ///
    /// # Errors
    /// - `InvalidSelection` when no search has run or `index` is out of range.
    /// - `AlreadyReported` when this round already delivered, was closed,
    ///   belongs to a cancelled add flow, or has been superseded by a newer
    ///   search.
    pub fn report_selection(&self, index: usize) -> Result<PendingCandidate> {
        let mut guard = lock(&self.slot);
        let Some(slot) = guard.as_mut() else {
            return Err(PoiError::invalid_selection("no search is pending"));
        };
        if slot.round != self.round || !slot.is_open() {
            return Err(PoiError::AlreadyReported);
        }
        let candidate = slot.candidates.get(index).ok_or_else(|| {
            PoiError::invalid_selection(format!(
                "index {index} out of range for {} candidates",
                slot.candidates.len()
            ))
        })?;

        let pending = candidate.to_pending(self.scale);
        slot.state = RoundState::Reported;
        if let Some(tx) = slot.tx.take() {
            // The consumer may already be gone; the round is spent regardless.
            let _ = tx.send(pending.clone());
        }
        tracing::debug!(round = self.round, index, name = ?pending.name, "Selection reported");
        Ok(pending)
    }
}

/// Consumer side of the selection handoff.
#[derive(Debug)]
pub struct SelectionBridge {
    scale: f64,
    slot: SharedSlot,
    next_round: u64,
    reporter: Option<SelectionReporter>,
    receiver: Option<oneshot::Receiver<PendingCandidate>>,
}

impl SelectionBridge {
    /// `scale` is the external search format's fixed-point factor.
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            slot: Arc::new(Mutex::new(None)),
            next_round: 1,
            reporter: None,
            receiver: None,
        }
    }

    /// Query the search service and open a new round with its results.
    ///
    /// A blank query is rejected before any network call. A new request
    /// supersedes any round still open. Cancelling `cancel` while the
    /// request is in flight abandons it with `FlowClosed`.
    pub async fn request_search(
        &mut self,
        search: &dyn SearchService,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PoiError::EmptyQuery);
        }
        self.close();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PoiError::FlowClosed),
            res = search.search(query) => res,
        };
        let candidates = result.map_err(|err| {
            tracing::warn!(query, error = %err, "Search request failed");
            PoiError::SearchUnavailable {
                message: err.user_message(),
            }
        })?;

        tracing::debug!(query, results = candidates.len(), "Search round opened");
        self.open_round(candidates.clone(), Some(cancel.clone()));
        Ok(candidates)
    }

    /// Open a round over `candidates`, replacing any previous round.
    pub fn begin_round(&mut self, candidates: Vec<Candidate>) -> SelectionReporter {
        self.open_round(candidates, None)
    }

    fn open_round(
        &mut self,
        candidates: Vec<Candidate>,
        cancel: Option<CancellationToken>,
    ) -> SelectionReporter {
        let round = self.next_round;
        self.next_round += 1;

        let (tx, rx) = oneshot::channel();
        *lock(&self.slot) = Some(RoundSlot {
            round,
            candidates,
            state: RoundState::Awaiting,
            tx: Some(tx),
            cancel,
        });

        let reporter = SelectionReporter {
            round,
            scale: self.scale,
            slot: Arc::clone(&self.slot),
        };
        self.reporter = Some(reporter.clone());
        self.receiver = Some(rx);
        reporter
    }

    /// Producer handle for the current round, if one was opened.
    pub fn reporter(&self) -> Option<SelectionReporter> {
        self.reporter.clone()
    }

    /// Report through the current round's handle.
    pub fn report_selection(&self, index: usize) -> Result<PendingCandidate> {
        match &self.reporter {
            Some(reporter) => reporter.report_selection(index),
            None => Err(PoiError::invalid_selection("no search is pending")),
        }
    }

    /// Take a reported selection without waiting.
    pub fn try_take_selection(&mut self) -> Option<PendingCandidate> {
        let pending = self.receiver.as_mut()?.try_recv().ok()?;
        self.receiver = None;
        Some(pending)
    }

    /// Wait for the current round's report.
    ///
    /// Returns `FlowClosed` if there is no round or it ends without a report.
    pub async fn wait_selection(&mut self) -> Result<PendingCandidate> {
        let receiver = self.receiver.take().ok_or(PoiError::FlowClosed)?;
        receiver.await.map_err(|_| PoiError::FlowClosed)
    }

    /// End the current round: later reports are rejected, an unclaimed
    /// selection is dropped, and no search counts as pending until the next
    /// one succeeds.
    pub fn close(&mut self) {
        if let Some(slot) = lock(&self.slot).as_mut() {
            slot.state = RoundState::Closed;
            slot.tx = None;
        }
        self.reporter = None;
        self.receiver = None;
    }

    /// Candidates of the current round (empty when none).
    pub fn candidates(&self) -> Vec<Candidate> {
        lock(&self.slot)
            .as_ref()
            .map(|slot| slot.candidates.clone())
            .unwrap_or_default()
    }

    /// Whether a round is open and still waiting for its report.
    pub fn is_awaiting(&self) -> bool {
        lock(&self.slot)
            .as_ref()
            .is_some_and(RoundSlot::is_open)
    }
}
