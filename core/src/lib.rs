//! Directory synchronization and filtered rendering for map points of interest
//!
//! Keeps an in-memory directory of places consistent with a remote source of
//! truth (with a local tabular fallback), projects a category-filtered view
//! of it onto a map surface, and runs the add/commit flow that takes a place
//! from external search through persistence and export.
//!
//! Everything lives on a [`Session`]; the components it wires together are
//! public for callers that need them individually.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod bridge;
pub mod category;
pub mod client;
pub mod config;
pub mod errors;
pub mod filter;
pub mod link;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod retry;
pub mod session;
pub mod tabular;


pub use bridge::{SelectionBridge, SelectionReporter};
pub use category::CategoryIndex;
pub use client::{DirectoryService, HttpPoiClient, RemoteError, SearchService};
pub use config::PoiMapConfig;
pub use errors::{ErrorCategory, PoiError, Result};
pub use filter::{filter, filter_owned};
pub use link::parse_map_link;
pub use model::{Candidate, Coordinates, Directory, PendingCandidate, PoiRecord};
pub use pipeline::{CommitOutcome, CommitPipeline, ExportArtifact, Persistence};
pub use render::{
    ArtifactHandle, ArtifactSpec, BoundingRegion, MapSurface, RenderReconciler, RenderSummary,
};
pub use resolver::{DirectorySourceResolver, FallbackSource, Resolution, SourceOrigin};
pub use session::{ResolveReport, Session};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
