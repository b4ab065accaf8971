//! Directory source resolution
//!
//! The remote service is authoritative when reachable. On any failure
//! (network, non-2xx, malformed payload, timeout) the local dataset is
//! parsed instead. Resolution never fails outright: the worst case is an
//! empty directory plus the recorded reasons.

use std::path::PathBuf;
use std::sync::Arc;

use crate::client::DirectoryService;
use crate::errors::PoiError;
use crate::model::Directory;
use crate::tabular;

/// Where the resolved directory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    Remote,
    Fallback,
    /// Neither source produced data.
    Empty,
}

impl SourceOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Fallback => "fallback",
            Self::Empty => "empty",
        }
    }
}

/// Local dataset location.
#[derive(Debug, Clone)]
pub enum FallbackSource {
    File(PathBuf),
    /// Dataset text held in memory (embedded data, tests).
    Inline(String),
}

impl FallbackSource {
    fn read(&self) -> std::io::Result<String> {
        match self {
            Self::File(path) => std::fs::read_to_string(path),
            Self::Inline(text) => Ok(text.clone()),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Inline(_) => "<inline>".to_string(),
        }
    }
}

/// Outcome of one resolution.
#[derive(Debug)]
pub struct Resolution {
    pub directory: Directory,
    pub origin: SourceOrigin,
    /// `SourceUnavailable` when the remote was configured but failed.
    pub remote_error: Option<PoiError>,
    /// `MalformedRow` entries from the fallback parse.
    pub skipped: Vec<PoiError>,
}

pub struct DirectorySourceResolver {
    remote: Option<Arc<dyn DirectoryService>>,
    fallback: FallbackSource,
}

impl DirectorySourceResolver {
    pub fn new(remote: Option<Arc<dyn DirectoryService>>, fallback: FallbackSource) -> Self {
        Self { remote, fallback }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Produce a fresh directory. Calling twice yields equal content; the
    /// result is always a complete replacement, never an increment.
    pub async fn resolve(&self) -> Resolution {
        let mut remote_error = None;

        if let Some(remote) = &self.remote {
            match remote.fetch_directory().await {
                Ok(mut directory) => {
                    for record in &mut directory {
                        record.sanitize_coordinates();
                    }
                    tracing::info!(
                        origin = "remote",
                        records = directory.len(),
                        "Directory resolved"
                    );
                    return Resolution {
                        directory,
                        origin: SourceOrigin::Remote,
                        remote_error: None,
                        skipped: Vec::new(),
                    };
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Remote directory unavailable, using fallback");
                    remote_error = Some(PoiError::SourceUnavailable {
                        message: err.user_message(),
                    });
                }
            }
        }

        let text = match self.fallback.read() {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(
                    source = %self.fallback.describe(),
                    error = %err,
                    "Fallback dataset unreadable; directory is empty"
                );
                return Resolution {
                    directory: Directory::new(),
                    origin: SourceOrigin::Empty,
                    remote_error,
                    skipped: Vec::new(),
                };
            }
        };

        let report = tabular::parse(&text);
        for skipped in &report.skipped {
            tracing::warn!(error = %skipped, "Skipping fallback row");
        }
        tracing::info!(
            origin = "fallback",
            source = %self.fallback.describe(),
            records = report.records.len(),
            skipped = report.skipped.len(),
            "Directory resolved"
        );

        Resolution {
            directory: report.records,
            origin: SourceOrigin::Fallback,
            remote_error,
            skipped: report.skipped,
        }
    }
}
