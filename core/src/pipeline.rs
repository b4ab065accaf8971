//! Add/commit pipeline
//!
//! Validate the pending candidate, try to persist it remotely, and fall back
//! to an optimistic local append when that fails. Either way the full
//! directory is exported so the user always has a durable copy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client::DirectoryService;
use crate::errors::{PoiError, Result};
use crate::model::{Directory, PendingCandidate, PoiRecord};
use crate::tabular;

/// How the new record was made durable.
#[derive(Debug)]
pub enum Persistence {
    /// Server accepted the write; its response is the new directory.
    Remote,
    /// Server rejected or was unreachable; the record was appended locally.
    /// Carries the `PersistenceFailed` reason.
    LocalFallback(PoiError),
    /// No remote service configured.
    LocalOnly,
}

impl Persistence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::LocalFallback(_) => "local_fallback",
            Self::LocalOnly => "local_only",
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote)
    }
}

/// A named, downloadable serialization of the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub contents: String,
}

impl ExportArtifact {
    /// `file_name` must be a bare, non-empty file name.
    pub fn from_directory(file_name: &str, directory: &[PoiRecord]) -> Result<Self> {
        if !is_bare_file_name(file_name) {
            return Err(PoiError::Export {
                message: format!("invalid export file name {file_name:?}"),
                source: None,
            });
        }
        Ok(Self {
            file_name: file_name.to_string(),
            contents: tabular::serialize(directory)?,
        })
    }

    /// Write into `dir` via a `.tmp` sibling and rename. Returns the path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.contents.as_bytes()).map_err(|e| {
            PoiError::export_with_source(format!("failed to write {}", tmp.display()), e)
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            PoiError::export_with_source(format!("failed to move export to {}", path.display()), e)
        })?;
        Ok(path)
    }
}

fn is_bare_file_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty()
        && trimmed != "."
        && trimmed != ".."
        && !trimmed.contains(['/', '\\'])
}

/// Result of the persistence step, before export.
#[derive(Debug)]
pub struct Persisted {
    /// The directory to install in place of the previous one.
    pub directory: Directory,
    pub record: PoiRecord,
    pub persistence: Persistence,
}

#[derive(Debug)]
pub struct CommitOutcome {
    /// The directory to install in place of the previous one.
    pub directory: Directory,
    /// The record as validated and submitted.
    pub record: PoiRecord,
    pub persistence: Persistence,
    pub export: ExportArtifact,
}

pub struct CommitPipeline {
    remote: Option<Arc<dyn DirectoryService>>,
    export_file_name: String,
}

impl CommitPipeline {
    pub fn new(remote: Option<Arc<dyn DirectoryService>>, export_file_name: impl Into<String>) -> Self {
        Self {
            remote,
            export_file_name: export_file_name.into(),
        }
    }

    /// Commit `pending` against `current`: [`persist`](Self::persist), then
    /// [`export`](Self::export).
    ///
    /// # Errors
    /// - `MissingName` / `MissingCoordinates` from validation.
    /// - `Export` if the directory cannot be serialized.
    pub async fn commit(
        &self,
        current: &[PoiRecord],
        pending: &PendingCandidate,
    ) -> Result<CommitOutcome> {
        let persisted = self.persist(current, pending).await?;
        let export = self.export(&persisted.directory)?;
        Ok(CommitOutcome {
            directory: persisted.directory,
            record: persisted.record,
            persistence: persisted.persistence,
            export,
        })
    }

    /// Validate and persist `pending`, producing the replacement directory.
    ///
    /// `current` is not touched, so a validation failure leaves everything as
    /// it was. A rejected remote write is not an error here: it is reported
    /// as [`Persistence::LocalFallback`].
    pub async fn persist(
        &self,
        current: &[PoiRecord],
        pending: &PendingCandidate,
    ) -> Result<Persisted> {
        let record = pending.validate()?;

        let (directory, persistence) = match &self.remote {
            Some(remote) => match remote.persist_record(&record).await {
                Ok(mut authoritative) => {
                    for entry in &mut authoritative {
                        entry.sanitize_coordinates();
                    }
                    (authoritative, Persistence::Remote)
                }
                Err(err) => {
                    tracing::warn!(
                        name = %record.name,
                        error = %err,
                        "Remote persistence failed, keeping record locally"
                    );
                    let failed = PoiError::PersistenceFailed {
                        message: err.user_message(),
                    };
                    (appended(current, &record), Persistence::LocalFallback(failed))
                }
            },
            None => (appended(current, &record), Persistence::LocalOnly),
        };

        tracing::info!(
            name = %record.name,
            category = %record.category,
            persistence = persistence.as_str(),
            records = directory.len(),
            "Committed new place"
        );

        Ok(Persisted {
            directory,
            record,
            persistence,
        })
    }

    /// Serialize `directory` under the configured export file name.
    pub fn export(&self, directory: &[PoiRecord]) -> Result<ExportArtifact> {
        ExportArtifact::from_directory(&self.export_file_name, directory)
    }
}

fn appended(current: &[PoiRecord], record: &PoiRecord) -> Directory {
    let mut directory = Vec::with_capacity(current.len() + 1);
    directory.extend_from_slice(current);
    directory.push(record.clone());
    directory
}
