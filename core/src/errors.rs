//! Directory error taxonomy
//!
//! Nothing here is fatal to the process. Every variant either has a degraded
//! fallback path (remote source, remote persistence) or is surfaced to the
//! user for correction while the already-resolved state stays intact.

use thiserror::Error;

/// Error category for structured logging and behavior mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Remote directory fetch failed; the local dataset takes over.
    Source,
    /// Local dataset row could not be used and was skipped.
    Parse,
    /// Search/selection protocol violation.
    Selection,
    /// Pending candidate failed validation on commit.
    Validation,
    /// Remote write failed; the record is kept locally and exported.
    Persistence,
    /// Configuration file or value problem.
    Config,
    /// Export artifact could not be produced or written.
    Export,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "SOURCE_ERROR",
            Self::Parse => "PARSE_ERROR",
            Self::Selection => "SELECTION_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Persistence => "PERSISTENCE_ERROR",
            Self::Config => "CONFIG_ERROR",
            Self::Export => "EXPORT_ERROR",
        }
    }

    /// Whether the session keeps working after an error of this category.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config)
    }
}

#[derive(Debug, Error)]
pub enum PoiError {
    #[error("remote directory unavailable: {message}")]
    SourceUnavailable { message: String },

    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    /// Carries the service's own message so it can be shown verbatim.
    #[error("search unavailable: {message}")]
    SearchUnavailable { message: String },

    #[error("search query is empty")]
    EmptyQuery,

    #[error("invalid selection: {reason}")]
    InvalidSelection { reason: String },

    #[error("a selection was already reported for this search")]
    AlreadyReported,

    #[error("place name is required")]
    MissingName,

    #[error("valid latitude and longitude are required")]
    MissingCoordinates,

    #[error("remote persistence failed: {message}")]
    PersistenceFailed { message: String },

    #[error("add flow was closed")]
    FlowClosed,

    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("export failed: {message}")]
    Export {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PoiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SourceUnavailable { .. } => ErrorCategory::Source,
            Self::MalformedRow { .. } => ErrorCategory::Parse,
            Self::SearchUnavailable { .. }
            | Self::EmptyQuery
            | Self::InvalidSelection { .. }
            | Self::AlreadyReported
            | Self::FlowClosed => ErrorCategory::Selection,
            Self::MissingName | Self::MissingCoordinates => ErrorCategory::Validation,
            Self::PersistenceFailed { .. } => ErrorCategory::Persistence,
            Self::Config { .. } => ErrorCategory::Config,
            Self::Export { .. } => ErrorCategory::Export,
        }
    }

    pub fn invalid_selection(reason: impl Into<String>) -> Self {
        Self::InvalidSelection {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn export_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Export {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for directory operations
pub type Result<T> = std::result::Result<T, PoiError>;
