//! Error taxonomy for the scrape and process pipelines.
//!
//! Failures are reported per item (per URL, per file). None of these errors
//! abort a batch; the orchestrators collect them into a
//! [`BatchSummary`](crate::summary::BatchSummary).

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// What went wrong while fetching a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Transport failure or a non-2xx status other than 404.
    Network,
    /// The page was fetched but holds no table matching the header keywords.
    Parse,
    /// The server answered 404.
    NotFound,
}

impl FetchErrorKind {
    /// Only network failures can change between attempts.
    pub fn is_retryable(self) -> bool {
        matches!(self, FetchErrorKind::Network)
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchErrorKind::Network => "NETWORK",
            FetchErrorKind::Parse => "PARSE",
            FetchErrorKind::NotFound => "NOT_FOUND",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} error fetching {url}: {cause}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub url: String,
    pub cause: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, url: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            kind,
            url: url.into(),
            cause: cause.to_string(),
        }
    }

    pub fn network(url: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::new(FetchErrorKind::Network, url, cause)
    }

    pub fn parse(url: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::new(FetchErrorKind::Parse, url, cause)
    }

    pub fn not_found(url: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::new(FetchErrorKind::NotFound, url, cause)
    }
}

/// Failure of one scrape target.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("unknown league key '{0}'")]
    UnknownLeague(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to save raw file {path}: {cause}")]
    Save { path: PathBuf, cause: String },
}

impl ScrapeError {
    /// Short label used in run summaries.
    pub fn kind(&self) -> String {
        match self {
            ScrapeError::UnknownLeague(_) => "UNKNOWN_LEAGUE".to_string(),
            ScrapeError::Fetch(e) => e.kind.to_string(),
            ScrapeError::Save { .. } => "SAVE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessErrorKind {
    /// The raw file is missing, unreadable, not CSV, or empty.
    Load,
    /// A required column is absent after pruning.
    MissingRequiredColumn,
    /// Anything failing after validation, including the final write.
    Transform,
}

impl fmt::Display for ProcessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessErrorKind::Load => "LOAD",
            ProcessErrorKind::MissingRequiredColumn => "MISSING_REQUIRED_COLUMN",
            ProcessErrorKind::Transform => "TRANSFORM",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} error processing {}: {cause}", path.display())]
pub struct ProcessError {
    pub kind: ProcessErrorKind,
    pub path: PathBuf,
    pub cause: String,
}

impl ProcessError {
    pub fn new(kind: ProcessErrorKind, path: impl Into<PathBuf>, cause: impl fmt::Display) -> Self {
        Self {
            kind,
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    pub fn load(path: impl Into<PathBuf>, cause: impl fmt::Display) -> Self {
        Self::new(ProcessErrorKind::Load, path, cause)
    }

    pub fn transform(path: impl Into<PathBuf>, cause: impl fmt::Display) -> Self {
        Self::new(ProcessErrorKind::Transform, path, cause)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
