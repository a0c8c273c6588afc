use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Local payload handed over for remote processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    name: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Artifact named after the final component of `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Caller-chosen processing option. Not validated here; the presentation
/// layer owns the set of valid choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOptions {
    pub target_language: String,
}

impl SubmitOptions {
    pub fn new(target_language: impl Into<String>) -> Self {
        Self {
            target_language: target_language.into(),
        }
    }
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self::new("hindi")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferFailureKind {
    InvalidUrl,
    Io,
    Empty,
    TooLarge { max_bytes: u64, actual: u64 },
    Rejected { status: u16 },
    Timeout,
    Network,
    MalformedResponse,
}

impl fmt::Display for TransferFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferFailureKind::InvalidUrl => write!(f, "invalid url"),
            TransferFailureKind::Io => write!(f, "io error"),
            TransferFailureKind::Empty => write!(f, "artifact is empty"),
            TransferFailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "artifact too large (max {max_bytes}, actual {actual})")
            }
            TransferFailureKind::Rejected { status } => write!(f, "rejected with http status {status}"),
            TransferFailureKind::Timeout => write!(f, "timeout"),
            TransferFailureKind::Network => write!(f, "network error"),
            TransferFailureKind::MalformedResponse => write!(f, "malformed response"),
        }
    }
}

/// The artifact could not be handed to the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransferError {
    pub kind: TransferFailureKind,
    pub message: String,
}

impl TransferError {
    pub fn new(kind: TransferFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollErrorKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Malformed,
}

impl fmt::Display for PollErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollErrorKind::InvalidUrl => write!(f, "invalid url"),
            PollErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            PollErrorKind::Timeout => write!(f, "timeout"),
            PollErrorKind::Network => write!(f, "network error"),
            PollErrorKind::Malformed => write!(f, "malformed response"),
        }
    }
}

/// A single status check could not be answered. Always transient: the
/// scheduler retries on its next tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PollError {
    pub kind: PollErrorKind,
    pub message: String,
}

impl PollError {
    pub fn new(kind: PollErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
