//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// An external process could not be started at all.
    ProcessLaunch(String),
    /// An external process ran but signaled failure the caller treats as fatal.
    ProcessExit(String),
    /// Waiting on an external process, or reading its output, was interrupted.
    Interrupted(String),
    /// A source-control retrieval step failed.
    Fetch(String),
    /// The parsed manifest contains no compositions or no versions.
    ManifestEmpty,
    /// The manifest document could not be parsed.
    ManifestParse(String),
    /// An ephemeral working directory could not be created or removed.
    ScratchDir(String),
    /// Action attempted without a valid composition/version/container selection.
    SelectionMissing(String),
    /// Start attempted while a session is already active.
    SelectionConflict(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::ProcessLaunch(msg) => write!(f, "process launch: {msg}"),
            Self::ProcessExit(msg) => write!(f, "process exit: {msg}"),
            Self::Interrupted(msg) => write!(f, "interrupted: {msg}"),
            Self::Fetch(msg) => write!(f, "fetch: {msg}"),
            Self::ManifestEmpty => write!(f, "manifest: no compositions or versions available"),
            Self::ManifestParse(msg) => write!(f, "manifest parse: {msg}"),
            Self::ScratchDir(msg) => write!(f, "scratch dir: {msg}"),
            Self::SelectionMissing(msg) => write!(f, "selection missing: {msg}"),
            Self::SelectionConflict(msg) => write!(f, "selection conflict: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::ManifestParse(err.to_string())
    }
}
