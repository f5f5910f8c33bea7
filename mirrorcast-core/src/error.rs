//! Domain-specific error types for mirrorcast.
//!
//! All fallible operations return `Result<T, CastError>`.
//! No panics on untrusted input: every error is typed, and the
//! coordinator uses [`CastError::is_recoverable`] to decide whether a
//! failure is skipped or escalated.

use thiserror::Error;

/// The canonical error type for mirrorcast.
#[derive(Debug, Error)]
pub enum CastError {
    // ── Caller Errors ────────────────────────────────────────────
    /// The module id is not present in the registry.
    #[error("unknown module: {0}")]
    UnknownModule(String),

    // ── Validation Errors ────────────────────────────────────────
    /// A gesture command carried malformed parameters.
    #[error("invalid command {id}: {reason}")]
    InvalidCommand { id: String, reason: &'static str },

    /// The environment cannot inject input right now.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    // ── State-transition Errors ──────────────────────────────────
    /// A lifecycle transition was requested from a state that does not
    /// allow it (e.g. starting a module that is already active).
    #[error("invalid state: {0}")]
    RecoverableState(String),

    /// The selection sequence failed in a way it cannot recover from.
    #[error("supervision failed: {0}")]
    FatalSupervision(String),

    // ── Plumbing ─────────────────────────────────────────────────
    /// An mpsc/oneshot channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// The IO layer reported an error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An inbound event could not be decoded.
    #[error("decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl CastError {
    /// Whether the coordinator may log this error and keep its
    /// subscription alive.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CastError::RecoverableState(_))
    }

    /// Whether this is a validation failure that is resolved locally by
    /// dropping the offending command.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CastError::InvalidCommand { .. } | CastError::CapabilityUnavailable(_)
        )
    }

    /// Wrap any non-fatal error into [`CastError::FatalSupervision`] for
    /// escalation. Already-fatal errors pass through unchanged.
    pub fn into_fatal(self) -> Self {
        match self {
            fatal @ CastError::FatalSupervision(_) => fatal,
            other => CastError::FatalSupervision(other.to_string()),
        }
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for CastError {
    fn from(s: String) -> Self {
        CastError::Other(s)
    }
}

impl From<&str> for CastError {
    fn from(s: &str) -> Self {
        CastError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for CastError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        CastError::ChannelClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for CastError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        CastError::ChannelClosed
    }
}
