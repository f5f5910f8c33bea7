//! Service host lifecycle state machine.
//!
//! Provides a `LifecycleState` enum that models one host instance from
//! creation to destruction, with validated transitions that return
//! `Result` instead of panicking.

use std::time::Instant;

use crate::error::CastError;

// ── LifecycleState ───────────────────────────────────────────────

/// The current phase of a service host instance.
///
/// ```text
///  Idle ──► Starting ──► ForegroundActive ──────────────► Stopped
///              │                │                            ▲
///              │                ▼                            │
///              │         StoppingForError ───────────────────┤
///              └─────────────────────────────────────────────┘
/// ```
///
/// `Stopped` is terminal: an instance is never restarted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Created, no start request processed yet.
    #[default]
    Idle,

    /// Start accepted; foreground registration pending.
    Starting,

    /// Foreground notification shown and streaming.
    ForegroundActive {
        /// When the host entered the foreground.
        since: Instant,
    },

    /// A failure is being reported before stopping.
    StoppingForError,

    /// Terminal.
    Stopped,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Starting => write!(f, "Starting"),
            Self::ForegroundActive { .. } => write!(f, "ForegroundActive"),
            Self::StoppingForError => write!(f, "StoppingForError"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

impl LifecycleState {
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::ForegroundActive { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// How long the host has been in the foreground.
    ///
    /// Returns `None` for any other phase.
    pub fn foreground_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::ForegroundActive { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Starting`.
    ///
    /// Valid from: `Idle`.
    pub fn begin_start(&mut self) -> Result<(), CastError> {
        match self {
            Self::Idle => {
                *self = Self::Starting;
                Ok(())
            }
            other => Err(CastError::RecoverableState(format!(
                "cannot start: host is {other}"
            ))),
        }
    }

    /// Transition to `ForegroundActive`.
    ///
    /// Valid from: `Starting`.
    pub fn enter_foreground(&mut self) -> Result<(), CastError> {
        match self {
            Self::Starting => {
                *self = Self::ForegroundActive {
                    since: Instant::now(),
                };
                Ok(())
            }
            other => Err(CastError::RecoverableState(format!(
                "cannot enter foreground: host is {other}"
            ))),
        }
    }

    /// Transition to `StoppingForError`.
    ///
    /// Valid from: `ForegroundActive`.
    pub fn begin_error_stop(&mut self) -> Result<(), CastError> {
        match self {
            Self::ForegroundActive { .. } => {
                *self = Self::StoppingForError;
                Ok(())
            }
            other => Err(CastError::RecoverableState(format!(
                "cannot fail: host is {other}"
            ))),
        }
    }

    /// Transition to `Stopped`.
    ///
    /// Valid from: `Starting`, `ForegroundActive`, `StoppingForError`.
    pub fn finish_stop(&mut self) -> Result<(), CastError> {
        match self {
            Self::Starting | Self::ForegroundActive { .. } | Self::StoppingForError => {
                *self = Self::Stopped;
                Ok(())
            }
            other => Err(CastError::RecoverableState(format!(
                "cannot stop: host is {other}"
            ))),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
