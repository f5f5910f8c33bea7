//! Input-injection surface.
//!
//! The OS exposes exactly one capability here: dispatch a timed stroke
//! path and report `Completed` or `Cancelled` later, from whatever
//! thread it likes.

use std::fmt;

use tokio::sync::oneshot;

use crate::relay::gesture::Gesture;

/// Terminal outcome of one gesture dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    /// Interrupted or refused by the surface. Not an error.
    Cancelled,
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Two-case completion callback handed to the dispatcher.
///
/// Consumed by whichever case fires. Dropping it unanswered counts as
/// `Cancelled`.
#[derive(Debug)]
pub struct DispatchCallback {
    tx: oneshot::Sender<DispatchOutcome>,
}

impl DispatchCallback {
    /// A callback plus the receiver the relay awaits.
    pub fn pair() -> (Self, oneshot::Receiver<DispatchOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn completed(self) {
        let _ = self.tx.send(DispatchOutcome::Completed);
    }

    pub fn cancelled(self) {
        let _ = self.tx.send(DispatchOutcome::Cancelled);
    }
}

/// The OS input-injection surface.
pub trait GestureDispatcher: Send + Sync {
    /// Start replaying `gesture`; answer `callback` when it finishes.
    ///
    /// Returns `false` if the surface refused the gesture outright, in
    /// which case `callback` may be dropped unanswered.
    fn dispatch(&self, gesture: Gesture, callback: DispatchCallback) -> bool;
}
