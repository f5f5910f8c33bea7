//! Remote control relay: bus subscription → validation → ordered
//! gesture dispatch.
//!
//! Two tasks per attached relay:
//!
//! 1. **intake** reads `ClientClick` / `ClientSwipe` events, checks the
//!    injection capability, validates the command and queues the gesture;
//!    rejected commands never reach the queue.
//! 2. **executor** dispatches queued gestures one at a time, waiting for
//!    `Completed` or `Cancelled` before taking the next.
//!
//! Detaching cancels both. An in-flight dispatch is abandoned.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::{BusEvent, CLIENT_CLICK, CLIENT_SWIPE, CommandChannel, Subscription};
use crate::error::CastError;
use crate::platform::CapabilityProvider;
use crate::relay::dispatch::{DispatchCallback, DispatchOutcome, GestureDispatcher};
use crate::relay::gesture::{CLICK_DURATION, Gesture, GestureCommand};

/// Lowest platform level with gesture dispatch support.
pub const MIN_GESTURE_PLATFORM_LEVEL: u32 = 24;

// ── RelayConfig ──────────────────────────────────────────────────

/// Configuration for [`RemoteControlRelay`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Hold time of a synthetic tap.
    pub click_duration: Duration,
    /// Platform level below which injection is unavailable.
    pub min_platform_level: u32,
    /// Validated gestures waiting for dispatch.
    pub queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            click_duration: CLICK_DURATION,
            min_platform_level: MIN_GESTURE_PLATFORM_LEVEL,
            queue_capacity: 64,
        }
    }
}

// ── Stats ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RelayStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time copy of the relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayCounts {
    pub accepted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub cancelled: u64,
}

impl RelayStats {
    fn snapshot(&self) -> RelayCounts {
        RelayCounts {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

// ── RemoteControlRelay ───────────────────────────────────────────

struct RelayInner {
    config: RelayConfig,
    capabilities: Arc<dyn CapabilityProvider>,
    dispatcher: Arc<dyn GestureDispatcher>,
    stats: RelayStats,
}

impl RelayInner {
    fn check_capability(&self) -> Result<(), CastError> {
        let level = self.capabilities.platform_level();
        if level < self.config.min_platform_level {
            return Err(CastError::CapabilityUnavailable(format!(
                "platform level {level} is below {}",
                self.config.min_platform_level
            )));
        }
        if !self.capabilities.input_surface_connected() {
            return Err(CastError::CapabilityUnavailable(
                "input surface not connected".into(),
            ));
        }
        Ok(())
    }

    fn prepare(&self, command: &GestureCommand) -> Result<Gesture, CastError> {
        self.check_capability()?;
        command.to_gesture(self.config.click_duration)
    }

    async fn enqueue(
        &self,
        queue: &mpsc::Sender<Gesture>,
        command: GestureCommand,
    ) -> Result<(), CastError> {
        let gesture = match self.prepare(&command) {
            Ok(g) => g,
            Err(e) => {
                warn!(command = %command.id, "dropped: {e}");
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        queue.send(gesture).await?;
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
        debug!(command = %command.id, "queued");
        Ok(())
    }

    async fn dispatch(&self, gesture: Gesture) -> DispatchOutcome {
        let id = gesture.command_id.clone();
        let (callback, outcome) = DispatchCallback::pair();
        if !self.dispatcher.dispatch(gesture, callback) {
            warn!(command = %id, "dispatch refused by input surface");
            return DispatchOutcome::Cancelled;
        }
        outcome.await.unwrap_or(DispatchOutcome::Cancelled)
    }
}

/// Replays remote pointer commands as synthetic gestures.
pub struct RemoteControlRelay {
    inner: Arc<RelayInner>,
}

impl RemoteControlRelay {
    pub fn new(
        config: RelayConfig,
        capabilities: Arc<dyn CapabilityProvider>,
        dispatcher: Arc<dyn GestureDispatcher>,
    ) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                config,
                capabilities,
                dispatcher,
                stats: RelayStats::default(),
            }),
        }
    }

    /// Check capability and validate `command` without queueing it.
    pub fn prepare(&self, command: &GestureCommand) -> Result<Gesture, CastError> {
        self.inner.prepare(command)
    }

    /// Subscribe to gesture events on `bus` and start dispatching.
    pub fn attach(self, bus: &CommandChannel) -> RelayHandle {
        let subscription = bus.subscribe(&[CLIENT_CLICK, CLIENT_SWIPE]);
        let (queue, queue_rx) = mpsc::channel(self.inner.config.queue_capacity.max(1));
        let cancel = CancellationToken::new();

        let intake = tokio::spawn(run_intake(
            Arc::clone(&self.inner),
            subscription,
            queue.clone(),
            cancel.clone(),
        ));
        let executor = tokio::spawn(run_executor(
            Arc::clone(&self.inner),
            queue_rx,
            cancel.clone(),
        ));
        info!("remote control relay attached");

        RelayHandle {
            inner: self.inner,
            queue,
            cancel,
            tasks: vec![intake, executor],
        }
    }
}

// ── RelayHandle ──────────────────────────────────────────────────

/// Owner of an attached relay.
pub struct RelayHandle {
    inner: Arc<RelayInner>,
    queue: mpsc::Sender<Gesture>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayHandle {
    /// Validate and queue a command directly, bypassing the bus.
    pub async fn submit(&self, command: GestureCommand) -> Result<(), CastError> {
        if !self.is_attached() {
            return Err(CastError::ChannelClosed);
        }
        self.inner.enqueue(&self.queue, command).await
    }

    pub fn counts(&self) -> RelayCounts {
        self.inner.stats.snapshot()
    }

    pub fn is_attached(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Unsubscribe and stop dispatching. Returns `true` the first time;
    /// later calls are no-ops returning `false`.
    pub fn detach(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.cancel.cancel();
        info!("remote control relay detached");
        true
    }

    /// Detach and wait for both tasks to exit.
    pub async fn shutdown(mut self) {
        self.detach();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Tasks ────────────────────────────────────────────────────────

async fn run_intake(
    inner: Arc<RelayInner>,
    mut subscription: Subscription,
    queue: mpsc::Sender<Gesture>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = subscription.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        let BusEvent::Gesture(command) = event else {
            continue;
        };

        let enqueued = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = inner.enqueue(&queue, command) => result,
        };
        if let Err(CastError::ChannelClosed) = enqueued {
            break;
        }
    }

    if subscription.unsubscribe() {
        debug!("relay unsubscribed from command channel");
    }
}

async fn run_executor(
    inner: Arc<RelayInner>,
    mut queue: mpsc::Receiver<Gesture>,
    cancel: CancellationToken,
) {
    loop {
        let gesture = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            gesture = queue.recv() => match gesture {
                Some(g) => g,
                None => break,
            },
        };

        let id = gesture.command_id.clone();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(command = %id, "abandoning in-flight gesture");
                break;
            }
            outcome = inner.dispatch(gesture) => outcome,
        };

        match outcome {
            DispatchOutcome::Completed => {
                inner.stats.completed.fetch_add(1, Ordering::Relaxed);
                debug!(command = %id, "gesture completed");
            }
            DispatchOutcome::Cancelled => {
                inner.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                info!(command = %id, "gesture cancelled");
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
