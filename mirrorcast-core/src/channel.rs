//! In-process command bus.
//!
//! Carries named events (module selection, remote pointer commands) to
//! whoever is subscribed *right now*. Nothing is persisted and late
//! subscribers see no history.
//!
//! Every subscriber owns an unbounded queue, so a slow consumer falls
//! behind but never loses an event published while it was subscribed.
//!
//! ```text
//! transport ──publish──► CommandChannel ──► Subscription (coordinator, relay, …)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;
use tracing::debug;

use crate::module::ModuleId;
use crate::relay::GestureCommand;

/// Events published on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// The desired module changed (or was re-affirmed).
    ModuleSelected(ModuleId),
    /// A remote viewer sent a pointer command.
    Gesture(GestureCommand),
}

impl BusEvent {
    /// Name the event is filtered by.
    pub fn name(&self) -> &'static str {
        match self {
            BusEvent::ModuleSelected(_) => MODULE_SELECTED,
            BusEvent::Gesture(cmd) => cmd.event_name(),
        }
    }
}

pub const MODULE_SELECTED: &str = "ModuleSelected";
pub const CLIENT_CLICK: &str = "ClientClick";
pub const CLIENT_SWIPE: &str = "ClientSwipe";

// ── CommandChannel ───────────────────────────────────────────────

struct Subscriber {
    id: u64,
    filter: Vec<&'static str>,
    tx: mpsc::UnboundedSender<BusEvent>,
}

impl Subscriber {
    fn wants(&self, name: &str) -> bool {
        self.filter.is_empty() || self.filter.contains(&name)
    }
}

#[derive(Default)]
struct Shared {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl Shared {
    fn subscribers(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Publish side of the bus. Cheap to clone.
#[derive(Clone, Default)]
pub struct CommandChannel {
    shared: Arc<Shared>,
}

impl CommandChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every current subscriber whose filter matches.
    ///
    /// Returns how many subscribers it reached. Zero is not an error:
    /// with nobody listening the event is simply gone.
    pub fn publish(&self, event: BusEvent) -> usize {
        let name = event.name();
        let mut subscribers = self.shared.subscribers();
        subscribers.retain(|s| !s.tx.is_closed());

        let mut delivered = 0;
        for subscriber in subscribers.iter().filter(|s| s.wants(name)) {
            if subscriber.tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        if delivered == 0 {
            debug!(event = name, "published with no subscribers");
        }
        delivered
    }

    /// Subscribe to the events whose [`BusEvent::name`] is in `names`.
    /// An empty slice subscribes to everything.
    pub fn subscribe(&self, names: &[&'static str]) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.subscribers().push(Subscriber {
            id,
            filter: names.to_vec(),
            tx,
        });
        Subscription {
            id,
            rx: Some(rx),
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared
            .subscribers()
            .iter()
            .filter(|s| !s.tx.is_closed())
            .count()
    }
}

impl std::fmt::Debug for CommandChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandChannel")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ── Subscription ─────────────────────────────────────────────────

/// Receive side of the bus for one consumer.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: Option<mpsc::UnboundedReceiver<BusEvent>>,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Wait for the next matching event.
    ///
    /// Returns `None` once unsubscribed or when every publisher is gone.
    /// Cancel-safe: dropping the future loses no event.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        self.rx.as_mut()?.recv().await
    }

    /// Stop receiving. Returns `true` the first time, `false` on any
    /// later call.
    pub fn unsubscribe(&mut self) -> bool {
        let Some(mut rx) = self.rx.take() else {
            return false;
        };
        rx.close();
        if let Some(shared) = self.shared.upgrade() {
            shared.subscribers().retain(|s| s.id != self.id);
        }
        true
    }

    pub fn is_subscribed(&self) -> bool {
        self.rx.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ── Tests ────────────────────────────────────────────────────────
