//! Turns selection changes into module starts.
//!
//! The coordinator observes the registry's selection only while it is
//! *supervising*. [`pause`](LifecycleCoordinator::pause) cancels the
//! subscription; [`resume`](LifecycleCoordinator::resume) re-establishes
//! it from the current value. Changes made while paused are not replayed
//! one by one: on resume only the latest selection is seen.
//!
//! For every observed selection:
//!
//! 1. already active → nothing to do;
//! 2. otherwise → `start_module`;
//! 3. a [`CastError::RecoverableState`] is logged and skipped;
//! 4. anything else ends the subscription and is escalated as
//!    [`CastError::FatalSupervision`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::CastError;
use crate::module::{ModuleId, ModuleRegistry};

/// Receiving end of the escalation channel, held by the top-level
/// supervisor.
pub type Escalations = mpsc::Receiver<CastError>;

struct SupervisionScope {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct LifecycleCoordinator {
    registry: Arc<ModuleRegistry>,
    escalation: mpsc::Sender<CastError>,
    scope: Option<SupervisionScope>,
}

impl LifecycleCoordinator {
    /// Create a paused coordinator and the receiver its fatal errors are
    /// escalated to.
    pub fn new(registry: Arc<ModuleRegistry>) -> (Self, Escalations) {
        let (escalation, rx) = mpsc::channel(8);
        (
            Self {
                registry,
                escalation,
                scope: None,
            },
            rx,
        )
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Whether a selection subscription is currently alive.
    ///
    /// A subscription that has escalated counts as dead even while its
    /// task is still winding down.
    pub fn is_supervising(&self) -> bool {
        self.scope
            .as_ref()
            .is_some_and(|s| !s.cancel.is_cancelled() && !s.task.is_finished())
    }

    /// Start (or restart after a fatal escalation) observing selections.
    /// A no-op while already supervising.
    pub fn resume(&mut self) {
        if self.is_supervising() {
            return;
        }
        let cancel = CancellationToken::new();
        let task = tokio::spawn(supervise(
            Arc::clone(&self.registry),
            cancel.clone(),
            self.escalation.clone(),
        ));
        self.scope = Some(SupervisionScope { cancel, task });
        debug!("supervision resumed");
    }

    /// Cancel the subscription and wait for it to wind down.
    ///
    /// A decision already in progress completes first; selections that
    /// arrive afterwards are not processed until [`resume`](Self::resume).
    pub async fn pause(&mut self) {
        if let Some(scope) = self.scope.take() {
            scope.cancel.cancel();
            let _ = scope.task.await;
            debug!("supervision paused");
        }
    }

    // ── Transport-facing operations ──────────────────────────────

    pub fn is_active(&self, id: &ModuleId) -> bool {
        self.registry.is_active(id)
    }

    pub async fn request_start(&self, id: &ModuleId) -> Result<(), CastError> {
        self.registry.start_module(id).await
    }

    pub async fn request_stop(&self, id: &ModuleId) -> Result<(), CastError> {
        self.registry.stop_module(id).await
    }
}

impl Drop for LifecycleCoordinator {
    fn drop(&mut self) {
        if let Some(scope) = self.scope.take() {
            scope.cancel.cancel();
        }
    }
}

// ── Supervision loop ─────────────────────────────────────────────

async fn supervise(
    registry: Arc<ModuleRegistry>,
    cancel: CancellationToken,
    escalation: mpsc::Sender<CastError>,
) {
    let mut selections = registry.observe_selection();

    loop {
        let id = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = selections.next() => match next {
                Some(id) => id,
                None => break,
            },
        };

        match decide(&registry, &id).await {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                info!(module = %id, "selection skipped: {e}");
            }
            Err(e) => {
                let fatal = e.into_fatal();
                error!(module = %id, "selection subscription failed: {fatal}");
                // Mark the scope dead before the supervisor can react.
                cancel.cancel();
                let _ = escalation.send(fatal).await;
                return;
            }
        }
    }

    debug!("selection subscription completed");
}

async fn decide(registry: &ModuleRegistry, id: &ModuleId) -> Result<(), CastError> {
    if registry.is_active(id) {
        debug!(module = %id, "already active");
        return Ok(());
    }
    info!(module = %id, "selected module not active; starting");
    registry.start_module(id).await
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::CommandChannel;
    use crate::module::{ModuleDescriptor, StreamingModule};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingModule {
        descriptor: ModuleDescriptor,
        running: AtomicBool,
        starts: AtomicUsize,
        fail_with: Option<fn() -> CastError>,
    }

    impl CountingModule {
        fn new(id: &str, fail_with: Option<fn() -> CastError>) -> Arc<Self> {
            Arc::new(Self {
                descriptor: ModuleDescriptor::new(id, []),
                running: AtomicBool::new(false),
                starts: AtomicUsize::new(0),
                fail_with,
            })
        }
    }

    #[async_trait]
    impl StreamingModule for CountingModule {
        fn descriptor(&self) -> &ModuleDescriptor {
            &self.descriptor
        }
        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
        async fn start(&self) -> Result<(), CastError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if let Some(make) = self.fail_with {
                return Err(make());
            }
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }
        async fn stop(&self) -> Result<(), CastError> {
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    fn busy() -> CastError {
        CastError::RecoverableState("busy".into())
    }

    fn closed() -> CastError {
        CastError::ChannelClosed
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn paused_coordinator_ignores_selection() {
        let remote = CountingModule::new("remote", None);
        let mut registry = ModuleRegistry::new(CommandChannel::new());
        registry.register(remote.clone()).unwrap();
        let (coordinator, _escalations) = LifecycleCoordinator::new(Arc::new(registry));

        coordinator.registry().select(&"remote".into()).unwrap();
        settle().await;
        assert!(!coordinator.is_supervising());
        assert_eq!(remote.starts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn recoverable_error_keeps_subscription() {
        let flaky = CountingModule::new("flaky", Some(busy));
        let good = CountingModule::new("good", None);
        let mut registry = ModuleRegistry::new(CommandChannel::new());
        registry.register(flaky.clone()).unwrap();
        registry.register(good.clone()).unwrap();
        let (mut coordinator, mut escalations) = LifecycleCoordinator::new(Arc::new(registry));
        coordinator.resume();

        coordinator.registry().select(&"flaky".into()).unwrap();
        settle().await;
        assert!(coordinator.is_supervising());

        coordinator.registry().select(&"good".into()).unwrap();
        settle().await;
        assert_eq!(good.starts.load(Ordering::SeqCst), 1);
        assert!(escalations.try_recv().is_err());
    }

    #[tokio::test]
    async fn other_errors_escalate_and_end_subscription() {
        let broken = CountingModule::new("broken", Some(closed));
        let mut registry = ModuleRegistry::new(CommandChannel::new());
        registry.register(broken).unwrap();
        let (mut coordinator, mut escalations) = LifecycleCoordinator::new(Arc::new(registry));
        coordinator.resume();

        coordinator.registry().select(&"broken".into()).unwrap();
        let escalated = escalations.recv().await.unwrap();
        assert!(matches!(escalated, CastError::FatalSupervision(_)));

        settle().await;
        assert!(!coordinator.is_supervising());
    }

    #[tokio::test]
    async fn resume_sees_latest_selection_only() {
        let local = CountingModule::new("local", None);
        let remote = CountingModule::new("remote", None);
        let mut registry = ModuleRegistry::new(CommandChannel::new());
        registry.register(local.clone()).unwrap();
        registry.register(remote.clone()).unwrap();
        let (mut coordinator, _escalations) = LifecycleCoordinator::new(Arc::new(registry));

        coordinator.registry().select(&"local".into()).unwrap();
        coordinator.registry().select(&"remote".into()).unwrap();
        coordinator.resume();
        settle().await;

        assert_eq!(local.starts.load(Ordering::SeqCst), 0);
        assert_eq!(remote.starts.load(Ordering::SeqCst), 1);

        coordinator.pause().await;
        assert!(!coordinator.is_supervising());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn resume_right_after_escalation_restarts() {
        let broken = CountingModule::new("broken", Some(closed));
        let mut registry = ModuleRegistry::new(CommandChannel::new());
        registry.register(broken.clone()).unwrap();
        let (mut coordinator, mut escalations) = LifecycleCoordinator::new(Arc::new(registry));
        coordinator.resume();
        coordinator.registry().select(&"broken".into()).unwrap();

        for round in 1..=100 {
            let escalated = tokio::time::timeout(Duration::from_secs(2), escalations.recv())
                .await
                .unwrap_or_else(|_| panic!("no escalation in round {round}"));
            assert!(matches!(escalated, Some(CastError::FatalSupervision(_))));
            assert!(!coordinator.is_supervising());
            coordinator.resume();
        }

        tokio::time::timeout(Duration::from_secs(2), escalations.recv())
            .await
            .expect("restarted subscription never ran");
        assert_eq!(broken.starts.load(Ordering::SeqCst), 101);
        coordinator.pause().await;
    }
}
