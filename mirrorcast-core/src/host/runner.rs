//! Task that owns a [`ServiceHost`] and feeds it requests in order.
//!
//! ```text
//! HostHandle ──[HostRequest]──► runner task ──► ServiceHost
//!      ▲                             │
//!      └──── watch<LifecycleState> ◄─┘        StreamBackend::run (spawned)
//! ```
//!
//! The runner exits after a normal stop or when every handle is dropped,
//! tearing the host down on the way out. After a failure it stays parked
//! in `Stopped` so the error notification stays visible until then.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CastError;
use crate::host::lifecycle::LifecycleState;
use crate::host::service::{Disposition, HostCommand, HostRequest, ServiceHost};
use crate::module::ModuleId;

/// Inbound request queue depth per host.
const REQUEST_QUEUE: usize = 16;

// ── StreamBackend ────────────────────────────────────────────────

/// The actual streaming work of a module (capture, encode, transport).
#[async_trait]
pub trait StreamBackend: Send + Sync {
    /// Stream until `cancel` fires (return `Ok`) or something breaks
    /// (return `Err`, which drives the host into its failure path).
    async fn run(&self, module: &ModuleId, cancel: CancellationToken) -> Result<(), CastError>;
}

// ── HostHandle ───────────────────────────────────────────────────

/// Cloneable handle to a running host task.
#[derive(Clone)]
pub struct HostHandle {
    module: ModuleId,
    tx: mpsc::Sender<HostRequest>,
    state_rx: watch::Receiver<LifecycleState>,
}

impl HostHandle {
    /// Move `host` onto its own task.
    pub fn spawn(host: ServiceHost, backend: Arc<dyn StreamBackend>) -> (Self, JoinHandle<()>) {
        let module = host.module().clone();
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
        let (state_tx, state_rx) = watch::channel(host.state().clone());

        let task = tokio::spawn(run_host(host, rx, state_tx, backend));
        (
            Self {
                module,
                tx,
                state_rx,
            },
            task,
        )
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Queue a request for the host.
    pub async fn request(&self, request: HostRequest) -> Result<(), CastError> {
        self.tx.send(request).await?;
        Ok(())
    }

    /// Latest published lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state_rx.borrow().clone()
    }

    /// Not yet stopped. A freshly spawned, still `Idle` host counts:
    /// its start request is already queued.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed() && !self.state_rx.borrow().is_stopped()
    }

    /// Wait until the host reports `Stopped`.
    ///
    /// A runner that has exited counts as stopped.
    pub async fn wait_stopped(&self) {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(LifecycleState::is_stopped).await;
    }
}

// ── Runner ───────────────────────────────────────────────────────

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Session {
    fn abort(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

async fn run_host(
    mut host: ServiceHost,
    mut requests: mpsc::Receiver<HostRequest>,
    state_tx: watch::Sender<LifecycleState>,
    backend: Arc<dyn StreamBackend>,
) {
    let (done_tx, mut done_rx) = mpsc::channel::<Result<(), CastError>>(1);
    let mut session: Option<Session> = None;
    let mut failed = false;

    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else {
                    debug!(module = %host.module(), "all handles dropped");
                    break;
                };

                match host.handle(&request) {
                    Ok(Disposition::Processed) => {}
                    Ok(Disposition::Duplicate) => {
                        debug!(module = %host.module(), request_id = ?request.id, "dropped duplicate");
                    }
                    Err(e) => warn!(module = %host.module(), "request rejected: {e}"),
                }
                state_tx.send_replace(host.state().clone());

                if host.state().is_foreground() && session.is_none() {
                    let cancel = CancellationToken::new();
                    let task = tokio::spawn({
                        let backend = Arc::clone(&backend);
                        let module = host.module().clone();
                        let cancel = cancel.clone();
                        let done_tx = done_tx.clone();
                        async move {
                            let result = backend.run(&module, cancel).await;
                            let _ = done_tx.send(result).await;
                        }
                    });
                    session = Some(Session { cancel, task });
                }

                if host.state().is_stopped() {
                    if let Some(s) = session.take() {
                        s.abort();
                    }
                    // A parked (failed) host only leaves on an explicit stop.
                    if !failed || request.command == HostCommand::Stop {
                        break;
                    }
                }
            }

            Some(result) = done_rx.recv() => {
                session = None;
                match result {
                    Ok(()) => {
                        info!(module = %host.module(), "stream ended");
                        if let Err(e) = host.stop() {
                            warn!(module = %host.module(), "stop after stream end: {e}");
                        }
                        state_tx.send_replace(host.state().clone());
                        break;
                    }
                    Err(e) => {
                        if let Err(err) = host.fail(&e.to_string()) {
                            warn!(module = %host.module(), "failure transition rejected: {err}");
                        }
                        failed = true;
                        state_tx.send_replace(host.state().clone());
                    }
                }
            }
        }
    }

    if let Some(s) = session.take() {
        s.abort();
    }
    if !host.state().is_stopped() {
        let _ = host.stop();
        state_tx.send_replace(host.state().clone());
    }
    host.teardown();
}

// ── Tests ────────────────────────────────────────────────────────
