//! A [`StreamingModule`] backed by a [`ServiceHost`] per start.
//!
//! Every `start` creates a fresh host instance on its own task and sends
//! it a tagged start request; `stop` sends a tagged stop request and
//! waits for the host to report `Stopped`. Dropping the previous handle
//! on the next start tears the old instance down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::CastError;
use crate::host::{HostHandle, HostRequest, LifecycleState, ServiceHost, StreamBackend};
use crate::module::descriptor::ModuleDescriptor;
use crate::module::streaming::StreamingModule;
use crate::platform::{CapabilityProvider, NotificationPresenter};

pub struct HostedModule {
    descriptor: ModuleDescriptor,
    capabilities: Arc<dyn CapabilityProvider>,
    notifier: Arc<dyn NotificationPresenter>,
    backend: Arc<dyn StreamBackend>,
    host: Mutex<Option<HostHandle>>,
    next_request: AtomicU64,
}

impl HostedModule {
    pub fn new(
        descriptor: ModuleDescriptor,
        capabilities: Arc<dyn CapabilityProvider>,
        notifier: Arc<dyn NotificationPresenter>,
        backend: Arc<dyn StreamBackend>,
    ) -> Self {
        Self {
            descriptor,
            capabilities,
            notifier,
            backend,
            host: Mutex::new(None),
            next_request: AtomicU64::new(1),
        }
    }

    /// Lifecycle state of the current host instance, if one exists.
    pub fn host_state(&self) -> Option<LifecycleState> {
        self.current().map(|h| h.state())
    }

    fn current(&self) -> Option<HostHandle> {
        self.host
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn request_id(&self, verb: &str) -> String {
        let n = self.next_request.fetch_add(1, Ordering::Relaxed);
        format!("{}:{verb}:{n}", self.descriptor.id)
    }
}

#[async_trait]
impl StreamingModule for HostedModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn is_running(&self) -> bool {
        self.current().is_some_and(|h| h.is_running())
    }

    async fn start(&self) -> Result<(), CastError> {
        let handle = {
            let mut slot = self
                .host
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if slot.as_ref().is_some_and(|h| h.is_running()) {
                return Err(CastError::RecoverableState(format!(
                    "module {} is already active",
                    self.descriptor.id
                )));
            }

            let host = ServiceHost::new(
                self.descriptor.id.clone(),
                Arc::clone(&self.capabilities),
                Arc::clone(&self.notifier),
            );
            let (handle, _task) = HostHandle::spawn(host, Arc::clone(&self.backend));
            // Replacing the old handle closes its queue; that runner
            // tears its host down.
            *slot = Some(handle.clone());
            handle
        };

        let request = HostRequest::start(self.request_id("start"));
        debug!(module = %self.descriptor.id, request_id = ?request.id, "start requested");
        handle.request(request).await
    }

    async fn stop(&self) -> Result<(), CastError> {
        let handle = match self.current() {
            Some(h) if h.is_running() => h,
            _ => {
                return Err(CastError::RecoverableState(format!(
                    "module {} is not active",
                    self.descriptor.id
                )));
            }
        };

        let request = HostRequest::stop(self.request_id("stop"));
        debug!(module = %self.descriptor.id, request_id = ?request.id, "stop requested");
        handle.request(request).await?;
        handle.wait_stopped().await;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
