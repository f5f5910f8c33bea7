//! Generic service host: the foreground/background lifecycle shared by
//! every streaming module.
//!
//! A `ServiceHost` is a plain state machine plus its collaborators. It
//! is owned by exactly one task (see [`HostHandle`](super::HostHandle)),
//! so nothing here needs locking.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::CastError;
use crate::host::dedup::ProcessedCommandSet;
use crate::host::lifecycle::LifecycleState;
use crate::module::ModuleId;
use crate::platform::{
    CapabilityProvider, ForegroundServiceType, ForegroundState, NotificationPresenter,
};

// ── Requests ─────────────────────────────────────────────────────

/// What an inbound request asks the host to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Start,
    Stop,
}

/// Inbound start/stop request, optionally tagged for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRequest {
    pub id: Option<String>,
    pub command: HostCommand,
}

impl HostRequest {
    pub fn start(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            command: HostCommand::Start,
        }
    }

    pub fn stop(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            command: HostCommand::Stop,
        }
    }

    /// A request that cannot be tagged. Always processed.
    pub fn untagged(command: HostCommand) -> Self {
        Self { id: None, command }
    }
}

/// Whether [`ServiceHost::handle`] acted on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Processed,
    Duplicate,
}

// ── ServiceHost ──────────────────────────────────────────────────

/// One host instance for one module start.
pub struct ServiceHost {
    module: ModuleId,
    state: LifecycleState,
    processed: ProcessedCommandSet,
    capabilities: Arc<dyn CapabilityProvider>,
    notifier: Arc<dyn NotificationPresenter>,
    foreground: Option<ForegroundServiceType>,
    error_visible: bool,
    torn_down: bool,
}

impl ServiceHost {
    pub fn new(
        module: ModuleId,
        capabilities: Arc<dyn CapabilityProvider>,
        notifier: Arc<dyn NotificationPresenter>,
    ) -> Self {
        debug!(module = %module, "host created");
        Self {
            module,
            state: LifecycleState::Idle,
            processed: ProcessedCommandSet::new(),
            capabilities,
            notifier,
            foreground: None,
            error_visible: false,
            torn_down: false,
        }
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// Service type used for the current foreground registration.
    pub fn foreground_type(&self) -> Option<ForegroundServiceType> {
        self.foreground
    }

    pub fn error_visible(&self) -> bool {
        self.error_visible
    }

    /// See [`ProcessedCommandSet::is_duplicate`].
    pub fn is_duplicate(&mut self, request_id: Option<&str>) -> bool {
        self.processed.is_duplicate(request_id)
    }

    /// De-duplicate and apply an inbound request.
    pub fn handle(&mut self, request: &HostRequest) -> Result<Disposition, CastError> {
        if self.is_duplicate(request.id.as_deref()) {
            return Ok(Disposition::Duplicate);
        }

        match request.command {
            HostCommand::Start => self.start()?,
            HostCommand::Stop => self.stop()?,
        }
        Ok(Disposition::Processed)
    }

    /// `Idle → Starting → ForegroundActive`.
    ///
    /// A start while already starting or in the foreground is a no-op.
    pub fn start(&mut self) -> Result<(), CastError> {
        match self.state {
            LifecycleState::Starting | LifecycleState::ForegroundActive { .. } => {
                debug!(module = %self.module, state = %self.state, "already started");
                Ok(())
            }
            _ => {
                self.state.begin_start()?;
                info!(module = %self.module, "starting");
                self.become_foreground()
            }
        }
    }

    /// Register as foreground. The service type is classified from the
    /// permissions granted at this moment.
    pub fn become_foreground(&mut self) -> Result<(), CastError> {
        self.state.enter_foreground()?;

        let service_type = ForegroundServiceType::classify(self.capabilities.as_ref());
        self.notifier
            .notify_foreground_state(&self.module, ForegroundState::Active(service_type));
        self.foreground = Some(service_type);

        info!(module = %self.module, %service_type, "foreground active");
        Ok(())
    }

    /// Leave the foreground and stop. Stopping a stopped host is a no-op.
    pub fn stop(&mut self) -> Result<(), CastError> {
        if self.state.is_stopped() {
            debug!(module = %self.module, "already stopped");
            return Ok(());
        }
        self.stop_foreground();
        self.state.finish_stop()?;
        info!(module = %self.module, "stopped");
        Ok(())
    }

    /// `ForegroundActive → StoppingForError → Stopped`, leaving an error
    /// notification behind.
    pub fn fail(&mut self, message: &str) -> Result<(), CastError> {
        self.state.begin_error_stop()?;
        warn!(module = %self.module, message, "stopping on error");

        self.stop_foreground();
        self.show_error_notification(message);
        self.state.finish_stop()
    }

    pub fn stop_foreground(&mut self) {
        debug!(module = %self.module, "stop foreground");
        self.foreground = None;
        self.notifier
            .notify_foreground_state(&self.module, ForegroundState::Cleared);
    }

    /// Replace any visible error notification with `message`.
    ///
    /// Silently skipped (logged) unless notifications are permitted
    /// *and* error notifications are enabled.
    pub fn show_error_notification(&mut self, message: &str) {
        self.hide_error_notification();

        if !self.capabilities.notification_permission_granted() {
            warn!(module = %self.module, "no notification permission; ignoring error");
            return;
        }
        if !self.capabilities.error_notifications_enabled() {
            warn!(module = %self.module, "error notifications disabled; ignoring error");
            return;
        }

        self.notifier.notify_error(&self.module, message);
        self.error_visible = true;
    }

    pub fn hide_error_notification(&mut self) {
        debug!(module = %self.module, "hide error notification");
        self.notifier.cancel_error(&self.module);
        self.error_visible = false;
    }

    /// Clear the foreground state, then hide the error notification.
    ///
    /// Safe from any state; runs once per instance, later calls (and the
    /// implicit one on drop) do nothing.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.stop_foreground();
        self.hide_error_notification();
        debug!(module = %self.module, state = %self.state, "host torn down");
    }
}

impl Drop for ServiceHost {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ── Tests ────────────────────────────────────────────────────────
