//! Console stand-ins for the device collaborators.
//!
//! The agent has no real screen, notification shade or input surface, so
//! each collaborator answers from configuration and reports what a device
//! would have done through `tracing`.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mirrorcast_core::error::CastError;
use mirrorcast_core::host::StreamBackend;
use mirrorcast_core::module::ModuleId;
use mirrorcast_core::platform::{CapabilityProvider, ForegroundState, NotificationPresenter};
use mirrorcast_core::relay::{DispatchCallback, Gesture, GestureDispatcher};

use crate::config::PlatformConfig;

// ── SimulatedDevice ──────────────────────────────────────────────

/// Capability answers taken from the `[platform]` section.
pub struct SimulatedDevice {
    config: PlatformConfig,
    surface_connected: AtomicBool,
}

impl SimulatedDevice {
    pub fn new(config: PlatformConfig) -> Self {
        let surface_connected = AtomicBool::new(config.input_surface_connected);
        Self {
            config,
            surface_connected,
        }
    }

    /// Connect or disconnect the input surface at runtime.
    pub fn set_surface_connected(&self, connected: bool) {
        self.surface_connected.store(connected, Ordering::SeqCst);
    }
}

impl CapabilityProvider for SimulatedDevice {
    fn sensitive_permission_granted(&self) -> bool {
        self.config.sensitive_permission
    }

    fn notification_permission_granted(&self) -> bool {
        self.config.notification_permission
    }

    fn error_notifications_enabled(&self) -> bool {
        self.config.error_notifications
    }

    fn platform_level(&self) -> u32 {
        self.config.platform_level
    }

    fn input_surface_connected(&self) -> bool {
        self.surface_connected.load(Ordering::SeqCst)
    }
}

// ── LogNotifier ──────────────────────────────────────────────────

/// Writes notifications to the log instead of a notification shade.
#[derive(Default)]
pub struct LogNotifier;

impl NotificationPresenter for LogNotifier {
    fn notify_foreground_state(&self, module: &ModuleId, state: ForegroundState) {
        match state {
            ForegroundState::Active(kind) => {
                info!(module = %module, service_type = %kind, "foreground notification shown")
            }
            ForegroundState::Cleared => {
                debug!(module = %module, "foreground notification cleared")
            }
        }
    }

    fn notify_error(&self, module: &ModuleId, message: &str) {
        warn!(module = %module, "error notification: {message}");
    }

    fn cancel_error(&self, module: &ModuleId) {
        debug!(module = %module, "error notification cancelled");
    }
}

// ── LogDispatcher ────────────────────────────────────────────────

/// Pretends to replay each gesture: logs it, holds for its duration,
/// then reports `Completed`.
#[derive(Default)]
pub struct LogDispatcher;

impl GestureDispatcher for LogDispatcher {
    fn dispatch(&self, gesture: Gesture, callback: DispatchCallback) -> bool {
        let hold = gesture.total_duration();
        for stroke in &gesture.strokes {
            info!(
                command = %gesture.command_id,
                points = stroke.path.len(),
                duration_ms = stroke.duration.as_millis() as u64,
                "replaying stroke"
            );
        }
        tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            callback.completed();
        });
        true
    }
}

// ── IdleStream ───────────────────────────────────────────────────

/// Streaming backend that holds the session open until cancelled.
#[derive(Default)]
pub struct IdleStream;

#[async_trait]
impl StreamBackend for IdleStream {
    async fn run(&self, module: &ModuleId, cancel: CancellationToken) -> Result<(), CastError> {
        info!(module = %module, "streaming");
        cancel.cancelled().await;
        info!(module = %module, "streaming ended");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
