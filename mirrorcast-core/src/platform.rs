//! Collaborator interfaces for everything owned by the OS or the UI.
//!
//! The coordinator, host and relay only ever talk to the device through
//! these traits, so they run the same against a real platform binding
//! or a recording fake.

use std::fmt;

use crate::module::ModuleId;

// ── Permissions / capabilities ───────────────────────────────────

/// Boolean queries answered by the permission/settings collaborator.
///
/// Every call is expected to reflect the *current* state; callers never
/// cache the answers.
pub trait CapabilityProvider: Send + Sync {
    /// Whether the sensitive input-capture permission (microphone) is
    /// granted.
    fn sensitive_permission_granted(&self) -> bool;

    /// Whether the app may post notifications at all.
    fn notification_permission_granted(&self) -> bool;

    /// Whether the user left error notifications switched on.
    fn error_notifications_enabled(&self) -> bool;

    /// Platform API level of the running OS.
    fn platform_level(&self) -> u32;

    /// Whether the input-injection surface is currently connected.
    fn input_surface_connected(&self) -> bool;
}

// ── Foreground classification ────────────────────────────────────

/// Service type the host registers with when going foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForegroundServiceType {
    /// Stricter type declared in the app manifest; required while the
    /// sensitive permission is held.
    Manifest,
    /// Plain screen-projection type.
    MediaProjection,
}

impl ForegroundServiceType {
    /// Pick the service type from the permissions granted right now.
    pub fn classify(capabilities: &dyn CapabilityProvider) -> Self {
        if capabilities.sensitive_permission_granted() {
            ForegroundServiceType::Manifest
        } else {
            ForegroundServiceType::MediaProjection
        }
    }
}

impl fmt::Display for ForegroundServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest => write!(f, "manifest"),
            Self::MediaProjection => write!(f, "media-projection"),
        }
    }
}

/// Foreground status reported to the notification collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForegroundState {
    /// Foreground notification shown and process registered.
    Active(ForegroundServiceType),
    /// Foreground notification removed.
    Cleared,
}

// ── Notifications ────────────────────────────────────────────────

/// Presents foreground and error notifications for a module's host.
pub trait NotificationPresenter: Send + Sync {
    /// Show, update or remove the foreground notification and the
    /// matching OS foreground registration.
    fn notify_foreground_state(&self, module: &ModuleId, state: ForegroundState);

    /// Show an error notification for `module`.
    fn notify_error(&self, module: &ModuleId, message: &str);

    /// Remove the error notification for `module`, if any.
    fn cancel_error(&self, module: &ModuleId);
}
