//! # mirrorcast-core
//!
//! Lifecycle coordination for a screen-streaming agent.
//!
//! This crate contains:
//! - **Channel**: `CommandChannel`, the in-process fan-out bus for
//!   selection and remote-input events
//! - **Modules**: `ModuleRegistry`, the `StreamingModule` contract and the
//!   distinct-until-changed `SelectionStream`
//! - **Coordinator**: `LifecycleCoordinator`, which starts whatever module
//!   the user selects while supervision is active
//! - **Host**: `ServiceHost`, the per-module foreground service with
//!   duplicate suppression, error notifications and teardown
//! - **Relay**: `RemoteControlRelay`, turning remote clicks and swipes into
//!   ordered gesture dispatches
//! - **Platform**: capability and notification traits the embedding
//!   application implements
//! - **Error**: `CastError`, a typed `thiserror`-based error hierarchy

pub mod channel;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod module;
pub mod platform;
pub mod relay;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use channel::{BusEvent, CommandChannel, Subscription};
pub use coordinator::{Escalations, LifecycleCoordinator};
pub use error::CastError;
pub use host::{
    Disposition, HostCommand, HostHandle, HostRequest, LifecycleState, ServiceHost,
    StreamBackend,
};
pub use module::{
    Capability, HostedModule, ModuleDescriptor, ModuleId, ModuleRegistry, SelectionStream,
    StreamingModule,
};
pub use platform::{
    CapabilityProvider, ForegroundServiceType, ForegroundState, NotificationPresenter,
};
pub use relay::{
    DispatchCallback, DispatchOutcome, Gesture, GestureCommand, GestureDispatcher, GestureKind,
    RelayConfig, RelayCounts, RelayHandle, RemoteControlRelay,
};
