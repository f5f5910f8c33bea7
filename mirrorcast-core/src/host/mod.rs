//! Per-module service host.
//!
//! | Module      | Purpose                                              |
//! |-------------|------------------------------------------------------|
//! | `lifecycle` | `LifecycleState` and its validated transitions       |
//! | `dedup`     | `ProcessedCommandSet` duplicate suppression           |
//! | `service`   | `ServiceHost`: foreground, notifications, teardown   |
//! | `runner`    | Task owning a host; `HostHandle`, `StreamBackend`    |

pub mod dedup;
pub mod lifecycle;
pub mod runner;
pub mod service;

pub use dedup::ProcessedCommandSet;
pub use lifecycle::LifecycleState;
pub use runner::{HostHandle, StreamBackend};
pub use service::{Disposition, HostCommand, HostRequest, ServiceHost};
