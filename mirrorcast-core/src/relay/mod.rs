//! # Remote control relay
//!
//! Replays pointer commands received from a remote viewer as synthetic
//! gestures on the local input surface.
//!
//! ```text
//! CommandChannel ──[ClientClick/ClientSwipe]──► intake
//!                                                 │ capability check
//!                                                 │ validation
//!                                                 ↓
//!                                        bounded gesture queue
//!                                                 ↓
//!                                     executor ──► GestureDispatcher
//!                                        ▲              │
//!                                        └─ Completed / Cancelled
//! ```
//!
//! | Module     | Purpose                                            |
//! |------------|----------------------------------------------------|
//! | `gesture`  | `GestureCommand` wire form and the `Gesture` model |
//! | `dispatch` | `GestureDispatcher` surface and its callback       |
//! | `service`  | `RemoteControlRelay` and its `RelayHandle`         |

pub mod dispatch;
pub mod gesture;
pub mod service;

pub use dispatch::{DispatchCallback, DispatchOutcome, GestureDispatcher};
pub use gesture::{CLICK_DURATION, Gesture, GestureCommand, GestureKind, Point, Stroke};
pub use service::{
    MIN_GESTURE_PLATFORM_LEVEL, RelayConfig, RelayCounts, RelayHandle, RemoteControlRelay,
};
