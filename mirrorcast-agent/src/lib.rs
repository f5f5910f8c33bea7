//! # mirrorcast-agent: streaming agent
//!
//! Console host for the mirrorcast core: registers the configured
//! streaming modules, starts whichever one is selected, and relays remote
//! clicks and swipes to the (simulated) input surface.
//!
//! Inbound events arrive as JSON lines on stdin; see [`transport`].
//!
//! | Module      | Purpose                                           |
//! |-------------|---------------------------------------------------|
//! | `config`    | `AgentConfig` TOML loading and defaults           |
//! | `platform`  | Console stand-ins for the device collaborators    |
//! | `transport` | JSON-lines inbound event stream                   |
//! | `service`   | `AgentService` wiring and supervision restarts    |

pub mod config;
pub mod platform;
pub mod service;
pub mod transport;
