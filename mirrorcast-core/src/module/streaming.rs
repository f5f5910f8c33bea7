//! The contract every selectable streaming module implements.

use async_trait::async_trait;

use crate::error::CastError;
use crate::module::descriptor::ModuleDescriptor;

/// A pluggable streaming transport (local network, peer-to-peer, …).
///
/// `start` and `stop` return once the request has been handed to the
/// module; a started module may keep initialising in the background.
#[async_trait]
pub trait StreamingModule: Send + Sync {
    fn descriptor(&self) -> &ModuleDescriptor;

    /// Whether the module currently holds the running lifecycle state.
    fn is_running(&self) -> bool;

    /// Start the module. Starting a running module is a
    /// [`CastError::RecoverableState`].
    async fn start(&self) -> Result<(), CastError>;

    /// Stop the module and wait until it has fully stopped.
    async fn stop(&self) -> Result<(), CastError>;
}
