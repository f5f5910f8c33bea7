//! Module catalogue, selection cell and start/stop transitions.
//!
//! The registry is the only place the selection is written, and the
//! only place modules are started or stopped. Transitions are
//! serialised so at most one module is ever active.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::channel::{BusEvent, CommandChannel};
use crate::error::CastError;
use crate::module::descriptor::{ModuleDescriptor, ModuleId};
use crate::module::selection::SelectionStream;
use crate::module::streaming::StreamingModule;

// ── ModuleRegistry ───────────────────────────────────────────────

pub struct ModuleRegistry {
    modules: BTreeMap<ModuleId, Arc<dyn StreamingModule>>,
    selection: watch::Sender<Option<ModuleId>>,
    bus: CommandChannel,
    transition: Mutex<()>,
}

impl ModuleRegistry {
    /// Empty registry publishing selection changes on `bus`.
    pub fn new(bus: CommandChannel) -> Self {
        let (selection, _) = watch::channel(None);
        Self {
            modules: BTreeMap::new(),
            selection,
            bus,
            transition: Mutex::new(()),
        }
    }

    /// Add a module. Ids must be unique.
    pub fn register(&mut self, module: Arc<dyn StreamingModule>) -> Result<(), CastError> {
        let id = module.descriptor().id.clone();
        if self.modules.contains_key(&id) {
            return Err(CastError::Other(format!("module {id} already registered")));
        }
        debug!(module = %id, "registered");
        self.modules.insert(id, module);
        Ok(())
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values().map(|m| m.descriptor())
    }

    fn module(&self, id: &ModuleId) -> Result<&Arc<dyn StreamingModule>, CastError> {
        self.modules
            .get(id)
            .ok_or_else(|| CastError::UnknownModule(id.to_string()))
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Whether `id` currently holds the running state. Unknown ids are
    /// never active.
    pub fn is_active(&self, id: &ModuleId) -> bool {
        self.modules.get(id).is_some_and(|m| m.is_running())
    }

    /// The running module, if any.
    pub fn active_module(&self) -> Option<ModuleId> {
        self.modules
            .iter()
            .find(|(_, m)| m.is_running())
            .map(|(id, _)| id.clone())
    }

    pub fn selected(&self) -> Option<ModuleId> {
        self.selection.borrow().clone()
    }

    // ── Selector ─────────────────────────────────────────────────

    /// Record `id` as the desired module and announce it on the bus.
    ///
    /// Does not start or stop anything. Unknown ids are rejected
    /// without touching the selection.
    pub fn select(&self, id: &ModuleId) -> Result<(), CastError> {
        self.module(id)?;
        self.selection.send_replace(Some(id.clone()));
        self.bus.publish(BusEvent::ModuleSelected(id.clone()));
        debug!(module = %id, "selected");
        Ok(())
    }

    /// Observe selection changes, starting from the current value.
    pub fn observe_selection(&self) -> SelectionStream {
        SelectionStream::new(self.selection.subscribe())
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Stop whichever other module is active, then start `id`.
    pub async fn start_module(&self, id: &ModuleId) -> Result<(), CastError> {
        let module = Arc::clone(self.module(id)?);
        let _guard = self.transition.lock().await;

        if module.is_running() {
            return Err(CastError::RecoverableState(format!(
                "module {id} is already active"
            )));
        }

        for (other_id, other) in &self.modules {
            if other_id != id && other.is_running() {
                info!(module = %other_id, next = %id, "stopping previous module");
                other.stop().await?;
            }
        }

        info!(module = %id, "starting module");
        module.start().await
    }

    /// Stop `id` and wait for it to reach its stopped state.
    pub async fn stop_module(&self, id: &ModuleId) -> Result<(), CastError> {
        let module = Arc::clone(self.module(id)?);
        let _guard = self.transition.lock().await;

        if !module.is_running() {
            return Err(CastError::RecoverableState(format!(
                "module {id} is not active"
            )));
        }
        info!(module = %id, "stopping module");
        module.stop().await
    }

    /// Stop every running module (shutdown path).
    pub async fn stop_all(&self) {
        let _guard = self.transition.lock().await;
        for (id, module) in &self.modules {
            if module.is_running() {
                if let Err(e) = module.stop().await {
                    warn!(module = %id, "stop during shutdown failed: {e}");
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
