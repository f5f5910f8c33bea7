//! Agent service core logic.
//!
//! Wires the module registry, lifecycle coordinator and remote control
//! relay together, feeds them inbound events, and supervises the
//! coordinator's selection subscription.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mirrorcast_core::channel::{BusEvent, CommandChannel};
use mirrorcast_core::coordinator::{Escalations, LifecycleCoordinator};
use mirrorcast_core::error::CastError;
use mirrorcast_core::module::{HostedModule, ModuleRegistry};
use mirrorcast_core::relay::{RelayHandle, RemoteControlRelay};

use crate::config::AgentConfig;
use crate::platform::{IdleStream, LogDispatcher, LogNotifier, SimulatedDevice};
use crate::transport::InboundEvent;

enum Step {
    Stop,
    Escalated(CastError),
    Event(InboundEvent),
    Closed,
}

// ── AgentService ─────────────────────────────────────────────────

/// The top-level agent service.
pub struct AgentService {
    config: AgentConfig,
    device: Arc<SimulatedDevice>,
    bus: CommandChannel,
    registry: Arc<ModuleRegistry>,
    coordinator: LifecycleCoordinator,
    escalations: Escalations,
    restarts: u32,
    shutdown: CancellationToken,
}

impl AgentService {
    /// Build the registry from `config.modules` with console collaborators.
    pub fn new(config: AgentConfig) -> Result<Self, CastError> {
        let device = Arc::new(SimulatedDevice::new(config.platform.clone()));
        let notifier = Arc::new(LogNotifier);
        let backend = Arc::new(IdleStream);
        let bus = CommandChannel::new();

        let mut registry = ModuleRegistry::new(bus.clone());
        for descriptor in &config.modules.available {
            registry.register(Arc::new(HostedModule::new(
                descriptor.clone(),
                device.clone(),
                notifier.clone(),
                backend.clone(),
            )))?;
        }
        let registry = Arc::new(registry);
        let (coordinator, escalations) = LifecycleCoordinator::new(Arc::clone(&registry));

        Ok(Self {
            config,
            device,
            bus,
            registry,
            coordinator,
            escalations,
            restarts: 0,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    pub fn stop_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &CommandChannel {
        &self.bus
    }

    pub fn device(&self) -> &Arc<SimulatedDevice> {
        &self.device
    }

    pub fn is_supervising(&self) -> bool {
        self.coordinator.is_supervising()
    }

    /// Attach the relay and begin supervising selections.
    pub fn start(&mut self) -> Result<RelayHandle, CastError> {
        let relay = RemoteControlRelay::new(
            self.config.to_relay_config(),
            self.device.clone(),
            Arc::new(LogDispatcher),
        )
        .attach(&self.bus);

        self.coordinator.resume();

        if let Some(id) = &self.config.modules.default {
            info!(module = %id, "applying default selection");
            self.registry.select(id)?;
        }
        Ok(relay)
    }

    /// Run until stopped, the event stream closes, or supervision fails
    /// more often than `supervisor.max_restarts` allows.
    pub async fn run(mut self, mut events: mpsc::Receiver<InboundEvent>) -> Result<(), CastError> {
        let relay = self.start()?;
        info!(
            modules = self.registry.descriptors().count(),
            "agent running"
        );

        let mut outcome = Ok(());
        loop {
            let step = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Step::Stop,
                Some(err) = self.escalations.recv() => Step::Escalated(err),
                event = events.recv() => match event {
                    Some(event) => Step::Event(event),
                    None => Step::Closed,
                },
            };

            match step {
                Step::Stop => break,
                Step::Closed => {
                    info!("inbound stream closed");
                    break;
                }
                Step::Event(event) => self.apply(event).await,
                Step::Escalated(err) => {
                    if let Err(fatal) = self.on_escalation(err) {
                        outcome = Err(fatal);
                        break;
                    }
                }
            }
        }

        self.coordinator.pause().await;
        relay.shutdown().await;
        self.registry.stop_all().await;
        info!("agent stopped");
        outcome
    }

    /// Act on one inbound event. Failures are logged, never returned.
    pub async fn apply(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::ModuleSelected { id } => {
                if let Err(e) = self.registry.select(&id) {
                    warn!(module = %id, "selection rejected: {e}");
                }
            }
            InboundEvent::Click { .. } | InboundEvent::Swipe { .. } => {
                if let Some(command) = event.gesture() {
                    if self.bus.publish(BusEvent::Gesture(command)) == 0 {
                        warn!("no relay attached; gesture dropped");
                    }
                }
            }
            InboundEvent::RequestStop { id } => match self.coordinator.request_stop(&id).await {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => info!(module = %id, "stop skipped: {e}"),
                Err(e) => warn!(module = %id, "stop failed: {e}"),
            },
            InboundEvent::Supervision { active: true } => self.coordinator.resume(),
            InboundEvent::Supervision { active: false } => self.coordinator.pause().await,
            InboundEvent::InputSurface { connected } => {
                info!(connected, "input surface changed");
                self.device.set_surface_connected(connected);
            }
        }
    }

    /// Restart the selection subscription, or give up once the restart
    /// budget is spent.
    fn on_escalation(&mut self, err: CastError) -> Result<(), CastError> {
        if self.restarts >= self.config.supervisor.max_restarts {
            error!(restarts = self.restarts, "supervision failed permanently: {err}");
            return Err(err);
        }
        self.restarts += 1;
        warn!(
            restart = self.restarts,
            max = self.config.supervisor.max_restarts,
            "restarting supervision after: {err}"
        );
        self.coordinator.resume();
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
