//! Integration tests: selection-driven lifecycle, host notification
//! ordering, and remote gesture relay over the command channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mirrorcast_core::{
    BusEvent, CapabilityProvider, CastError, CommandChannel, DispatchCallback, Disposition,
    ForegroundServiceType, ForegroundState, Gesture, GestureCommand, GestureDispatcher,
    HostRequest, HostedModule, LifecycleCoordinator, LifecycleState, ModuleDescriptor, ModuleId,
    ModuleRegistry, NotificationPresenter, RelayConfig, RemoteControlRelay, ServiceHost,
    StreamBackend, StreamingModule,
};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

// ── Fakes ────────────────────────────────────────────────────────

struct Device {
    sensitive: bool,
    notifications: bool,
    error_notifications: bool,
    surface: bool,
}

impl Device {
    fn granted() -> Arc<Self> {
        Arc::new(Self {
            sensitive: false,
            notifications: true,
            error_notifications: true,
            surface: true,
        })
    }

    fn without_input_surface() -> Arc<Self> {
        Arc::new(Self {
            sensitive: false,
            notifications: true,
            error_notifications: true,
            surface: false,
        })
    }
}

impl CapabilityProvider for Device {
    fn sensitive_permission_granted(&self) -> bool {
        self.sensitive
    }
    fn notification_permission_granted(&self) -> bool {
        self.notifications
    }
    fn error_notifications_enabled(&self) -> bool {
        self.error_notifications
    }
    fn platform_level(&self) -> u32 {
        34
    }
    fn input_surface_connected(&self) -> bool {
        self.surface
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Note {
    Foreground(String, ForegroundState),
    Error(String, String),
    CancelError(String),
}

/// Records every notification call in order.
#[derive(Default)]
struct Recorder {
    notes: Mutex<Vec<Note>>,
}

impl Recorder {
    fn take(&self) -> Vec<Note> {
        std::mem::take(&mut *self.notes.lock().unwrap())
    }
}

impl NotificationPresenter for Recorder {
    fn notify_foreground_state(&self, module: &ModuleId, state: ForegroundState) {
        self.notes
            .lock()
            .unwrap()
            .push(Note::Foreground(module.to_string(), state));
    }
    fn notify_error(&self, module: &ModuleId, message: &str) {
        self.notes
            .lock()
            .unwrap()
            .push(Note::Error(module.to_string(), message.to_string()));
    }
    fn cancel_error(&self, module: &ModuleId) {
        self.notes
            .lock()
            .unwrap()
            .push(Note::CancelError(module.to_string()));
    }
}

/// Streams until cancelled, counting runs.
#[derive(Default)]
struct IdleBackend {
    runs: AtomicUsize,
}

#[async_trait]
impl StreamBackend for IdleBackend {
    async fn run(&self, _: &ModuleId, cancel: CancellationToken) -> Result<(), CastError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        cancel.cancelled().await;
        Ok(())
    }
}

struct BrokenBackend;

#[async_trait]
impl StreamBackend for BrokenBackend {
    async fn run(&self, _: &ModuleId, _: CancellationToken) -> Result<(), CastError> {
        Err(CastError::Other("encoder lost".into()))
    }
}

/// Completes each gesture after its own duration, logging the order of
/// dispatch and completion.
#[derive(Default)]
struct TimedDispatcher {
    log: Arc<Mutex<Vec<String>>>,
    gestures: Mutex<Vec<Gesture>>,
}

impl GestureDispatcher for TimedDispatcher {
    fn dispatch(&self, gesture: Gesture, callback: DispatchCallback) -> bool {
        let id = gesture.command_id.clone();
        let hold = gesture.total_duration();
        self.log.lock().unwrap().push(format!("dispatch {id}"));
        self.gestures.lock().unwrap().push(gesture);

        let log = Arc::clone(&self.log);
        tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            log.lock().unwrap().push(format!("complete {id}"));
            callback.completed();
        });
        true
    }
}

/// Cancels each gesture partway through, logging dispatch and
/// cancellation order.
#[derive(Default)]
struct InterruptingDispatcher {
    log: Arc<Mutex<Vec<String>>>,
}

impl GestureDispatcher for InterruptingDispatcher {
    fn dispatch(&self, gesture: Gesture, callback: DispatchCallback) -> bool {
        let id = gesture.command_id.clone();
        self.log.lock().unwrap().push(format!("dispatch {id}"));

        let log = Arc::clone(&self.log);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            log.lock().unwrap().push(format!("cancel {id}"));
            callback.cancelled();
        });
        true
    }
}

// ── Helpers ──────────────────────────────────────────────────────

async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

fn hosted_registry(
    recorder: &Arc<Recorder>,
    backend: Arc<dyn StreamBackend>,
) -> Arc<ModuleRegistry> {
    let mut registry = ModuleRegistry::new(CommandChannel::new());
    for id in ["local", "remote"] {
        registry
            .register(Arc::new(HostedModule::new(
                ModuleDescriptor::new(id, []),
                Device::granted(),
                recorder.clone(),
                Arc::clone(&backend),
            )))
            .unwrap();
    }
    Arc::new(registry)
}

fn host(recorder: &Arc<Recorder>) -> ServiceHost {
    ServiceHost::new("local".into(), Device::granted(), recorder.clone())
}

// ── Selection → lifecycle ────────────────────────────────────────

#[tokio::test]
async fn test_reselecting_active_module_starts_once() {
    let recorder = Arc::new(Recorder::default());
    let backend = Arc::new(IdleBackend::default());
    let registry = hosted_registry(&recorder, backend.clone());
    let (mut coordinator, _escalations) = LifecycleCoordinator::new(Arc::clone(&registry));
    coordinator.resume();

    registry.select(&"remote".into()).unwrap();
    settle().await;
    assert!(registry.is_active(&"remote".into()));
    assert_eq!(backend.runs.load(Ordering::SeqCst), 1);

    registry.select(&"remote".into()).unwrap();
    settle().await;
    assert_eq!(backend.runs.load(Ordering::SeqCst), 1);

    coordinator.pause().await;
    registry.stop_all().await;
}

#[tokio::test]
async fn test_switching_modules_tears_down_previous_host() {
    let recorder = Arc::new(Recorder::default());
    let registry = hosted_registry(&recorder, Arc::new(IdleBackend::default()));
    let (mut coordinator, _escalations) = LifecycleCoordinator::new(Arc::clone(&registry));
    coordinator.resume();

    registry.select(&"local".into()).unwrap();
    settle().await;
    let active = ForegroundState::Active(ForegroundServiceType::MediaProjection);
    assert_eq!(recorder.take(), vec![Note::Foreground("local".into(), active)]);

    registry.select(&"remote".into()).unwrap();
    settle().await;
    assert_eq!(registry.active_module(), Some("remote".into()));

    let notes = recorder.take();
    let cleared = notes
        .iter()
        .position(|n| *n == Note::Foreground("local".into(), ForegroundState::Cleared))
        .unwrap();
    let started = notes
        .iter()
        .position(|n| *n == Note::Foreground("remote".into(), active))
        .unwrap();
    assert!(cleared < started, "previous module must stop first: {notes:?}");

    coordinator.pause().await;
    registry.stop_all().await;
}

#[tokio::test]
async fn test_selection_is_announced_on_bus() {
    let bus = CommandChannel::new();
    let mut sub = bus.subscribe(&[]);
    let recorder = Arc::new(Recorder::default());
    let mut registry = ModuleRegistry::new(bus);
    registry
        .register(Arc::new(HostedModule::new(
            ModuleDescriptor::new("local", []),
            Device::granted(),
            recorder,
            Arc::new(IdleBackend::default()),
        )))
        .unwrap();

    registry.select(&"local".into()).unwrap();
    let event = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("timeout");
    assert_eq!(event, Some(BusEvent::ModuleSelected("local".into())));
}

// ── Service host ─────────────────────────────────────────────────

#[test]
fn test_tagged_requests_processed_once() {
    let recorder = Arc::new(Recorder::default());
    let mut host = host(&recorder);

    assert_eq!(assert_ok!(host.handle(&HostRequest::start("a"))), Disposition::Processed);
    assert_eq!(assert_ok!(host.handle(&HostRequest::start("a"))), Disposition::Duplicate);
    assert_eq!(assert_ok!(host.handle(&HostRequest::stop("b"))), Disposition::Processed);
    assert_eq!(*host.state(), LifecycleState::Stopped);
}

#[test]
fn test_teardown_from_any_state() {
    let recorder = Arc::new(Recorder::default());
    let expected = vec![
        Note::Foreground("local".into(), ForegroundState::Cleared),
        Note::CancelError("local".into()),
    ];

    // Idle
    drop(host(&recorder));
    assert_eq!(recorder.take(), expected);

    // Foreground
    let mut h = host(&recorder);
    h.start().unwrap();
    recorder.take();
    h.teardown();
    h.teardown();
    drop(h);
    assert_eq!(recorder.take(), expected);

    // Stopped after an error
    let mut h = host(&recorder);
    h.start().unwrap();
    h.fail("capture lost").unwrap();
    recorder.take();
    drop(h);
    assert_eq!(recorder.take(), expected);
}

#[test]
fn test_error_notification_replaces_previous() {
    let recorder = Arc::new(Recorder::default());
    let mut host = host(&recorder);

    host.show_error_notification("first");
    host.show_error_notification("second");
    assert_eq!(
        recorder.take(),
        vec![
            Note::CancelError("local".into()),
            Note::Error("local".into(), "first".into()),
            Note::CancelError("local".into()),
            Note::Error("local".into(), "second".into()),
        ]
    );
    assert!(host.error_visible());
}

#[tokio::test]
async fn test_backend_failure_parks_host_with_error() {
    let recorder = Arc::new(Recorder::default());
    let module = HostedModule::new(
        ModuleDescriptor::new("local", []),
        Device::granted(),
        recorder.clone(),
        Arc::new(BrokenBackend),
    );

    module.start().await.unwrap();
    settle().await;
    assert!(!module.is_running());
    assert_eq!(module.host_state(), Some(LifecycleState::Stopped));
    assert!(recorder
        .take()
        .iter()
        .any(|n| matches!(n, Note::Error(_, msg) if msg.contains("encoder lost"))));

    // The next start replaces the parked host, which tears itself down.
    module.start().await.unwrap();
    settle().await;
    assert!(recorder.take().contains(&Note::CancelError("local".into())));
}

// ── Remote control relay ─────────────────────────────────────────

#[tokio::test]
async fn test_gestures_dispatched_in_order() {
    let bus = CommandChannel::new();
    let dispatcher = Arc::new(TimedDispatcher::default());
    let handle = RemoteControlRelay::new(RelayConfig::default(), Device::granted(), dispatcher.clone())
        .attach(&bus);

    bus.publish(BusEvent::Gesture(GestureCommand::swipe(
        "A",
        (10.0, 10.0),
        (200.0, 400.0),
        60,
    )));
    bus.publish(BusEvent::Gesture(GestureCommand::click("B", 50.0, 50.0)));

    tokio::time::timeout(Duration::from_secs(2), async {
        while handle.counts().completed < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timeout");

    assert_eq!(
        *dispatcher.log.lock().unwrap(),
        vec!["dispatch A", "complete A", "dispatch B", "complete B"]
    );
    handle.shutdown().await;
}

#[tokio::test]
async fn test_swipe_duration_validation() {
    let bus = CommandChannel::new();
    let dispatcher = Arc::new(TimedDispatcher::default());
    let handle = RemoteControlRelay::new(RelayConfig::default(), Device::granted(), dispatcher.clone())
        .attach(&bus);

    let err = assert_err!(
        handle
            .submit(GestureCommand::swipe("zero", (0.0, 0.0), (5.0, 5.0), 0))
            .await
    );
    assert!(err.is_validation());

    assert_ok!(
        handle
            .submit(GestureCommand::swipe("quarter", (0.0, 0.0), (5.0, 5.0), 250))
            .await
    );

    tokio::time::timeout(Duration::from_secs(2), async {
        while handle.counts().completed < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timeout");

    let gestures = dispatcher.gestures.lock().unwrap().clone();
    assert_eq!(gestures.len(), 1);
    assert_eq!(gestures[0].command_id, "quarter");
    assert_eq!(gestures[0].total_duration(), Duration::from_millis(250));
    assert_eq!(handle.counts().rejected, 1);
    handle.shutdown().await;
}

#[tokio::test]
async fn test_next_gesture_waits_for_cancellation() {
    let bus = CommandChannel::new();
    let dispatcher = Arc::new(InterruptingDispatcher::default());
    let handle = RemoteControlRelay::new(RelayConfig::default(), Device::granted(), dispatcher.clone())
        .attach(&bus);

    bus.publish(BusEvent::Gesture(GestureCommand::swipe(
        "A",
        (10.0, 10.0),
        (200.0, 400.0),
        500,
    )));
    bus.publish(BusEvent::Gesture(GestureCommand::click("B", 50.0, 50.0)));

    tokio::time::timeout(Duration::from_secs(2), async {
        while handle.counts().cancelled < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timeout");

    assert_eq!(
        *dispatcher.log.lock().unwrap(),
        vec!["dispatch A", "cancel A", "dispatch B", "cancel B"]
    );
    assert_eq!(handle.counts().completed, 0);
    handle.shutdown().await;
}

#[tokio::test]
async fn test_unavailable_capability_never_reaches_dispatcher() {
    let bus = CommandChannel::new();
    let dispatcher = Arc::new(TimedDispatcher::default());
    let handle = RemoteControlRelay::new(
        RelayConfig::default(),
        Device::without_input_surface(),
        dispatcher.clone(),
    )
    .attach(&bus);

    bus.publish(BusEvent::Gesture(GestureCommand::click("c1", 5.0, 5.0)));
    bus.publish(BusEvent::Gesture(GestureCommand::swipe(
        "s1",
        (0.0, 0.0),
        (5.0, 5.0),
        250,
    )));

    tokio::time::timeout(Duration::from_secs(2), async {
        while handle.counts().rejected < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timeout");
    settle().await;

    assert!(dispatcher.log.lock().unwrap().is_empty());
    assert!(dispatcher.gestures.lock().unwrap().is_empty());
    assert_eq!(handle.counts().accepted, 0);

    let err = assert_err!(handle.submit(GestureCommand::click("c2", 1.0, 1.0)).await);
    assert!(matches!(err, CastError::CapabilityUnavailable(_)));
    handle.shutdown().await;
}
