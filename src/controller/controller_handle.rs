//! Controller Handle - polling loop and its worker thread
//!
//! One dedicated OS thread owns the device session, the input state and the mapping
//! engine. Each cycle it polls the device, runs the engine and sleeps for the poll
//! interval. Nothing else touches that state; consumers only see:
//!
//! ```text
//! worker ─[ActionEvent]──────► mpsc::Receiver   (one message per dispatched action)
//!        ─[InputSnapshot]────► watch::Receiver  (latest state after every cycle)
//! ```
//!
//! The loop checks a [`CancellationToken`] once per cycle and always closes the session
//! on its way out.

use chrono::{DateTime, Local};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::controller::device_session::{
    Active, DeviceInfo, DeviceSession, InputBackend, SessionError, SessionGuard,
};
use crate::controller::input_state::{AxisIndex, ButtonIndex, InputState};
use crate::mapping::{
    ActionDispatcher, ActionError, GroupName, MappingEngine, MappingError, TransitionEvent,
};
use crate::persistence::ControllerConfig;

/// Why the polling loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The stop signal was observed
    Stopped,
    /// The device went away
    Disconnected,
}

/// A dispatched action, as delivered to the consumer
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEvent {
    pub name: GroupName,
    pub tick: u64,
    pub timestamp: DateTime<Local>,
}

impl From<&TransitionEvent> for ActionEvent {
    fn from(event: &TransitionEvent) -> Self {
        Self {
            name: event.group.clone(),
            tick: event.tick,
            timestamp: event.timestamp,
        }
    }
}

/// State published after every cycle
///
/// Read-only view for displays; the worker thread keeps the authoritative copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    /// Poll cycle this snapshot was taken after (0 before the first cycle)
    pub tick: u64,

    /// Pressed buttons in ascending order
    pub pressed: Vec<ButtonIndex>,

    /// Every configured trigger axis with its travel in percent
    ///
    /// A trigger the backend has not reported yet reads 50%.
    pub triggers: Vec<(AxisIndex, u8)>,

    /// Whether the activation combo currently has the overlay shown
    pub overlay_visible: bool,
}

impl InputSnapshot {
    pub fn capture(input: &InputState, engine: &MappingEngine) -> Self {
        Self {
            tick: engine.tick(),
            pressed: input.pressed_buttons(),
            triggers: input
                .trigger_axes()
                .map(|axis| (axis, input.trigger_percent(axis)))
                .collect(),
            overlay_visible: engine.overlay_visible(),
        }
    }
}

/// Errors from starting or joining the polling worker
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The device session could not be opened
    ///
    /// `NoDevice` when no gamepad is plugged in, `Backend` when the platform input
    /// layer failed. Retrying later is fine.
    #[error("Session error: {0}")]
    SessionError(#[from] SessionError),

    /// The combo configuration was rejected
    ///
    /// Raised before the worker starts; retrying is pointless until the configuration
    /// is fixed.
    #[error("Mapping error: {0}")]
    MappingError(#[from] MappingError),

    /// The worker went away before reporting back, or its join task failed
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The OS refused to start the worker thread
    #[error("Initialization error: {0}")]
    InitializationError(String),

    /// The polling thread panicked; the session guard has already released the device
    #[error("Polling worker panicked")]
    WorkerPanicked,
}

/// Run the polling loop until the stop signal or a disconnect
///
/// The session is closed exactly once before this returns, and also if the engine
/// panics mid-cycle.
pub fn run_polling_loop(
    session: DeviceSession<Active>,
    engine: &mut MappingEngine,
    interval: Duration,
    cancel: &CancellationToken,
    snapshots: Option<&watch::Sender<InputSnapshot>>,
) -> LoopExit {
    info!(
        "Starting polling loop with {}ms interval",
        interval.as_millis()
    );
    let mut guard = SessionGuard::new(session);

    // Stats for performance monitoring
    let mut cycles: u64 = 0;
    let mut transitions: u64 = 0;
    let mut last_stats_time = Local::now();
    let stats_interval = chrono::Duration::seconds(30);

    let exit = loop {
        if cancel.is_cancelled() {
            info!("Stop signal received");
            break LoopExit::Stopped;
        }

        let Some(session) = guard.active() else {
            break LoopExit::Disconnected;
        };
        if !session.poll() {
            warn!("Device disconnected, leaving polling loop");
            break LoopExit::Disconnected;
        }

        let fired = engine.step(session.input());
        transitions += fired.len() as u64;
        cycles += 1;

        if let Some(sender) = snapshots {
            // No receivers is fine; the snapshot is informational
            let _ = sender.send(InputSnapshot::capture(session.input(), engine));
        }

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            info!(
                "Polling stats: {} cycles, {} transitions in {} seconds",
                cycles,
                transitions,
                (now - last_stats_time).num_seconds()
            );
            cycles = 0;
            transitions = 0;
            last_stats_time = now;
        }

        std::thread::sleep(interval);
    };

    guard.close();
    info!("Polling loop finished: {:?}", exit);
    exit
}

/// Dispatcher that forwards every registered group to `sender`
///
/// Sending never blocks the polling thread; a full or closed channel is an
/// [`ActionError`].
pub fn channel_dispatcher<'a>(
    names: impl IntoIterator<Item = &'a str>,
    sender: mpsc::Sender<ActionEvent>,
) -> ActionDispatcher {
    let mut dispatcher = ActionDispatcher::new();
    for name in names {
        let sender = sender.clone();
        dispatcher.register(name, move |event: &TransitionEvent| {
            sender
                .try_send(ActionEvent::from(event))
                .map_err(|e| ActionError::new(event.group.clone(), e.to_string()))
        });
    }
    dispatcher
}

/// Handle for the polling worker
pub struct ControllerHandle {
    cancel: CancellationToken,
    worker: JoinHandle<LoopExit>,
    device: DeviceInfo,
    snapshot_receiver: watch::Receiver<InputSnapshot>,
}

impl ControllerHandle {
    /// Open a device on a new worker thread and start polling
    ///
    /// `make_backend` runs on the worker thread, so the backend never has to be `Send`.
    /// Returns once the device is bound, or with the error that prevented it.
    pub async fn spawn<F>(
        config: &ControllerConfig,
        make_backend: F,
        action_sender: mpsc::Sender<ActionEvent>,
    ) -> Result<Self, ControllerError>
    where
        F: FnOnce() -> Result<Box<dyn InputBackend>, SessionError> + Send + 'static,
    {
        info!(
            "Initializing controller: mode={}, activation={}",
            config.mode,
            config.describe_activation()
        );

        let mut names = vec![crate::mapping::ACTIVATION_GROUP];
        names.extend(config.controls.iter().map(|(name, _)| name.as_str()));
        let dispatcher = channel_dispatcher(names, action_sender);

        let mut engine = MappingEngine::new(
            config.mode,
            config.activation.clone(),
            &config.controls,
            dispatcher,
        )?;

        let cancel = CancellationToken::new();
        let (snapshot_sender, snapshot_receiver) = watch::channel(InputSnapshot::default());
        let (ready_sender, ready_receiver) = oneshot::channel::<Result<DeviceInfo, SessionError>>();

        let trigger_axes = config.trigger_axes.clone();
        let interval = config.poll_interval;
        let worker_cancel = cancel.clone();

        let worker = std::thread::Builder::new()
            .name("controller-poll".to_string())
            .spawn(move || {
                let opened = make_backend()
                    .and_then(|backend| DeviceSession::create(backend, &trigger_axes).open());

                let session = match opened {
                    Ok(session) => session,
                    Err(e) => {
                        error!("Failed to open device session: {}", e);
                        let _ = ready_sender.send(Err(e));
                        return LoopExit::Stopped;
                    }
                };

                let device = session.device().cloned().unwrap_or(DeviceInfo {
                    id: 0,
                    name: "unknown".to_string(),
                });
                if ready_sender.send(Ok(device)).is_err() {
                    warn!("Spawner went away before the session was ready");
                    session.close();
                    return LoopExit::Stopped;
                }

                run_polling_loop(
                    session,
                    &mut engine,
                    interval,
                    &worker_cancel,
                    Some(&snapshot_sender),
                )
            })
            .map_err(|e| ControllerError::InitializationError(e.to_string()))?;

        let device = ready_receiver
            .await
            .map_err(|e| ControllerError::ChannelError(e.to_string()))??;

        info!("Controller polling {} ({})", device.name, device.id);
        Ok(Self {
            cancel,
            worker,
            device,
            snapshot_receiver,
        })
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Token that stops the loop when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<InputSnapshot> {
        debug!("New subscriber to input snapshots");
        self.snapshot_receiver.clone()
    }

    /// Wait for the worker to finish on its own (disconnect or external cancel)
    pub async fn join(self) -> Result<LoopExit, ControllerError> {
        let worker = self.worker;
        tokio::task::spawn_blocking(move || worker.join())
            .await
            .map_err(|e| ControllerError::ChannelError(e.to_string()))?
            .map_err(|_| ControllerError::WorkerPanicked)
    }

    /// Cancel the loop and wait for it to release the device
    pub async fn stop(self) -> Result<LoopExit, ControllerError> {
        info!("Stopping controller");
        self.cancel.cancel();
        self.join().await
    }
}
