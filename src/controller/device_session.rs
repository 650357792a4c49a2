//! Device Session - lifetime of the binding to one input device
//!
//! The session owns an [`InputBackend`] and the [`InputState`] it feeds. Its lifecycle
//! is encoded with a statum state machine so that polling is only possible on a bound
//! device:
//!
//! ```text
//! Uninitialized ──open()──► Active ──close()──► Closed
//! ```
//!
//! There is no way back from `Closed`; reconnecting means building a new session.

use statum::{machine, state};
use tracing::{debug, error, info, warn};

use crate::controller::input_state::{AxisIndex, ButtonIndex, InputState};

/// Raw per-frame event reported by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum RawControllerEvent {
    ButtonDown { button: ButtonIndex },
    ButtonUp { button: ButtonIndex },
    AxisMotion { axis: AxisIndex, value: f32 },
    /// The bound device went away or the platform asked us to quit
    Disconnected,
}

/// A device the backend can bind to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: usize,
    pub name: String,
}

// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No gamepad connected")]
    NoDevice,

    #[error("Input backend error: {0}")]
    Backend(String),
}

/// Platform input capability the session depends on
///
/// Implemented by [`GilrsBackend`](crate::controller::gilrs_backend::GilrsBackend) for
/// real hardware and by scripted fakes in tests.
pub trait InputBackend {
    /// Devices currently present, in the order the platform reports them
    fn connected_devices(&mut self) -> Vec<DeviceInfo>;

    /// Bind to one device; events from any other device must be dropped afterwards
    fn bind(&mut self, device: &DeviceInfo) -> Result<(), SessionError>;

    /// Drain everything buffered since the previous call
    fn drain_events(&mut self) -> Vec<RawControllerEvent>;

    /// Release the binding
    fn release(&mut self);
}

#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Uninitialized,
    Active,
    Closed,
}

#[machine]
pub struct DeviceSession<S: SessionState> {
    backend: Box<dyn InputBackend>,

    // Bound device, set by open()
    device: Option<DeviceInfo>,

    // Last-known button and axis state
    input: InputState,

    // Cleared once poll() sees a disconnect
    connected: bool,
}

// Implementation of methods available in all states
impl<S: SessionState> DeviceSession<S> {
    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }
}

impl DeviceSession<Uninitialized> {
    pub fn create(backend: Box<dyn InputBackend>, trigger_axes: &[AxisIndex]) -> Self {
        debug!(
            "Creating device session with trigger axes {:?}",
            trigger_axes
        );
        Self::new(
            backend,
            None,
            InputState::new(trigger_axes.iter().copied()),
            false,
        )
    }

    /// Bind to the first available device and transition to `Active`
    pub fn open(mut self) -> Result<DeviceSession<Active>, SessionError> {
        let devices = self.backend.connected_devices();

        if devices.is_empty() {
            warn!("No gamepad connected");
            return Err(SessionError::NoDevice);
        }

        info!("Found {} gamepads:", devices.len());
        for (idx, device) in devices.iter().enumerate() {
            info!("  [{}] ID: {}, Name: {}", idx, device.id, device.name);
        }

        let device = devices[0].clone();
        if let Err(e) = self.backend.bind(&device) {
            error!("Failed to bind gamepad {}: {}", device.name, e);
            return Err(e);
        }
        info!("Selected gamepad: {} ({})", device.name, device.id);

        self.device = Some(device);
        self.connected = true;
        Ok(self.transition())
    }
}

impl DeviceSession<Active> {
    /// Apply every buffered event to the input state
    ///
    /// Returns `false` once the device disconnected. After that the session is spent:
    /// later calls return `false` without touching the backend, and the caller is
    /// expected to `close()` it.
    pub fn poll(&mut self) -> bool {
        if !self.connected {
            return false;
        }

        let events = self.backend.drain_events();
        if !events.is_empty() {
            debug!("Applying batch of {} raw events", events.len());
        }

        for event in &events {
            if *event == RawControllerEvent::Disconnected {
                warn!("Controller disconnected event detected");
                self.connected = false;
                return false;
            }
            self.input.apply(event);
        }

        true
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Release the device and reset the input state
    pub fn close(mut self) -> DeviceSession<Closed> {
        match &self.device {
            Some(device) => info!("Releasing gamepad {} ({})", device.name, device.id),
            None => info!("Releasing input backend"),
        }
        self.backend.release();
        self.input.reset();
        self.connected = false;
        self.transition()
    }
}

impl DeviceSession<Closed> {
    /// Closing a closed session does nothing
    pub fn close(self) -> Self {
        debug!("Session already closed");
        self
    }
}

/// Releases the wrapped session on every exit path, unwinding included
pub struct SessionGuard {
    session: Option<DeviceSession<Active>>,
}

impl SessionGuard {
    pub fn new(session: DeviceSession<Active>) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn active(&mut self) -> Option<&mut DeviceSession<Active>> {
        self.session.as_mut()
    }

    pub fn close(mut self) -> Option<DeviceSession<Closed>> {
        self.session.take().map(|session| session.close())
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            warn!("Session guard dropped with a live session, closing it");
            session.close();
        }
    }
}
