//! Controller subsystem for gamepad input handling
//!
//! 1. [`device_session`] - binding to one gamepad and its raw event stream
//! 2. [`input_state`] - last-known button and axis values
//! 3. [`controller_handle`] - the polling loop and its worker thread
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► DeviceSession ──► InputState ──► MappingEngine ──► ActionEvent
//!             (poll)            (cache)        (combos)          (channel)
//! ```
//!
//! [`gilrs_backend`] provides the hardware side; [`probe`] is the button test mode.

pub mod controller_handle;
pub mod device_session;
pub mod gilrs_backend;
pub mod input_state;
pub mod probe;

pub use controller_handle::{
    run_polling_loop, ActionEvent, ControllerError, ControllerHandle, InputSnapshot, LoopExit,
};
pub use device_session::{DeviceInfo, DeviceSession, InputBackend, RawControllerEvent, SessionError};
pub use input_state::{AxisIndex, ButtonIndex, InputState};
