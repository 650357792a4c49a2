//! # combowatch
//!
//! Gamepad combo listener: polls one gamepad, tracks button and trigger state, and
//! turns configured button combinations into named actions, each fired once per
//! press.
//!
//! - [`controller`] - device session, input state, polling worker
//! - [`mapping`] - combo detection, mode gate and action dispatch
//! - [`persistence`] - controller configuration file

pub mod controller;
pub mod mapping;
pub mod persistence;

pub use controller::{ControllerHandle, LoopExit};
pub use mapping::{MappingEngine, MappingMode};
pub use persistence::ControllerConfig;
