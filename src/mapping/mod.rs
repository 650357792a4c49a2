//! Turns controller state into named actions.
//!
//! - [`combo`] - edge-triggered detection of button groups
//! - [`dispatcher`] - registry of effects keyed by group name
//! - [`engine`] - activation combo, control buttons and the toggle/direct mode gate

pub mod combo;
pub mod dispatcher;
pub mod engine;
pub mod error;

// Re-exports for easier access
pub use combo::{ButtonGroup, ComboDetector, GroupName, TransitionEvent};
pub use dispatcher::{ActionCallback, ActionDispatcher, DispatchReport};
pub use engine::{MappingEngine, MappingMode, ACTIVATION_GROUP};
pub use error::{ActionError, MappingError};
