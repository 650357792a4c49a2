//! Input State Cache - last-known button and axis values for one session

use std::collections::{BTreeSet, HashMap};

use crate::controller::device_session::RawControllerEvent;

/// Physical button number as reported by the backend
pub type ButtonIndex = u16;

/// Analog axis number as reported by the backend
pub type AxisIndex = u16;

/// Button and axis state, updated once per poll cycle
///
/// Indices that were never observed read as released / `0.0`.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    buttons: HashMap<ButtonIndex, bool>,
    axes: HashMap<AxisIndex, f32>,
    trigger_axes: BTreeSet<AxisIndex>,
}

impl InputState {
    pub fn new(trigger_axes: impl IntoIterator<Item = AxisIndex>) -> Self {
        Self {
            buttons: HashMap::new(),
            axes: HashMap::new(),
            trigger_axes: trigger_axes.into_iter().collect(),
        }
    }

    pub fn apply(&mut self, event: &RawControllerEvent) {
        match event {
            RawControllerEvent::ButtonDown { button } => {
                self.buttons.insert(*button, true);
            }
            RawControllerEvent::ButtonUp { button } => {
                self.buttons.insert(*button, false);
            }
            RawControllerEvent::AxisMotion { axis, value } => {
                self.axes.insert(*axis, *value);
            }
            RawControllerEvent::Disconnected => {}
        }
    }

    pub fn button_pressed(&self, id: ButtonIndex) -> bool {
        self.buttons.get(&id).copied().unwrap_or(false)
    }

    pub fn axis_raw(&self, id: AxisIndex) -> f32 {
        self.axes.get(&id).copied().unwrap_or(0.0)
    }

    /// Trigger travel as a percentage
    ///
    /// Raw trigger values span `[-1, 1]` (released to fully pulled). Non-trigger axes
    /// always read `0`.
    pub fn trigger_percent(&self, id: AxisIndex) -> u8 {
        if !self.trigger_axes.contains(&id) {
            return 0;
        }
        let percent = ((self.axis_raw(id) + 1.0) / 2.0 * 100.0).round();
        percent.clamp(0.0, 100.0) as u8
    }

    pub fn is_trigger(&self, id: AxisIndex) -> bool {
        self.trigger_axes.contains(&id)
    }

    pub fn trigger_axes(&self) -> impl Iterator<Item = AxisIndex> + '_ {
        self.trigger_axes.iter().copied()
    }

    /// Currently pressed buttons in ascending order
    pub fn pressed_buttons(&self) -> Vec<ButtonIndex> {
        let mut pressed: Vec<ButtonIndex> = self
            .buttons
            .iter()
            .filter(|(_, pressed)| **pressed)
            .map(|(button, _)| *button)
            .collect();
        pressed.sort_unstable();
        pressed
    }

    /// Forget everything observed; trigger designation is kept
    pub fn reset(&mut self) {
        self.buttons.clear();
        self.axes.clear();
    }
}
