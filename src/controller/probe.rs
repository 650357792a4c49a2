//! Button test mode
//!
//! Reports every newly pressed button and every trigger movement so the numbers for
//! the configuration file can be read off a real gamepad.

use std::collections::HashMap;

use crate::controller::input_state::{AxisIndex, ButtonIndex, InputState};
use crate::mapping::{ButtonGroup, ComboDetector, MappingError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeReport {
    ButtonPressed(ButtonIndex),
    Trigger { axis: AxisIndex, percent: u8 },
}

pub struct Prober {
    buttons: ComboDetector,
    last_triggers: HashMap<AxisIndex, u8>,
}

impl Prober {
    /// Watch buttons `0..button_count`
    pub fn new(button_count: ButtonIndex) -> Result<Self, MappingError> {
        let buttons = ComboDetector::new(
            (0..button_count)
                .map(|button| (button.to_string(), ButtonGroup::single(button)))
                .collect(),
        )?;
        Ok(Self {
            buttons,
            last_triggers: HashMap::new(),
        })
    }

    /// Reports for this cycle: rising button edges, then changed non-zero triggers
    ///
    /// The first observation of a trigger only records its level. An untouched
    /// trigger reads 50% until the backend reports it, and that must stay quiet.
    pub fn observe(&mut self, input: &InputState) -> Vec<ProbeReport> {
        let mut reports: Vec<ProbeReport> = self
            .buttons
            .evaluate(input)
            .iter()
            .filter_map(|name| name.parse().ok())
            .map(ProbeReport::ButtonPressed)
            .collect();

        for axis in input.trigger_axes() {
            let percent = input.trigger_percent(axis);
            match self.last_triggers.insert(axis, percent) {
                Some(previous) if percent > 0 && percent != previous => {
                    reports.push(ProbeReport::Trigger { axis, percent });
                }
                _ => {}
            }
        }

        reports
    }
}
