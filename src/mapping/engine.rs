//! Mapping engine: activation combo, control buttons and the mode gate
//!
//! ```text
//! InputState ──► activation detector ──┐
//!      │                               ├──► TransitionEvents ──► ActionDispatcher
//!      └──────► control detector ──────┘
//!               (gated by overlay visibility in toggle mode)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use tracing::{debug, info};

use crate::controller::input_state::{ButtonIndex, InputState};
use crate::mapping::combo::{ButtonGroup, ComboDetector, GroupName, TransitionEvent};
use crate::mapping::dispatcher::{ActionDispatcher, DispatchReport};
use crate::mapping::MappingError;

/// Group name of the activation combo
pub const ACTIVATION_GROUP: &str = "activate";

/// How control buttons are gated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingMode {
    /// Controls only fire while the overlay is visible
    #[default]
    Toggle,
    /// Controls fire every cycle regardless of the overlay
    Direct,
}

impl Display for MappingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingMode::Toggle => write!(f, "toggle"),
            MappingMode::Direct => write!(f, "direct"),
        }
    }
}

pub struct MappingEngine {
    mode: MappingMode,
    activation: ComboDetector,
    controls: ComboDetector,
    dispatcher: ActionDispatcher,
    overlay_visible: bool,
    tick: u64,
}

impl MappingEngine {
    /// Build the engine from an activation combo and single-button controls
    pub fn new(
        mode: MappingMode,
        activation: ButtonGroup,
        controls: &[(GroupName, ButtonIndex)],
        dispatcher: ActionDispatcher,
    ) -> Result<Self, MappingError> {
        let activation = ComboDetector::new(vec![(ACTIVATION_GROUP.to_string(), activation)])?;

        if let Some((name, _)) = controls.iter().find(|(name, _)| name == ACTIVATION_GROUP) {
            return Err(MappingError::InvalidGroup {
                name: name.clone(),
                reason: "name is reserved for the activation combo".to_string(),
            });
        }
        let controls = ComboDetector::new(
            controls
                .iter()
                .map(|(name, button)| (name.clone(), ButtonGroup::single(*button)))
                .collect(),
        )?;

        info!(
            "Mapping engine ready: mode={}, {} controls",
            mode,
            controls.len()
        );

        Ok(Self {
            mode,
            activation,
            controls,
            dispatcher,
            overlay_visible: false,
            tick: 0,
        })
    }

    /// Run one cycle: detect edges, apply the mode gate, dispatch
    pub fn step(&mut self, input: &InputState) -> Vec<TransitionEvent> {
        self.tick += 1;
        let tick = self.tick;

        let mut transitions: Vec<TransitionEvent> = self
            .activation
            .evaluate(input)
            .into_iter()
            .map(|name| TransitionEvent::new(name, tick))
            .collect();

        if !transitions.is_empty() {
            self.overlay_visible = !self.overlay_visible;
            info!(
                "Overlay {}",
                if self.overlay_visible { "shown" } else { "hidden" }
            );
            if self.mode == MappingMode::Toggle {
                // Buttons held through the toggle must not fire on the next cycle
                self.controls.rearm(input);
            }
        }

        if self.mode == MappingMode::Direct || self.overlay_visible {
            transitions.extend(
                self.controls
                    .evaluate(input)
                    .into_iter()
                    .map(|name| TransitionEvent::new(name, tick)),
            );
        }

        if !transitions.is_empty() {
            let report: DispatchReport = self.dispatcher.dispatch(&transitions);
            debug!("Cycle {} dispatch: {:?}", tick, report);
        }

        transitions
    }

    pub fn mode(&self) -> MappingMode {
        self.mode
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn controls(&self) -> &ComboDetector {
        &self.controls
    }

    pub fn activation(&self) -> &ComboDetector {
        &self.activation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::device_session::RawControllerEvent;
    use std::sync::{Arc, Mutex};

    fn press(input: &mut InputState, buttons: &[ButtonIndex]) {
        for &button in buttons {
            input.apply(&RawControllerEvent::ButtonDown { button });
        }
    }

    fn release(input: &mut InputState, buttons: &[ButtonIndex]) {
        for &button in buttons {
            input.apply(&RawControllerEvent::ButtonUp { button });
        }
    }

    fn names(events: &[TransitionEvent]) -> Vec<&str> {
        events.iter().map(|e| e.group.as_str()).collect()
    }

    fn engine(mode: MappingMode) -> MappingEngine {
        MappingEngine::new(
            mode,
            ButtonGroup::new([2, 0, 8]),
            &[
                ("skip".to_string(), 1),
                ("prev".to_string(), 2),
                ("play_pause".to_string(), 0),
            ],
            ActionDispatcher::new(),
        )
        .unwrap()
    }

    #[test]
    fn empty_activation_is_rejected() {
        let result = MappingEngine::new(
            MappingMode::Toggle,
            ButtonGroup::default(),
            &[],
            ActionDispatcher::new(),
        );
        assert!(matches!(result, Err(MappingError::InvalidGroup { .. })));
    }

    #[test]
    fn reserved_control_name_is_rejected() {
        let result = MappingEngine::new(
            MappingMode::Toggle,
            ButtonGroup::new([1, 2]),
            &[(ACTIVATION_GROUP.to_string(), 3)],
            ActionDispatcher::new(),
        );
        assert!(matches!(result, Err(MappingError::InvalidGroup { .. })));
    }

    #[test]
    fn controls_are_gated_while_hidden() {
        let mut engine = engine(MappingMode::Toggle);
        let mut input = InputState::default();

        press(&mut input, &[1]);
        assert!(engine.step(&input).is_empty());
        assert!(!engine.overlay_visible());
    }

    #[test]
    fn toggle_rearms_controls_held_during_activation() {
        let mut engine = engine(MappingMode::Toggle);
        let mut input = InputState::default();

        press(&mut input, &[2, 0, 8]);
        assert_eq!(names(&engine.step(&input)), vec![ACTIVATION_GROUP]);
        assert!(engine.overlay_visible());

        // X and A are also prev / play_pause; holding them must not fire
        assert!(engine.step(&input).is_empty());
        assert!(engine.step(&input).is_empty());

        release(&mut input, &[2, 0, 8]);
        assert!(engine.step(&input).is_empty());

        press(&mut input, &[2]);
        assert_eq!(names(&engine.step(&input)), vec!["prev"]);
    }

    #[test]
    fn direct_mode_fires_controls_regardless_of_overlay() {
        let mut engine = engine(MappingMode::Direct);
        let mut input = InputState::default();

        press(&mut input, &[1]);
        assert_eq!(names(&engine.step(&input)), vec!["skip"]);
        assert!(!engine.overlay_visible());

        press(&mut input, &[2, 0]);
        assert_eq!(names(&engine.step(&input)), vec!["prev", "play_pause"]);

        press(&mut input, &[8]);
        assert_eq!(names(&engine.step(&input)), vec![ACTIVATION_GROUP]);
        assert!(engine.overlay_visible());
    }

    #[test]
    fn step_dispatches_to_registered_actions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = ActionDispatcher::new();
        let sink = seen.clone();
        dispatcher.register(ACTIVATION_GROUP, move |event: &TransitionEvent| {
            sink.lock().unwrap().push(event.tick);
            Ok(())
        });

        let mut engine = MappingEngine::new(
            MappingMode::Toggle,
            ButtonGroup::new([4, 5]),
            &[],
            dispatcher,
        )
        .unwrap();
        let mut input = InputState::default();

        engine.step(&input);
        press(&mut input, &[4, 5]);
        engine.step(&input);
        engine.step(&input);

        assert_eq!(*seen.lock().unwrap(), vec![2]);
        assert_eq!(engine.tick(), 3);
    }
}
