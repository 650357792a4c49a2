//! Edge-triggered combo detection
//!
//! A [`ComboDetector`] evaluates named [`ButtonGroup`]s against an [`InputState`] once
//! per cycle and reports each group exactly once per rising edge of "all members
//! pressed". Holding a combo never re-fires it; releasing any member and pressing it
//! again does.

use std::collections::BTreeSet;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::controller::input_state::{ButtonIndex, InputState};
use crate::mapping::MappingError;

pub type GroupName = String;

/// Set of buttons that must be held together
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ButtonGroup {
    members: BTreeSet<ButtonIndex>,
}

impl ButtonGroup {
    pub fn new(members: impl IntoIterator<Item = ButtonIndex>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    pub fn single(button: ButtonIndex) -> Self {
        Self::new([button])
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, button: ButtonIndex) -> bool {
        self.members.contains(&button)
    }

    pub fn members(&self) -> impl Iterator<Item = ButtonIndex> + '_ {
        self.members.iter().copied()
    }

    /// An empty group is never pressed
    pub fn all_pressed(&self, input: &InputState) -> bool {
        !self.members.is_empty() && self.members.iter().all(|b| input.button_pressed(*b))
    }
}

/// Rising edge of one group
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub group: GroupName,
    /// Poll cycle the edge was observed in
    pub tick: u64,
    pub timestamp: DateTime<Local>,
}

impl TransitionEvent {
    pub fn new(group: impl Into<GroupName>, tick: u64) -> Self {
        Self {
            group: group.into(),
            tick,
            timestamp: Local::now(),
        }
    }
}

#[derive(Debug, Clone)]
struct GroupSlot {
    name: GroupName,
    group: ButtonGroup,
    // All members pressed on the previous cycle
    was_pressed: bool,
}

#[derive(Debug, Clone)]
pub struct ComboDetector {
    slots: Vec<GroupSlot>,
}

impl ComboDetector {
    /// Build a detector; evaluation follows the order of `groups`
    ///
    /// Fails with [`MappingError::InvalidGroup`] for an empty group or a repeated name.
    pub fn new(groups: Vec<(GroupName, ButtonGroup)>) -> Result<Self, MappingError> {
        let mut slots: Vec<GroupSlot> = Vec::with_capacity(groups.len());

        for (name, group) in groups {
            if group.is_empty() {
                return Err(MappingError::InvalidGroup {
                    name,
                    reason: "group has no buttons".to_string(),
                });
            }
            if slots.iter().any(|slot| slot.name == name) {
                return Err(MappingError::InvalidGroup {
                    name,
                    reason: "group name is defined twice".to_string(),
                });
            }
            debug!("Registered group {} = {:?}", name, group.members);
            slots.push(GroupSlot {
                name,
                group,
                was_pressed: false,
            });
        }

        Ok(Self { slots })
    }

    /// Names of the groups that went from not-all-pressed to all-pressed this cycle
    pub fn evaluate(&mut self, input: &InputState) -> Vec<GroupName> {
        let pressed_now: Vec<bool> = self
            .slots
            .iter()
            .map(|slot| slot.group.all_pressed(input))
            .collect();

        let mut fired = Vec::new();
        for (slot, now) in self.slots.iter_mut().zip(pressed_now) {
            if now && !slot.was_pressed {
                info!("Combo {} activated", slot.name);
                fired.push(slot.name.clone());
            }
            slot.was_pressed = now;
        }
        fired
    }

    /// Re-arm every group against the current input
    ///
    /// Groups that are fully held right now are marked as already pressed, so they
    /// only fire again after a release and a fresh press. Everything else is cleared.
    /// Clearing a held group instead would read as a rising edge on the next cycle,
    /// since its members are still down.
    pub fn rearm(&mut self, input: &InputState) {
        for slot in &mut self.slots {
            slot.was_pressed = slot.group.all_pressed(input);
            if slot.was_pressed {
                debug!("Group {} held while re-arming, waiting for release", slot.name);
            }
        }
    }

    /// Clear every edge state
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.was_pressed = false;
        }
    }

    /// Previous-cycle "all pressed" value of a group
    pub fn edge_state(&self, name: &str) -> Option<bool> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| slot.was_pressed)
    }

    pub fn group(&self, name: &str) -> Option<&ButtonGroup> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| &slot.group)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::device_session::RawControllerEvent;

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

    fn detector(groups: &[(&str, &[ButtonIndex])]) -> ComboDetector {
        ComboDetector::new(
            groups
                .iter()
                .map(|(name, members)| (name.to_string(), ButtonGroup::new(members.iter().copied())))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn empty_group_is_rejected() {
        let result = ComboDetector::new(vec![("nothing".to_string(), ButtonGroup::default())]);
        assert!(matches!(
            result,
            Err(MappingError::InvalidGroup { ref name, .. }) if name == "nothing"
        ));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let result = ComboDetector::new(vec![
            ("skip".to_string(), ButtonGroup::single(1)),
            ("skip".to_string(), ButtonGroup::single(2)),
        ]);
        assert!(matches!(result, Err(MappingError::InvalidGroup { .. })));
    }

    #[test]
    fn held_combo_fires_once() {
        let mut combos = detector(&[("activate", &[2, 0, 8])]);
        let mut input = InputState::default();

        press(&mut input, &[2, 0]);
        assert!(combos.evaluate(&input).is_empty());

        press(&mut input, &[8]);
        assert_eq!(combos.evaluate(&input), vec!["activate".to_string()]);

        for _ in 0..10 {
            assert!(combos.evaluate(&input).is_empty());
        }
        assert_eq!(combos.edge_state("activate"), Some(true));
    }

    #[test]
    fn release_and_repress_fires_again() {
        let mut combos = detector(&[("activate", &[2, 0, 8])]);
        let mut input = InputState::default();

        press(&mut input, &[2, 0, 8]);
        assert_eq!(combos.evaluate(&input).len(), 1);

        release(&mut input, &[0]);
        assert!(combos.evaluate(&input).is_empty());
        assert_eq!(combos.edge_state("activate"), Some(false));

        press(&mut input, &[0]);
        assert_eq!(combos.evaluate(&input), vec!["activate".to_string()]);
    }

    #[test]
    fn press_and_release_within_one_batch_is_not_seen() {
        let mut combos = detector(&[("skip", &[1])]);
        let mut input = InputState::default();

        press(&mut input, &[1]);
        release(&mut input, &[1]);
        assert!(combos.evaluate(&input).is_empty());
    }

    #[test]
    fn overlapping_groups_are_independent() {
        let mut combos = detector(&[("a", &[0, 1]), ("b", &[1, 2])]);
        let mut input = InputState::default();

        press(&mut input, &[0, 1]);
        assert_eq!(combos.evaluate(&input), vec!["a".to_string()]);
        assert_eq!(combos.edge_state("b"), Some(false));

        press(&mut input, &[2]);
        assert_eq!(combos.evaluate(&input), vec!["b".to_string()]);

        release(&mut input, &[0]);
        assert!(combos.evaluate(&input).is_empty());
        assert_eq!(combos.edge_state("a"), Some(false));
        assert_eq!(combos.edge_state("b"), Some(true));
    }

    #[test]
    fn simultaneous_edges_follow_declaration_order() {
        let mut combos = detector(&[("second", &[3]), ("first", &[3, 4])]);
        let mut input = InputState::default();

        press(&mut input, &[3, 4]);
        assert_eq!(
            combos.evaluate(&input),
            vec!["second".to_string(), "first".to_string()]
        );
    }

    #[test]
    fn rearm_suppresses_held_groups() {
        let mut combos = detector(&[("skip", &[1]), ("prev", &[2])]);
        let mut input = InputState::default();

        press(&mut input, &[1]);
        combos.rearm(&input);
        assert_eq!(combos.edge_state("skip"), Some(true));
        assert_eq!(combos.edge_state("prev"), Some(false));
        assert!(combos.evaluate(&input).is_empty());

        release(&mut input, &[1]);
        assert!(combos.evaluate(&input).is_empty());
        press(&mut input, &[1]);
        assert_eq!(combos.evaluate(&input), vec!["skip".to_string()]);
    }

    #[test]
    fn reset_clears_edge_state() {
        let mut combos = detector(&[("skip", &[1])]);
        let mut input = InputState::default();

        press(&mut input, &[1]);
        combos.evaluate(&input);
        combos.reset();
        assert_eq!(combos.edge_state("skip"), Some(false));
        assert_eq!(combos.evaluate(&input), vec!["skip".to_string()]);
    }
}
