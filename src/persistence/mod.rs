//! # Persistence Module
//!
//! Configuration for the controller: which buttons form the activation combo, which
//! single buttons drive which action, how the loop is timed.
//!
//! Two layers:
//! - [`RawControllerConfig`] mirrors the TOML file one to one and has a built-in
//!   default. It is what gets loaded, saved and defaulted.
//! - [`ControllerConfig`] is the validated form the rest of the crate consumes. It is
//!   produced once at startup with `TryFrom` and never guesses values.
//!
//! File handling lives in [`config_file`].

pub mod config_file;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::controller::input_state::{AxisIndex, ButtonIndex};
use crate::mapping::{ButtonGroup, GroupName, MappingError, MappingMode};

/// Activation combo as written in the file
///
/// `buttons` only names indices for log output; `combo` is what has to be held.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct RawActivation {
    pub combo: Vec<i64>,
    /// Optional; unnamed indices are logged as `#<index>`
    #[serde(default)]
    pub buttons: BTreeMap<String, i64>,
}

impl Default for RawActivation {
    fn default() -> Self {
        Self {
            combo: vec![2, 0, 8],
            buttons: BTreeMap::from([
                ("X".to_string(), 2),
                ("A".to_string(), 0),
                ("R3".to_string(), 8),
            ]),
        }
    }
}

/// Controller configuration as written in the file
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RawControllerConfig {
    pub mode: MappingMode,
    pub poll_interval_ms: u64,
    pub trigger_axes: Vec<i64>,
    pub activation: RawActivation,
    /// Action name -> button index
    pub controls: BTreeMap<String, i64>,
}

impl Default for RawControllerConfig {
    fn default() -> Self {
        Self {
            mode: MappingMode::Toggle,
            poll_interval_ms: 100,
            trigger_axes: vec![4, 5],
            activation: RawActivation::default(),
            controls: BTreeMap::from([
                ("skip".to_string(), 1),
                ("prev".to_string(), 2),
                ("play_pause".to_string(), 0),
                ("volume_up".to_string(), 5),
                ("volume_down".to_string(), 4),
            ]),
        }
    }
}

/// Validated controller configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    /// Whether controls are gated by the overlay
    pub mode: MappingMode,

    /// Sleep between poll cycles
    ///
    /// Combos are sampled once per cycle, so a press shorter than this can be missed.
    /// Never zero.
    pub poll_interval: Duration,

    /// Axes reported as trigger percentages
    pub trigger_axes: Vec<AxisIndex>,

    /// Buttons that must be held together to toggle the overlay; never empty
    pub activation: ButtonGroup,

    /// Names for activation buttons, used in log output
    pub button_names: BTreeMap<String, ButtonIndex>,

    /// Single-button controls in name order
    pub controls: Vec<(GroupName, ButtonIndex)>,
}

impl ControllerConfig {
    /// Human readable form of the activation combo, e.g. `X + A + R3`
    pub fn describe_activation(&self) -> String {
        self.activation
            .members()
            .map(|button| {
                self.button_names
                    .iter()
                    .find(|(_, index)| **index == button)
                    .map(|(name, _)| name.clone())
                    .unwrap_or_else(|| format!("#{button}"))
            })
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

fn to_index(name: &str, value: i64) -> Result<u16, MappingError> {
    u16::try_from(value).map_err(|_| MappingError::InvalidIndex {
        name: name.to_string(),
        index: value,
    })
}

impl TryFrom<RawControllerConfig> for ControllerConfig {
    type Error = MappingError;

    fn try_from(raw: RawControllerConfig) -> Result<Self, Self::Error> {
        if raw.poll_interval_ms == 0 {
            return Err(MappingError::InvalidSetting {
                name: "poll_interval_ms".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let trigger_axes = raw
            .trigger_axes
            .iter()
            .map(|axis| to_index("trigger_axes", *axis))
            .collect::<Result<Vec<_>, _>>()?;

        if raw.activation.combo.is_empty() {
            return Err(MappingError::InvalidGroup {
                name: "activation".to_string(),
                reason: "combo has no buttons".to_string(),
            });
        }
        let activation = raw
            .activation
            .combo
            .iter()
            .map(|button| to_index("activation.combo", *button))
            .collect::<Result<Vec<_>, _>>()?;

        let button_names = raw
            .activation
            .buttons
            .iter()
            .map(|(name, button)| to_index(name, *button).map(|index| (name.clone(), index)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let controls = raw
            .controls
            .iter()
            .map(|(name, button)| to_index(name, *button).map(|index| (name.clone(), index)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            mode: raw.mode,
            poll_interval: Duration::from_millis(raw.poll_interval_ms),
            trigger_axes,
            activation: ButtonGroup::new(activation),
            button_names,
            controls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = ControllerConfig::try_from(RawControllerConfig::default()).unwrap();
        assert_eq!(config.mode, MappingMode::Toggle);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.activation, ButtonGroup::new([0, 2, 8]));
        assert_eq!(config.trigger_axes, vec![4, 5]);
        assert_eq!(config.controls.len(), 5);
        assert_eq!(config.controls[0], ("play_pause".to_string(), 0));
    }

    #[test]
    fn negative_index_is_rejected() {
        let mut raw = RawControllerConfig::default();
        raw.controls.insert("skip".to_string(), -1);
        let err = ControllerConfig::try_from(raw).unwrap_err();
        assert!(matches!(err, MappingError::InvalidIndex { index: -1, .. }));
    }

    #[test]
    fn empty_combo_is_rejected() {
        let mut raw = RawControllerConfig::default();
        raw.activation.combo.clear();
        let err = ControllerConfig::try_from(raw).unwrap_err();
        assert!(matches!(err, MappingError::InvalidGroup { .. }));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let raw = RawControllerConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            ControllerConfig::try_from(raw),
            Err(MappingError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn describe_uses_button_names() {
        let config = ControllerConfig::try_from(RawControllerConfig::default()).unwrap();
        assert_eq!(config.describe_activation(), "A + X + R3");

        let mut raw = RawControllerConfig::default();
        raw.activation.combo.push(11);
        let config = ControllerConfig::try_from(raw).unwrap();
        assert_eq!(config.describe_activation(), "A + X + R3 + #11");
    }
}
