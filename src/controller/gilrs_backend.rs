//! gilrs implementation of the [`InputBackend`] boundary
//!
//! Buttons and axes are translated into the numbering used by the controller
//! configuration. It follows the XInput layout, except that the stick clicks are
//! swapped so the default activation combo (X, A, R3) reads `[2, 0, 8]`:
//!
//! | Index | Button      | Index | Axis        |
//! |-------|-------------|-------|-------------|
//! | 0     | A (South)   | 0     | LeftStickX  |
//! | 1     | B (East)    | 1     | LeftStickY  |
//! | 2     | X (West)    | 2     | RightStickX |
//! | 3     | Y (North)   | 3     | RightStickY |
//! | 4     | LB          | 4     | LeftZ / LT  |
//! | 5     | RB          | 5     | RightZ / RT |
//! | 6     | Back        |       |             |
//! | 7     | Start       |       |             |
//! | 8     | R3          |       |             |
//! | 9     | L3          |       |             |
//! | 10    | Guide       |       |             |
//! | 11-14 | DPad U/D/L/R|       |             |

use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use tracing::{debug, error, info, warn};

use crate::controller::device_session::{DeviceInfo, InputBackend, RawControllerEvent, SessionError};
use crate::controller::input_state::{AxisIndex, ButtonIndex};

pub const LEFT_TRIGGER_AXIS: AxisIndex = 4;
pub const RIGHT_TRIGGER_AXIS: AxisIndex = 5;

pub struct GilrsBackend {
    gilrs: Gilrs,

    // Bound gamepad
    active_gamepad: Option<GamepadId>,
}

impl GilrsBackend {
    pub fn new() -> Result<Self, SessionError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(SessionError::Backend(e.to_string()));
            }
        };

        Ok(Self {
            gilrs,
            active_gamepad: None,
        })
    }

    fn convert_event(&self, event: EventType) -> Option<RawControllerEvent> {
        match event {
            EventType::ButtonPressed(button, _) => map_button(button).map(|button| {
                debug!("Button pressed: {}", button);
                RawControllerEvent::ButtonDown { button }
            }),
            EventType::ButtonReleased(button, _) => map_button(button).map(|button| {
                debug!("Button released: {}", button);
                RawControllerEvent::ButtonUp { button }
            }),
            EventType::ButtonChanged(button, value, _) => {
                // Analog triggers report 0..1 here; rescale to the axis range
                map_analog_trigger(button).map(|axis| RawControllerEvent::AxisMotion {
                    axis,
                    value: value * 2.0 - 1.0,
                })
            }
            EventType::AxisChanged(axis, value, _) => {
                map_axis(axis).map(|axis| RawControllerEvent::AxisMotion { axis, value })
            }
            EventType::ButtonRepeated(button, _) => {
                debug!("Button repeat ignored: {:?}", button);
                None
            }
            EventType::Disconnected => Some(RawControllerEvent::Disconnected),
            _ => {
                debug!("Unhandled event type: {:?}", event);
                None
            }
        }
    }
}

impl InputBackend for GilrsBackend {
    fn connected_devices(&mut self) -> Vec<DeviceInfo> {
        self.gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .map(|(id, gamepad)| DeviceInfo {
                id: usize::from(id),
                name: gamepad.name().to_string(),
            })
            .collect()
    }

    fn bind(&mut self, device: &DeviceInfo) -> Result<(), SessionError> {
        let id = self
            .gilrs
            .gamepads()
            .map(|(id, _)| id)
            .find(|id| usize::from(*id) == device.id)
            .ok_or_else(|| {
                SessionError::Backend(format!("Gamepad {} is no longer present", device.id))
            })?;
        self.active_gamepad = Some(id);
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<RawControllerEvent> {
        let mut events = Vec::new();

        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if self.active_gamepad != Some(id) {
                debug!("Skipping event from non-active gamepad: {:?}", id);
                continue;
            }
            if let Some(raw_event) = self.convert_event(event) {
                events.push(raw_event);
            }
        }

        events
    }

    fn release(&mut self) {
        if let Some(id) = self.active_gamepad.take() {
            info!("Released gamepad {:?}", id);
        } else {
            warn!("Release requested without a bound gamepad");
        }
    }
}

fn map_button(button: Button) -> Option<ButtonIndex> {
    match button {
        Button::South => Some(0),
        Button::East => Some(1),
        Button::West => Some(2),
        Button::North => Some(3),
        Button::LeftTrigger => Some(4),
        Button::RightTrigger => Some(5),
        Button::Select => Some(6),
        Button::Start => Some(7),
        Button::RightThumb => Some(8),
        Button::LeftThumb => Some(9),
        Button::Mode => Some(10),
        Button::DPadUp => Some(11),
        Button::DPadDown => Some(12),
        Button::DPadLeft => Some(13),
        Button::DPadRight => Some(14),
        _ => None,
    }
}

fn map_analog_trigger(button: Button) -> Option<AxisIndex> {
    match button {
        Button::LeftTrigger2 => Some(LEFT_TRIGGER_AXIS),
        Button::RightTrigger2 => Some(RIGHT_TRIGGER_AXIS),
        _ => None,
    }
}

fn map_axis(axis: Axis) -> Option<AxisIndex> {
    match axis {
        Axis::LeftStickX => Some(0),
        Axis::LeftStickY => Some(1),
        Axis::RightStickX => Some(2),
        Axis::RightStickY => Some(3),
        Axis::LeftZ => Some(LEFT_TRIGGER_AXIS),
        Axis::RightZ => Some(RIGHT_TRIGGER_AXIS),
        _ => None,
    }
}
