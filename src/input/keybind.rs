//! Push-to-talk binding descriptions.
//!
//! These are persisted in the local store and sent over the desktop bridge,
//! so their serialized shape is part of the storage format:
//!
//! ```json
//! {"type":"keyboard","key":{"character":"P","ctrl":true,"alt":false,"shift":true}}
//! {"type":"gamepad","key":"XINPUT_GAMEPAD_A"}
//! {"type":"wheelDevice","booleanBitOffset":20}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// The only binding slot the client exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeybindId {
    Ptt,
}

/// A character key plus the exact modifier set that must accompany it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombo {
    pub character: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyCombo {
    pub fn new(character: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            ctrl: false,
            alt: false,
            shift: false,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            self.ctrl.then_some("Ctrl".to_string()),
            self.alt.then_some("Alt".to_string()),
            self.shift.then_some("Shift".to_string()),
            Some(self.character.to_uppercase()),
        ];
        let parts: Vec<String> = parts.into_iter().flatten().collect();
        f.write_str(&parts.join("-"))
    }
}

/// Controller buttons in the standard gamepad layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamepadButton {
    #[serde(rename = "XINPUT_GAMEPAD_A")]
    A,
    #[serde(rename = "XINPUT_GAMEPAD_B")]
    B,
    #[serde(rename = "XINPUT_GAMEPAD_X")]
    X,
    #[serde(rename = "XINPUT_GAMEPAD_Y")]
    Y,
    #[serde(rename = "XINPUT_GAMEPAD_LEFT_SHOULDER")]
    LeftShoulder,
    #[serde(rename = "XINPUT_GAMEPAD_RIGHT_SHOULDER")]
    RightShoulder,
    #[serde(rename = "XINPUT_GAMEPAD_LEFT_THUMB")]
    LeftThumb,
    #[serde(rename = "XINPUT_GAMEPAD_RIGHT_THUMB")]
    RightThumb,
    #[serde(rename = "XINPUT_GAMEPAD_BACK")]
    Back,
    #[serde(rename = "XINPUT_GAMEPAD_START")]
    Start,
    #[serde(rename = "XINPUT_GAMEPAD_DPAD_UP")]
    DpadUp,
    #[serde(rename = "XINPUT_GAMEPAD_DPAD_DOWN")]
    DpadDown,
    #[serde(rename = "XINPUT_GAMEPAD_DPAD_LEFT")]
    DpadLeft,
    #[serde(rename = "XINPUT_GAMEPAD_DPAD_RIGHT")]
    DpadRight,
}

impl GamepadButton {
    pub const ALL: [GamepadButton; 14] = [
        GamepadButton::A,
        GamepadButton::B,
        GamepadButton::X,
        GamepadButton::Y,
        GamepadButton::LeftShoulder,
        GamepadButton::RightShoulder,
        GamepadButton::LeftThumb,
        GamepadButton::RightThumb,
        GamepadButton::Back,
        GamepadButton::Start,
        GamepadButton::DpadUp,
        GamepadButton::DpadDown,
        GamepadButton::DpadLeft,
        GamepadButton::DpadRight,
    ];

    /// Maps a standard-layout button index. Indices 10, 11 and 16+ have no
    /// mapping.
    pub fn from_index(index: usize) -> Option<Self> {
        Some(match index {
            0 => GamepadButton::A,
            1 => GamepadButton::B,
            2 => GamepadButton::X,
            3 => GamepadButton::Y,
            4 => GamepadButton::LeftShoulder,
            5 => GamepadButton::RightShoulder,
            // The trigger slots; stick clicks at 10 and 11 stay unmapped.
            6 => GamepadButton::LeftThumb,
            7 => GamepadButton::RightThumb,
            8 => GamepadButton::Back,
            9 => GamepadButton::Start,
            12 => GamepadButton::DpadUp,
            13 => GamepadButton::DpadDown,
            14 => GamepadButton::DpadLeft,
            15 => GamepadButton::DpadRight,
            _ => return None,
        })
    }

    pub fn index(self) -> usize {
        match self {
            GamepadButton::A => 0,
            GamepadButton::B => 1,
            GamepadButton::X => 2,
            GamepadButton::Y => 3,
            GamepadButton::LeftShoulder => 4,
            GamepadButton::RightShoulder => 5,
            GamepadButton::LeftThumb => 6,
            GamepadButton::RightThumb => 7,
            GamepadButton::Back => 8,
            GamepadButton::Start => 9,
            GamepadButton::DpadUp => 12,
            GamepadButton::DpadDown => 13,
            GamepadButton::DpadLeft => 14,
            GamepadButton::DpadRight => 15,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            GamepadButton::A => "Xbox A",
            GamepadButton::B => "Xbox B",
            GamepadButton::X => "Xbox X",
            GamepadButton::Y => "Xbox Y",
            GamepadButton::LeftShoulder => "Left Bumper",
            GamepadButton::RightShoulder => "Right Bumper",
            GamepadButton::LeftThumb => "Left Trigger",
            GamepadButton::RightThumb => "Right Trigger",
            GamepadButton::Back => "Back",
            GamepadButton::Start => "Start",
            GamepadButton::DpadUp => "D-Pad Up",
            GamepadButton::DpadDown => "D-Pad Down",
            GamepadButton::DpadLeft => "D-Pad Left",
            GamepadButton::DpadRight => "D-Pad Right",
        }
    }
}

/// What has to be held for push-to-talk to be active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Keybind {
    #[serde(rename = "keyboard")]
    Keyboard { key: KeyCombo },
    #[serde(rename = "gamepad")]
    Gamepad { key: GamepadButton },
    /// A button on the steering-wheel HID device, read from one byte of
    /// each input report.
    #[serde(rename = "wheelDevice", alias = "moza/tsw")]
    WheelDevice {
        #[serde(rename = "booleanBitOffset")]
        boolean_bit_offset: usize,
    },
}

impl Default for Keybind {
    fn default() -> Self {
        Keybind::Keyboard {
            key: KeyCombo::new("P").ctrl().shift(),
        }
    }
}

impl fmt::Display for Keybind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keybind::Keyboard { key } => fmt::Display::fmt(key, f),
            Keybind::Gamepad { key } => f.write_str(key.display_name()),
            Keybind::WheelDevice { boolean_bit_offset } => {
                write!(f, "Button {boolean_bit_offset}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shapes() {
        let keyboard = Keybind::Keyboard {
            key: KeyCombo::new("P").ctrl(),
        };
        assert_eq!(
            serde_json::to_value(&keyboard).unwrap(),
            json!({"type": "keyboard", "key": {"character": "P", "ctrl": true, "alt": false, "shift": false}})
        );

        let pad = Keybind::Gamepad {
            key: GamepadButton::DpadLeft,
        };
        assert_eq!(
            serde_json::to_value(&pad).unwrap(),
            json!({"type": "gamepad", "key": "XINPUT_GAMEPAD_DPAD_LEFT"})
        );

        let wheel = Keybind::WheelDevice {
            boolean_bit_offset: 20,
        };
        assert_eq!(
            serde_json::to_value(&wheel).unwrap(),
            json!({"type": "wheelDevice", "booleanBitOffset": 20})
        );
        assert_eq!(serde_json::to_value(KeybindId::Ptt).unwrap(), json!("ptt"));
    }

    #[test]
    fn test_legacy_wheel_tag_is_accepted() {
        let parsed: Keybind =
            serde_json::from_value(json!({"type": "moza/tsw", "booleanBitOffset": 7})).unwrap();
        assert_eq!(
            parsed,
            Keybind::WheelDevice {
                boolean_bit_offset: 7
            }
        );
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(Keybind::default().to_string(), "Ctrl-Shift-P");
        let all = Keybind::Keyboard {
            key: KeyCombo::new("q").ctrl().alt().shift(),
        };
        assert_eq!(all.to_string(), "Ctrl-Alt-Shift-Q");
        assert_eq!(
            Keybind::Gamepad {
                key: GamepadButton::LeftThumb
            }
            .to_string(),
            "Left Trigger"
        );
        assert_eq!(
            Keybind::WheelDevice {
                boolean_bit_offset: 20
            }
            .to_string(),
            "Button 20"
        );
    }

    #[test]
    fn test_button_index_mapping() {
        for button in GamepadButton::ALL {
            assert_eq!(GamepadButton::from_index(button.index()), Some(button));
        }
        for unmapped in [10, 11, 16, 99] {
            assert_eq!(GamepadButton::from_index(unmapped), None);
        }
    }
}
