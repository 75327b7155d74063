//! Push-to-talk input.
//!
//! - [`keybind`] - serializable binding descriptions
//! - [`keyboard`], [`gamepad`], [`wheel`] - one adapter per device family
//! - [`gate`] - edge detection over the composite state
//! - [`manager`] - the owner of the live binding
//! - [`capture`] - picks a binding from the next thing the user presses
//! - [`backend`] - OS integrations, each behind a cargo feature

pub mod backend;
pub mod capture;
pub mod gamepad;
pub mod gate;
pub mod keybind;
pub mod keyboard;
pub mod manager;
pub mod source;
pub mod wheel;

use thiserror::Error;

pub use capture::KeybindCapture;
pub use gamepad::{GamepadAdapter, GamepadBackend, GamepadSnapshot};
pub use gate::PushToTalkGate;
pub use keybind::{GamepadButton, KeyCombo, Keybind, KeybindId};
pub use keyboard::{Key, KeyEvent, KeyState, KeyboardAdapter, ModifierState};
pub use manager::{InputBindingManager, InputDevices};
pub use source::{InputSignal, InputSource};
pub use wheel::{WheelAdapter, WheelBackend};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("no {0} backend is available")]
    Unavailable(&'static str),

    #[error("failed to open {device}: {reason}")]
    DeviceOpen {
        device: &'static str,
        reason: String,
    },

    #[error("failed to register global hotkey: {0}")]
    Hotkey(String),
}
