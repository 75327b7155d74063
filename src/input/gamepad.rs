//! Gamepad adapter.

use std::time::Duration;

use super::keybind::GamepadButton;
use super::source::InputSource;

/// How often a live gamepad binding is sampled.
pub const GAMEPAD_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// One connected controller as seen by a [`GamepadBackend`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamepadSnapshot {
    /// Controllers without rumble support are ignored: the standard-layout
    /// mapping only holds for Xbox-style pads.
    pub has_vibration: bool,
    /// Pressed state per standard-layout button index.
    pub buttons: Vec<bool>,
}

impl GamepadSnapshot {
    pub fn is_pressed(&self, button: GamepadButton) -> bool {
        self.buttons.get(button.index()).copied().unwrap_or(false)
    }

    /// Mapped buttons currently down, in index order.
    pub fn pressed_buttons(&self) -> Vec<GamepadButton> {
        self.buttons
            .iter()
            .enumerate()
            .filter(|&(_, &down)| down)
            .filter_map(|(i, _)| GamepadButton::from_index(i))
            .collect()
    }
}

/// Source of controller state.
pub trait GamepadBackend: Send {
    fn snapshot(&mut self) -> Vec<GamepadSnapshot>;
}

/// The first vibration-capable controller, if any.
pub fn primary_gamepad(pads: &[GamepadSnapshot]) -> Option<&GamepadSnapshot> {
    pads.iter().find(|p| p.has_vibration)
}

/// Samples one button on the primary controller.
///
/// Owns the backend while the binding is live; the manager takes it back
/// when the binding changes.
pub struct GamepadAdapter {
    button: GamepadButton,
    backend: Box<dyn GamepadBackend>,
}

impl GamepadAdapter {
    pub fn new(button: GamepadButton, backend: Box<dyn GamepadBackend>) -> Self {
        Self { button, backend }
    }

    pub fn button(&self) -> GamepadButton {
        self.button
    }

    pub fn into_backend(self) -> Box<dyn GamepadBackend> {
        self.backend
    }
}

impl InputSource for GamepadAdapter {
    fn sample(&mut self) -> bool {
        let pads = self.backend.snapshot();
        primary_gamepad(&pads)
            .map(|pad| pad.is_pressed(self.button))
            .unwrap_or(false)
    }
}
