//! "Press the key you want to use" binding capture.

use super::gamepad::{GamepadSnapshot, primary_gamepad};
use super::keybind::{KeyCombo, Keybind};
use super::keyboard::{Key, KeyEvent, KeyState, ModifierState};

/// Byte offset bound by the hidden wheel capture shortcut.
pub const WHEEL_CAPTURE_OFFSET: usize = 20;

/// Watches input until the user presses something bindable.
///
/// Letter keys bind with whatever modifiers are held at the time.
/// Ctrl+Alt+Shift+P is reserved: it selects the wheel device instead.
#[derive(Debug, Default)]
pub struct KeybindCapture {
    held: ModifierState,
}

impl KeybindCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_key(&mut self, event: &KeyEvent) -> Option<Keybind> {
        let down = event.state == KeyState::Down;
        match &event.key {
            Key::ControlLeft | Key::ControlRight => self.held.ctrl = down,
            Key::AltLeft | Key::AltRight => self.held.alt = down,
            Key::ShiftLeft | Key::ShiftRight => self.held.shift = down,
            Key::Named(name) if down && is_letter(name) => {
                let h = self.held;
                if h.ctrl && h.alt && h.shift && name.eq_ignore_ascii_case("P") {
                    return Some(Keybind::WheelDevice {
                        boolean_bit_offset: WHEEL_CAPTURE_OFFSET,
                    });
                }
                return Some(Keybind::Keyboard {
                    key: KeyCombo {
                        character: name.to_ascii_uppercase(),
                        ctrl: h.ctrl,
                        alt: h.alt,
                        shift: h.shift,
                    },
                });
            }
            Key::Named(_) => {}
        }
        None
    }

    /// Binds the first mapped button held on the primary controller.
    pub fn observe_gamepads(&self, pads: &[GamepadSnapshot]) -> Option<Keybind> {
        let pad = primary_gamepad(pads)?;
        let key = pad.pressed_buttons().into_iter().next()?;
        Some(Keybind::Gamepad { key })
    }
}

fn is_letter(name: &str) -> bool {
    let mut chars = name.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keybind::GamepadButton;

    #[test]
    fn test_letter_binds_with_held_modifiers() {
        let mut capture = KeybindCapture::new();
        assert_eq!(capture.observe_key(&KeyEvent::down(Key::ControlLeft)), None);
        assert_eq!(capture.observe_key(&KeyEvent::down(Key::named("F1"))), None);
        assert_eq!(
            capture.observe_key(&KeyEvent::down(Key::named("t"))),
            Some(Keybind::Keyboard {
                key: KeyCombo::new("T").ctrl()
            })
        );
    }

    #[test]
    fn test_hidden_wheel_shortcut() {
        let mut capture = KeybindCapture::new();
        for key in [Key::ControlRight, Key::AltLeft, Key::ShiftLeft] {
            capture.observe_key(&KeyEvent::down(key));
        }
        assert_eq!(
            capture.observe_key(&KeyEvent::down(Key::named("P"))),
            Some(Keybind::WheelDevice {
                boolean_bit_offset: WHEEL_CAPTURE_OFFSET
            })
        );
    }

    #[test]
    fn test_gamepad_capture_takes_first_mapped_button() {
        let mut buttons = vec![false; 16];
        buttons[11] = true;
        buttons[13] = true;
        let pads = [GamepadSnapshot {
            has_vibration: true,
            buttons,
        }];
        assert_eq!(
            KeybindCapture::new().observe_gamepads(&pads),
            Some(Keybind::Gamepad {
                key: GamepadButton::DpadDown
            })
        );
        assert_eq!(KeybindCapture::new().observe_gamepads(&[]), None);
    }
}
