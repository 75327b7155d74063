//! Keyboard adapter.

use super::keybind::KeyCombo;
use super::source::InputSource;

/// A key as reported by the global key listener.
///
/// Left and right modifiers are distinct here and merged by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    ShiftLeft,
    ShiftRight,
    Named(String),
}

impl Key {
    pub fn named(name: impl Into<String>) -> Self {
        Key::Named(name.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Down,
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub state: KeyState,
}

impl KeyEvent {
    pub fn down(key: Key) -> Self {
        Self {
            key,
            state: KeyState::Down,
        }
    }

    pub fn up(key: Key) -> Self {
        Self {
            key,
            state: KeyState::Up,
        }
    }
}

/// Which parts of the bound combination are currently held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub character: bool,
}

/// Tracks modifier and character state for one [`KeyCombo`].
///
/// The combination counts as held when the character is down and every
/// modifier matches the binding exactly: an extra modifier releases it.
#[derive(Debug, Clone)]
pub struct KeyboardAdapter {
    required: KeyCombo,
    held: ModifierState,
}

impl KeyboardAdapter {
    pub fn new(required: KeyCombo) -> Self {
        Self {
            required,
            held: ModifierState::default(),
        }
    }

    /// Switches to another combination without forgetting what is held.
    ///
    /// Modifiers always carry over. The character only does when both
    /// combinations use the same key; otherwise it is up until seen down.
    pub fn rebind(self, required: KeyCombo) -> Self {
        let same_key = self
            .required
            .character
            .eq_ignore_ascii_case(&required.character);
        Self {
            held: ModifierState {
                character: self.held.character && same_key,
                ..self.held
            },
            required,
        }
    }

    pub fn handle(&mut self, event: &KeyEvent) {
        let down = event.state == KeyState::Down;
        match &event.key {
            Key::ControlLeft | Key::ControlRight => self.held.ctrl = down,
            Key::AltLeft | Key::AltRight => self.held.alt = down,
            Key::ShiftLeft | Key::ShiftRight => self.held.shift = down,
            Key::Named(name) if name.eq_ignore_ascii_case(&self.required.character) => {
                self.held.character = down
            }
            Key::Named(_) => {}
        }
    }

    pub fn held(&self) -> ModifierState {
        self.held
    }

    pub fn required(&self) -> &KeyCombo {
        &self.required
    }
}

impl InputSource for KeyboardAdapter {
    fn sample(&mut self) -> bool {
        let r = &self.required;
        let h = &self.held;
        h.character && h.ctrl == r.ctrl && h.alt == r.alt && h.shift == r.shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::gate::PushToTalkGate;

    fn run(adapter: &mut KeyboardAdapter, events: &[KeyEvent]) -> Vec<bool> {
        let mut gate = PushToTalkGate::new();
        events
            .iter()
            .filter_map(|e| {
                adapter.handle(e);
                gate.evaluate(adapter.sample())
            })
            .collect()
    }

    #[test]
    fn test_combo_emits_single_edges() {
        let mut adapter = KeyboardAdapter::new(KeyCombo::new("P").ctrl().shift());
        let p = || Key::named("P");
        let events = [
            KeyEvent::down(Key::ControlLeft),
            KeyEvent::down(Key::ShiftRight),
            KeyEvent::down(p()),
            KeyEvent::down(p()),
            KeyEvent::down(p()),
            KeyEvent::up(p()),
            KeyEvent::up(Key::ShiftRight),
            KeyEvent::up(Key::ControlLeft),
        ];
        assert_eq!(run(&mut adapter, &events), vec![true, false]);
    }

    #[test]
    fn test_extra_modifier_releases() {
        let mut adapter = KeyboardAdapter::new(KeyCombo::new("P").ctrl());
        let events = [
            KeyEvent::down(Key::ControlRight),
            KeyEvent::down(Key::named("p")),
            KeyEvent::down(Key::AltLeft),
            KeyEvent::up(Key::AltLeft),
            KeyEvent::up(Key::ControlRight),
        ];
        assert_eq!(run(&mut adapter, &events), vec![true, false, true, false]);
    }

    #[test]
    fn test_left_and_right_share_a_flag() {
        let mut adapter = KeyboardAdapter::new(KeyCombo::new("P").shift());
        adapter.handle(&KeyEvent::down(Key::ShiftLeft));
        adapter.handle(&KeyEvent::up(Key::ShiftRight));
        assert!(!adapter.held().shift);
    }

    #[test]
    fn test_rebind_keeps_held_character_only_for_same_key() {
        let mut adapter = KeyboardAdapter::new(KeyCombo::new("P").ctrl());
        adapter.handle(&KeyEvent::down(Key::ControlLeft));
        adapter.handle(&KeyEvent::down(Key::named("P")));
        assert!(adapter.sample());

        let mut same = adapter.clone().rebind(KeyCombo::new("p").ctrl());
        assert!(same.sample());
        assert!(same.held().ctrl);

        let mut other = adapter.rebind(KeyCombo::new("O").ctrl());
        assert!(!other.held().character);
        assert!(other.held().ctrl);
        assert!(!other.sample());
    }

    #[test]
    fn test_unrelated_keys_are_ignored() {
        let mut adapter = KeyboardAdapter::new(KeyCombo::new("P"));
        adapter.handle(&KeyEvent::down(Key::named("Q")));
        assert_eq!(adapter.held(), ModifierState::default());
        assert!(!adapter.sample());
    }
}
