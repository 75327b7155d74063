//! Global keyboard listening through `global-hotkey`.
//!
//! The hotkey API reports whole combinations rather than individual keys, so
//! the bound character is registered under all eight modifier combinations.
//! Each press is translated back into modifier and character key events,
//! which lets the keyboard adapter apply its exact-modifier rule unchanged.
//!
//! Limitations of this backend:
//!
//! - Registered combinations are grabbed by the OS, so while a binding is
//!   live its character no longer reaches other applications under any
//!   modifier set. A bare letter binding swallows that letter system-wide.
//! - Modifier changes are only seen at the moment the character goes down.
//!   Pressing or releasing a modifier while the character is held produces
//!   no event, so an extra modifier cannot release push-to-talk mid-hold
//!   here. The release of the character always ends it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam::channel::TryRecvError;
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::input::InputError;
use crate::input::keyboard::{Key, KeyEvent};
use crate::input::source::InputSignal;

/// Poll interval for the hotkey event receiver.
const HOTKEY_POLL_INTERVAL: Duration = Duration::from_millis(10);

type Registrations = Arc<Mutex<HashMap<u32, (Modifiers, String)>>>;

pub struct GlobalKeyListener {
    manager: GlobalHotKeyManager,
    hotkeys: Vec<HotKey>,
    registrations: Registrations,
}

impl GlobalKeyListener {
    pub fn new() -> Result<Self, InputError> {
        let manager = GlobalHotKeyManager::new().map_err(|e| InputError::Hotkey(e.to_string()))?;
        Ok(Self {
            manager,
            hotkeys: Vec::new(),
            registrations: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Listens for `character` under every modifier combination, replacing
    /// whatever was registered before.
    pub fn listen_for(&mut self, character: &str) -> Result<(), InputError> {
        self.unregister_all();

        let code = parse_letter(character)?;
        let mut registrations = self.registrations.lock().unwrap();
        for mods in modifier_combinations() {
            let hotkey = HotKey::new(Some(mods), code);
            self.manager
                .register(hotkey)
                .map_err(|e| InputError::Hotkey(e.to_string()))?;
            registrations.insert(hotkey.id(), (mods, character.to_string()));
            self.hotkeys.push(hotkey);
        }
        debug!("Listening for {} under {} combinations", character, self.hotkeys.len());
        Ok(())
    }

    pub fn unregister_all(&mut self) {
        for hotkey in self.hotkeys.drain(..) {
            if let Err(e) = self.manager.unregister(hotkey) {
                warn!("Failed to unregister hotkey: {}", e);
            }
        }
        self.registrations.lock().unwrap().clear();
    }

    /// Forwards hotkey events as [`InputSignal::Key`] until `signals` closes.
    pub fn spawn_forwarder(&self, signals: UnboundedSender<InputSignal>) -> JoinHandle<()> {
        let registrations = self.registrations.clone();
        tokio::spawn(async move {
            let receiver = GlobalHotKeyEvent::receiver();
            loop {
                match receiver.try_recv() {
                    Ok(event) => {
                        let registered = registrations.lock().unwrap().get(&event.id()).cloned();
                        let Some((mods, character)) = registered else {
                            continue;
                        };
                        for key_event in translate(mods, &character, event.state()) {
                            if signals.send(InputSignal::Key(key_event)).is_err() {
                                return;
                            }
                        }
                    }
                    Err(TryRecvError::Empty) => tokio::time::sleep(HOTKEY_POLL_INTERVAL).await,
                    Err(TryRecvError::Disconnected) => break,
                }
            }
        })
    }
}

impl Drop for GlobalKeyListener {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

fn modifier_combinations() -> impl Iterator<Item = Modifiers> {
    (0u8..8).map(|bits| {
        let mut mods = Modifiers::empty();
        if bits & 1 != 0 {
            mods |= Modifiers::CONTROL;
        }
        if bits & 2 != 0 {
            mods |= Modifiers::ALT;
        }
        if bits & 4 != 0 {
            mods |= Modifiers::SHIFT;
        }
        mods
    })
}

fn parse_letter(character: &str) -> Result<Code, InputError> {
    format!("Key{}", character.to_ascii_uppercase())
        .parse::<Code>()
        .map_err(|_| InputError::Hotkey(format!("Unsupported key: {}", character)))
}

/// Expands one combination event into individual key transitions.
///
/// A press reports the modifier state it was registered with, then the
/// character going down. A release only reports the character going up.
fn translate(mods: Modifiers, character: &str, state: HotKeyState) -> Vec<KeyEvent> {
    let set = |held: bool, key: Key| {
        if held {
            KeyEvent::down(key)
        } else {
            KeyEvent::up(key)
        }
    };
    match state {
        HotKeyState::Pressed => vec![
            set(mods.contains(Modifiers::CONTROL), Key::ControlLeft),
            set(mods.contains(Modifiers::ALT), Key::AltLeft),
            set(mods.contains(Modifiers::SHIFT), Key::ShiftLeft),
            KeyEvent::down(Key::named(character)),
        ],
        HotKeyState::Released => vec![KeyEvent::up(Key::named(character))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_combinations_are_distinct() {
        let combos: Vec<Modifiers> = modifier_combinations().collect();
        assert_eq!(combos.len(), 8);
        for (i, a) in combos.iter().enumerate() {
            for b in &combos[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_press_reports_exact_modifiers() {
        let events = translate(Modifiers::CONTROL | Modifiers::SHIFT, "P", HotKeyState::Pressed);
        assert_eq!(
            events,
            vec![
                KeyEvent::down(Key::ControlLeft),
                KeyEvent::up(Key::AltLeft),
                KeyEvent::down(Key::ShiftLeft),
                KeyEvent::down(Key::named("P")),
            ]
        );
        assert_eq!(
            translate(Modifiers::empty(), "P", HotKeyState::Released),
            vec![KeyEvent::up(Key::named("P"))]
        );
    }

    #[test]
    fn test_letters_parse() {
        assert_eq!(parse_letter("p").unwrap(), Code::KeyP);
        assert!(parse_letter("F1").is_err());
    }
}
