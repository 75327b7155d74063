//! Controller state through gilrs.
//!
//! `Gilrs` must stay on the thread that created it, so a dedicated thread
//! pumps its events and publishes snapshots for the adapter to read.

use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use gilrs::{Button, Gilrs};
use tracing::{error, info};

use crate::input::InputError;
use crate::input::gamepad::{GAMEPAD_POLL_INTERVAL, GamepadBackend, GamepadSnapshot};

/// gilrs buttons in standard-layout index order.
///
/// Indices 6 and 7 are the analog triggers (`LeftTrigger2`/`RightTrigger2`).
/// The bindings named `LeftThumb`/`RightThumb` map to those indices, so they
/// fire on the triggers, matching their "Left Trigger"/"Right Trigger"
/// display names. The stick clicks sit at 10 and 11 and cannot be bound.
const STANDARD_LAYOUT: [Button; 16] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

pub struct GilrsBackend {
    latest: Arc<Mutex<Vec<GamepadSnapshot>>>,
}

impl GilrsBackend {
    pub fn spawn() -> Result<Self, InputError> {
        let latest = Arc::new(Mutex::new(Vec::new()));
        let (ready_tx, ready_rx) = mpsc::channel();

        let published = latest.clone();
        thread::Builder::new()
            .name("gamepad-poller".into())
            .spawn(move || {
                let mut gilrs = match Gilrs::new() {
                    Ok(gilrs) => {
                        let _ = ready_tx.send(Ok(()));
                        gilrs
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                loop {
                    while gilrs.next_event().is_some() {}
                    let snapshots: Vec<GamepadSnapshot> = gilrs
                        .gamepads()
                        .map(|(_, pad)| GamepadSnapshot {
                            has_vibration: pad.is_ff_supported(),
                            buttons: STANDARD_LAYOUT.iter().map(|&b| pad.is_pressed(b)).collect(),
                        })
                        .collect();
                    *published.lock().unwrap() = snapshots;
                    thread::sleep(GAMEPAD_POLL_INTERVAL);
                }
            })
            .map_err(|e| InputError::DeviceOpen {
                device: "gamepad",
                reason: e.to_string(),
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Gamepad poller started");
                Ok(Self { latest })
            }
            Ok(Err(reason)) => Err(InputError::DeviceOpen {
                device: "gamepad",
                reason,
            }),
            Err(e) => {
                error!("Gamepad poller exited before starting: {}", e);
                Err(InputError::DeviceOpen {
                    device: "gamepad",
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl GamepadBackend for GilrsBackend {
    fn snapshot(&mut self) -> Vec<GamepadSnapshot> {
        self.latest.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keybind::GamepadButton;

    #[test]
    fn test_thumb_bindings_land_on_the_triggers() {
        assert_eq!(STANDARD_LAYOUT[GamepadButton::LeftThumb.index()], Button::LeftTrigger2);
        assert_eq!(STANDARD_LAYOUT[GamepadButton::RightThumb.index()], Button::RightTrigger2);
        assert_eq!(STANDARD_LAYOUT[GamepadButton::A.index()], Button::South);
        assert_eq!(GamepadButton::from_index(10), None);
    }
}
