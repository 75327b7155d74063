//! The shared shape of every push-to-talk input.

use super::keyboard::KeyEvent;

/// Anything that can report whether its binding is currently held.
///
/// Keyboard and wheel adapters are pushed events and answer from their
/// latest state; the gamepad adapter queries its device when sampled.
pub trait InputSource: Send {
    fn sample(&mut self) -> bool;
}

/// Everything the binding manager reacts to, delivered on one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSignal {
    /// An OS-level key transition.
    Key(KeyEvent),
    /// A poll tick from the gamepad timer started for `generation`.
    GamepadTick { generation: u64 },
    /// A raw input report from the wheel device.
    WheelReport(Vec<u8>),
}
