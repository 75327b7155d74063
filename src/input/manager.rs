//! Owns the live push-to-talk binding and turns device signals into edges.
//!
//! ```text
//! OS key listener ──┐
//! gamepad timer ────┼──► InputSignal channel ──► InputBindingManager ──► gate ──► subscribers
//! wheel reader ─────┘
//! ```
//!
//! Every signal is checked against the binding that is live when it is
//! handled. Ticks from a replaced gamepad timer carry an old generation and
//! the wheel reader is detached when its binding goes away, so a binding
//! switch can never be followed by an edge from the previous device.
//!
//! Key events keep updating the parked keyboard state while another device
//! is bound, so returning to the keyboard starts from what is really held.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use super::InputError;
use super::gamepad::{GAMEPAD_POLL_INTERVAL, GamepadAdapter, GamepadBackend};
use super::gate::PushToTalkGate;
use super::keybind::Keybind;
use super::keyboard::KeyboardAdapter;
use super::source::{InputSignal, InputSource};
use super::wheel::{WHEEL_PRODUCT_ID, WHEEL_VENDOR_ID, WheelAdapter, WheelBackend};

/// Device backends available to the manager. Missing backends make the
/// corresponding binding type fail to activate.
#[derive(Default)]
pub struct InputDevices {
    pub gamepad: Option<Box<dyn GamepadBackend>>,
    pub wheel: Option<Box<dyn WheelBackend>>,
}

enum ActiveSource {
    Keyboard(KeyboardAdapter),
    Gamepad(GamepadAdapter),
    Wheel(WheelAdapter),
    Inactive,
}

pub struct InputBindingManager {
    keybind: Keybind,
    active: ActiveSource,
    gate: PushToTalkGate,
    parked_keys: Option<KeyboardAdapter>,
    generation: u64,
    poll_task: Option<JoinHandle<()>>,
    gamepad_backend: Option<Box<dyn GamepadBackend>>,
    wheel_backend: Option<Box<dyn WheelBackend>>,
    wheel_open: bool,
    signals: UnboundedSender<InputSignal>,
    subscribers: Vec<UnboundedSender<bool>>,
}

impl InputBindingManager {
    /// Creates a manager bound to the default keyboard combination.
    ///
    /// The returned receiver carries every [`InputSignal`]; feed each one to
    /// [`handle_signal`](Self::handle_signal).
    pub fn new(devices: InputDevices) -> (Self, UnboundedReceiver<InputSignal>) {
        let (signals, receiver) = mpsc::unbounded_channel();
        let keybind = Keybind::default();
        let active = match &keybind {
            Keybind::Keyboard { key } => ActiveSource::Keyboard(KeyboardAdapter::new(key.clone())),
            _ => ActiveSource::Inactive,
        };
        let manager = Self {
            keybind,
            active,
            gate: PushToTalkGate::new(),
            parked_keys: None,
            generation: 0,
            poll_task: None,
            gamepad_backend: devices.gamepad,
            wheel_backend: devices.wheel,
            wheel_open: false,
            signals,
            subscribers: Vec::new(),
        };
        (manager, receiver)
    }

    /// Sender for OS-level listeners to deliver key events.
    pub fn signal_sender(&self) -> UnboundedSender<InputSignal> {
        self.signals.clone()
    }

    pub fn keybind(&self) -> &Keybind {
        &self.keybind
    }

    pub fn is_pressed(&self) -> bool {
        self.gate.is_pressed()
    }

    /// Receives every press (`true`) and release (`false`) edge.
    pub fn subscribe(&mut self) -> UnboundedReceiver<bool> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Replaces the live binding.
    ///
    /// The previous source is fully detached before the new one is installed.
    /// Nothing is emitted by the switch itself: the next sample of the new
    /// source is compared against the last emitted state. If the new source
    /// cannot be activated the binding is recorded but stays inert.
    pub fn set_keybind(&mut self, keybind: Keybind) -> Result<(), InputError> {
        self.deactivate();
        self.keybind = keybind.clone();

        self.active = match keybind {
            Keybind::Keyboard { key } => ActiveSource::Keyboard(match self.parked_keys.take() {
                Some(parked) => parked.rebind(key),
                None => KeyboardAdapter::new(key),
            }),
            Keybind::Gamepad { key } => {
                let backend = self
                    .gamepad_backend
                    .take()
                    .ok_or(InputError::Unavailable("gamepad"))?;
                self.start_polling();
                ActiveSource::Gamepad(GamepadAdapter::new(key, backend))
            }
            Keybind::WheelDevice { boolean_bit_offset } => {
                self.ensure_wheel_open()?;
                if let Some(backend) = self.wheel_backend.as_mut() {
                    backend.attach(self.signals.clone());
                }
                ActiveSource::Wheel(WheelAdapter::new(boolean_bit_offset))
            }
        };

        info!("Push-to-talk bound to {}", self.keybind);
        Ok(())
    }

    /// Feeds one signal through the live source and the gate.
    ///
    /// Returns the edge, if any, after delivering it to subscribers.
    pub fn handle_signal(&mut self, signal: InputSignal) -> Option<bool> {
        let composite = match (&mut self.active, signal) {
            (ActiveSource::Keyboard(adapter), InputSignal::Key(event)) => {
                adapter.handle(&event);
                adapter.sample()
            }
            (ActiveSource::Gamepad(adapter), InputSignal::GamepadTick { generation })
                if generation == self.generation =>
            {
                adapter.sample()
            }
            (ActiveSource::Wheel(adapter), InputSignal::WheelReport(report)) => {
                adapter.on_report(&report);
                adapter.sample()
            }
            (_, InputSignal::Key(event)) => {
                if let Some(parked) = self.parked_keys.as_mut() {
                    parked.handle(&event);
                }
                return None;
            }
            (_, signal) => {
                trace!("Dropping signal for inactive source: {:?}", signal);
                return None;
            }
        };

        let edge = self.gate.evaluate(composite)?;
        debug!("Push-to-talk {}", if edge { "pressed" } else { "released" });
        self.subscribers.retain(|tx| tx.send(edge).is_ok());
        Some(edge)
    }

    fn deactivate(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        self.generation += 1;
        match std::mem::replace(&mut self.active, ActiveSource::Inactive) {
            ActiveSource::Keyboard(adapter) => self.parked_keys = Some(adapter),
            ActiveSource::Gamepad(adapter) => self.gamepad_backend = Some(adapter.into_backend()),
            ActiveSource::Wheel(_) => {
                if let Some(backend) = self.wheel_backend.as_mut() {
                    backend.detach();
                }
                debug!("Detached wheel listener");
            }
            ActiveSource::Inactive => {}
        }
    }

    fn start_polling(&mut self) {
        let generation = self.generation;
        let signals = self.signals.clone();
        self.poll_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(GAMEPAD_POLL_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if signals.send(InputSignal::GamepadTick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    fn ensure_wheel_open(&mut self) -> Result<(), InputError> {
        if self.wheel_open {
            return Ok(());
        }
        let backend = self
            .wheel_backend
            .as_mut()
            .ok_or(InputError::Unavailable("wheel"))?;
        backend.open(WHEEL_VENDOR_ID, WHEEL_PRODUCT_ID)?;
        self.wheel_open = true;
        info!(
            "Opened wheel device {:04x}:{:04x}",
            WHEEL_VENDOR_ID, WHEEL_PRODUCT_ID
        );
        Ok(())
    }
}

impl Drop for InputBindingManager {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        if let Some(backend) = self.wheel_backend.as_mut() {
            backend.detach();
        }
    }
}
