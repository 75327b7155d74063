//! OS integrations for the input adapters.
//!
//! Each backend sits behind its own cargo feature so the core builds without
//! any system input libraries:
//!
//! - `global-keys` - [`hotkey::GlobalKeyListener`] over `global-hotkey`
//! - `gamepad` - [`pads::GilrsBackend`] over `gilrs`
//! - `wheel` - [`hid::HidWheelBackend`] over `hidapi`

#[cfg(feature = "wheel")]
pub mod hid;
#[cfg(feature = "global-keys")]
pub mod hotkey;
#[cfg(feature = "gamepad")]
pub mod pads;

#[allow(unused_imports)]
use tracing::warn;

use super::manager::InputDevices;

/// Collects whichever device backends this build supports.
pub fn detect() -> InputDevices {
    #[allow(unused_mut)]
    let mut devices = InputDevices::default();

    #[cfg(feature = "gamepad")]
    match pads::GilrsBackend::spawn() {
        Ok(backend) => devices.gamepad = Some(Box::new(backend)),
        Err(e) => warn!("Gamepad support unavailable: {}", e),
    }

    #[cfg(feature = "wheel")]
    {
        devices.wheel = Some(Box::new(hid::HidWheelBackend::default()));
    }

    devices
}
