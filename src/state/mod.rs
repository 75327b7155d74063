//! Persisted preferences and shared view state.
//!
//! - [`store`] - the typed key/value [`LocalStore`]
//! - [`settings`] - per-participant volume and effect amount
//! - [`overlay`] - what the overlay window displays

pub mod overlay;
pub mod settings;
pub mod store;

pub use overlay::{OverlayOptions, OverlayPatch, OverlayPosition, OverlayState, OverlayUser};
pub use settings::{ParticipantSettings, SettingsBook, SettingsError, SettingsMap};
pub use store::{LocalStore, SharedStore, StoreKey, UserProfile};
