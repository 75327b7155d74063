//! Persisted user preferences.
//!
//! The store is one JSON object on disk mapping a key to a string. Each string
//! is itself the JSON encoding of `{"value": payload}`, so every entry can be
//! read back without knowing its type up front.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::overlay::OverlayOptions;
use super::settings::{ParticipantSettings, SettingsMap};
use crate::input::Keybind;

/// A typed entry in the [`LocalStore`].
pub trait StoreKey {
    const KEY: &'static str;
    type Value: Serialize + DeserializeOwned;
}

macro_rules! store_keys {
    ($($(#[$meta:meta])* $name:ident => $key:literal : $value:ty;)*) => {
        $(
            $(#[$meta])*
            pub struct $name;

            impl StoreKey for $name {
                const KEY: &'static str = $key;
                type Value = $value;
            }
        )*
    };
}

/// The profile shown to other participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub avatar: String,
}

store_keys! {
    KeybindKey => "keybind": Keybind;
    DefaultParticipantSettingsKey => "defaultParticipantSettings": ParticipantSettings;
    /// Per-user overrides keyed by uuid.
    ParticipantSettingsKey => "participantSettings": SettingsMap;
    OverlayOptionsKey => "overlayOptions": OverlayOptions;
    /// Whether the local participant hears their own radio output.
    SelfPlaybackKey => "selfPlayback": bool;
    RogerBeepEnabledKey => "rogerBeepEnabled": bool;
    UserKey => "user": UserProfile;
    /// Microphone chosen by the user, by device name.
    SelectedAudioInputKey => "selectedAudioInput": String;
}

#[derive(Serialize)]
struct Wrapped<'a, T> {
    value: &'a T,
}

#[derive(Deserialize)]
struct Unwrapped<T> {
    value: T,
}

/// The store as shared between the registry, the session and the bridge.
pub type SharedStore = Arc<Mutex<LocalStore>>;

/// File-backed key/value store. Writes go straight to disk.
#[derive(Debug)]
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Store {} is not a JSON object of strings", path.display()))?
        } else {
            BTreeMap::new()
        };
        debug!("Opened store {} with {} entries", path.display(), entries.len());
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn get<K: StoreKey>(&self) -> Option<K::Value> {
        let raw = self.entries.get(K::KEY)?;
        match serde_json::from_str::<Unwrapped<K::Value>>(raw) {
            Ok(wrapped) => Some(wrapped.value),
            Err(e) => {
                warn!("Ignoring unreadable store entry {}: {}", K::KEY, e);
                None
            }
        }
    }

    pub fn set<K: StoreKey>(&mut self, value: &K::Value) -> Result<()> {
        let raw = serde_json::to_string(&Wrapped { value })
            .with_context(|| format!("Failed to encode store entry {}", K::KEY))?;
        self.entries.insert(K::KEY.to_string(), raw);
        self.flush()
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Raw string as written for `K`.
    pub fn raw<K: StoreKey>(&self) -> Option<&str> {
        self.entries.get(K::KEY).map(String::as_str)
    }

    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, raw).with_context(|| format!("Failed to write store {}", path.display()))
    }
}
