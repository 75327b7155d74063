//! Per-participant listening preferences.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::store::{DefaultParticipantSettingsKey, LocalStore, ParticipantSettingsKey};

pub const VOLUME_RANGE: RangeInclusive<f64> = 0.0..=300.0;
pub const POST_PROCESSING_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// Percentages; 100 is unity volume and the full radio effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSettings {
    pub volume: f64,
    pub post_processing_amount: f64,
}

impl Default for ParticipantSettings {
    fn default() -> Self {
        Self {
            volume: 100.0,
            post_processing_amount: 100.0,
        }
    }
}

impl ParticipantSettings {
    /// Settings from user input, rejecting values outside the UI ranges.
    pub fn checked(volume: f64, post_processing_amount: f64) -> Result<Self, SettingsError> {
        Ok(Self {
            volume: check_range("volume", volume, VOLUME_RANGE)?,
            post_processing_amount: check_range(
                "amount",
                post_processing_amount,
                POST_PROCESSING_RANGE,
            )?,
        })
    }

    /// Volume as a gain factor.
    pub fn volume_fraction(&self) -> f64 {
        self.volume / 100.0
    }

    /// Effect amount as a radio intensity in `0..=1`.
    pub fn intensity(&self) -> f64 {
        self.post_processing_amount / 100.0
    }
}

pub type SettingsMap = BTreeMap<String, ParticipantSettings>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("`{field}` must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

pub(crate) fn check_range(
    field: &'static str,
    value: f64,
    range: RangeInclusive<f64>,
) -> Result<f64, SettingsError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(SettingsError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Defaults plus per-uuid overrides, written through to the store.
#[derive(Debug, Clone, Default)]
pub struct SettingsBook {
    defaults: ParticipantSettings,
    overrides: SettingsMap,
}

impl SettingsBook {
    pub fn load(store: &LocalStore) -> Self {
        Self {
            defaults: store.get::<DefaultParticipantSettingsKey>().unwrap_or_default(),
            overrides: store.get::<ParticipantSettingsKey>().unwrap_or_default(),
        }
    }

    pub fn defaults(&self) -> ParticipantSettings {
        self.defaults
    }

    /// The override for `uuid`, falling back to the current defaults.
    pub fn resolve(&self, uuid: Option<&str>) -> ParticipantSettings {
        uuid.and_then(|uuid| self.overrides.get(uuid))
            .copied()
            .unwrap_or(self.defaults)
    }

    pub fn has_override(&self, uuid: &str) -> bool {
        self.overrides.contains_key(uuid)
    }

    /// Edits the override for `uuid`, creating it from the defaults on first
    /// change. Overrides are never removed.
    pub fn update_override(
        &mut self,
        store: &mut LocalStore,
        uuid: &str,
        edit: impl FnOnce(&mut ParticipantSettings),
    ) -> ParticipantSettings {
        let defaults = self.defaults;
        let entry = self.overrides.entry(uuid.to_string()).or_insert(defaults);
        edit(entry);
        let updated = *entry;
        if let Err(e) = store.set::<ParticipantSettingsKey>(&self.overrides) {
            warn!("Failed to persist settings for {}: {:#}", uuid, e);
        }
        updated
    }

    pub fn update_defaults(
        &mut self,
        store: &mut LocalStore,
        edit: impl FnOnce(&mut ParticipantSettings),
    ) -> ParticipantSettings {
        edit(&mut self.defaults);
        if let Err(e) = store.set::<DefaultParticipantSettingsKey>(&self.defaults) {
            warn!("Failed to persist default settings: {:#}", e);
        }
        self.defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape_and_defaults() {
        assert_eq!(
            serde_json::to_value(ParticipantSettings::default()).unwrap(),
            json!({"volume": 100.0, "postProcessingAmount": 100.0})
        );
        let parsed: ParticipantSettings =
            serde_json::from_value(json!({"volume": 150, "postProcessingAmount": 50})).unwrap();
        assert_eq!(parsed.volume_fraction(), 1.5);
        assert_eq!(parsed.intensity(), 0.5);
    }

    #[test]
    fn test_override_copies_defaults_once() {
        let mut store = LocalStore::in_memory();
        let mut book = SettingsBook::default();
        book.update_defaults(&mut store, |s| s.post_processing_amount = 40.0);
        book.update_override(&mut store, "u1", |s| s.volume = 200.0);
        assert_eq!(
            book.resolve(Some("u1")),
            ParticipantSettings {
                volume: 200.0,
                post_processing_amount: 40.0
            }
        );

        // Later default changes no longer reach an existing override.
        book.update_defaults(&mut store, |s| s.post_processing_amount = 10.0);
        assert_eq!(book.resolve(Some("u1")).post_processing_amount, 40.0);
        assert_eq!(book.resolve(Some("u2")).post_processing_amount, 10.0);
        assert_eq!(book.resolve(None), book.defaults());

        let reloaded = SettingsBook::load(&store);
        assert!(reloaded.has_override("u1"));
        assert_eq!(reloaded.defaults().post_processing_amount, 10.0);
    }

    #[test]
    fn test_checked_settings() {
        let settings = ParticipantSettings::checked(150.0, 50.0).unwrap();
        assert_eq!(settings.volume_fraction(), 1.5);
        assert_eq!(settings.intensity(), 0.5);
        assert!(matches!(
            ParticipantSettings::checked(100.0, 500.0),
            Err(SettingsError::OutOfRange { field: "amount", .. })
        ));
        assert!(matches!(
            ParticipantSettings::checked(-1.0, 0.0),
            Err(SettingsError::OutOfRange { field: "volume", .. })
        ));
        assert!(ParticipantSettings::checked(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_range_check() {
        assert_eq!(check_range("volume", 300.0, VOLUME_RANGE), Ok(300.0));
        assert_eq!(
            check_range("amount", 101.0, POST_PROCESSING_RANGE),
            Err(SettingsError::OutOfRange {
                field: "amount",
                value: 101.0,
                min: 0.0,
                max: 100.0
            })
        );
    }
}
