//! Keeps one radio graph per remote voice in step with the SDK's snapshot.
//!
//! Every participant event triggers a full [`reconcile`] over the current
//! snapshot. Per session the registry holds a dry [`MediaStream`] whose track
//! is swapped in place, and at most one [`RadioEffect`] built on top of it.
//! A graph lives from the first time a track shows up until the track goes
//! away or the participant leaves; settings changes retune it in place.
//!
//! [`reconcile`]: ParticipantStreamRegistry::reconcile

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::client::Participant;
use super::radio::{RadioControls, RadioEffect};
use crate::audio::{AudioTrack, MediaStream, TrackId};
use crate::state::settings::{POST_PROCESSING_RANGE, VOLUME_RANGE, check_range};
use crate::state::{ParticipantSettings, SettingsBook, SettingsError, SharedStore};

#[derive(Default)]
struct ParticipantStreams {
    dry: MediaStream,
    wet: Option<RadioEffect>,
}

impl ParticipantStreams {
    fn teardown(&mut self) -> bool {
        match self.wet.take() {
            Some(wet) => {
                wet.teardown();
                true
            }
            None => false,
        }
    }
}

/// What one [`ParticipantStreamRegistry::reconcile`] pass changed, by
/// session id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub dry_swapped: Vec<String>,
    pub created: Vec<String>,
    pub retuned: Vec<String>,
    pub torn_down: Vec<String>,
    pub departed: Vec<String>,
}

/// A participant as presented to the UI and the overlay.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub uuid: String,
    pub user_name: String,
    pub avatar_url: String,
    pub session_id: String,
    pub is_me: bool,
    pub is_speaking: bool,
    pub settings: ParticipantSettings,
    pub wet: Option<AudioTrack>,
}

pub struct ParticipantStreamRegistry {
    streams: HashMap<String, ParticipantStreams>,
    participants: Vec<Participant>,
    settings: SettingsBook,
    store: SharedStore,
}

impl ParticipantStreamRegistry {
    pub fn new(store: SharedStore) -> Self {
        let settings = SettingsBook::load(&store.lock().unwrap());
        Self {
            streams: HashMap::new(),
            participants: Vec::new(),
            settings,
            store,
        }
    }

    pub fn reconcile(&mut self, snapshot: &[Participant]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for participant in snapshot {
            let id = &participant.session_id;
            let settings = self.settings.resolve(participant.uuid());
            let streams = self.streams.entry(id.clone()).or_default();
            let persistent = participant.audio.persistent_track.as_ref();

            if streams.dry.track_id().as_ref() != persistent.map(AudioTrack::id) {
                streams.dry.replace_track(persistent.cloned());
                report.dry_swapped.push(id.clone());
            }

            if persistent.is_none() {
                if streams.teardown() {
                    debug!("Audio track lost for \"{}\" (id:{})", participant.user_name, id);
                    report.torn_down.push(id.clone());
                }
                continue;
            }

            match &streams.wet {
                None => {
                    debug!(
                        "MEMORY WATCHDOG: Setting up post processing for \"{}\" (id:{})",
                        participant.user_name, id
                    );
                    streams.wet = Some(RadioEffect::create(
                        &streams.dry,
                        settings.volume_fraction(),
                        settings.intensity(),
                    ));
                    report.created.push(id.clone());
                }
                Some(wet) => {
                    apply(wet.controls(), settings);
                    report.retuned.push(id.clone());
                }
            }
        }

        let present: HashSet<&str> = snapshot.iter().map(|p| p.session_id.as_str()).collect();
        self.streams.retain(|id, streams| {
            if present.contains(id.as_str()) {
                return true;
            }
            streams.teardown();
            info!("Participant {} left", id);
            report.departed.push(id.clone());
            false
        });

        self.participants = snapshot.to_vec();
        report
    }

    /// Participants with a profile, in snapshot order.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.participants
            .iter()
            .filter(|p| !p.is_listener())
            .map(|p| {
                let data = p.user_data.clone().unwrap_or_default();
                RosterEntry {
                    uuid: data.uuid.unwrap_or_default(),
                    user_name: p.user_name.clone(),
                    avatar_url: data.avatar_url.unwrap_or_default(),
                    session_id: p.session_id.clone(),
                    is_me: p.local,
                    is_speaking: p.is_speaking(),
                    settings: self.settings.resolve(p.uuid()),
                    wet: self.wet_track(&p.session_id),
                }
            })
            .collect()
    }

    pub fn guest_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_listener()).count()
    }

    pub fn speaker_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_speaking()).count()
    }

    /// Wet tracks that should be heard right now.
    pub fn audible_tracks(&self, self_playback: bool) -> Vec<AudioTrack> {
        self.roster()
            .into_iter()
            .filter(|entry| entry.is_speaking && (!entry.is_me || self_playback))
            .filter_map(|entry| entry.wet)
            .collect()
    }

    pub fn controls(&self, session_id: &str) -> Option<RadioControls> {
        let wet = self.streams.get(session_id)?.wet.as_ref()?;
        Some(wet.controls().clone())
    }

    pub fn dry_track_id(&self, session_id: &str) -> Option<TrackId> {
        self.streams.get(session_id)?.dry.track_id()
    }

    pub fn wet_track(&self, session_id: &str) -> Option<AudioTrack> {
        let wet = self.streams.get(session_id)?.wet.as_ref()?;
        Some(wet.output().clone())
    }

    pub fn defaults(&self) -> ParticipantSettings {
        self.settings.defaults()
    }

    pub fn settings_for(&self, uuid: &str) -> ParticipantSettings {
        self.settings.resolve(Some(uuid))
    }

    /// Sets the volume percentage, `0..=300`, for one user.
    pub fn update_volume(
        &mut self,
        uuid: &str,
        volume: f64,
    ) -> Result<ParticipantSettings, SettingsError> {
        let volume = check_range("volume", volume, VOLUME_RANGE)?;
        let updated = {
            let mut store = self.store.lock().unwrap();
            self.settings
                .update_override(&mut store, uuid, |s| s.volume = volume)
        };
        self.retune();
        Ok(updated)
    }

    /// Sets the effect amount percentage, `0..=100`, for one user.
    pub fn update_post_processing(
        &mut self,
        uuid: &str,
        amount: f64,
    ) -> Result<ParticipantSettings, SettingsError> {
        let amount = check_range("amount", amount, POST_PROCESSING_RANGE)?;
        let updated = {
            let mut store = self.store.lock().unwrap();
            self.settings
                .update_override(&mut store, uuid, |s| s.post_processing_amount = amount)
        };
        self.retune();
        Ok(updated)
    }

    pub fn update_default_volume(&mut self, volume: f64) -> Result<ParticipantSettings, SettingsError> {
        let volume = check_range("volume", volume, VOLUME_RANGE)?;
        let updated = {
            let mut store = self.store.lock().unwrap();
            self.settings.update_defaults(&mut store, |s| s.volume = volume)
        };
        self.retune();
        Ok(updated)
    }

    pub fn update_default_post_processing(
        &mut self,
        amount: f64,
    ) -> Result<ParticipantSettings, SettingsError> {
        let amount = check_range("amount", amount, POST_PROCESSING_RANGE)?;
        let updated = {
            let mut store = self.store.lock().unwrap();
            self.settings
                .update_defaults(&mut store, |s| s.post_processing_amount = amount)
        };
        self.retune();
        Ok(updated)
    }

    /// Re-applies resolved settings to every live graph.
    fn retune(&self) {
        for participant in &self.participants {
            if let Some(controls) = self.controls(&participant.session_id) {
                apply(&controls, self.settings.resolve(participant.uuid()));
            }
        }
    }
}

impl Drop for ParticipantStreamRegistry {
    fn drop(&mut self) {
        for streams in self.streams.values_mut() {
            streams.teardown();
        }
    }
}

fn apply(controls: &RadioControls, settings: ParticipantSettings) {
    controls.adjust_intensity(settings.intensity());
    controls.adjust_volume(settings.volume_fraction());
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::call::client::{ParticipantAudio, TrackState, UserData};
    use crate::state::LocalStore;

    pub(crate) fn speaker(session: &str, uuid: &str, track: Option<&AudioTrack>) -> Participant {
        Participant {
            session_id: session.to_string(),
            user_name: format!("user-{session}"),
            local: false,
            user_data: Some(UserData {
                uuid: Some(uuid.to_string()),
                avatar_url: Some(format!("https://avatars/{uuid}.png")),
                is_listener: false,
            }),
            audio: ParticipantAudio {
                state: if track.is_some() {
                    TrackState::Playable
                } else {
                    TrackState::Off
                },
                persistent_track: track.cloned(),
            },
        }
    }

    fn listener(session: &str) -> Participant {
        Participant {
            session_id: session.to_string(),
            user_name: format!("listener:{session}"),
            user_data: Some(UserData {
                is_listener: true,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn registry() -> ParticipantStreamRegistry {
        ParticipantStreamRegistry::new(LocalStore::in_memory().shared())
    }

    fn track(id: &str) -> AudioTrack {
        AudioTrack::from_samples(id, vec![0.0; 64])
    }

    #[test]
    fn test_settings_scenario_reaches_new_graph() {
        let mut registry = registry();
        registry.update_volume("u1", 150.0).unwrap();
        registry.update_post_processing("u1", 50.0).unwrap();

        let report = registry.reconcile(&[speaker("s1", "u1", Some(&track("t1")))]);
        assert_eq!(report.created, vec!["s1".to_string()]);

        let controls = registry.controls("s1").unwrap();
        assert_eq!(controls.volume(), 1.5);
        let params = controls.params();
        assert_eq!(params.intensity, 0.5);
        assert_eq!(params.bandpass_q, 0.5);
        assert_eq!(params.highpass_cutoff, 150.0);
        assert_eq!(params.wet_gain, 0.875);
    }

    #[test]
    fn test_unchanged_track_keeps_graph() {
        let mut registry = registry();
        let t1 = track("t1");

        registry.reconcile(&[speaker("s1", "u1", Some(&t1))]);
        let first = registry.controls("s1").unwrap();

        let report = registry.reconcile(&[speaker("s1", "u1", Some(&t1))]);
        assert!(report.dry_swapped.is_empty());
        assert_eq!(report.retuned, vec!["s1".to_string()]);
        assert!(first.same_graph(&registry.controls("s1").unwrap()));
    }

    #[test]
    fn test_new_track_swaps_dry_but_keeps_graph() {
        let mut registry = registry();
        registry.reconcile(&[speaker("s1", "u1", Some(&track("t1")))]);
        let first = registry.controls("s1").unwrap();

        let report = registry.reconcile(&[speaker("s1", "u1", Some(&track("t2")))]);
        assert_eq!(report.dry_swapped, vec!["s1".to_string()]);
        assert_eq!(registry.dry_track_id("s1"), Some(TrackId::from("t2")));
        assert!(first.same_graph(&registry.controls("s1").unwrap()));
    }

    #[test]
    fn test_track_loss_tears_down_and_rebuilds() {
        let mut registry = registry();
        registry.reconcile(&[speaker("s1", "u1", Some(&track("t1")))]);
        let wet = registry.wet_track("s1").unwrap();
        let first = registry.controls("s1").unwrap();

        let report = registry.reconcile(&[speaker("s1", "u1", None)]);
        assert_eq!(report.torn_down, vec!["s1".to_string()]);
        assert!(wet.is_stopped());
        assert!(registry.controls("s1").is_none());
        assert_eq!(registry.dry_track_id("s1"), None);

        registry.reconcile(&[speaker("s1", "u1", Some(&track("t2")))]);
        assert!(!first.same_graph(&registry.controls("s1").unwrap()));
    }

    #[test]
    fn test_departed_participants_are_forgotten() {
        let mut registry = registry();
        registry.reconcile(&[
            speaker("s1", "u1", Some(&track("t1"))),
            speaker("s2", "u2", Some(&track("t2"))),
        ]);
        let wet = registry.wet_track("s2").unwrap();

        let report = registry.reconcile(&[speaker("s1", "u1", Some(&track("t1")))]);
        assert_eq!(report.departed, vec!["s2".to_string()]);
        assert!(wet.is_stopped());
        assert!(registry.controls("s2").is_none());
    }

    #[test]
    fn test_listeners_are_counted_not_listed() {
        let mut registry = registry();
        let mut me = speaker("s1", "u1", Some(&track("t1")));
        me.local = true;
        registry.reconcile(&[
            me,
            speaker("s2", "u2", None),
            listener("s3"),
            Participant {
                session_id: "s4".into(),
                ..Default::default()
            },
        ]);

        let roster = registry.roster();
        assert_eq!(
            roster.iter().map(|e| e.uuid.as_str()).collect::<Vec<_>>(),
            vec!["u1", "u2"]
        );
        assert_eq!(registry.guest_count(), 2);
        assert_eq!(registry.speaker_count(), 1);

        assert!(registry.audible_tracks(false).is_empty());
        assert_eq!(registry.audible_tracks(true).len(), 1);
    }

    #[test]
    fn test_range_errors_leave_graphs_alone() {
        let mut registry = registry();
        registry.reconcile(&[speaker("s1", "u1", Some(&track("t1")))]);

        assert!(matches!(
            registry.update_volume("u1", 301.0),
            Err(SettingsError::OutOfRange { field: "volume", .. })
        ));
        assert!(matches!(
            registry.update_post_processing("u1", -1.0),
            Err(SettingsError::OutOfRange { field: "amount", max, .. }) if max == 100.0
        ));
        assert!(registry.update_default_post_processing(150.0).is_err());
        assert_eq!(registry.controls("s1").unwrap().volume(), 1.0);
        assert_eq!(registry.controls("s1").unwrap().params().intensity, 1.0);
    }

    #[test]
    fn test_updates_retune_live_graphs() {
        let mut registry = registry();
        registry.reconcile(&[
            speaker("s1", "u1", Some(&track("t1"))),
            speaker("s2", "u2", Some(&track("t2"))),
        ]);
        let first = registry.controls("s1").unwrap();

        registry.update_volume("u1", 50.0).unwrap();
        assert_eq!(first.volume(), 0.5);
        assert!(first.same_graph(&registry.controls("s1").unwrap()));

        registry.update_default_post_processing(20.0).unwrap();
        assert_eq!(registry.controls("s2").unwrap().params().intensity, 0.2);
        // u1's override was copied from the old defaults.
        assert_eq!(first.params().intensity, 1.0);
    }

    #[test]
    fn test_settings_persist_across_registries() {
        let store = LocalStore::in_memory().shared();
        let mut registry = ParticipantStreamRegistry::new(store.clone());
        registry.update_volume("u1", 250.0).unwrap();
        registry.update_default_volume(80.0).unwrap();

        let reopened = ParticipantStreamRegistry::new(store);
        assert_eq!(reopened.settings_for("u1").volume, 250.0);
        assert_eq!(reopened.defaults().volume, 80.0);
    }
}
