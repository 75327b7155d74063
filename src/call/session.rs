//! One joined room: wires SDK events to the registry, cues, mixer and overlay.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use super::client::{
    AudioProcessor, CallClient, CallErrorKind, CallEvent, InputDevice, InputSettings, JoinOptions,
    UserData,
};
use super::mixer::OutputMixer;
use super::participants::ParticipantStreamRegistry;
use super::sounds::{Cue, CuePlayer};
use super::speaking::SpeakingActivityTracker;
use crate::bridge::DesktopApi;
use crate::config::ClientConfig;
use crate::state::store::{RogerBeepEnabledKey, SelectedAudioInputKey, SelfPlaybackKey, UserKey};
use crate::state::{OverlayPatch, OverlayUser, SharedStore};

/// How the local user takes part in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRole {
    /// Talks and is listed, identified by the stable user uuid.
    Speaker { uuid: String },
    /// Only listens; shows up in the guest count.
    Listener,
}

pub struct CallSession<C, P> {
    client: Arc<C>,
    cues: P,
    registry: ParticipantStreamRegistry,
    tracker: SpeakingActivityTracker,
    mixer: Arc<OutputMixer>,
    store: SharedStore,
    config: ClientConfig,
    roger_beep: bool,
    self_playback: bool,
    input_devices: Vec<String>,
    input_device: Option<String>,
}

impl<C, P> CallSession<C, P>
where
    C: CallClient,
    P: CuePlayer + Clone + Send + 'static,
{
    pub fn new(
        client: Arc<C>,
        cues: P,
        mixer: Arc<OutputMixer>,
        store: SharedStore,
        config: ClientConfig,
    ) -> Self {
        let (roger_beep, self_playback) = {
            let store = store.lock().unwrap();
            (
                store.get::<RogerBeepEnabledKey>().unwrap_or(true),
                store.get::<SelfPlaybackKey>().unwrap_or(false),
            )
        };
        Self {
            client,
            cues,
            registry: ParticipantStreamRegistry::new(store.clone()),
            tracker: SpeakingActivityTracker::new(),
            mixer,
            store,
            config,
            roger_beep,
            self_playback,
            input_devices: Vec::new(),
            input_device: None,
        }
    }

    /// Announces the local user and joins `server_id` with the microphone off.
    ///
    /// Subscribes before joining so no event is missed.
    pub async fn join(
        &mut self,
        server_id: &str,
        role: SessionRole,
    ) -> Result<UnboundedReceiver<CallEvent>> {
        let events = self.client.subscribe();
        let url = self.config.room_url(server_id)?;

        match &role {
            SessionRole::Speaker { uuid } => {
                let profile = self.store.lock().unwrap().get::<UserKey>();
                self.client
                    .set_user_data(UserData {
                        uuid: Some(uuid.clone()),
                        avatar_url: profile.as_ref().map(|p| p.avatar.clone()),
                        is_listener: false,
                    })
                    .await
                    .context("Failed to set user data")?;

                let settings = InputSettings {
                    processor: AudioProcessor::NoiseCancellation,
                };
                if let Err(e) = self.client.update_input_settings(settings).await {
                    debug!("Noise cancellation unavailable: {:#}", e);
                }

                self.client
                    .set_user_name(profile.as_ref().map_or("", |p| p.username.as_str()));
            }
            SessionRole::Listener => {
                self.client
                    .set_user_data(UserData {
                        is_listener: true,
                        ..Default::default()
                    })
                    .await
                    .context("Failed to set user data")?;
                let name = format!("listener:{}", chrono::Utc::now().timestamp_millis());
                self.client.set_user_name(&name);
            }
        }

        self.client
            .join(
                &url,
                JoinOptions {
                    start_audio_off: true,
                },
            )
            .await
            .with_context(|| format!("Failed to join {url}"))?;
        info!("Joined {}", url);

        if matches!(role, SessionRole::Speaker { .. }) {
            self.cues.play(Cue::Join);
        }
        Ok(events)
    }

    /// Handles one SDK event. Returns the overlay update it produced, if any.
    pub fn handle_event(&mut self, event: CallEvent) -> Option<OverlayPatch> {
        if let CallEvent::Error(e) = &event {
            match e.kind {
                CallErrorKind::Fatal => error!("Call error: {}", e),
                _ => warn!("Call error: {}", e),
            }
            return None;
        }
        Some(self.refresh())
    }

    /// Reconciles against the SDK's current snapshot and updates cues and
    /// the mix.
    pub fn refresh(&mut self) -> OverlayPatch {
        let snapshot = self.client.participants();
        let report = self.registry.reconcile(&snapshot);
        if !report.created.is_empty() || !report.torn_down.is_empty() {
            debug!("Reconciled: {:?}", report);
        }

        self.tracker
            .observe(self.registry.speaker_count())
            .play(&self.cues, self.roger_beep);
        self.mixer
            .set_tracks(self.registry.audible_tracks(self.self_playback));

        self.overlay_patch()
    }

    pub fn overlay_patch(&self) -> OverlayPatch {
        let users = self
            .registry
            .roster()
            .into_iter()
            .map(|entry| OverlayUser {
                uuid: entry.uuid,
                user_name: entry.user_name,
                avatar_url: entry.avatar_url,
                is_speaking: entry.is_speaking,
            })
            .collect();
        OverlayPatch {
            users: Some(users),
            guest_count: Some(self.registry.guest_count()),
            ..Default::default()
        }
    }

    /// Push-to-talk edge from the desktop side.
    pub fn on_ptt(&self, pressed: bool) {
        debug!("Local push-to-talk {}", pressed);
        self.client.set_local_audio(pressed);
    }

    pub fn set_self_playback(&mut self, enabled: bool) {
        self.self_playback = enabled;
        self.persist::<SelfPlaybackKey>(&enabled);
        self.mixer
            .set_tracks(self.registry.audible_tracks(self.self_playback));
    }

    pub fn set_roger_beep(&mut self, enabled: bool) {
        self.roger_beep = enabled;
        self.persist::<RogerBeepEnabledKey>(&enabled);
    }

    /// Replaces the microphones that can be picked.
    ///
    /// When the current choice is missing from the new list, the stored
    /// choice is used if present and the first device otherwise, and the SDK
    /// is switched to it.
    pub async fn set_input_devices(&mut self, devices: Vec<String>) -> Result<()> {
        self.input_devices = devices;
        if self
            .input_device
            .as_ref()
            .is_some_and(|current| self.input_devices.contains(current))
        {
            return Ok(());
        }
        let stored = self.store.lock().unwrap().get::<SelectedAudioInputKey>();
        self.input_device = stored
            .filter(|name| self.input_devices.contains(name))
            .or_else(|| self.input_devices.first().cloned());
        self.apply_input_device().await
    }

    /// Captures from `device_id` from now on and remembers the choice.
    ///
    /// Returns `false` without touching anything if the device is not listed.
    pub async fn select_input_device(&mut self, device_id: &str) -> Result<bool> {
        if !self.input_devices.iter().any(|name| name == device_id) {
            debug!("Ignoring unknown input device {:?}", device_id);
            return Ok(false);
        }
        self.persist::<SelectedAudioInputKey>(&device_id.to_string());
        self.input_device = Some(device_id.to_string());
        self.apply_input_device().await?;
        Ok(true)
    }

    pub fn input_devices(&self) -> &[String] {
        &self.input_devices
    }

    pub fn input_device(&self) -> Option<&str> {
        self.input_device.as_deref()
    }

    async fn apply_input_device(&self) -> Result<()> {
        let device = InputDevice {
            device_id: self.input_device.clone(),
            auto_gain_control: false,
        };
        self.client
            .set_input_device(device)
            .await
            .context("Failed to switch input device")?;
        info!(
            "Capturing from {}",
            self.input_device.as_deref().unwrap_or("the default input")
        );
        Ok(())
    }

    fn persist<K: crate::state::StoreKey>(&self, value: &K::Value) {
        if let Err(e) = self.store.lock().unwrap().set::<K>(value) {
            warn!("Failed to persist {}: {:#}", K::KEY, e);
        }
    }

    pub fn registry(&self) -> &ParticipantStreamRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ParticipantStreamRegistry {
        &mut self.registry
    }

    pub async fn leave(&mut self) -> Result<()> {
        self.client.leave().await.context("Failed to leave call")?;
        self.registry.reconcile(&[]);
        self.tracker.observe(0);
        self.cues.set_loop(false);
        self.mixer.set_tracks(Vec::new());
        info!("Left call");
        Ok(())
    }

    /// Runs the session until the SDK event stream ends.
    ///
    /// Push-to-talk edges are forwarded to the SDK and every participant
    /// change is pushed to the overlay. The overlay is disabled on exit.
    pub async fn run(
        &mut self,
        mut events: UnboundedReceiver<CallEvent>,
        mut ptt: UnboundedReceiver<bool>,
        desktop: DesktopApi,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    if let Some(patch) = self.handle_event(event) {
                        desktop.overlay_update_state(patch);
                    }
                }
                Some(pressed) = ptt.recv() => self.on_ptt(pressed),
            }
        }
        desktop.overlay_set_enabled(false);
    }
}
