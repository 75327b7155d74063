//! The calling SDK as seen by this crate.
//!
//! Transport, signalling and capture all live behind [`CallClient`]. The rest
//! of the crate only consumes participant snapshots and call events.

use std::fmt;
use std::future::Future;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

use crate::audio::AudioTrack;

/// Media state of a participant's audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Blocked,
    #[default]
    Off,
    Sendable,
    Loading,
    Interrupted,
    /// The participant is transmitting.
    Playable,
}

#[derive(Debug, Clone, Default)]
pub struct ParticipantAudio {
    pub state: TrackState,
    pub persistent_track: Option<AudioTrack>,
}

/// Application data every client attaches to itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_listener: bool,
}

/// One row of the SDK's participant snapshot.
#[derive(Debug, Clone, Default)]
pub struct Participant {
    pub session_id: String,
    pub user_name: String,
    pub local: bool,
    pub user_data: Option<UserData>,
    pub audio: ParticipantAudio,
}

impl Participant {
    pub fn uuid(&self) -> Option<&str> {
        self.user_data.as_ref()?.uuid.as_deref()
    }

    /// Listeners join without a profile and never appear in the roster.
    pub fn is_listener(&self) -> bool {
        self.user_data.as_ref().is_none_or(|data| data.is_listener)
    }

    pub fn is_speaking(&self) -> bool {
        self.audio.state == TrackState::Playable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoinOptions {
    pub start_audio_off: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioProcessor {
    #[default]
    None,
    NoiseCancellation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputSettings {
    pub processor: AudioProcessor,
}

/// Which microphone the SDK captures from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    /// `None` picks the system default.
    pub device_id: Option<String>,
    /// Radio voices sound wrong with automatic gain, so callers turn it off.
    pub auto_gain_control: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallErrorKind {
    Fatal,
    Nonfatal,
    Dialin,
    Dialout,
}

impl CallErrorKind {
    /// The SDK event that carries this kind of error.
    pub fn event_name(self) -> &'static str {
        match self {
            CallErrorKind::Fatal => "error",
            CallErrorKind::Nonfatal => "nonfatal-error",
            CallErrorKind::Dialin => "dialin-error",
            CallErrorKind::Dialout => "dialout-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallError {
    pub kind: CallErrorKind,
    pub message: String,
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.event_name(), self.message)
    }
}

#[derive(Debug, Clone)]
pub enum CallEvent {
    ParticipantJoined(Participant),
    ParticipantUpdated(Participant),
    ParticipantLeft(Participant),
    JoinedMeeting,
    Error(CallError),
}

impl CallEvent {
    /// Whether the participant snapshot may have changed.
    pub fn touches_participants(&self) -> bool {
        !matches!(self, CallEvent::Error(_))
    }
}

/// A real-time calling SDK session.
pub trait CallClient: Send + Sync {
    fn join(&self, url: &Url, options: JoinOptions) -> impl Future<Output = Result<()>> + Send;

    fn leave(&self) -> impl Future<Output = Result<()>> + Send;

    /// Starts or stops sending the local microphone.
    fn set_local_audio(&self, enabled: bool);

    fn set_user_name(&self, name: &str);

    fn set_user_data(&self, data: UserData) -> impl Future<Output = Result<()>> + Send;

    fn update_input_settings(
        &self,
        settings: InputSettings,
    ) -> impl Future<Output = Result<()>> + Send;

    fn set_input_device(&self, device: InputDevice) -> impl Future<Output = Result<()>> + Send;

    /// Current snapshot, local participant included.
    fn participants(&self) -> Vec<Participant>;

    fn subscribe(&self) -> UnboundedReceiver<CallEvent>;
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::{Arc, Mutex};

    use anyhow::bail;
    use tokio::sync::mpsc::{self, UnboundedSender};

    use super::*;

    /// Records every call made against it.
    #[derive(Clone, Default)]
    pub struct FakeCallClient {
        pub calls: Arc<Mutex<Vec<String>>>,
        pub participants: Arc<Mutex<Vec<Participant>>>,
        pub events: Arc<Mutex<Vec<UnboundedSender<CallEvent>>>>,
        pub fail_input_settings: bool,
    }

    impl FakeCallClient {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn emit(&self, event: CallEvent) {
            for tx in self.events.lock().unwrap().iter() {
                let _ = tx.send(event.clone());
            }
        }
    }

    impl CallClient for FakeCallClient {
        async fn join(&self, url: &Url, options: JoinOptions) -> Result<()> {
            self.record(format!("join {} off={}", url, options.start_audio_off));
            Ok(())
        }

        async fn leave(&self) -> Result<()> {
            self.record("leave".to_string());
            Ok(())
        }

        fn set_local_audio(&self, enabled: bool) {
            self.record(format!("local_audio {}", enabled));
        }

        fn set_user_name(&self, name: &str) {
            self.record(format!("user_name {}", name));
        }

        async fn set_user_data(&self, data: UserData) -> Result<()> {
            self.record(format!("user_data {}", serde_json::to_string(&data)?));
            Ok(())
        }

        async fn update_input_settings(&self, settings: InputSettings) -> Result<()> {
            self.record(format!("input_settings {:?}", settings.processor));
            if self.fail_input_settings {
                bail!("processor unsupported");
            }
            Ok(())
        }

        async fn set_input_device(&self, device: InputDevice) -> Result<()> {
            self.record(format!(
                "input_device {} agc={}",
                device.device_id.as_deref().unwrap_or("default"),
                device.auto_gain_control
            ));
            Ok(())
        }

        fn participants(&self) -> Vec<Participant> {
            self.participants.lock().unwrap().clone()
        }

        fn subscribe(&self) -> UnboundedReceiver<CallEvent> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.events.lock().unwrap().push(tx);
            rx
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_data_shapes() {
        let speaker = UserData {
            uuid: Some("abc".into()),
            avatar_url: Some("https://a/b.png".into()),
            is_listener: false,
        };
        assert_eq!(
            serde_json::to_value(&speaker).unwrap(),
            json!({"uuid": "abc", "avatarUrl": "https://a/b.png"})
        );
        let listener: UserData = serde_json::from_value(json!({"isListener": true})).unwrap();
        assert!(listener.is_listener);
        assert_eq!(listener.uuid, None);
    }

    #[test]
    fn test_listener_detection() {
        let mut participant = Participant::default();
        assert!(participant.is_listener());
        participant.user_data = Some(UserData {
            uuid: Some("u".into()),
            ..Default::default()
        });
        assert!(!participant.is_listener());
        assert_eq!(participant.uuid(), Some("u"));
    }

    #[test]
    fn test_error_event_names() {
        let error = CallError {
            kind: CallErrorKind::Nonfatal,
            message: "ice restart".into(),
        };
        assert_eq!(error.to_string(), "nonfatal-error: ice restart");
        assert_eq!(CallErrorKind::Dialout.event_name(), "dialout-error");
        assert_eq!(
            serde_json::to_value(AudioProcessor::NoiseCancellation).unwrap(),
            json!("noise-cancellation")
        );
    }
}
