//! Everything that happens once a room is joined.
//!
//! - [`client`] - the calling SDK contract
//! - [`radio`] - the per-voice radio effect graph
//! - [`participants`] - keeps one graph per remote voice
//! - [`speaking`] and [`sounds`] - radio chatter cues
//! - [`mixer`] - the output mix
//! - [`session`] - joins a room and wires the above together

pub mod client;
pub mod mixer;
pub mod participants;
pub mod radio;
pub mod session;
pub mod sounds;
pub mod speaking;

pub use client::{
    CallClient, CallError, CallErrorKind, CallEvent, InputDevice, Participant, TrackState, UserData,
};
pub use mixer::OutputMixer;
pub use participants::{ParticipantStreamRegistry, ReconcileReport, RosterEntry};
pub use radio::{RadioControls, RadioEffect, RadioParams};
pub use session::{CallSession, SessionRole};
pub use sounds::{Cue, CueBank, CuePlayer};
pub use speaking::{SpeakerDirection, SpeakerTransition, SpeakingActivityTracker};
