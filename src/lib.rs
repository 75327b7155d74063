//! Push-to-talk group voice client with a CB radio effect.
//!
//! - [`input`] - push-to-talk devices, the gate and the binding manager
//! - [`audio`] and [`pipeline`] - voice buffers, DSP blocks and the pull graph
//! - [`call`] - the radio effect, participant graphs, cues and the session
//! - [`state`] - persisted preferences and overlay state
//! - [`bridge`] - the desktop host and its renderer-side handle

pub mod audio;
pub mod bridge;
pub mod call;
pub mod config;
pub mod identity;
pub mod input;
#[cfg(feature = "playback")]
pub mod io;
pub mod pipeline;
pub mod state;
pub mod version;
