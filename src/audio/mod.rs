//! Audio data types, effects and sources.
//!
//! # Data Types
//! - [`AudioSample`] - Trait for sample formats (f32, i16, ...)
//! - [`frame::AudioBuffer`] - A typed block of PCM samples
//! - [`track::AudioTrack`] / [`track::MediaStream`] - What the calling layer hands around
//!
//! # Sources
//! - [`file`] - Audio file decoding with symphonia
//!
//! # Effects
//! - [`effects::gain`] - Volume control
//! - [`effects::biquad`] - Band-pass, high-pass and shelving filters
//! - [`effects::waveshaper`] - Distortion curves

pub mod effects;
pub mod file;
pub mod frame;
pub mod sample;
pub mod track;

pub use file::{AudioFileInfo, AudioFileReader, load_voice_samples};
pub use frame::{AudioBuffer, VOICE_SAMPLE_RATE, VoiceBuffer};
pub use sample::AudioSample;
pub use track::{AudioTrack, MediaStream, SampleQueue, TrackFeed, TrackId};
