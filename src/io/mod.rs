//! Hardware I/O.
//!
//! - [`AudioOutput`] - speaker playback via cpal
//! - [`input_device_names`] - microphones the call can capture from

pub mod audio;

pub use audio::{AudioOutput, input_device_names, output_device_names};
