//! Audio effect building blocks.
//!
//! - [`gain`] - volume node driven by a shared handle
//! - [`biquad`] - Web Audio compatible second-order filters
//! - [`waveshaper`] - curve lookup with optional oversampling

pub mod biquad;
pub mod gain;
pub mod waveshaper;

pub use biquad::{Biquad, BiquadCoefficients};
pub use gain::{Gain, GainHandle};
pub use waveshaper::{Oversample, ShapingCurve, WaveShaper};
