use std::fmt::Debug;

use num_traits::{Bounded, FromPrimitive, Num, ToPrimitive};

/// A PCM sample format the effect graph can read and write.
///
/// Processing happens on normalized `f64` values in `[-1, 1]`; conversion back
/// clamps, so a gain above unity clips rather than wraps.
pub trait AudioSample:
    Num + Copy + Send + Sync + PartialOrd + ToPrimitive + FromPrimitive + Bounded + Debug + 'static
{
    fn silence() -> Self;

    fn to_f64_normalized(self) -> f64;

    fn from_f64_normalized(value: f64) -> Self;
}

impl AudioSample for f32 {
    fn silence() -> Self {
        0.0
    }

    fn to_f64_normalized(self) -> f64 {
        self as f64
    }

    fn from_f64_normalized(value: f64) -> Self {
        value.clamp(-1.0, 1.0) as f32
    }
}

impl AudioSample for f64 {
    fn silence() -> Self {
        0.0
    }

    fn to_f64_normalized(self) -> f64 {
        self
    }

    fn from_f64_normalized(value: f64) -> Self {
        value.clamp(-1.0, 1.0)
    }
}

impl AudioSample for i16 {
    fn silence() -> Self {
        0
    }

    fn to_f64_normalized(self) -> f64 {
        self as f64 / i16::MAX as f64
    }

    fn from_f64_normalized(value: f64) -> Self {
        (value.clamp(-1.0, 1.0) * i16::MAX as f64) as i16
    }
}

impl AudioSample for i32 {
    fn silence() -> Self {
        0
    }

    fn to_f64_normalized(self) -> f64 {
        self as f64 / i32::MAX as f64
    }

    fn from_f64_normalized(value: f64) -> Self {
        (value.clamp(-1.0, 1.0) * i32::MAX as f64) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_values_clip() {
        assert_eq!(f32::from_f64_normalized(2.5), 1.0);
        assert_eq!(i16::from_f64_normalized(-3.0), -i16::MAX);
        assert_eq!(i16::from_f64_normalized(1.0), i16::MAX);
    }

    #[test]
    fn test_i16_round_trip_is_close() {
        let value = 0.25;
        let back = i16::from_f64_normalized(value).to_f64_normalized();
        assert!((back - value).abs() < 1e-4);
    }
}
