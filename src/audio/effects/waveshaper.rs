//! Curve-based waveshaping.

use std::sync::Arc;

/// A transfer curve sampled uniformly over the input range `[-1, 1]`.
///
/// Cheap to clone; the samples are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapingCurve(Arc<[f32]>);

impl ShapingCurve {
    pub fn new(points: Vec<f32>) -> Self {
        Self(points.into())
    }

    /// The curve that maps every input to itself.
    pub fn identity(len: usize) -> Self {
        let last = len.saturating_sub(1).max(1) as f64;
        Self::new((0..len).map(|i| (i as f64 / last * 2.0 - 1.0) as f32).collect())
    }

    /// Point-wise `self + (other - self) * t`.
    ///
    /// Curves of different length are interpolated over the shorter one.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self::new(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(&a, &b)| (a as f64 + (b as f64 - a as f64) * t) as f32)
                .collect(),
        )
    }

    pub fn points(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Maps `x` through the curve with linear interpolation.
    ///
    /// Inputs outside `[-1, 1]` take the end values. An empty curve passes
    /// the input through.
    pub fn apply(&self, x: f64) -> f64 {
        let curve = &self.0;
        if curve.is_empty() {
            return x;
        }
        let last = curve.len() - 1;
        let v = last as f64 * 0.5 * (x + 1.0);
        if v <= 0.0 {
            return curve[0] as f64;
        }
        if v >= last as f64 {
            return curve[last] as f64;
        }
        let k = v.floor() as usize;
        let frac = v - k as f64;
        (1.0 - frac) * curve[k] as f64 + frac * curve[k + 1] as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Oversample {
    #[default]
    None,
    X4,
}

impl Oversample {
    fn factor(self) -> usize {
        match self {
            Oversample::None => 1,
            Oversample::X4 => 4,
        }
    }
}

/// Per-channel waveshaper memory.
///
/// With [`Oversample::X4`] each input sample is expanded into four points
/// linearly interpolated from the previous input, shaped individually, and
/// averaged back down. This tames the aliasing a steep curve produces.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveShaper {
    previous: f64,
}

impl WaveShaper {
    pub fn process(&mut self, curve: &ShapingCurve, oversample: Oversample, x: f64) -> f64 {
        let factor = oversample.factor();
        if factor == 1 {
            self.previous = x;
            return curve.apply(x);
        }
        let step = (x - self.previous) / factor as f64;
        let mut acc = 0.0;
        for i in 1..=factor {
            acc += curve.apply(self.previous + step * i as f64);
        }
        self.previous = x;
        acc / factor as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_curve_passes_through() {
        let curve = ShapingCurve::identity(44_100);
        for x in [-1.0, -0.3, 0.0, 0.42, 1.0] {
            assert!((curve.apply(x) - x).abs() < 1e-6);
        }
    }

    #[test]
    fn test_apply_clamps_outside_range() {
        let curve = ShapingCurve::new(vec![-0.5, 0.0, 0.5]);
        assert_eq!(curve.apply(-4.0), -0.5);
        assert_eq!(curve.apply(4.0), 0.5);
        assert!((curve.apply(0.5) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_empty_curve_is_bypass() {
        assert_eq!(ShapingCurve::new(Vec::new()).apply(0.7), 0.7);
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = ShapingCurve::new(vec![0.0, 1.0]);
        let b = ShapingCurve::new(vec![1.0, 3.0]);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.lerp(&b, 0.5).points(), &[0.5, 2.0]);
    }

    #[test]
    fn test_oversampled_identity_settles_on_input() {
        let curve = ShapingCurve::identity(1024);
        let mut shaper = WaveShaper::default();
        let mut y = 0.0;
        for _ in 0..4 {
            y = shaper.process(&curve, Oversample::X4, 0.5);
        }
        assert!((y - 0.5).abs() < 1e-3);
    }
}
