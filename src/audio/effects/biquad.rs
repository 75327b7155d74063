//! Second-order IIR filter sections.
//!
//! Coefficient design follows the Web Audio API `BiquadFilterNode` definitions
//! (the Audio EQ Cookbook with Web Audio's edge cases), so a graph tuned for a
//! browser sounds the same here. Frequencies are given in hertz and normalized
//! against the Nyquist frequency of the stream.

use std::f64::consts::PI;

/// Normalized coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    pub const SILENCE: Self = Self {
        b0: 0.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let inv = 1.0 / a0;
        Self {
            b0: b0 * inv,
            b1: b1 * inv,
            b2: b2 * inv,
            a1: a1 * inv,
            a2: a2 * inv,
        }
    }

    fn constant(gain: f64) -> Self {
        Self {
            b0: gain,
            ..Self::IDENTITY
        }
    }

    /// Band-pass centred on `frequency` with linear quality factor `q`.
    ///
    /// `q <= 0` degenerates to a pass-through.
    pub fn bandpass(frequency: f64, q: f64, sample_rate: u32) -> Self {
        let f = normalize(frequency, sample_rate);
        if f <= 0.0 || f >= 1.0 {
            return Self::SILENCE;
        }
        if q <= 0.0 {
            return Self::IDENTITY;
        }
        let w0 = PI * f;
        let alpha = w0.sin() / (2.0 * q);
        let k = w0.cos();
        Self::normalized(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * k, 1.0 - alpha)
    }

    /// High-pass at `cutoff` with resonance `q_db` in decibels.
    ///
    /// A cutoff of zero passes everything; a cutoff at or above Nyquist passes
    /// nothing.
    pub fn highpass(cutoff: f64, q_db: f64, sample_rate: u32) -> Self {
        let f = normalize(cutoff, sample_rate).clamp(0.0, 1.0);
        if f >= 1.0 {
            return Self::SILENCE;
        }
        if f <= 0.0 {
            return Self::IDENTITY;
        }
        let resonance = 10f64.powf(0.05 * q_db);
        let theta = PI * f;
        let alpha = theta.sin() / (2.0 * resonance);
        let cosw = theta.cos();
        let beta = (1.0 + cosw) / 2.0;
        Self::normalized(beta, -2.0 * beta, beta, 1.0 + alpha, -2.0 * cosw, 1.0 - alpha)
    }

    /// Low shelf at `frequency` boosting or cutting by `gain_db`, slope 1.
    pub fn lowshelf(frequency: f64, gain_db: f64, sample_rate: u32) -> Self {
        let f = normalize(frequency, sample_rate).clamp(0.0, 1.0);
        let a = 10f64.powf(gain_db / 40.0);
        if f >= 1.0 {
            return Self::constant(a * a);
        }
        if f <= 0.0 {
            return Self::IDENTITY;
        }
        let (k, k2) = shelf_terms(f, a);
        let a_plus_one = a + 1.0;
        let a_minus_one = a - 1.0;
        Self::normalized(
            a * (a_plus_one - a_minus_one * k + k2),
            2.0 * a * (a_minus_one - a_plus_one * k),
            a * (a_plus_one - a_minus_one * k - k2),
            a_plus_one + a_minus_one * k + k2,
            -2.0 * (a_minus_one + a_plus_one * k),
            a_plus_one + a_minus_one * k - k2,
        )
    }

    /// High shelf at `frequency` boosting or cutting by `gain_db`, slope 1.
    pub fn highshelf(frequency: f64, gain_db: f64, sample_rate: u32) -> Self {
        let f = normalize(frequency, sample_rate).clamp(0.0, 1.0);
        let a = 10f64.powf(gain_db / 40.0);
        if f >= 1.0 {
            return Self::IDENTITY;
        }
        if f <= 0.0 {
            return Self::constant(a * a);
        }
        let (k, k2) = shelf_terms(f, a);
        let a_plus_one = a + 1.0;
        let a_minus_one = a - 1.0;
        Self::normalized(
            a * (a_plus_one + a_minus_one * k + k2),
            -2.0 * a * (a_minus_one + a_plus_one * k),
            a * (a_plus_one + a_minus_one * k - k2),
            a_plus_one - a_minus_one * k + k2,
            2.0 * (a_minus_one - a_plus_one * k),
            a_plus_one - a_minus_one * k - k2,
        )
    }

    /// Magnitude of the frequency response at `frequency` hertz.
    pub fn magnitude_at(&self, frequency: f64, sample_rate: u32) -> f64 {
        let w = PI * normalize(frequency, sample_rate);
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);
        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

fn normalize(frequency: f64, sample_rate: u32) -> f64 {
    frequency / (sample_rate as f64 / 2.0)
}

// S = 1 makes the shelf alpha term 0.5 * sin(w0) * sqrt(2).
fn shelf_terms(f: f64, a: f64) -> (f64, f64) {
    let w0 = PI * f;
    let alpha = 0.5 * w0.sin() * 2f64.sqrt();
    (w0.cos(), 2.0 * a.sqrt() * alpha)
}

/// Direct form I filter memory for one channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Biquad {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    pub fn process(&mut self, c: &BiquadCoefficients, x: f64) -> f64 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        // Flush denormals so a silent input settles to exact zero.
        self.y1 = if y.abs() < 1e-30 { 0.0 } else { y };
        self.y1
    }
}
