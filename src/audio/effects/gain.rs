//! Gain (volume) effect.

use std::sync::{Arc, Mutex};

use crate::audio::frame::AudioBuffer;
use crate::audio::sample::AudioSample;
use crate::pipeline::Node;

/// Shared gain factor, adjustable while the graph runs.
#[derive(Debug, Clone)]
pub struct GainHandle(Arc<Mutex<f32>>);

impl GainHandle {
    pub fn new(factor: f32) -> Self {
        Self(Arc::new(Mutex::new(factor)))
    }

    pub fn set(&self, factor: f32) {
        *self.0.lock().unwrap() = factor;
    }

    pub fn get(&self) -> f32 {
        *self.0.lock().unwrap()
    }
}

/// Multiplies every sample by the current factor of a [`GainHandle`].
///
/// The factor is read once per block. Results are clipped to full scale, so
/// factors above 1.0 amplify quiet signals and saturate loud ones.
///
/// ```ignore
/// let volume = GainHandle::new(1.0);
/// let out = pull_chain![source =>, Gain::<f32, 1, 48000>::new(volume.clone())];
/// volume.set(1.5);
/// ```
pub struct Gain<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32> {
    factor: GainHandle,
    _marker: std::marker::PhantomData<Sample>,
}

impl<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32> Gain<Sample, CHANNELS, SAMPLE_RATE> {
    pub fn new(factor: GainHandle) -> Self {
        Self {
            factor,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32> Node
    for Gain<Sample, CHANNELS, SAMPLE_RATE>
where
    Sample: AudioSample,
{
    type Input = AudioBuffer<Sample, CHANNELS, SAMPLE_RATE>;
    type Output = AudioBuffer<Sample, CHANNELS, SAMPLE_RATE>;

    fn process(&self, mut input: Self::Input) -> Option<Self::Output> {
        let factor = self.factor.get() as f64;
        for sample in input.data_mut() {
            *sample = Sample::from_f64_normalized(sample.to_f64_normalized() * factor);
        }
        Some(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::VoiceBuffer;

    #[test]
    fn test_gain_follows_handle() {
        let handle = GainHandle::new(0.5);
        let gain = Gain::<f32, 1, 48000>::new(handle.clone());

        let out = gain.process(VoiceBuffer::new(vec![0.5, -0.5]).unwrap()).unwrap();
        assert_eq!(out.data(), &[0.25, -0.25]);

        handle.set(3.0);
        let out = gain.process(VoiceBuffer::new(vec![0.1, 0.5]).unwrap()).unwrap();
        assert!((out.data()[0] - 0.3).abs() < 1e-6);
        assert_eq!(out.data()[1], 1.0);
    }
}
