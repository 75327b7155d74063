use anyhow::Result;

/// Sample rate every voice path runs at.
pub const VOICE_SAMPLE_RATE: u32 = 48_000;

/// A type-safe audio buffer with compile-time channel count and sample rate.
///
/// Samples are interleaved when `CHANNELS > 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32> {
    data: Vec<Sample>,
}

/// One block of a participant's voice: mono `f32` at 48 kHz.
pub type VoiceBuffer = AudioBuffer<f32, 1, VOICE_SAMPLE_RATE>;

impl<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32>
    AudioBuffer<Sample, CHANNELS, SAMPLE_RATE>
{
    /// Create a new audio buffer from raw samples.
    ///
    /// Returns an error if the data length is not a multiple of the channel count.
    pub fn new(data: Vec<Sample>) -> Result<Self> {
        if !data.is_empty() && data.len() % CHANNELS != 0 {
            anyhow::bail!(
                "Data length {} must be a multiple of channels {}",
                data.len(),
                CHANNELS
            );
        }
        Ok(Self { data })
    }

    /// Returns an iterator over the samples of a specific channel.
    pub fn iter_channel(&self, channel_idx: usize) -> impl Iterator<Item = &Sample> {
        assert!(
            channel_idx < CHANNELS,
            "Channel index {} out of bounds (max {})",
            channel_idx,
            CHANNELS - 1
        );
        self.data.iter().skip(channel_idx).step_by(CHANNELS)
    }

    /// Returns the number of samples per channel.
    pub fn samples_per_channel(&self) -> usize {
        self.data.len() / CHANNELS
    }

    pub const fn channels(&self) -> usize {
        CHANNELS
    }

    pub const fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[Sample] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [Sample] {
        &mut self.data
    }

    pub fn into_inner(self) -> Vec<Sample> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_buffer_channel_iter() {
        let samples = vec![1, 10, 2, 20, 3, 30]; // L1, R1, L2, R2, L3, R3
        let buffer = AudioBuffer::<i16, 2, 48000>::new(samples).unwrap();

        let left: Vec<_> = buffer.iter_channel(0).cloned().collect();
        let right: Vec<_> = buffer.iter_channel(1).cloned().collect();

        assert_eq!(left, vec![1, 2, 3]);
        assert_eq!(right, vec![10, 20, 30]);
        assert_eq!(buffer.samples_per_channel(), 3);
    }

    #[test]
    fn test_audio_buffer_validation() {
        assert!(AudioBuffer::<i16, 2, 48000>::new(vec![0; 961]).is_err());
        assert!(VoiceBuffer::new(vec![0.0; 961]).is_ok());
    }
}
