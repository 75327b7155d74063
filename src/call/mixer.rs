//! Sums the audible wet tracks and the cue bank into one output stream.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::audio::{AudioSample, AudioTrack, TrackId, VoiceBuffer};
use crate::pipeline::Pullable;

pub struct OutputMixer {
    tracks: DashMap<TrackId, AudioTrack>,
    extra: Vec<Arc<dyn Pullable<VoiceBuffer>>>,
}

impl OutputMixer {
    pub fn new() -> Self {
        Self {
            tracks: DashMap::new(),
            extra: Vec::new(),
        }
    }

    /// Adds a source that is always mixed in, such as the cue bank.
    pub fn with_source(mut self, source: Arc<dyn Pullable<VoiceBuffer>>) -> Self {
        self.extra.push(source);
        self
    }

    /// Makes `tracks` the full set of audible tracks.
    pub fn set_tracks(&self, tracks: Vec<AudioTrack>) {
        let before = self.tracks.len();
        self.tracks
            .retain(|id, _| tracks.iter().any(|t| t.id() == id));
        for track in tracks {
            self.tracks.entry(track.id().clone()).or_insert(track);
        }
        if self.tracks.len() != before {
            debug!("Mixing {} tracks", self.tracks.len());
        }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

impl Default for OutputMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Pullable<VoiceBuffer> for OutputMixer {
    /// Returns `None` if no source has data. Otherwise the block holds
    /// exactly `len` samples, padded with silence where sources ran short.
    fn pull(&self, len: usize) -> Option<VoiceBuffer> {
        let mut mixed: Vec<f64> = vec![0.0; len];
        let mut has_data = false;

        let sources = self
            .tracks
            .iter()
            .map(|t| t.value().pull(len))
            .chain(self.extra.iter().map(|s| s.pull(len)));

        for block in sources.flatten() {
            has_data = true;
            for (out, sample) in mixed.iter_mut().zip(block.data()) {
                *out += sample.to_f64_normalized();
            }
        }

        if !has_data {
            return None;
        }

        let samples: Vec<f32> = mixed.into_iter().map(f32::from_f64_normalized).collect();
        VoiceBuffer::new(samples).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleQueue;

    #[test]
    fn test_mix_pads_and_sums() {
        let mixer = OutputMixer::new()
            .with_source(Arc::new(SampleQueue::from_samples(vec![0.25; 2])));
        mixer.set_tracks(vec![
            AudioTrack::from_samples("a", vec![0.5; 4]),
            AudioTrack::from_samples("b", vec![0.1; 1]),
        ]);

        let block = mixer.pull(4).unwrap();
        assert_eq!(block.len(), 4);
        let data = block.data();
        assert!((data[0] - 0.85).abs() < 1e-6);
        assert!((data[1] - 0.75).abs() < 1e-6);
        assert_eq!(data[3], 0.5);
    }

    #[test]
    fn test_clips_and_reports_silence() {
        let mixer = OutputMixer::new();
        assert!(mixer.pull(4).is_none());

        mixer.set_tracks(vec![
            AudioTrack::from_samples("a", vec![0.8; 2]),
            AudioTrack::from_samples("b", vec![0.8; 2]),
        ]);
        assert_eq!(mixer.pull(2).unwrap().data(), &[1.0, 1.0]);
    }

    #[test]
    fn test_set_tracks_replaces_the_set() {
        let mixer = OutputMixer::new();
        let a = AudioTrack::from_samples("a", vec![0.5; 8]);
        mixer.set_tracks(vec![a.clone()]);
        mixer.set_tracks(vec![a, AudioTrack::from_samples("b", vec![0.5; 8])]);
        assert_eq!(mixer.track_count(), 2);

        mixer.set_tracks(Vec::new());
        assert_eq!(mixer.track_count(), 0);
        assert!(mixer.pull(2).is_none());
    }
}
