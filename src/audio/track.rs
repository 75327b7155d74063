//! Tracks and streams: the units the calling layer hands around.
//!
//! - [`AudioTrack`] - a pullable voice source with an identity and a stop flag
//! - [`TrackFeed`] - the producer half of a track fed from another thread
//! - [`MediaStream`] - a container whose track can be swapped in place
//! - [`SampleQueue`] - a FIFO used for prerecorded material

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::trace;

use super::frame::VoiceBuffer;
use crate::pipeline::{Pullable, Pushable};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A mono 48 kHz voice source.
///
/// Clones share the same source and stop flag. A stopped track yields
/// nothing, permanently.
#[derive(Clone)]
pub struct AudioTrack {
    id: TrackId,
    source: Arc<dyn Pullable<VoiceBuffer>>,
    stopped: Arc<AtomicBool>,
}

impl AudioTrack {
    pub fn new(id: impl Into<TrackId>, source: Arc<dyn Pullable<VoiceBuffer>>) -> Self {
        Self {
            id: id.into(),
            source,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A track fed block by block through the returned [`TrackFeed`].
    ///
    /// `capacity` is in samples; blocks that do not fit are dropped.
    pub fn channel(id: impl Into<TrackId>, capacity: usize) -> (TrackFeed, Self) {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity);
        let source = Arc::new(RingSource {
            consumer: Mutex::new(consumer),
        });
        let feed = TrackFeed {
            producer: Mutex::new(producer),
        };
        (feed, Self::new(id, source))
    }

    /// A track that plays `samples` once.
    pub fn from_samples(id: impl Into<TrackId>, samples: Vec<f32>) -> Self {
        Self::new(id, Arc::new(SampleQueue::from_samples(samples)))
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl fmt::Debug for AudioTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioTrack")
            .field("id", &self.id)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Pullable<VoiceBuffer> for AudioTrack {
    fn pull(&self, len: usize) -> Option<VoiceBuffer> {
        if self.is_stopped() {
            return None;
        }
        self.source.pull(len)
    }
}

/// Producer half of [`AudioTrack::channel`].
pub struct TrackFeed {
    producer: Mutex<rtrb::Producer<f32>>,
}

impl Pushable<VoiceBuffer> for TrackFeed {
    fn push(&self, input: VoiceBuffer) {
        let mut producer = self.producer.lock().unwrap();
        let mut dropped = 0usize;
        for sample in input.into_inner() {
            if producer.push(sample).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            trace!("Track feed full, dropped {} samples", dropped);
        }
    }
}

struct RingSource {
    consumer: Mutex<rtrb::Consumer<f32>>,
}

impl Pullable<VoiceBuffer> for RingSource {
    fn pull(&self, len: usize) -> Option<VoiceBuffer> {
        let mut consumer = self.consumer.lock().unwrap();
        let available = consumer.slots().min(len);
        if available == 0 {
            return None;
        }
        let mut samples = Vec::with_capacity(available);
        while samples.len() < available {
            match consumer.pop() {
                Ok(sample) => samples.push(sample),
                Err(_) => break,
            }
        }
        VoiceBuffer::new(samples).ok()
    }
}

/// A container for at most one track, replaceable in place.
///
/// Everything connected to a stream keeps pulling from it across track
/// replacements, so swapping the track never requires rewiring a graph.
#[derive(Clone, Default)]
pub struct MediaStream {
    track: Arc<RwLock<Option<AudioTrack>>>,
}

impl MediaStream {
    pub fn with_track(track: AudioTrack) -> Self {
        let stream = Self::default();
        stream.replace_track(Some(track));
        stream
    }

    pub fn replace_track(&self, track: Option<AudioTrack>) {
        *self.track.write().unwrap() = track;
    }

    pub fn track_id(&self) -> Option<TrackId> {
        self.track.read().unwrap().as_ref().map(|t| t.id().clone())
    }

    pub fn is_empty(&self) -> bool {
        self.track.read().unwrap().is_none()
    }
}

impl Pullable<VoiceBuffer> for MediaStream {
    fn pull(&self, len: usize) -> Option<VoiceBuffer> {
        let track = self.track.read().unwrap();
        track.as_ref()?.pull(len)
    }
}

/// A thread-safe FIFO of samples.
///
/// Pushed blocks are appended; a pull returns up to `len` samples.
#[derive(Clone, Default)]
pub struct SampleQueue {
    queue: Arc<Mutex<VecDeque<f32>>>,
}

impl SampleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<f32>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(samples.into())),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Pushable<VoiceBuffer> for SampleQueue {
    fn push(&self, input: VoiceBuffer) {
        self.queue.lock().unwrap().extend(input.into_inner());
    }
}

impl Pullable<VoiceBuffer> for SampleQueue {
    fn pull(&self, len: usize) -> Option<VoiceBuffer> {
        let mut queue = self.queue.lock().unwrap();
        if queue.is_empty() {
            return None;
        }
        let actual_len = len.min(queue.len());
        let samples: Vec<f32> = queue.drain(..actual_len).collect();
        VoiceBuffer::new(samples).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_track_yields_nothing() {
        let track = AudioTrack::from_samples("a", vec![0.5; 16]);
        let clone = track.clone();
        assert_eq!(clone.pull(4).map(|b| b.len()), Some(4));

        track.stop();
        assert!(clone.is_stopped());
        assert!(clone.pull(4).is_none());
    }

    #[test]
    fn test_channel_delivers_pushed_blocks() {
        let (feed, track) = AudioTrack::channel("mic", 8);
        assert!(track.pull(4).is_none());

        feed.push(VoiceBuffer::new(vec![0.1, 0.2, 0.3]).unwrap());
        let block = track.pull(8).unwrap();
        assert_eq!(block.data(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_channel_drops_overflow() {
        let (feed, track) = AudioTrack::channel("mic", 2);
        feed.push(VoiceBuffer::new(vec![0.1, 0.2, 0.3]).unwrap());
        assert_eq!(track.pull(8).unwrap().data(), &[0.1, 0.2]);
    }

    #[test]
    fn test_sample_queue_is_fifo() {
        let queue = SampleQueue::default();
        assert!(queue.is_empty());
        queue.push(VoiceBuffer::new(vec![0.1, 0.2]).unwrap());
        queue.push(VoiceBuffer::new(vec![0.3]).unwrap());
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.pull(2).unwrap().data(), &[0.1, 0.2]);
        assert_eq!(queue.pull(8).unwrap().data(), &[0.3]);
        assert!(queue.pull(1).is_none());
    }

    #[test]
    fn test_media_stream_replaces_in_place() {
        let stream = MediaStream::with_track(AudioTrack::from_samples("one", vec![1.0; 4]));
        let reader = stream.clone();
        assert_eq!(reader.track_id(), Some(TrackId::from("one")));

        stream.replace_track(Some(AudioTrack::from_samples("two", vec![-1.0; 4])));
        assert_eq!(reader.track_id(), Some(TrackId::from("two")));
        assert_eq!(reader.pull(2).unwrap().data(), &[-1.0, -1.0]);

        stream.replace_track(None);
        assert!(reader.is_empty());
        assert!(reader.pull(2).is_none());
    }
}
