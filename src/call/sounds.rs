//! Radio chatter cues: start chimes, squelch tail, roger beep and static.
//!
//! Cue files are decoded once at startup into mono 48 kHz sample buffers.
//! [`CueBank`] is itself a [`Pullable`] and is mixed into the output next to
//! the participants' wet tracks.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rand::Rng;
use tracing::{debug, warn};

use crate::audio::{VoiceBuffer, load_voice_samples};
use crate::pipeline::Pullable;

pub const CUE_VOLUME: f32 = 0.5;
pub const STATIC_VOLUME: f32 = 0.2;
pub const STATIC_FILE: &str = "radiostatic.mp3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// One of four keying chimes.
    Start(u8),
    Stop,
    Roger,
    Join,
    Leave,
}

impl Cue {
    pub const ALL: [Cue; 8] = [
        Cue::Start(0),
        Cue::Start(1),
        Cue::Start(2),
        Cue::Start(3),
        Cue::Stop,
        Cue::Roger,
        Cue::Join,
        Cue::Leave,
    ];

    pub fn random_start() -> Self {
        Cue::Start(rand::thread_rng().gen_range(0..4))
    }

    pub fn file_name(self) -> String {
        format!("{self}.wav")
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cue::Start(n) => write!(f, "start{n}"),
            Cue::Stop => f.write_str("stop"),
            Cue::Roger => f.write_str("roger"),
            Cue::Join => f.write_str("join"),
            Cue::Leave => f.write_str("leave"),
        }
    }
}

pub trait CuePlayer {
    fn play(&self, cue: Cue);
    fn set_loop(&self, enabled: bool);
}

struct Voice {
    samples: Arc<[f32]>,
    position: usize,
}

struct Inner {
    cues: HashMap<Cue, Arc<[f32]>>,
    background: Option<Arc<[f32]>>,
    voices: Mutex<Vec<Voice>>,
    loop_position: Mutex<usize>,
    loop_enabled: AtomicBool,
}

/// Decoded cues plus whatever is currently sounding.
#[derive(Clone)]
pub struct CueBank {
    inner: Arc<Inner>,
}

impl CueBank {
    /// Loads every cue found in `dir`. Missing or unreadable files are
    /// skipped and the cue stays silent.
    pub fn load(dir: &Path) -> Self {
        let mut cues = HashMap::new();
        for cue in Cue::ALL {
            if let Some(samples) = load_or_warn(&dir.join(cue.file_name())) {
                cues.insert(cue, samples);
            }
        }
        let background = load_or_warn(&dir.join(STATIC_FILE));
        debug!("Loaded {} cues from {}", cues.len(), dir.display());
        Self::from_parts(cues, background)
    }

    pub fn from_parts(cues: HashMap<Cue, Arc<[f32]>>, background: Option<Arc<[f32]>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cues,
                background,
                voices: Mutex::new(Vec::new()),
                loop_position: Mutex::new(0),
                loop_enabled: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_looping(&self) -> bool {
        self.inner.loop_enabled.load(Ordering::Acquire)
    }

    pub fn active_voices(&self) -> usize {
        self.inner.voices.lock().unwrap().len()
    }
}

fn load_or_warn(path: &Path) -> Option<Arc<[f32]>> {
    match load_voice_samples(path) {
        Ok(samples) => Some(samples.into()),
        Err(e) => {
            warn!("Cue {} unavailable: {:#}", path.display(), e);
            None
        }
    }
}

impl CuePlayer for CueBank {
    fn play(&self, cue: Cue) {
        let Some(samples) = self.inner.cues.get(&cue) else {
            debug!("No samples for cue {}", cue);
            return;
        };
        self.inner.voices.lock().unwrap().push(Voice {
            samples: samples.clone(),
            position: 0,
        });
    }

    /// Pausing keeps the loop position, so resuming continues where it left off.
    fn set_loop(&self, enabled: bool) {
        self.inner.loop_enabled.store(enabled, Ordering::Release);
    }
}

impl Pullable<VoiceBuffer> for CueBank {
    fn pull(&self, len: usize) -> Option<VoiceBuffer> {
        let mut mixed = vec![0.0f32; len];
        let mut has_data = false;

        {
            let mut voices = self.inner.voices.lock().unwrap();
            for voice in voices.iter_mut() {
                let remaining = &voice.samples[voice.position..];
                let n = remaining.len().min(len);
                for (out, sample) in mixed.iter_mut().zip(&remaining[..n]) {
                    *out += sample * CUE_VOLUME;
                }
                voice.position += n;
                has_data |= n > 0;
            }
            voices.retain(|v| v.position < v.samples.len());
        }

        if self.is_looping()
            && let Some(background) = self.inner.background.as_ref().filter(|b| !b.is_empty())
        {
            let mut position = self.inner.loop_position.lock().unwrap();
            for out in mixed.iter_mut() {
                *out += background[*position] * STATIC_VOLUME;
                *position = (*position + 1) % background.len();
            }
            has_data = true;
        }

        if !has_data {
            return None;
        }
        VoiceBuffer::new(mixed).ok()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records cue calls as `"play <cue>"` and `"loop <bool>"`.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingPlayer {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingPlayer {
        pub(crate) fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl CuePlayer for RecordingPlayer {
        fn play(&self, cue: Cue) {
            self.events.lock().unwrap().push(format!("play {cue}"));
        }

        fn set_loop(&self, enabled: bool) {
            self.events.lock().unwrap().push(format!("loop {enabled}"));
        }
    }

    fn bank() -> CueBank {
        let mut cues = HashMap::new();
        cues.insert(Cue::Stop, Arc::from(vec![1.0f32; 3]));
        cues.insert(Cue::Roger, Arc::from(vec![0.5f32; 2]));
        CueBank::from_parts(cues, Some(Arc::from(vec![1.0f32, -1.0])))
    }

    #[test]
    fn test_cue_names() {
        assert_eq!(Cue::Start(2).file_name(), "start2.wav");
        assert_eq!(Cue::Roger.file_name(), "roger.wav");
        for _ in 0..32 {
            assert!(matches!(Cue::random_start(), Cue::Start(0..=3)));
        }
    }

    #[test]
    fn test_one_shots_mix_at_cue_volume() {
        let bank = bank();
        assert!(bank.pull(4).is_none());

        bank.play(Cue::Stop);
        bank.play(Cue::Roger);
        assert_eq!(bank.active_voices(), 2);
        assert_eq!(bank.pull(2).unwrap().data(), &[0.75, 0.75]);
        assert_eq!(bank.active_voices(), 1);
        assert_eq!(bank.pull(2).unwrap().data(), &[0.5, 0.0]);
        assert_eq!(bank.active_voices(), 0);
        assert!(bank.pull(2).is_none());
    }

    #[test]
    fn test_static_loop_repeats_and_resumes() {
        let bank = bank();
        bank.set_loop(true);
        assert_eq!(bank.pull(3).unwrap().data(), &[0.2, -0.2, 0.2]);

        bank.set_loop(false);
        assert!(bank.pull(3).is_none());

        bank.set_loop(true);
        assert_eq!(bank.pull(1).unwrap().data(), &[-0.2]);
    }

    #[test]
    fn test_missing_cues_are_silent() {
        let dir = tempfile::tempdir().unwrap();
        let bank = CueBank::load(dir.path());
        bank.play(Cue::Join);
        bank.set_loop(true);
        assert!(bank.pull(8).is_none());
    }
}
