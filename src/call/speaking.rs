//! Turns the number of people transmitting into radio chatter cues.

use std::time::Duration;

use tracing::trace;

use super::sounds::{Cue, CuePlayer};

/// Delay between the squelch tail and the roger beep.
pub const ROGER_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerDirection {
    Up,
    Down,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeakerTransition {
    pub direction: SpeakerDirection,
    /// Whether the static loop should be running.
    pub loop_active: bool,
}

#[derive(Debug, Default)]
pub struct SpeakingActivityTracker {
    last_count: usize,
}

impl SpeakingActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_count(&self) -> usize {
        self.last_count
    }

    pub fn observe(&mut self, count: usize) -> SpeakerTransition {
        let direction = match count.cmp(&self.last_count) {
            std::cmp::Ordering::Greater => SpeakerDirection::Up,
            std::cmp::Ordering::Less => SpeakerDirection::Down,
            std::cmp::Ordering::Equal => SpeakerDirection::Unchanged,
        };
        trace!("Speakers {} -> {}", self.last_count, count);
        self.last_count = count;
        SpeakerTransition {
            direction,
            loop_active: count > 0,
        }
    }
}

impl SpeakerTransition {
    /// Plays the cues for this transition. The roger beep, if enabled, is
    /// scheduled on the runtime and fires [`ROGER_DELAY`] after the stop cue.
    pub fn play<P>(&self, player: &P, roger_beep: bool)
    where
        P: CuePlayer + Clone + Send + 'static,
    {
        match self.direction {
            SpeakerDirection::Up => player.play(Cue::random_start()),
            SpeakerDirection::Down => {
                player.play(Cue::Stop);
                if roger_beep {
                    let player = player.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(ROGER_DELAY).await;
                        player.play(Cue::Roger);
                    });
                }
            }
            SpeakerDirection::Unchanged => {}
        }
        player.set_loop(self.loop_active);
    }
}
