//! Edge detection over the composite pressed state.

/// Turns a stream of composite samples into press/release edges.
///
/// Starts released. Only transitions are reported, so the call layer sees
/// exactly one `true` per press and one `false` per release no matter how
/// often the sources are sampled.
#[derive(Debug, Default)]
pub struct PushToTalkGate {
    last_emitted: bool,
}

impl PushToTalkGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Some(composite)` when it differs from the last emitted value.
    pub fn evaluate(&mut self, composite: bool) -> Option<bool> {
        if composite == self.last_emitted {
            return None;
        }
        self.last_emitted = composite;
        Some(composite)
    }

    pub fn is_pressed(&self) -> bool {
        self.last_emitted
    }
}
