//! The CB radio effect applied to every remote voice.
//!
//! ```text
//! dry MediaStream ──► bandpass ──► highpass ──► highshelf ──► lowshelf ──► waveshaper ──► wet gain ──┐
//!        │                                                                                            ├──► final gain ──► wet AudioTrack
//!        └──────────────────────────────────────────────────────────────────────────────► dry gain ──┘
//! ```
//!
//! One intensity value in `[0, 1]` drives every stage of the chain. The final
//! gain carries the listener's volume for that participant.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::debug;

use crate::audio::effects::{
    Biquad, BiquadCoefficients, Gain, GainHandle, Oversample, ShapingCurve, WaveShaper,
};
use crate::audio::frame::{AudioBuffer, VOICE_SAMPLE_RATE, VoiceBuffer};
use crate::audio::sample::AudioSample;
use crate::audio::track::{AudioTrack, MediaStream};
use crate::pipeline::{GraphNode, Node, Pullable};

pub const DISTORTION_CURVE_LEN: usize = 44_100;
const DISTORTION_AMOUNT: f64 = 50.0;

const BANDPASS_FREQUENCY: f64 = 1500.0;
const HIGHPASS_CUTOFF_PER_INTENSITY: f64 = 300.0;
const HIGHPASS_Q_DB: f64 = 1.0;
const HIGHSHELF_FREQUENCY: f64 = 4000.0;
const LOWSHELF_FREQUENCY: f64 = 400.0;
const SHELF_CUT_DB_PER_INTENSITY: f64 = -17.9;
const WET_GAIN_BASE: f64 = 0.75;
const WET_GAIN_PER_INTENSITY: f64 = 0.25;
const DRY_GAIN: f64 = 0.0;

static NEXT_OUTPUT_ID: AtomicU64 = AtomicU64::new(0);

fn distortion_curves() -> &'static (ShapingCurve, ShapingCurve) {
    static CURVES: OnceLock<(ShapingCurve, ShapingCurve)> = OnceLock::new();
    CURVES.get_or_init(|| {
        let n = DISTORTION_CURVE_LEN;
        let deg = std::f64::consts::PI / 180.0;
        let shaped = (0..n)
            .map(|i| {
                let x = (i * 2) as f64 / n as f64 - 1.0;
                ((3.0 + DISTORTION_AMOUNT) * x * 20.0 * deg
                    / (std::f64::consts::PI + DISTORTION_AMOUNT * x.abs())) as f32
            })
            .collect();
        (ShapingCurve::identity(n), ShapingCurve::new(shaped))
    })
}

/// The distortion curve for `intensity`: the identity curve blended toward
/// the full distortion curve.
pub fn distortion_curve(intensity: f64) -> ShapingCurve {
    let (identity, shaped) = distortion_curves();
    identity.lerp(shaped, intensity)
}

/// Every parameter of the chain, derived from a single intensity.
///
/// Deriving twice from the same intensity yields equal parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioParams {
    pub intensity: f64,
    pub bandpass_q: f64,
    pub highpass_cutoff: f64,
    pub highshelf_gain_db: f64,
    pub lowshelf_gain_db: f64,
    pub wet_gain: f64,
    pub dry_gain: f64,
    pub curve: ShapingCurve,
    pub oversample: Oversample,
    bandpass: BiquadCoefficients,
    highpass: BiquadCoefficients,
    highshelf: BiquadCoefficients,
    lowshelf: BiquadCoefficients,
}

impl RadioParams {
    pub fn derive(intensity: f64, sample_rate: u32) -> Self {
        let bandpass_q = intensity;
        let highpass_cutoff = HIGHPASS_CUTOFF_PER_INTENSITY * intensity;
        let shelf_gain_db = SHELF_CUT_DB_PER_INTENSITY * intensity;
        Self {
            intensity,
            bandpass_q,
            highpass_cutoff,
            highshelf_gain_db: shelf_gain_db,
            lowshelf_gain_db: shelf_gain_db,
            wet_gain: WET_GAIN_BASE + WET_GAIN_PER_INTENSITY * intensity,
            dry_gain: DRY_GAIN,
            curve: distortion_curve(intensity),
            oversample: Oversample::X4,
            bandpass: BiquadCoefficients::bandpass(BANDPASS_FREQUENCY, bandpass_q, sample_rate),
            highpass: BiquadCoefficients::highpass(highpass_cutoff, HIGHPASS_Q_DB, sample_rate),
            highshelf: BiquadCoefficients::highshelf(
                HIGHSHELF_FREQUENCY,
                shelf_gain_db,
                sample_rate,
            ),
            lowshelf: BiquadCoefficients::lowshelf(LOWSHELF_FREQUENCY, shelf_gain_db, sample_rate),
        }
    }
}

#[derive(Default, Clone, Copy)]
struct ChannelState {
    bandpass: Biquad,
    highpass: Biquad,
    highshelf: Biquad,
    lowshelf: Biquad,
    shaper: WaveShaper,
}

/// Everything between the dry source and the final gain.
///
/// Parameters are read once per block from the shared snapshot, so a block
/// never mixes parameters from two different intensities.
pub struct RadioChain<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32> {
    params: Arc<Mutex<RadioParams>>,
    state: Mutex<[ChannelState; CHANNELS]>,
    _marker: std::marker::PhantomData<Sample>,
}

impl<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32>
    RadioChain<Sample, CHANNELS, SAMPLE_RATE>
{
    pub fn new(params: Arc<Mutex<RadioParams>>) -> Self {
        Self {
            params,
            state: Mutex::new([ChannelState::default(); CHANNELS]),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32> Node
    for RadioChain<Sample, CHANNELS, SAMPLE_RATE>
where
    Sample: AudioSample,
{
    type Input = AudioBuffer<Sample, CHANNELS, SAMPLE_RATE>;
    type Output = AudioBuffer<Sample, CHANNELS, SAMPLE_RATE>;

    fn process(&self, mut input: Self::Input) -> Option<Self::Output> {
        let p = self.params.lock().unwrap().clone();
        let mut state = self.state.lock().unwrap();

        for frame in input.data_mut().chunks_mut(CHANNELS) {
            for (sample, ch) in frame.iter_mut().zip(state.iter_mut()) {
                let dry = sample.to_f64_normalized();
                let mut wet = ch.bandpass.process(&p.bandpass, dry);
                wet = ch.highpass.process(&p.highpass, wet);
                wet = ch.highshelf.process(&p.highshelf, wet);
                wet = ch.lowshelf.process(&p.lowshelf, wet);
                wet = ch.shaper.process(&p.curve, p.oversample, wet);
                *sample = Sample::from_f64_normalized(wet * p.wet_gain + dry * p.dry_gain);
            }
        }

        Some(input)
    }
}

/// Live handle onto a running effect.
///
/// Clones control the same graph; [`RadioControls::same_graph`] tells whether
/// two handles do.
#[derive(Clone)]
pub struct RadioControls {
    params: Arc<Mutex<RadioParams>>,
    volume: GainHandle,
    sample_rate: u32,
}

impl RadioControls {
    /// Re-derives every intensity-dependent parameter and swaps them in as
    /// one snapshot.
    pub fn adjust_intensity(&self, intensity: f64) {
        let next = RadioParams::derive(intensity, self.sample_rate);
        *self.params.lock().unwrap() = next;
    }

    /// Sets the final gain only.
    pub fn adjust_volume(&self, volume: f64) {
        self.volume.set(volume as f32);
    }

    pub fn params(&self) -> RadioParams {
        self.params.lock().unwrap().clone()
    }

    pub fn volume(&self) -> f64 {
        self.volume.get() as f64
    }

    pub fn same_graph(&self, other: &RadioControls) -> bool {
        Arc::ptr_eq(&self.params, &other.params)
    }
}

impl std::fmt::Debug for RadioControls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioControls")
            .field("intensity", &self.params.lock().unwrap().intensity)
            .field("volume", &self.volume.get())
            .finish()
    }
}

/// A constructed radio graph for one participant.
pub struct RadioEffect {
    output: AudioTrack,
    controls: RadioControls,
    chain: Arc<GraphNode<RadioChain<f32, 1, VOICE_SAMPLE_RATE>>>,
}

impl RadioEffect {
    /// Builds the graph on top of `dry` and returns the wet track and its
    /// controls. `volume` is a linear factor, `intensity` is in `[0, 1]`.
    ///
    /// No validation happens here; callers range-check user input first.
    pub fn create(dry: &MediaStream, volume: f64, intensity: f64) -> Self {
        debug!("MEMORY WATCHDOG: building radio graph");

        let params = Arc::new(Mutex::new(RadioParams::derive(intensity, VOICE_SAMPLE_RATE)));
        let volume = GainHandle::new(volume as f32);

        let chain = Arc::new(GraphNode::new(RadioChain::new(params.clone())));
        chain.set_input(Arc::new(dry.clone()));

        let tap: Arc<dyn Pullable<VoiceBuffer>> = chain.clone();
        let wet = crate::pull_chain![tap =>, Gain::<f32, 1, VOICE_SAMPLE_RATE>::new(volume.clone())];

        let id = NEXT_OUTPUT_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            output: AudioTrack::new(format!("radio-{id}"), wet),
            controls: RadioControls {
                params,
                volume,
                sample_rate: VOICE_SAMPLE_RATE,
            },
            chain,
        }
    }

    pub fn output(&self) -> &AudioTrack {
        &self.output
    }

    pub fn controls(&self) -> &RadioControls {
        &self.controls
    }

    /// Stops the wet track and disconnects the graph from its dry source.
    pub fn teardown(&self) {
        debug!("MEMORY WATCHDOG: tearing down radio graph {}", self.output.id());
        self.output.stop();
        self.chain.clear_input();
    }

    pub fn is_torn_down(&self) -> bool {
        self.output.is_stopped() && !self.chain.has_input()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc_stream(level: f32, len: usize) -> MediaStream {
        MediaStream::with_track(AudioTrack::from_samples("dry", vec![level; len]))
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = RadioParams::derive(0.37, VOICE_SAMPLE_RATE);
        let b = RadioParams::derive(0.37, VOICE_SAMPLE_RATE);
        assert_eq!(a, b);
    }

    #[test]
    fn test_adjust_intensity_is_idempotent() {
        let effect = RadioEffect::create(&MediaStream::default(), 1.0, 0.2);
        let controls = effect.controls();

        controls.adjust_intensity(0.8);
        let once = controls.params();
        controls.adjust_intensity(0.8);
        assert_eq!(controls.params(), once);

        controls.adjust_intensity(0.1);
        controls.adjust_intensity(0.8);
        assert_eq!(controls.params(), once);
        assert_eq!(once, RadioParams::derive(0.8, VOICE_SAMPLE_RATE));
    }

    #[test]
    fn test_half_intensity_parameters() {
        let p = RadioParams::derive(0.5, VOICE_SAMPLE_RATE);
        assert_eq!(p.bandpass_q, 0.5);
        assert_eq!(p.highpass_cutoff, 150.0);
        assert!((p.highshelf_gain_db + 8.95).abs() < 1e-12);
        assert!((p.lowshelf_gain_db + 8.95).abs() < 1e-12);
        assert_eq!(p.wet_gain, 0.875);
        assert_eq!(p.dry_gain, 0.0);
        assert_eq!(p.oversample, Oversample::X4);

        let n = DISTORTION_CURVE_LEN;
        assert_eq!(p.curve.len(), n);
        for k in [0, 1, 11_025, 22_050, 33_075, n - 1] {
            let identity = k as f64 / (n - 1) as f64 * 2.0 - 1.0;
            let x = (k * 2) as f64 / n as f64 - 1.0;
            let shaped = 53.0 * x * 20.0 * (std::f64::consts::PI / 180.0)
                / (std::f64::consts::PI + 50.0 * x.abs());
            let expected = identity + (shaped - identity) * 0.5;
            assert!((p.curve.points()[k] as f64 - expected).abs() < 1e-6, "k = {k}");
        }
    }

    #[test]
    fn test_curve_endpoints_by_intensity() {
        let (identity, shaped) = distortion_curves();
        assert_eq!(&distortion_curve(0.0), identity);
        assert_eq!(&distortion_curve(1.0), shaped);
    }

    #[test]
    fn test_zero_intensity_passes_dc_at_wet_gain() {
        let dry = dc_stream(0.4, 4800);
        let effect = RadioEffect::create(&dry, 1.0, 0.0);

        let mut last = None;
        while let Some(block) = effect.output().pull(480) {
            last = block.data().last().copied();
        }
        let last = last.unwrap();
        assert!((last - 0.3).abs() < 1e-4, "got {last}");
    }

    #[test]
    fn test_adjust_volume_only_touches_final_gain() {
        let effect = RadioEffect::create(&MediaStream::default(), 1.0, 0.6);
        let before = effect.controls().params();

        effect.controls().adjust_volume(2.5);
        assert_eq!(effect.controls().volume(), 2.5);
        assert_eq!(effect.controls().params(), before);
    }

    #[test]
    fn test_dry_track_swap_reaches_graph() {
        let dry = MediaStream::default();
        let effect = RadioEffect::create(&dry, 1.0, 1.0);
        assert!(effect.output().pull(480).is_none());

        dry.replace_track(Some(AudioTrack::from_samples("late", vec![0.1; 480])));
        let block = effect.output().pull(480).unwrap();
        assert_eq!(block.len(), 480);
    }

    #[test]
    fn test_teardown_stops_output_and_disconnects() {
        let dry = dc_stream(0.2, 48_000);
        let effect = RadioEffect::create(&dry, 1.0, 1.0);
        let clone = effect.output().clone();
        assert!(clone.pull(480).is_some());

        effect.teardown();
        assert!(effect.is_torn_down());
        assert!(clone.pull(480).is_none());
    }

    #[test]
    fn test_controls_identity() {
        let a = RadioEffect::create(&MediaStream::default(), 1.0, 1.0);
        let b = RadioEffect::create(&MediaStream::default(), 1.0, 1.0);
        assert!(a.controls().same_graph(&a.controls().clone()));
        assert!(!a.controls().same_graph(b.controls()));
        assert_ne!(a.output().id(), b.output().id());
    }
}
