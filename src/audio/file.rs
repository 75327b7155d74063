//! Audio file decoding using symphonia.
//!
//! [`AudioFileReader`] decodes common formats (wav, mp3, flac, ogg, aac) and
//! converts them to the channel layout and rate of the voice graph. Sound cues
//! and the offline renderer both load through here.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rubato::{FftFixedIn, Resampler};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::AudioSample;
use super::frame::{AudioBuffer, VOICE_SAMPLE_RATE};

const RESAMPLE_CHUNK: usize = 1024;

/// Appends `decoded` to `output`, one vector per source channel.
fn extract_samples(decoded: &AudioBufferRef, output: &mut Vec<Vec<f64>>) {
    macro_rules! copy_planes {
        ($buf:expr, $convert:expr) => {{
            let channels = $buf.spec().channels.count();
            if output.len() < channels {
                output.resize(channels, Vec::new());
            }
            for ch in 0..channels {
                output[ch].extend($buf.chan(ch).iter().map($convert));
            }
        }};
    }

    match decoded {
        AudioBufferRef::F32(buf) => copy_planes!(buf, |&s| s as f64),
        AudioBufferRef::F64(buf) => copy_planes!(buf, |&s| s),
        AudioBufferRef::S16(buf) => copy_planes!(buf, |&s| s as f64 / 32768.0),
        AudioBufferRef::S32(buf) => copy_planes!(buf, |&s| s as f64 / 2147483648.0),
        AudioBufferRef::U8(buf) => copy_planes!(buf, |&s| (s as f64 - 128.0) / 128.0),
        _ => {}
    }
}

/// Folds `input` channels onto `channels` outputs.
///
/// Mono output averages every source channel; otherwise source channels are
/// repeated cyclically.
fn remix(input: Vec<Vec<f64>>, channels: usize) -> Vec<Vec<f64>> {
    if input.len() == channels || input.is_empty() {
        return input;
    }
    let frames = input[0].len();
    if channels == 1 {
        let n = input.len() as f64;
        let mono = (0..frames)
            .map(|i| input.iter().map(|ch| ch[i]).sum::<f64>() / n)
            .collect();
        return vec![mono];
    }
    (0..channels).map(|ch| input[ch % input.len()].clone()).collect()
}

#[derive(Debug, Clone)]
pub struct AudioFileInfo {
    pub sample_rate: u32,
    pub channels: usize,
    pub duration_secs: Option<f64>,
    pub file_name: String,
}

pub struct AudioFileReader {
    format: Box<dyn symphonia::core::formats::FormatReader>,
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    track_id: u32,
    pub info: AudioFileInfo,
}

impl AudioFileReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let file = File::open(path)
            .with_context(|| format!("Failed to open audio file {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("Failed to probe audio format")?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| anyhow!("No supported audio track found"))?;

        let track_id = track.id;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| anyhow!("Unknown sample rate"))?;

        let channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .unwrap_or(2);

        let duration_secs = track
            .codec_params
            .n_frames
            .map(|frames| frames as f64 / sample_rate as f64);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Failed to create decoder")?;

        Ok(Self {
            format,
            decoder,
            track_id,
            info: AudioFileInfo {
                sample_rate,
                channels,
                duration_secs,
                file_name,
            },
        })
    }

    /// Decodes the whole file into one buffer with the requested layout.
    pub fn decode_all_resampled<
        Sample: AudioSample,
        const CHANNELS: usize,
        const SAMPLE_RATE: u32,
    >(
        mut self,
    ) -> Result<AudioBuffer<Sample, CHANNELS, SAMPLE_RATE>> {
        let mut planes: Vec<Vec<f64>> = Vec::new();

        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(symphonia::core::errors::Error::DecodeError(e)) => {
                    debug!("Skipping undecodable packet in {}: {}", self.info.file_name, e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            extract_samples(&decoded, &mut planes);
        }

        let planes = remix(planes, CHANNELS);
        if planes.first().is_none_or(|p| p.is_empty()) {
            return AudioBuffer::new(Vec::new());
        }

        let planes = if self.info.sample_rate == SAMPLE_RATE {
            planes
        } else {
            resample(&planes, self.info.sample_rate, SAMPLE_RATE)?
        };

        let frames = planes[0].len();
        let mut interleaved = Vec::with_capacity(frames * CHANNELS);
        for frame_idx in 0..frames {
            for plane in &planes {
                interleaved.push(Sample::from_f64_normalized(plane[frame_idx]));
            }
        }
        AudioBuffer::new(interleaved)
    }
}

fn resample(input: &[Vec<f64>], from: u32, to: u32) -> Result<Vec<Vec<f64>>> {
    let channels = input.len();
    let mut resampler =
        FftFixedIn::<f64>::new(from as usize, to as usize, RESAMPLE_CHUNK, 2, channels)?;

    let num_frames = input[0].len();
    let expected = (num_frames as u64 * to as u64 / from as u64) as usize;
    let mut output: Vec<Vec<f64>> = vec![Vec::with_capacity(expected); channels];

    let mut pos = 0;
    while pos < num_frames {
        let end = (pos + RESAMPLE_CHUNK).min(num_frames);
        let chunk: Vec<Vec<f64>> = input
            .iter()
            .map(|plane| {
                let mut data = plane[pos..end].to_vec();
                data.resize(RESAMPLE_CHUNK, 0.0);
                data
            })
            .collect();

        let resampled = resampler.process(&chunk, None)?;
        for (out, plane) in output.iter_mut().zip(resampled) {
            out.extend(plane);
        }
        pos += RESAMPLE_CHUNK;
    }

    for plane in &mut output {
        plane.truncate(expected);
    }
    Ok(output)
}

/// Loads a file as mono voice-rate samples.
pub fn load_voice_samples<P: AsRef<Path>>(path: P) -> Result<Vec<f32>> {
    let reader = AudioFileReader::open(path)?;
    let buffer = reader.decode_all_resampled::<f32, 1, VOICE_SAMPLE_RATE>()?;
    Ok(buffer.into_inner())
}
