//! Speaker playback using cpal.

use crate::audio::{AudioSample, VOICE_SAMPLE_RATE, VoiceBuffer};
use crate::pipeline::Pullable;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, StreamConfig};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[allow(deprecated)]
fn device_display_name(device: &Device) -> String {
    match device.description() {
        Ok(desc) => desc.name().to_string(),
        Err(_) => String::from("Unknown"),
    }
}

fn get_output_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .output_devices()
            .context("Failed to enumerate output devices")?
            .find(|d| device_display_name(d) == name)
            .with_context(|| format!("Output device {name:?} not found")),
        None => host
            .default_output_device()
            .context("No default output device available"),
    }
}

/// Names of the output devices on the default host.
pub fn output_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .context("Failed to enumerate output devices")?;
    Ok(devices.map(|d| device_display_name(&d)).collect())
}

/// Names of the input devices on the default host, for microphone selection.
pub fn input_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .context("Failed to enumerate input devices")?;
    Ok(devices.map(|d| device_display_name(&d)).collect())
}

/// Plays a mono voice source on an output device, copying it to every
/// device channel.
pub struct AudioOutput {
    source: Arc<dyn Pullable<VoiceBuffer>>,
}

impl AudioOutput {
    pub fn new(source: Arc<dyn Pullable<VoiceBuffer>>) -> Self {
        Self { source }
    }

    pub fn start(self, device_name: Option<&str>) -> Result<cpal::Stream> {
        let output_device = get_output_device(device_name)?;
        info!("Using output device: {}", device_display_name(&output_device));
        let output_config = output_device.default_output_config()?;
        debug!("Output config: {output_config:#?}");

        let channels = output_config.channels().max(1);
        let config = StreamConfig {
            channels,
            sample_rate: VOICE_SAMPLE_RATE,
            buffer_size: match output_config.buffer_size() {
                cpal::SupportedBufferSize::Range { min, max } => {
                    let target = 256u32;
                    let size = target.clamp(*min, *max);
                    debug!(
                        "Using output buffer size: {} (min={}, max={})",
                        size, min, max
                    );
                    BufferSize::Fixed(size)
                }
                cpal::SupportedBufferSize::Unknown => {
                    warn!("Supported buffer size range unknown, using default");
                    BufferSize::Default
                }
            },
        };

        let source = self.source;
        let channels = channels as usize;
        debug!("Building output stream");
        let stream = output_device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                let pulled = source.pull(frames);
                let src = pulled.as_ref().map(|b| b.data()).unwrap_or(&[]);
                for (i, frame) in data.chunks_mut(channels).enumerate() {
                    let sample = src.get(i).copied().unwrap_or_else(f32::silence);
                    frame.fill(sample);
                }
            },
            |err| error!("An error occurred on the output audio stream: {}", err),
            None,
        )?;
        stream.play()?;
        Ok(stream)
    }
}
