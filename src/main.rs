use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use citizen_band::audio::{AudioTrack, MediaStream, VOICE_SAMPLE_RATE, load_voice_samples};
use citizen_band::bridge::DesktopHost;
use citizen_band::call::RadioEffect;
use citizen_band::config::ClientConfig;
use citizen_band::input::{Keybind, KeybindId, backend};
use citizen_band::pipeline::Pullable;
use citizen_band::state::{LocalStore, ParticipantSettings};
use citizen_band::{identity, version};

/// Samples pulled per block when rendering offline.
const RENDER_BLOCK: usize = 480;

#[derive(Parser)]
#[command(name = "citizen-band", version, about)]
struct Cli {
    /// Preferences file
    #[arg(long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render an audio file through the radio effect into a mono WAV file
    Render {
        input: PathBuf,
        output: PathBuf,
        /// Effect amount in percent, 0 to 100
        #[arg(long, default_value_t = 100.0)]
        amount: f64,
        /// Volume in percent, 0 to 300
        #[arg(long, default_value_t = 100.0)]
        volume: f64,
    },
    /// Print push-to-talk edges from the configured binding
    Ptt {
        /// Binding as JSON, e.g. '{"type":"gamepad","key":"XINPUT_GAMEPAD_A"}'
        #[arg(long)]
        keybind: Option<String>,
    },
    /// Play an audio file through the radio effect on the output device
    #[cfg(feature = "playback")]
    Play {
        input: PathBuf,
        /// Effect amount in percent, 0 to 100
        #[arg(long, default_value_t = 100.0)]
        amount: f64,
        /// Volume in percent, 0 to 300
        #[arg(long, default_value_t = 100.0)]
        volume: f64,
        /// Output device name
        #[arg(long)]
        device: Option<String>,
    },
    /// List the audio devices that can be selected
    #[cfg(feature = "playback")]
    Devices,
    /// Print the stable user identifier
    Identity,
    /// Print the client version, optionally checking it against another
    Version {
        #[arg(long)]
        newer_than: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run() {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ClientConfig::default();
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    match cli.command {
        Command::Render {
            input,
            output,
            amount,
            volume,
        } => render(&input, &output, ParticipantSettings::checked(volume, amount)?),
        Command::Ptt { keybind } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start runtime")?;
            runtime.block_on(watch_ptt(config, keybind))
        }
        #[cfg(feature = "playback")]
        Command::Play {
            input,
            amount,
            volume,
            device,
        } => play(
            &input,
            ParticipantSettings::checked(volume, amount)?,
            device.or(config.output_device),
        ),
        #[cfg(feature = "playback")]
        Command::Devices => {
            use citizen_band::io::{input_device_names, output_device_names};
            println!("Inputs:");
            for name in input_device_names()? {
                println!("  {name}");
            }
            println!("Outputs:");
            for name in output_device_names()? {
                println!("  {name}");
            }
            Ok(())
        }
        Command::Identity => {
            println!("{}", identity::user_uuid()?);
            Ok(())
        }
        Command::Version { newer_than } => {
            let current = env!("CARGO_PKG_VERSION");
            match newer_than {
                Some(other) => println!("{}", version::is_newer(current, &other)),
                None => println!("{current}"),
            }
            Ok(())
        }
    }
}

fn render(input: &Path, output: &Path, settings: ParticipantSettings) -> Result<()> {
    let samples = load_voice_samples(input)?;
    info!(
        "Rendering {} samples at amount {}% volume {}%",
        samples.len(),
        settings.post_processing_amount,
        settings.volume
    );

    let dry = MediaStream::with_track(AudioTrack::from_samples("input", samples));
    let effect = RadioEffect::create(&dry, settings.volume_fraction(), settings.intensity());

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: VOICE_SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(output, spec)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    while let Some(block) = effect.output().pull(RENDER_BLOCK) {
        for sample in block.data() {
            writer.write_sample(*sample)?;
        }
    }
    writer.finalize().context("Failed to finalize WAV file")?;
    effect.teardown();
    info!("Wrote {}", output.display());
    Ok(())
}

async fn watch_ptt(config: ClientConfig, keybind: Option<String>) -> Result<()> {
    let store = LocalStore::open(&config.store_path)?.shared();
    let (host, api) = DesktopHost::new(backend::detect(), store);
    tokio::spawn(host.run());

    if let Some(raw) = keybind {
        let keybind: Keybind = serde_json::from_str(&raw).context("Invalid keybind JSON")?;
        api.set_keybind(KeybindId::Ptt, keybind).await?;
    }
    let mut edges = api.on_keybind(KeybindId::Ptt).await?;
    info!("Watching push-to-talk, press Ctrl-C to stop");

    loop {
        tokio::select! {
            edge = edges.recv() => match edge {
                Some(pressed) => println!("{}", if pressed { "pressed" } else { "released" }),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

#[cfg(feature = "playback")]
fn play(input: &Path, settings: ParticipantSettings, device: Option<String>) -> Result<()> {
    use citizen_band::call::OutputMixer;
    use citizen_band::io::AudioOutput;
    use std::sync::Arc;
    use std::time::Duration;

    let samples = load_voice_samples(input)?;
    let duration = Duration::from_secs_f64(samples.len() as f64 / VOICE_SAMPLE_RATE as f64);
    let dry = MediaStream::with_track(AudioTrack::from_samples("input", samples));
    let effect = RadioEffect::create(&dry, settings.volume_fraction(), settings.intensity());

    let mixer = Arc::new(OutputMixer::new());
    mixer.set_tracks(vec![effect.output().clone()]);
    let _stream = AudioOutput::new(mixer).start(device.as_deref())?;
    info!("Playing {} for {:.1}s", input.display(), duration.as_secs_f64());
    std::thread::sleep(duration + Duration::from_millis(250));
    effect.teardown();
    Ok(())
}
