//! jackbridge - JACK client handing fixed-size blocks to a compute engine
//!
//! This is the command-line entry point. It:
//! 1. Loads the YAML config and applies command-line overrides
//! 2. Starts the JACK client and the bridge's dispatch thread
//! 3. Monitors counters and realtime events until Ctrl-C, server shutdown,
//!    or a fatal protocol violation
//! 4. Deactivates the client and joins the dispatch thread
//!
//! ## Example
//!
//! ```text
//! jackbridge -i 2 -o 2 -a system -b system -e gain --gain 0.5
//! ```

use std::path::PathBuf;

use clap::Parser;

use jackbridge_core::compute::ENGINE_NAMES;
use jackbridge_core::config::{default_config_path, load_config, BridgeConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of input channels
    #[arg(short = 'i', long = "inchans")]
    inchans: Option<usize>,

    /// Number of output channels
    #[arg(short = 'o', long = "outchans")]
    outchans: Option<usize>,

    /// Frames per cycle; must equal the JACK buffer size (0 = use JACK's)
    #[arg(short = 'r', long = "nframes")]
    nframes: Option<usize>,

    /// JACK client to automatically connect to our inputs
    #[arg(short = 'a', long = "inconnect")]
    inconnect: Option<String>,

    /// JACK client to automatically connect to our outputs
    #[arg(short = 'b', long = "outconnect")]
    outconnect: Option<String>,

    /// JACK client name
    #[arg(short = 'n', long = "name")]
    name: Option<String>,

    /// Compute engine (passthrough, gain, mixdown, silence)
    #[arg(short = 'e', long = "engine")]
    engine: Option<String>,

    /// Linear gain for the gain engine
    #[arg(long)]
    gain: Option<f32>,

    /// Ring depth per channel, in blocks
    #[arg(long = "buffer-blocks")]
    buffer_blocks: Option<usize>,

    /// Config file (defaults to the user config directory)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

impl Args {
    /// Command-line values override file values
    fn apply(&self, config: &mut BridgeConfig) {
        if let Some(inputs) = self.inchans {
            config.input_channels = inputs;
        }
        if let Some(outputs) = self.outchans {
            config.output_channels = outputs;
        }
        if let Some(frames) = self.nframes {
            config.frames_per_cycle = (frames > 0).then_some(frames);
        }
        if let Some(source) = &self.inconnect {
            config.input_connect = Some(source.clone());
        }
        if let Some(sink) = &self.outconnect {
            config.output_connect = Some(sink.clone());
        }
        if let Some(name) = &self.name {
            config.client_name = name.clone();
        }
        if let Some(engine) = &self.engine {
            config.engine.name = engine.clone();
        }
        if let Some(gain) = self.gain {
            config.engine.gain = gain;
        }
        if let Some(blocks) = self.buffer_blocks {
            config.buffer_blocks = blocks;
        }
    }
}

fn log_settings(config: &BridgeConfig) {
    log::info!("Client name: {}", config.client_name);
    log::info!(
        "Channels: {} in / {} out",
        config.input_channels,
        config.output_channels
    );
    match config.frames_per_cycle {
        Some(frames) => log::info!("Frames per cycle: {}", frames),
        None => log::info!("Frames per cycle: JACK buffer size"),
    }
    log::info!("Ring depth: {} blocks", config.buffer_blocks);
    log::info!(
        "Engine: {} (gain {}, available: {})",
        config.engine.name,
        config.engine.gain,
        ENGINE_NAMES.join(", ")
    );
    if let Some(source) = &config.input_connect {
        log::info!("Inputs from: {}", source);
    }
    if let Some(sink) = &config.output_connect {
        log::info!("Outputs to: {}", sink);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config: BridgeConfig = load_config(&config_path);
    args.apply(&mut config);

    log_settings(&config);
    run(config)
}

#[cfg(all(target_os = "linux", feature = "jack-backend"))]
fn run(config: BridgeConfig) -> anyhow::Result<()> {
    use std::time::Duration;

    use anyhow::Context;
    use jackbridge_core::audio::JackBridge;
    use jackbridge_core::bridge::{BridgeEvent, BridgeState};
    use jackbridge_core::compute::engine_from_config;

    // How often the main thread looks at the bridge
    const MONITOR_INTERVAL_MS: u64 = 500;

    let engine = engine_from_config(&config.engine).context("Failed to select compute engine")?;
    let mut jack = JackBridge::start(&config, engine).context("Failed to start JACK bridge")?;

    log::info!(
        "Running as '{}' at {}Hz, {} frames per cycle ({:.1}ms)",
        jack.client_name(),
        jack.sample_rate(),
        jack.shape().frames,
        jack.latency_ms()
    );

    let lifecycle = jack.bridge().lifecycle();
    ctrlc::set_handler(move || {
        lifecycle.request_shutdown();
    })
    .context("Failed to install Ctrl-C handler")?;

    let mut violation = None;
    let mut last = jack.bridge().stats();
    loop {
        std::thread::sleep(Duration::from_millis(MONITOR_INTERVAL_MS));

        for event in jack.bridge_mut().drain_events() {
            match event {
                BridgeEvent::ProtocolViolation { expected, got } => {
                    log::error!(
                        "JACK delivered {} frames, bridge is configured for {}",
                        got,
                        expected
                    );
                    violation = Some(event);
                }
                BridgeEvent::Stopped => log::debug!("Realtime side stopped"),
            }
        }

        let now = jack.bridge().stats();
        let delta = now.delta_since(&last);
        last = now;
        if delta.has_xruns() {
            log::warn!(
                "{} input overruns, {} output underruns in the last {}ms",
                delta.input_overruns,
                delta.output_underruns,
                MONITOR_INTERVAL_MS
            );
        }

        if violation.is_some() || jack.bridge().state() != BridgeState::Running {
            break;
        }
    }

    log::info!("Shutting down");
    let summary = jack.close().context("Failed to close JACK bridge")?;
    log::info!(
        "Engine '{}' processed {} blocks",
        summary.engine,
        summary.blocks
    );

    if let Some(event) = violation {
        anyhow::bail!("Stopped after protocol violation: {:?}", event);
    }
    Ok(())
}

#[cfg(not(all(target_os = "linux", feature = "jack-backend")))]
fn run(_config: BridgeConfig) -> anyhow::Result<()> {
    anyhow::bail!("jackbridge was built without the JACK backend (Linux, feature `jack-backend`)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file_values() {
        let args = Args::parse_from([
            "jackbridge", "-i", "4", "-o", "2", "-r", "256", "-a", "system", "-e", "gain",
            "--gain", "0.5",
        ]);
        let mut config = BridgeConfig::with_channels(1, 1);
        config.output_connect = Some("mixer".to_string());
        args.apply(&mut config);

        assert_eq!(config.input_channels, 4);
        assert_eq!(config.output_channels, 2);
        assert_eq!(config.frames_per_cycle, Some(256));
        assert_eq!(config.input_connect.as_deref(), Some("system"));
        assert_eq!(config.output_connect.as_deref(), Some("mixer"));
        assert_eq!(config.engine.name, "gain");
        assert_eq!(config.engine.gain, 0.5);
    }

    #[test]
    fn test_zero_frames_means_backend_size() {
        let args = Args::parse_from(["jackbridge", "-r", "0"]);
        let mut config = BridgeConfig::default().with_frames(512);
        args.apply(&mut config);
        assert_eq!(config.frames_per_cycle, None);
    }
}
