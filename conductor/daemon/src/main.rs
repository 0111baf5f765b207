//! Pinchy Daemon
//!
//! Runs the Pinchy conductor behind a JSON-lines stdio bridge. The desktop
//! shell writes host events to stdin and renders whatever comes out on
//! stdout; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: ~/.config/pinchy/pinchy.toml and ~/.config/pinchy/settings.json
//! pinchy-daemon --width 2560 --height 1440
//!
//! # Fast attention loop and verbose logging
//! RUST_LOG=debug pinchy-daemon --dev
//! ```
//!
//! # Protocol
//!
//! Inbound, one object per line:
//! - `{"type":"cursor","x":..,"y":..}` and `{"type":"work-area",..}` update geometry
//! - any agent event, e.g. `{"type":"click"}` or `{"type":"tutorial-next"}`
//!
//! Outbound, one object per line:
//! - agent messages, e.g. `{"event":"tutorial-step",..}`
//! - window commands, `{"event":"overlay-position",..}` and `{"event":"overlay-size",..}`
//!
//! # Signals
//!
//! - SIGINT or end of stdin: graceful shutdown

mod host;

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use pinchy_conductor::{
    load_config_from_path, default_config_path, Conductor, ConductorConfig, ConfigOverrides,
    EngineHandle, EngineRuntime, Host, JsonFileStore, Point, Profile, Size, VirtualScreen,
};

use host::{parse_line, Inbound, LineOverlay, Outbound};

/// Command queue depth between the stdin reader and the engine
const COMMAND_CAPACITY: usize = 64;

/// Pinchy desktop agent behavior engine
#[derive(Debug, Parser)]
#[command(name = "pinchy-daemon", version, about)]
struct Args {
    /// Engine config file (TOML)
    #[arg(long, env = "PINCHY_CONFIG")]
    config: Option<PathBuf>,

    /// Settings document (JSON)
    #[arg(long, env = "PINCHY_SETTINGS")]
    settings: Option<PathBuf>,

    /// Work area width in pixels
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Work area height in pixels
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Use the dev profile (fast attention loop)
    #[arg(long)]
    dev: bool,

    /// Seed for behavior randomness
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if self.dev {
            overrides = overrides.with_profile(Profile::Dev);
        }
        if let Some(seed) = self.seed {
            overrides = overrides.with_seed(seed);
        }
        overrides
    }
}

fn load_engine_config(args: &Args) -> anyhow::Result<ConductorConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path.clone())
        .with_context(|| format!("Failed to load config from {path:?}"))?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs on stderr; stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pinchy_daemon=info".parse()?)
                .add_directive("pinchy_conductor=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();
    info!("Starting Pinchy daemon");

    let config = load_engine_config(&args)?;
    info!(
        profile = ?config.profile,
        source = %config.source,
        "Configuration loaded"
    );

    let settings_path = args
        .settings
        .clone()
        .or_else(JsonFileStore::default_path)
        .context("No settings path given and no config directory available")?;
    info!(path = ?settings_path, "Settings store");

    let (out_tx, out_rx) = mpsc::unbounded_channel::<Outbound>();
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();

    let screen = VirtualScreen::new(Size::new(args.width, args.height));
    let overlay = LineOverlay::new(Point::default(), config.overlay.compact, out_tx.clone());
    let host = Host::new(
        overlay,
        screen.clone(),
        JsonFileStore::new(settings_path),
        Utc::now(),
    );
    let conductor = Conductor::new(config, host, msg_tx);

    // Presentation messages share the output stream with window commands
    let forward_tx = out_tx;
    tokio::spawn(async move {
        while let Some(message) = msg_rx.recv().await {
            if forward_tx.send(Outbound::Message(message)).is_err() {
                break;
            }
        }
    });
    let writer = tokio::spawn(write_output(out_rx));

    let (runtime, handle) = EngineRuntime::new(conductor, COMMAND_CAPACITY);
    let engine = tokio::spawn(runtime.run());
    info!("Conductor running");

    tokio::select! {
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received Ctrl+C, shutting down"),
                Err(e) => warn!(error = %e, "Signal handler failed, shutting down"),
            }
        }
        () = read_input(handle.clone(), screen) => {
            info!("Input closed, shutting down");
        }
    }

    if handle.shutdown().await.is_err() {
        debug!("Engine already stopped");
    }
    drop(handle);

    let conductor = engine.await.context("Engine task failed")?;
    let snapshot = conductor.snapshot();
    info!(
        now_ms = snapshot.now_ms,
        position = ?snapshot.position,
        mood = ?snapshot.mood,
        "Conductor stopped"
    );

    // Dropping the conductor closes the output channels
    drop(conductor);
    writer
        .await
        .context("Output task failed")?
        .context("Failed to write output")?;

    info!("Pinchy daemon stopped cleanly");
    Ok(())
}

/// Feed stdin lines to the engine until EOF
async fn read_input(handle: EngineHandle, screen: VirtualScreen) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Failed to read input");
                return;
            }
        };

        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(Inbound::Host(input))) => input.apply(&screen),
            Ok(Some(Inbound::Event(event))) => {
                debug!(event = event.name(), "Received event");
                if handle.send(event).await.is_err() {
                    warn!("Engine stopped, dropping input");
                    return;
                }
            }
            Err(e) => warn!(error = %e, line = %line, "Ignoring malformed input line"),
        }
    }
}

/// Write outbound lines to stdout until every sender is gone
async fn write_output(mut rx: mpsc::UnboundedReceiver<Outbound>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(outbound) = rx.recv().await {
        let mut line = match outbound.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to encode output");
                continue;
            }
        };
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
