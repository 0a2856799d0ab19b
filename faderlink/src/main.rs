//! faderlink — entry point.
//!
//! ```text
//! faderlink                              Run with faderlink.toml
//! faderlink --config <path>              Use custom config TOML
//! faderlink --host 10.0.0.5 --port 8000  Override the destination
//! faderlink --gen-config                 Dump default config and exit
//! ```

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use faderlink_core::{ConnectionManager, FileEndpointStore};

use faderlink::config::SurfaceConfig;
use faderlink::surface::{Command, Reply, Surface};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "faderlink", about = "Stream fader movements as OSC parameter updates")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "faderlink.toml")]
    config: PathBuf,

    /// Destination host (overrides config and the saved endpoint).
    #[arg(long)]
    host: Option<String>,

    /// Destination port (overrides config and the saved endpoint).
    #[arg(long)]
    port: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&SurfaceConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let config = SurfaceConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("faderlink v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Restore the destination ──────────────────────────────

    let store = FileEndpointStore::new(&config.network.endpoint_file);
    let mut connection = ConnectionManager::udp(config.network.host_policy(), Box::new(store));
    connection.load();

    let host = cli.host.unwrap_or_else(|| config.network.host.clone());
    if !host.trim().is_empty() {
        if let Err(e) = connection.set_host(&host) {
            warn!("startup host ignored: {e}");
        }
    }
    let port = cli.port.unwrap_or_else(|| config.network.port.clone());
    if !port.trim().is_empty() {
        if let Err(e) = connection.set_port(&port) {
            warn!("startup port ignored: {e}");
        }
    }
    info!("{}", connection.status());

    let mut status_rx = connection.status_receiver();
    let mut surface = Surface::new(&config.controls, connection, config.dispatch.threshold);
    info!("{} faders, {} Hz", surface.controls().len(), config.frame.rate_hz);

    // ── 2. Widget events from stdin ─────────────────────────────

    let (line_tx, mut line_rx) = mpsc::channel::<String>(64);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    // ── 3. Frame loop ───────────────────────────────────────────

    let mut frames = tokio::time::interval(config.frame.period());
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_frame = Instant::now();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = frames.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_frame).as_secs_f32();
                last_frame = now;
                surface.tick(dt);
            }
            line = line_rx.recv(), if stdin_open => match line {
                Some(line) => match Command::parse(&line).and_then(|c| surface.apply(c)) {
                    Ok(Reply::Ok) => {}
                    Ok(Reply::Text(text)) => println!("{text}"),
                    Ok(Reply::Quit) => break,
                    Err(e) => eprintln!("{e}"),
                },
                None => {
                    stdin_open = false;
                    info!("stdin closed; running until Ctrl-C");
                }
            },
            Ok(()) = status_rx.changed() => {
                let status = status_rx.borrow_and_update().clone();
                info!("{status}");
            }
            _ = &mut ctrl_c => {
                info!("Ctrl-C received; shutting down");
                break;
            }
        }
    }

    Ok(())
}
