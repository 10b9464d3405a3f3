//! # Scan Replay
//!
//! Runs a scan session against a folder of still images instead of a webcam.
//!
//! ## Usage
//! ```bash
//! # Replay ./frames against a catalog, printing every added line as JSON
//! cargo run -p titan-scan --bin scan-replay -- --catalog ./catalog.json --frames ./frames
//!
//! # Use a custom scanner config
//! cargo run -p titan-scan --bin scan-replay -- -c ./catalog.json -f ./frames --config ./scanner.toml
//! ```
//!
//! Every match is confirmed immediately with the staged quantity, so each
//! frame holding a known code yields one JSON line on stdout. Logs go to
//! stderr and honour `RUST_LOG`.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use titan_core::ScannedLine;
use titan_scan::{
    load_catalog_file, ReplayCamera, ScanConfig, ScanEventSink, ScanNotice, ScanSession, SharedCatalog,
};

/// Extra time after the last frame before the replay ends.
const DRAIN_MS: u64 = 500;

/// Forwards notices to the replay loop.
struct ReplaySink {
    tx: mpsc::UnboundedSender<ScanNotice>,
}

impl ScanEventSink for ReplaySink {
    fn on_notice(&self, notice: &ScanNotice) {
        let _ = self.tx.send(notice.clone());
    }

    fn on_product_scanned(&self, line: &ScannedLine) {
        match serde_json::to_string(line) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!(error = %e, "Could not serialize scanned line"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut catalog_path: Option<PathBuf> = None;
    let mut frames_dir: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" | "-c" => {
                if i + 1 < args.len() {
                    catalog_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--frames" | "-f" => {
                if i + 1 < args.len() {
                    frames_dir = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let (Some(catalog_path), Some(frames_dir)) = (catalog_path, frames_dir) else {
        print_usage();
        return Err("--catalog and --frames are required".into());
    };

    let config = ScanConfig::load(config_path)?;
    let catalog = SharedCatalog::new(load_catalog_file(&catalog_path)?);
    let camera = ReplayCamera::from_dir(&frames_dir)?;
    let replay_for = config.capture.interval() * camera.frame_count() as u32 + Duration::from_millis(DRAIN_MS);

    let (tx, mut notices) = mpsc::unbounded_channel();
    let mut session = ScanSession::builder(config)
        .with_camera(Arc::new(camera))
        .with_catalog(Arc::new(catalog))
        .with_sink(Arc::new(ReplaySink { tx }))
        .build()?;

    session.start().await?;
    info!(session_id = %session.id(), ?replay_for, "Replaying frames");

    let deadline = tokio::time::sleep(replay_for);
    tokio::pin!(deadline);

    let mut added = 0usize;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Some(notice) = notices.recv() => match notice {
                ScanNotice::Matched { code, .. } => match session.confirm_add().await {
                    Ok(_) => added += 1,
                    Err(e) => warn!(%code, error = %e, "Could not add scanned product"),
                },
                ScanNotice::ProductNotFound { code } => {
                    warn!(%code, "No product for code");
                }
                _ => {}
            },
        }
    }

    session.close().await;
    info!(added, "Replay finished");
    Ok(())
}

fn print_usage() {
    println!("Titan POS Scan Replay");
    println!();
    println!("Usage: scan-replay --catalog <FILE> --frames <DIR> [--config <FILE>]");
    println!();
    println!("Options:");
    println!("  -c, --catalog <FILE>   Catalog JSON (array of products)");
    println!("  -f, --frames <DIR>     Directory of PNG/JPEG frames, replayed in name order");
    println!("      --config <FILE>    Scanner config (default: platform config dir)");
    println!("  -h, --help             Show this help message");
}

/// Initializes the tracing subscriber for logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show all debug logs
/// - `RUST_LOG=titan_scan=trace` - Include per-tick skips
/// - Default: `info,titan=debug`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,titan=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();
}
