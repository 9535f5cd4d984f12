//! QR Viewfinder CLI
//!
//! Command-line harness for the scan controller. Runs the preview and
//! scan loop against the mock backend (or real hardware when built
//! with the `camera` feature) and prints each tick's result.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

#[cfg(feature = "camera")]
use qr_viewfinder::camera::NokhwaHost;
use qr_viewfinder::camera::CameraHost;
#[cfg(not(feature = "camera"))]
use qr_viewfinder::camera::{DeviceInfo, MockCameraHost, Panel};
use qr_viewfinder::config::FileConfig;
use qr_viewfinder::controller::ScanController;
use qr_viewfinder::decode::RqrrDecoder;
use qr_viewfinder::display::{ChannelDisplay, DisplayEvent};

#[derive(Parser)]
#[command(name = "qr-viewfinder")]
#[command(about = "Camera preview with a periodic QR scan loop")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many scan ticks (0 runs until Ctrl-C)
    #[arg(short, long, default_value = "0")]
    ticks: u64,

    /// Override the scan interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// List detected camera devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    info!("QR Viewfinder v{}", qr_viewfinder::VERSION);

    let mut config = match cli.config {
        Some(ref path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };

    if let Some(interval_ms) = cli.interval_ms {
        config.scan.interval_ms = interval_ms;
        if let Err(e) = config.validate() {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    }

    let host = make_host();

    if cli.list_devices {
        match host.enumerate() {
            Ok(devices) if devices.is_empty() => println!("No camera devices found."),
            Ok(devices) => {
                for device in devices {
                    println!("{}  {}  (panel: {:?})", device.id, device.name, device.panel);
                }
            }
            Err(e) => {
                eprintln!("Failed to enumerate devices: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let (display, events) = ChannelDisplay::new();
    let mut controller = ScanController::new(host, RqrrDecoder::new(), display, config);

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        running_handler.store(false, Ordering::SeqCst);
    }) {
        warn!("failed to install Ctrl-C handler: {}", e);
    }

    if let Err(e) = controller.activate() {
        eprintln!("Failed to start scanning: {}", e);
        std::process::exit(1);
    }

    info!("Scanning... point a QR code at the camera");

    let mut seen = 0u64;
    while running.load(Ordering::SeqCst) && controller.is_active() {
        match events.recv_timeout(Duration::from_millis(200)) {
            Ok(DisplayEvent::Update(update)) => {
                seen += 1;
                let text = update.text.as_deref().unwrap_or("(no symbol)");
                println!("{}  {}", update.frame_info(), text);
                if cli.ticks != 0 && seen >= cli.ticks {
                    break;
                }
            }
            Ok(event) => {
                tracing::debug!(?event, "display event");
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    controller.deactivate();

    let stats = controller.stats();
    info!(
        "Scanned {} ticks: {} decoded, {} misses, {} capture failures",
        stats.ticks, stats.decoded, stats.misses, stats.capture_failures
    );
}

#[cfg(feature = "camera")]
fn make_host() -> NokhwaHost {
    NokhwaHost::new()
}

#[cfg(not(feature = "camera"))]
fn make_host() -> MockCameraHost {
    info!("No camera backend compiled in; using the synthetic mock camera");
    MockCameraHost::new().with_device(DeviceInfo {
        id: "mock0".to_string(),
        name: "Synthetic Camera".to_string(),
        panel: Panel::Back,
    })
}
