//! QR Viewfinder Library
//!
//! Camera preview management with a periodic QR scan loop. Selects a
//! capture device by enclosure panel, keeps the preview upright as the
//! display rotates, and once per tick captures a frame, decodes it,
//! and publishes the result to a display surface.
//!
//! # Architecture
//!
//! The controller walks one session through an explicit lifecycle:
//!
//! ```text
//! select device → open session → attach preview → scan loop
//!                                                     ↓
//!                             tick: focus → capture → decode → present
//! ```
//!
//! # Design Principles
//!
//! - **One session at a time**: the scan worker owns the session, so a
//!   frame can never be captured after the device is released
//! - **Traits at every seam**: camera backend, decoder, and display
//!   surface are all swappable, with mock implementations included
//! - **Failures degrade**: a failed tick is skipped, a lost device
//!   tears the whole session down and returns the controller to idle
//!
//! # Example
//!
//! ```no_run
//! use qr_viewfinder::{
//!     camera::{DeviceInfo, MockCameraHost, Panel},
//!     config::FileConfig,
//!     controller::ScanController,
//!     decode::RqrrDecoder,
//!     display::RecordingDisplay,
//! };
//!
//! let host = MockCameraHost::new().with_device(DeviceInfo {
//!     id: "cam0".to_string(),
//!     name: "Demo Camera".to_string(),
//!     panel: Panel::Back,
//! });
//! let display = RecordingDisplay::new();
//!
//! let mut controller = ScanController::new(
//!     host,
//!     RqrrDecoder::new(),
//!     display.clone(),
//!     FileConfig::default(),
//! );
//!
//! controller.activate().unwrap();
//! std::thread::sleep(std::time::Duration::from_secs(3));
//! controller.deactivate();
//!
//! for update in display.updates() {
//!     println!("{} {}", update.frame_info(), update.text_or_empty());
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod camera;
pub mod config;
pub mod controller;
pub mod decode;
pub mod display;
pub mod orientation;

// Re-export commonly used types at crate root
pub use camera::{
    CameraError, CameraHost, CaptureSession, DeviceInfo, Frame, MockCameraHost, Panel, PixelFormat,
};
pub use config::{CaptureConfig, FileConfig, ScanConfig};
pub use controller::{ControllerState, ScanController, StatsSnapshot};
pub use decode::{DecodeOptions, Decoder, MockDecoder, RqrrDecoder};
pub use display::{ChannelDisplay, DisplayEvent, DisplaySurface, RecordingDisplay, ScanUpdate};
pub use orientation::DisplayOrientation;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
