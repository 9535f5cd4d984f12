//! Capture session abstraction over camera hardware.
//!
//! This module provides trait-based abstractions over camera backends,
//! allowing for both real camera input and mock implementations for
//! testing. A [`CameraHost`] enumerates devices and opens sessions; a
//! [`CaptureSession`] owns one device from preview start to release.

use std::sync::Arc;

use thiserror::Error;

use super::device::DeviceInfo;
use super::frame::{Frame, PixelFormat};
use crate::config::CaptureConfig;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("no camera device found")]
    NoDeviceFound,
    #[error("camera access denied: {0}")]
    AccessDenied(String),
    #[error("failed to open camera {id}: {reason}")]
    OpenFailed {
        /// Identifier of the device that failed to open.
        id: String,
        /// Backend-reported reason.
        reason: String,
    },
    #[error("failed to start preview: {0}")]
    PreviewStart(String),
    #[error("failed to stop preview: {0}")]
    PreviewStop(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("failed to access stream properties: {0}")]
    StreamProperties(String),
    #[error("camera backend error: {0}")]
    Backend(String),
}

/// Asynchronous device-level failure reported by a camera backend.
///
/// Distinct from [`CameraError`]: these arrive outside any method call,
/// typically when the device is unplugged or claimed by another process,
/// and force the session to shut down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFailure {
    /// Backend-specific error code.
    pub code: u32,
    /// Human-readable failure description.
    pub message: String,
}

impl std::fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "device failure (0x{:X}): {}", self.code, self.message)
    }
}

/// Properties of the active preview stream.
///
/// Rotation is stream metadata, not a pixel transform: the backend
/// records how the consumer should rotate frames for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamProperties {
    /// Stream width in pixels.
    pub width: u32,
    /// Stream height in pixels.
    pub height: u32,
    /// Clockwise display rotation in degrees (0, 90, 180, or 270).
    pub rotation_degrees: u32,
}

/// Callback channel for asynchronous device failures.
///
/// Cloneable so a backend can hand it to whatever thread or callback
/// context surfaces the failure.
#[derive(Clone)]
pub struct FailureSink {
    notify: Arc<dyn Fn(DeviceFailure) + Send + Sync>,
}

impl FailureSink {
    /// Creates a sink that forwards failures to the given callback.
    pub fn new(notify: impl Fn(DeviceFailure) + Send + Sync + 'static) -> Self {
        Self {
            notify: Arc::new(notify),
        }
    }

    /// Creates a sink that discards all failures.
    pub fn ignored() -> Self {
        Self::new(|_| {})
    }

    /// Reports a failure to the registered callback.
    pub fn report(&self, failure: DeviceFailure) {
        (self.notify)(failure);
    }
}

impl std::fmt::Debug for FailureSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureSink").finish()
    }
}

/// Trait for camera backends.
///
/// This abstraction allows swapping between real camera hardware
/// and mock implementations for testing.
pub trait CameraHost {
    /// Enumerates the video capture devices currently attached.
    fn enumerate(&self) -> Result<Vec<DeviceInfo>, CameraError>;

    /// Opens a capture session on the given device.
    ///
    /// The `failures` sink receives asynchronous device failures for
    /// the lifetime of the returned session.
    fn open(
        &self,
        device: &DeviceInfo,
        config: &CaptureConfig,
        failures: FailureSink,
    ) -> Result<Box<dyn CaptureSession>, CameraError>;
}

/// An open capture session on a single device.
///
/// Dropping the session releases the device.
pub trait CaptureSession: Send {
    /// Starts the preview stream.
    fn start_preview(&mut self) -> Result<(), CameraError>;

    /// Stops the preview stream.
    fn stop_preview(&mut self) -> Result<(), CameraError>;

    /// Triggers a single autofocus sweep, if the device supports one.
    fn autofocus(&mut self) -> Result<(), CameraError>;

    /// Reads the active preview stream properties.
    fn stream_properties(&self) -> Result<StreamProperties, CameraError>;

    /// Writes preview stream properties back to the device.
    fn set_stream_properties(&mut self, props: StreamProperties) -> Result<(), CameraError>;

    /// Captures a single frame at the given dimensions.
    fn capture_frame(
        &mut self,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<Frame, CameraError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_failure_sink_forwards() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);
        let sink = FailureSink::new(move |failure| {
            seen_clone.store(failure.code, Ordering::SeqCst);
        });

        sink.report(DeviceFailure {
            code: 0xDEAD,
            message: "device unplugged".to_string(),
        });

        assert_eq!(seen.load(Ordering::SeqCst), 0xDEAD);
    }

    #[test]
    fn test_failure_sink_ignored() {
        let sink = FailureSink::ignored();
        sink.report(DeviceFailure {
            code: 1,
            message: "nobody listening".to_string(),
        });
    }

    #[test]
    fn test_device_failure_display() {
        let failure = DeviceFailure {
            code: 0xC00D3E85,
            message: "media source busy".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "device failure (0xC00D3E85): media source busy"
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CameraError::NoDeviceFound.to_string(),
            "no camera device found"
        );
        let err = CameraError::OpenFailed {
            id: "cam0".to_string(),
            reason: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "failed to open camera cam0: busy");
    }
}
