//! Mock camera backend that generates synthetic frames.
//!
//! Records every session operation so tests can assert on lifecycle
//! ordering, and exposes toggles for the failure modes a real backend
//! can hit (denied access, preview failure, lost stream).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::device::DeviceInfo;
use super::frame::{Frame, PixelFormat};
use super::session::{
    CameraError, CameraHost, CaptureSession, DeviceFailure, FailureSink, StreamProperties,
};
use crate::config::CaptureConfig;

/// An operation observed on a mock capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Preview stream started.
    PreviewStarted,
    /// Autofocus sweep requested.
    Autofocus,
    /// Stream properties were read.
    PropertiesRead,
    /// Rotation metadata written, with the degrees applied.
    RotationSet(u32),
    /// A frame was captured.
    FrameCaptured,
    /// Preview stream stopped.
    PreviewStopped,
    /// Session dropped and device released.
    Released,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct MockInner {
    devices: Mutex<Vec<DeviceInfo>>,
    deny_access: AtomicBool,
    fail_preview: AtomicBool,
    fail_capture: AtomicBool,
    properties_unavailable: AtomicBool,
    sinks: Mutex<Vec<FailureSink>>,
    events: Mutex<Vec<SessionEvent>>,
}

/// Mock camera backend for testing.
///
/// Clones share state, so a test can keep one handle for assertions
/// while the controller owns another.
#[derive(Debug, Clone, Default)]
pub struct MockCameraHost {
    inner: Arc<MockInner>,
}

impl MockCameraHost {
    /// Creates a host with no attached devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device to the enumeration results.
    pub fn with_device(self, device: DeviceInfo) -> Self {
        lock(&self.inner.devices).push(device);
        self
    }

    /// Makes every subsequent open attempt fail with access denied.
    pub fn deny_access(self) -> Self {
        self.inner.deny_access.store(true, Ordering::SeqCst);
        self
    }

    /// Makes every subsequent preview start fail.
    pub fn fail_preview(self) -> Self {
        self.inner.fail_preview.store(true, Ordering::SeqCst);
        self
    }

    /// Toggles frame capture failure at runtime.
    pub fn set_fail_capture(&self, fail: bool) {
        self.inner.fail_capture.store(fail, Ordering::SeqCst);
    }

    /// Toggles stream property reads returning an error at runtime.
    pub fn set_properties_unavailable(&self, unavailable: bool) {
        self.inner
            .properties_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    /// Reports a device failure to every open session's sink.
    pub fn inject_failure(&self, failure: DeviceFailure) {
        for sink in lock(&self.inner.sinks).iter() {
            sink.report(failure.clone());
        }
    }

    /// Returns all session events recorded so far, in order.
    pub fn events(&self) -> Vec<SessionEvent> {
        lock(&self.inner.events).clone()
    }

    fn record(&self, event: SessionEvent) {
        lock(&self.inner.events).push(event);
    }
}

impl CameraHost for MockCameraHost {
    fn enumerate(&self) -> Result<Vec<DeviceInfo>, CameraError> {
        Ok(lock(&self.inner.devices).clone())
    }

    fn open(
        &self,
        device: &DeviceInfo,
        config: &CaptureConfig,
        failures: FailureSink,
    ) -> Result<Box<dyn CaptureSession>, CameraError> {
        if self.inner.deny_access.load(Ordering::SeqCst) {
            return Err(CameraError::AccessDenied(
                "simulated permission denial".to_string(),
            ));
        }
        config
            .validate()
            .map_err(|e| CameraError::Backend(e.to_string()))?;

        lock(&self.inner.sinks).push(failures);
        tracing::info!(device = %device.id, "mock session opened");

        Ok(Box::new(MockSession {
            host: self.clone(),
            previewing: false,
            sequence: 0,
            props: StreamProperties {
                width: config.width,
                height: config.height,
                rotation_degrees: 0,
            },
        }))
    }
}

struct MockSession {
    host: MockCameraHost,
    previewing: bool,
    sequence: u64,
    props: StreamProperties,
}

impl CaptureSession for MockSession {
    fn start_preview(&mut self) -> Result<(), CameraError> {
        if self.host.inner.fail_preview.load(Ordering::SeqCst) {
            return Err(CameraError::PreviewStart(
                "simulated preview failure".to_string(),
            ));
        }
        if self.previewing {
            return Err(CameraError::PreviewStart(
                "preview already running".to_string(),
            ));
        }
        self.previewing = true;
        self.host.record(SessionEvent::PreviewStarted);
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), CameraError> {
        if self.previewing {
            self.previewing = false;
            self.host.record(SessionEvent::PreviewStopped);
        }
        Ok(())
    }

    fn autofocus(&mut self) -> Result<(), CameraError> {
        self.host.record(SessionEvent::Autofocus);
        Ok(())
    }

    fn stream_properties(&self) -> Result<StreamProperties, CameraError> {
        if self.host.inner.properties_unavailable.load(Ordering::SeqCst) {
            return Err(CameraError::StreamProperties(
                "no active preview stream".to_string(),
            ));
        }
        self.host.record(SessionEvent::PropertiesRead);
        Ok(self.props)
    }

    fn set_stream_properties(&mut self, props: StreamProperties) -> Result<(), CameraError> {
        self.props = props;
        self.host.record(SessionEvent::RotationSet(props.rotation_degrees));
        Ok(())
    }

    fn capture_frame(
        &mut self,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<Frame, CameraError> {
        if !self.previewing {
            return Err(CameraError::CaptureFailed(
                "preview not running".to_string(),
            ));
        }
        if self.host.inner.fail_capture.load(Ordering::SeqCst) {
            return Err(CameraError::CaptureFailed(
                "simulated capture failure".to_string(),
            ));
        }

        // Deterministic pattern, varies per frame via the sequence number
        let byte_count = (width as usize) * (height as usize) * format.bytes_per_pixel();
        let pixels: Vec<u8> = (0..byte_count)
            .map(|i| ((i as u64 ^ self.sequence) % 256) as u8)
            .collect();

        self.sequence += 1;
        self.host.record(SessionEvent::FrameCaptured);
        Ok(Frame::new(pixels, width, height, format))
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.host.record(SessionEvent::Released);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::device::Panel;

    fn test_device() -> DeviceInfo {
        DeviceInfo {
            id: "mock0".to_string(),
            name: "Test Camera".to_string(),
            panel: Panel::Back,
        }
    }

    #[test]
    fn test_mock_session_lifecycle() {
        let host = MockCameraHost::new().with_device(test_device());
        let devices = host.enumerate().unwrap();
        assert_eq!(devices.len(), 1);

        let mut session = host
            .open(&devices[0], &CaptureConfig::default(), FailureSink::ignored())
            .unwrap();

        session.start_preview().unwrap();
        let props = session.stream_properties().unwrap();
        let frame = session
            .capture_frame(PixelFormat::Gray8, props.width, props.height)
            .unwrap();
        assert!(frame.is_valid());
        session.stop_preview().unwrap();
        drop(session);

        let events = host.events();
        assert_eq!(
            events,
            vec![
                SessionEvent::PreviewStarted,
                SessionEvent::PropertiesRead,
                SessionEvent::FrameCaptured,
                SessionEvent::PreviewStopped,
                SessionEvent::Released,
            ]
        );
    }

    #[test]
    fn test_capture_requires_preview() {
        let host = MockCameraHost::new().with_device(test_device());
        let mut session = host
            .open(&test_device(), &CaptureConfig::default(), FailureSink::ignored())
            .unwrap();

        assert!(matches!(
            session.capture_frame(PixelFormat::Gray8, 640, 480),
            Err(CameraError::CaptureFailed(_))
        ));
    }

    #[test]
    fn test_double_start_rejected() {
        let host = MockCameraHost::new().with_device(test_device());
        let mut session = host
            .open(&test_device(), &CaptureConfig::default(), FailureSink::ignored())
            .unwrap();

        session.start_preview().unwrap();
        assert!(matches!(
            session.start_preview(),
            Err(CameraError::PreviewStart(_))
        ));
    }

    #[test]
    fn test_deny_access() {
        let host = MockCameraHost::new().with_device(test_device()).deny_access();
        let result = host.open(
            &test_device(),
            &CaptureConfig::default(),
            FailureSink::ignored(),
        );
        assert!(matches!(result, Err(CameraError::AccessDenied(_))));
    }

    #[test]
    fn test_injected_failure_reaches_sink() {
        use std::sync::atomic::AtomicU32;

        let host = MockCameraHost::new().with_device(test_device());
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);
        let sink = FailureSink::new(move |f| seen_clone.store(f.code, Ordering::SeqCst));

        let _session = host
            .open(&test_device(), &CaptureConfig::default(), sink)
            .unwrap();
        host.inject_failure(DeviceFailure {
            code: 42,
            message: "unplugged".to_string(),
        });

        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_frames_vary_by_sequence() {
        let host = MockCameraHost::new().with_device(test_device());
        let mut session = host
            .open(&test_device(), &CaptureConfig::default(), FailureSink::ignored())
            .unwrap();
        session.start_preview().unwrap();

        let a = session.capture_frame(PixelFormat::Gray8, 64, 64).unwrap();
        let b = session.capture_frame(PixelFormat::Gray8, 64, 64).unwrap();
        assert_ne!(a.pixels(), b.pixels());
    }
}
