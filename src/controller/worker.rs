//! Scan worker thread driving the periodic capture and decode loop.
//!
//! The worker owns the capture session outright. Ticks and control
//! events are serialized on one thread, so a frame can never be
//! captured after the session has been released and at most one
//! decode is ever in flight.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::camera::{CameraError, CaptureSession, DeviceFailure, PixelFormat};
use crate::decode::{DecodeOptions, Decoder};
use crate::display::{DisplaySurface, ScanUpdate};
use crate::orientation::DisplayOrientation;

use super::apply_rotation;
use super::state::{ControllerState, StateCell};
use super::stats::ScanStats;

/// Messages the controller sends to a running worker.
#[derive(Debug)]
pub(crate) enum WorkerEvent {
    /// Stop scanning and tear the session down.
    Stop,
    /// The display rotated; reapply rotation correction.
    OrientationChanged(DisplayOrientation),
    /// The device reported an asynchronous failure.
    DeviceFailed(DeviceFailure),
}

/// Everything the worker thread owns.
pub(crate) struct WorkerContext {
    pub(crate) session: Box<dyn CaptureSession>,
    pub(crate) events: Receiver<WorkerEvent>,
    pub(crate) decoder: Arc<dyn Decoder>,
    pub(crate) display: Arc<dyn DisplaySurface>,
    pub(crate) state: Arc<StateCell>,
    pub(crate) stats: Arc<ScanStats>,
    pub(crate) interval: Duration,
    pub(crate) options: DecodeOptions,
    pub(crate) orientation: DisplayOrientation,
    pub(crate) mirrored: bool,
    pub(crate) external: bool,
}

pub(crate) fn spawn(context: WorkerContext) -> Result<thread::JoinHandle<()>, CameraError> {
    thread::Builder::new()
        .name("scan-worker".to_string())
        .spawn(move || run(context))
        .map_err(|e| CameraError::Backend(format!("failed to spawn scan worker: {}", e)))
}

fn run(mut context: WorkerContext) {
    tracing::debug!(
        interval_ms = context.interval.as_millis() as u64,
        "scan worker started"
    );

    let mut fatal = None;
    let mut next_tick = Instant::now() + context.interval;

    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match context.events.recv_timeout(wait) {
            Ok(WorkerEvent::Stop) => break,
            Ok(WorkerEvent::OrientationChanged(orientation)) => {
                context.orientation = orientation;
                if let Err(e) = apply_rotation(
                    context.session.as_mut(),
                    orientation,
                    context.mirrored,
                    context.external,
                ) {
                    tracing::warn!("failed to reapply preview rotation: {}", e);
                }
            }
            Ok(WorkerEvent::DeviceFailed(failure)) => {
                fatal = Some(failure);
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                run_tick(&mut context);
                // The next tick is armed after the work finishes, so a
                // slow decode delays the schedule instead of stacking
                // overlapping ticks.
                next_tick = Instant::now() + context.interval;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Some(failure) = &fatal {
        tracing::error!(
            code = failure.code,
            "stopping after device failure: {}",
            failure.message
        );
    }

    teardown(context);
}

/// One scan tick: focus, read stream properties, capture, decode,
/// publish. Any step failing skips the rest of the tick.
fn run_tick(context: &mut WorkerContext) {
    context.stats.record_tick();

    if let Err(e) = context.session.autofocus() {
        tracing::debug!("autofocus request failed: {}", e);
    }

    let props = match context.session.stream_properties() {
        Ok(props) => props,
        Err(e) => {
            tracing::warn!("stream properties unavailable, skipping tick: {}", e);
            return;
        }
    };

    let frame = match context
        .session
        .capture_frame(PixelFormat::Gray8, props.width, props.height)
    {
        Ok(frame) => frame,
        Err(e) => {
            context.stats.record_capture_failure();
            tracing::warn!("frame capture failed, skipping tick: {}", e);
            return;
        }
    };

    let (width, height, format) = (frame.width(), frame.height(), frame.format());
    let text = context.decoder.decode(&frame, &context.options);
    drop(frame);

    match &text {
        Some(symbol) => {
            context.stats.record_decoded();
            tracing::info!(bytes = symbol.len(), "scan tick decoded a symbol");
        }
        None => context.stats.record_miss(),
    }

    context.display.present(ScanUpdate {
        width,
        height,
        format,
        text,
    });
}

/// Stops the preview, detaches the display, and releases the device.
fn teardown(mut context: WorkerContext) {
    context.state.set(ControllerState::CleaningUp);

    if let Err(e) = context.session.stop_preview() {
        tracing::warn!("failed to stop preview during teardown: {}", e);
    }
    context.display.clear_preview();
    context.display.set_keep_awake(false);
    drop(context.session);

    let snapshot = context.stats.snapshot();
    tracing::info!(
        ticks = snapshot.ticks,
        decoded = snapshot.decoded,
        misses = snapshot.misses,
        capture_failures = snapshot.capture_failures,
        "scan worker stopped"
    );

    context.state.set(ControllerState::Idle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{
        CameraHost, DeviceInfo, FailureSink, MockCameraHost, Panel, SessionEvent,
    };
    use crate::config::CaptureConfig;
    use crate::decode::MockDecoder;
    use crate::display::{DisplayEvent, RecordingDisplay};
    use std::sync::mpsc;

    fn test_device() -> DeviceInfo {
        DeviceInfo {
            id: "mock0".to_string(),
            name: "Test Camera".to_string(),
            panel: Panel::Back,
        }
    }

    fn test_context(
        host: &MockCameraHost,
        decoder: MockDecoder,
        display: RecordingDisplay,
        events: mpsc::Receiver<WorkerEvent>,
    ) -> WorkerContext {
        let mut session = host
            .open(
                &test_device(),
                &CaptureConfig::default(),
                FailureSink::ignored(),
            )
            .unwrap();
        session.start_preview().unwrap();

        WorkerContext {
            session,
            events,
            decoder: Arc::new(decoder),
            display: Arc::new(display),
            state: Arc::new(StateCell::new(ControllerState::Previewing)),
            stats: Arc::new(ScanStats::new()),
            interval: Duration::from_secs(60),
            options: DecodeOptions::default(),
            orientation: DisplayOrientation::Landscape,
            mirrored: false,
            external: false,
        }
    }

    #[test]
    fn test_stop_tears_down_in_order() {
        let host = MockCameraHost::new();
        let display = RecordingDisplay::new();
        let (tx, rx) = mpsc::channel();
        let context = test_context(&host, MockDecoder::new(), display.clone(), rx);
        let state = Arc::clone(&context.state);

        tx.send(WorkerEvent::Stop).unwrap();
        run(context);

        assert_eq!(state.get(), ControllerState::Idle);
        assert_eq!(
            host.events(),
            vec![
                SessionEvent::PreviewStarted,
                SessionEvent::PreviewStopped,
                SessionEvent::Released,
            ]
        );
        assert_eq!(
            display.events(),
            vec![DisplayEvent::PreviewCleared, DisplayEvent::KeepAwake(false)]
        );
    }

    #[test]
    fn test_device_failure_breaks_loop() {
        let host = MockCameraHost::new();
        let display = RecordingDisplay::new();
        let (tx, rx) = mpsc::channel();
        let context = test_context(&host, MockDecoder::new(), display.clone(), rx);
        let state = Arc::clone(&context.state);

        tx.send(WorkerEvent::DeviceFailed(DeviceFailure {
            code: 0xBEEF,
            message: "device unplugged".to_string(),
        }))
        .unwrap();
        run(context);

        assert_eq!(state.get(), ControllerState::Idle);
        assert_eq!(
            host.events(),
            vec![
                SessionEvent::PreviewStarted,
                SessionEvent::PreviewStopped,
                SessionEvent::Released,
            ]
        );
    }

    #[test]
    fn test_controller_disconnect_stops_loop() {
        let host = MockCameraHost::new();
        let display = RecordingDisplay::new();
        let (tx, rx) = mpsc::channel();
        let context = test_context(&host, MockDecoder::new(), display.clone(), rx);

        drop(tx);
        run(context);

        assert!(host.events().contains(&SessionEvent::Released));
    }

    #[test]
    fn test_orientation_event_applies_rotation() {
        let host = MockCameraHost::new();
        let display = RecordingDisplay::new();
        let (tx, rx) = mpsc::channel();
        let context = test_context(&host, MockDecoder::new(), display.clone(), rx);

        tx.send(WorkerEvent::OrientationChanged(DisplayOrientation::Portrait))
            .unwrap();
        tx.send(WorkerEvent::Stop).unwrap();
        run(context);

        assert!(host.events().contains(&SessionEvent::RotationSet(90)));
    }

    #[test]
    fn test_tick_presents_update() {
        let host = MockCameraHost::new();
        let display = RecordingDisplay::new();
        let (_tx, rx) = mpsc::channel();
        let mut context = test_context(
            &host,
            MockDecoder::scripted(vec![Some("HELLO".to_string())]),
            display.clone(),
            rx,
        );

        run_tick(&mut context);
        run_tick(&mut context);

        let updates = display.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].text.as_deref(), Some("HELLO"));
        assert_eq!(updates[0].frame_info(), "640x480 Gray8");
        assert_eq!(updates[1].text, None);

        let snapshot = context.stats.snapshot();
        assert_eq!(snapshot.ticks, 2);
        assert_eq!(snapshot.decoded, 1);
        assert_eq!(snapshot.misses, 1);

        let events = host.events();
        let focus = events
            .iter()
            .position(|e| *e == SessionEvent::Autofocus)
            .unwrap();
        let capture = events
            .iter()
            .position(|e| *e == SessionEvent::FrameCaptured)
            .unwrap();
        assert!(focus < capture);
    }

    #[test]
    fn test_capture_failure_skips_tick() {
        let host = MockCameraHost::new();
        let display = RecordingDisplay::new();
        let (_tx, rx) = mpsc::channel();
        let mut context = test_context(&host, MockDecoder::new(), display.clone(), rx);

        host.set_fail_capture(true);
        run_tick(&mut context);

        assert!(display.updates().is_empty());
        let snapshot = context.stats.snapshot();
        assert_eq!(snapshot.ticks, 1);
        assert_eq!(snapshot.capture_failures, 1);
    }

    #[test]
    fn test_missing_properties_skips_tick() {
        let host = MockCameraHost::new();
        let display = RecordingDisplay::new();
        let (_tx, rx) = mpsc::channel();
        let mut context = test_context(&host, MockDecoder::new(), display.clone(), rx);

        host.set_properties_unavailable(true);
        run_tick(&mut context);

        assert!(display.updates().is_empty());
        assert!(!host.events().contains(&SessionEvent::FrameCaptured));
        let snapshot = context.stats.snapshot();
        assert_eq!(snapshot.ticks, 1);
        assert_eq!(snapshot.capture_failures, 0);
    }
}
