//! Scan controller tying device selection, session lifecycle, the
//! display surface, and the periodic scan loop together.
//!
//! Activation selects a device, opens a session, attaches the preview,
//! and hands the session to a worker thread that captures and decodes
//! a frame on every tick. Deactivation (or an asynchronous device
//! failure) tears everything down in the reverse order it was built.

mod state;
mod stats;
mod worker;

pub use state::ControllerState;
pub use stats::{ScanStats, StatsSnapshot};

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::camera::{select_device, CameraError, CameraHost, CaptureSession, FailureSink};
use crate::config::FileConfig;
use crate::decode::{DecodeOptions, Decoder};
use crate::display::DisplaySurface;
use crate::orientation::{rotation_degrees, DisplayOrientation};

use state::StateCell;
use worker::{WorkerContext, WorkerEvent};

struct WorkerHandle {
    events: Sender<WorkerEvent>,
    join: JoinHandle<()>,
}

/// Controller for one camera preview and scan session at a time.
///
/// Owns the camera host, a decoder, and a display surface. [`activate`]
/// brings the preview up and starts the scan loop; [`deactivate`]
/// stops the loop and releases the device. Dropping the controller
/// deactivates it.
///
/// [`activate`]: ScanController::activate
/// [`deactivate`]: ScanController::deactivate
pub struct ScanController<H: CameraHost> {
    host: H,
    decoder: Arc<dyn Decoder>,
    display: Arc<dyn DisplaySurface>,
    config: FileConfig,
    orientation: DisplayOrientation,
    state: Arc<StateCell>,
    stats: Arc<ScanStats>,
    worker: Option<WorkerHandle>,
}

impl<H: CameraHost> ScanController<H> {
    /// Creates an idle controller.
    pub fn new(
        host: H,
        decoder: impl Decoder + 'static,
        display: impl DisplaySurface + 'static,
        config: FileConfig,
    ) -> Self {
        Self {
            host,
            decoder: Arc::new(decoder),
            display: Arc::new(display),
            config,
            orientation: DisplayOrientation::default(),
            state: Arc::new(StateCell::new(ControllerState::Idle)),
            stats: Arc::new(ScanStats::new()),
            worker: None,
        }
    }

    /// Sets the initial display orientation.
    pub fn with_orientation(mut self, orientation: DisplayOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Selects a device, opens it, starts the preview, and launches
    /// the scan loop.
    ///
    /// A no-op when the loop is already running. On failure every
    /// partial step is undone and the controller returns to idle.
    pub fn activate(&mut self) -> Result<(), CameraError> {
        if let Some(handle) = &self.worker {
            if handle.join.is_finished() {
                // The worker exited on its own after a device failure.
                // Reap it so this activation starts fresh.
                self.reap_worker();
            } else {
                tracing::debug!("activate ignored, scan already running");
                return Ok(());
            }
        }

        self.stats = Arc::new(ScanStats::new());

        match self.try_activate() {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("activation failed: {}", e);
                self.state.set(ControllerState::Idle);
                Err(e)
            }
        }
    }

    fn try_activate(&mut self) -> Result<(), CameraError> {
        self.state.set(ControllerState::DeviceSelecting);

        let devices = self.host.enumerate()?;
        let device = select_device(&devices, self.config.capture.preferred_panel)
            .cloned()
            .ok_or(CameraError::NoDeviceFound)?;
        tracing::info!(
            id = %device.id,
            name = %device.name,
            panel = ?device.panel,
            "camera selected"
        );

        self.state.set(ControllerState::Initializing);

        let (event_tx, event_rx) = mpsc::channel();
        let failure_tx = Mutex::new(event_tx.clone());
        let failures = FailureSink::new(move |failure| {
            let guard = failure_tx
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if guard.send(WorkerEvent::DeviceFailed(failure)).is_err() {
                tracing::debug!("device failure reported after worker exit");
            }
        });

        let mut session = self.host.open(&device, &self.config.capture, failures)?;

        let external = device.is_external();
        let mirrored = !external && device.is_front();

        self.display.set_keep_awake(true);
        self.display.attach_preview(mirrored);

        if let Err(e) = session.start_preview() {
            self.display.clear_preview();
            self.display.set_keep_awake(false);
            return Err(e);
        }

        if let Err(e) = apply_rotation(session.as_mut(), self.orientation, mirrored, external) {
            tracing::warn!("failed to apply preview rotation: {}", e);
        }

        // The worker may report a device failure immediately, so the
        // state must read as previewing before it starts.
        self.state.set(ControllerState::Previewing);

        let context = WorkerContext {
            session,
            events: event_rx,
            decoder: Arc::clone(&self.decoder),
            display: Arc::clone(&self.display),
            state: Arc::clone(&self.state),
            stats: Arc::clone(&self.stats),
            interval: Duration::from_millis(self.config.scan.interval_ms),
            options: DecodeOptions {
                auto_rotate: self.config.scan.auto_rotate,
            },
            orientation: self.orientation,
            mirrored,
            external,
        };

        match worker::spawn(context) {
            Ok(join) => {
                self.worker = Some(WorkerHandle {
                    events: event_tx,
                    join,
                });
                Ok(())
            }
            Err(e) => {
                // Spawning consumed the context, so the session is
                // already released. Undo the display side here.
                self.display.clear_preview();
                self.display.set_keep_awake(false);
                Err(e)
            }
        }
    }

    /// Stops the scan loop and releases the device.
    ///
    /// Blocks until the worker has finished tearing down. A no-op when
    /// nothing is running.
    pub fn deactivate(&mut self) {
        self.reap_worker();
    }

    fn reap_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.events.send(WorkerEvent::Stop);
            if handle.join.join().is_err() {
                tracing::error!("scan worker panicked");
                self.state.set(ControllerState::Idle);
            }
        }
    }

    /// Records a display orientation change and reapplies the preview
    /// rotation correction if a scan is running.
    pub fn orientation_changed(&mut self, orientation: DisplayOrientation) {
        self.orientation = orientation;
        if let Some(handle) = &self.worker {
            if handle
                .events
                .send(WorkerEvent::OrientationChanged(orientation))
                .is_err()
            {
                tracing::debug!("orientation change while worker was exiting");
            }
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ControllerState {
        self.state.get()
    }

    /// Returns true while the scan loop is running.
    pub fn is_active(&self) -> bool {
        matches!(&self.worker, Some(handle) if !handle.join.is_finished())
    }

    /// Returns a snapshot of the current session's counters.
    ///
    /// After deactivation this reports the finished session until the
    /// next activation resets it.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<H: CameraHost> Drop for ScanController<H> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Writes the rotation correction for the given orientation into the
/// preview stream's metadata.
///
/// External devices manage their own orientation and are left alone.
pub(crate) fn apply_rotation(
    session: &mut dyn CaptureSession,
    orientation: DisplayOrientation,
    mirrored: bool,
    external: bool,
) -> Result<(), CameraError> {
    if external {
        return Ok(());
    }

    let degrees = rotation_degrees(orientation, mirrored);
    let mut props = session.stream_properties()?;
    props.rotation_degrees = degrees;
    session.set_stream_properties(props)?;
    tracing::debug!(degrees, mirrored, "preview rotation applied");
    Ok(())
}
