//! Camera device discovery, session lifecycle, and frame handling.
//!
//! This module provides abstractions for enumerating capture devices,
//! opening a session on one, and pulling frames from its preview
//! stream. Backends plug in behind the [`CameraHost`] trait; the mock
//! backend is always available, the nokhwa backend behind the `camera`
//! feature.

mod device;
mod frame;
mod mock;
#[cfg(feature = "camera")]
mod nokhwa;
mod session;

pub use device::{select_device, DeviceInfo, Panel};
pub use frame::{Frame, PixelFormat};
pub use mock::{MockCameraHost, SessionEvent};
#[cfg(feature = "camera")]
pub use self::nokhwa::NokhwaHost;
pub use session::{
    CameraError, CameraHost, CaptureSession, DeviceFailure, FailureSink, StreamProperties,
};
