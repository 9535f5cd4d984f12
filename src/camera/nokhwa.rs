//! Real camera backend built on nokhwa.
//!
//! The nokhwa `Camera` type cannot leave the thread it was created on,
//! so each session runs a dedicated service thread that owns the camera
//! and answers requests over channels. The session handle itself is
//! plain data and can move freely between threads.

use std::sync::mpsc;
use std::thread;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;

use super::device::{DeviceInfo, Panel};
use super::frame::{Frame, PixelFormat};
use super::session::{
    CameraError, CameraHost, CaptureSession, DeviceFailure, FailureSink, StreamProperties,
};
use crate::config::CaptureConfig;

/// Camera backend using the host's native capture API via nokhwa.
#[derive(Debug, Default)]
pub struct NokhwaHost;

impl NokhwaHost {
    /// Creates a new host.
    pub fn new() -> Self {
        Self
    }
}

impl CameraHost for NokhwaHost {
    fn enumerate(&self) -> Result<Vec<DeviceInfo>, CameraError> {
        let cameras =
            nokhwa::query(ApiBackend::Auto).map_err(|e| CameraError::Backend(e.to_string()))?;

        // Desktop capture APIs do not report enclosure placement, so
        // every device enumerates as external.
        Ok(cameras
            .iter()
            .map(|info| DeviceInfo {
                id: info.index().to_string(),
                name: info.human_name(),
                panel: Panel::Unknown,
            })
            .collect())
    }

    fn open(
        &self,
        device: &DeviceInfo,
        config: &CaptureConfig,
        failures: FailureSink,
    ) -> Result<Box<dyn CaptureSession>, CameraError> {
        let index = index_for(&device.id);
        let device_id = device.id.clone();
        let config = config.clone();

        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let service = thread::Builder::new()
            .name("camera-io".to_string())
            .spawn(move || {
                let camera = match open_camera(index, &device_id, &config) {
                    Ok(camera) => {
                        if ready_tx.send(Ok(())).is_err() {
                            return;
                        }
                        camera
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                service_loop(camera, failures, request_rx, response_tx);
            })
            .map_err(|e| CameraError::Backend(format!("failed to spawn camera thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(NokhwaSession {
                requests: request_tx,
                responses: response_rx,
                service: Some(service),
            })),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(service_gone()),
        }
    }
}

fn index_for(id: &str) -> CameraIndex {
    match id.parse::<u32>() {
        Ok(n) => CameraIndex::Index(n),
        Err(_) => CameraIndex::String(id.to_string()),
    }
}

fn service_gone() -> CameraError {
    CameraError::Backend("camera service thread terminated".to_string())
}

/// Opens the camera, walking down a ladder of format requests until
/// one is accepted by the backend.
fn open_camera(
    index: CameraIndex,
    device_id: &str,
    config: &CaptureConfig,
) -> Result<Camera, CameraError> {
    let resolution = Resolution::new(config.width, config.height);
    let requests = [
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            resolution,
            FrameFormat::MJPEG,
            config.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            resolution,
            FrameFormat::YUYV,
            config.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ];

    let mut last_error = String::new();
    for (i, requested) in requests.iter().enumerate() {
        match Camera::new(index.clone(), *requested) {
            Ok(camera) => return Ok(camera),
            Err(e) => {
                last_error = e.to_string();
                tracing::warn!(
                    "camera format {}/{} rejected: {}",
                    i + 1,
                    requests.len(),
                    e
                );
            }
        }
    }

    let lowered = last_error.to_lowercase();
    if lowered.contains("denied") || lowered.contains("permission") || lowered.contains("access") {
        Err(CameraError::AccessDenied(last_error))
    } else {
        Err(CameraError::OpenFailed {
            id: device_id.to_string(),
            reason: last_error,
        })
    }
}

enum Request {
    StartPreview,
    StopPreview,
    Autofocus,
    GetProps,
    SetProps(StreamProperties),
    Capture {
        format: PixelFormat,
        width: u32,
        height: u32,
    },
    Shutdown,
}

enum Reply {
    Done,
    Props(StreamProperties),
    Frame(Frame),
}

fn service_loop(
    mut camera: Camera,
    failures: FailureSink,
    requests: mpsc::Receiver<Request>,
    responses: mpsc::Sender<Result<Reply, CameraError>>,
) {
    let mut previewing = false;
    let mut rotation_degrees = 0u32;

    while let Ok(request) = requests.recv() {
        let response = match request {
            Request::Shutdown => break,
            Request::StartPreview => {
                if previewing {
                    Err(CameraError::PreviewStart(
                        "preview already running".to_string(),
                    ))
                } else {
                    match camera.open_stream() {
                        Ok(()) => {
                            previewing = true;
                            tracing::info!(
                                name = %camera.info().human_name(),
                                resolution = ?camera.resolution(),
                                "camera stream opened"
                            );
                            Ok(Reply::Done)
                        }
                        Err(e) => Err(CameraError::PreviewStart(e.to_string())),
                    }
                }
            }
            Request::StopPreview => {
                if previewing {
                    previewing = false;
                    match camera.stop_stream() {
                        Ok(()) => Ok(Reply::Done),
                        Err(e) => Err(CameraError::PreviewStop(e.to_string())),
                    }
                } else {
                    Ok(Reply::Done)
                }
            }
            // Focus is driver managed on desktop backends.
            Request::Autofocus => Ok(Reply::Done),
            Request::GetProps => {
                let resolution = camera.resolution();
                Ok(Reply::Props(StreamProperties {
                    width: resolution.width(),
                    height: resolution.height(),
                    rotation_degrees,
                }))
            }
            Request::SetProps(props) => {
                // Rotation is carried as metadata; renegotiating the
                // stream size is not supported here.
                rotation_degrees = props.rotation_degrees;
                Ok(Reply::Done)
            }
            Request::Capture {
                format,
                width,
                height,
            } => capture_frame(&mut camera, &failures, previewing, format, width, height),
        };

        if responses.send(response).is_err() {
            break;
        }
    }

    if previewing {
        let _ = camera.stop_stream();
    }
}

fn capture_frame(
    camera: &mut Camera,
    failures: &FailureSink,
    previewing: bool,
    format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<Reply, CameraError> {
    if !previewing {
        return Err(CameraError::CaptureFailed("preview not running".to_string()));
    }

    let buffer = match camera.frame() {
        Ok(buffer) => buffer,
        Err(e) => {
            if !camera.is_stream_open() {
                failures.report(DeviceFailure {
                    code: 0,
                    message: e.to_string(),
                });
            }
            return Err(CameraError::CaptureFailed(e.to_string()));
        }
    };

    let decoded = buffer
        .decode_image::<RgbFormat>()
        .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

    if decoded.width() != width || decoded.height() != height {
        tracing::debug!(
            requested_width = width,
            requested_height = height,
            actual_width = decoded.width(),
            actual_height = decoded.height(),
            "camera returned a different frame size than requested"
        );
    }

    let (actual_width, actual_height) = (decoded.width(), decoded.height());
    let pixels = match format {
        PixelFormat::Gray8 => rgb_to_gray(&decoded.into_raw()),
    };

    Ok(Reply::Frame(Frame::new(
        pixels,
        actual_width,
        actual_height,
        format,
    )))
}

/// Converts packed RGB8 to 8-bit grayscale using integer BT.601 weights.
fn rgb_to_gray(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .map(|chunk| {
            let luma =
                (chunk[0] as u32 * 299 + chunk[1] as u32 * 587 + chunk[2] as u32 * 114) / 1000;
            luma as u8
        })
        .collect()
}

/// Session handle whose camera lives on a dedicated service thread.
pub struct NokhwaSession {
    requests: mpsc::Sender<Request>,
    responses: mpsc::Receiver<Result<Reply, CameraError>>,
    service: Option<thread::JoinHandle<()>>,
}

impl NokhwaSession {
    fn call(&self, request: Request) -> Result<Reply, CameraError> {
        self.requests.send(request).map_err(|_| service_gone())?;
        self.responses.recv().map_err(|_| service_gone())?
    }
}

impl CaptureSession for NokhwaSession {
    fn start_preview(&mut self) -> Result<(), CameraError> {
        self.call(Request::StartPreview).map(|_| ())
    }

    fn stop_preview(&mut self) -> Result<(), CameraError> {
        self.call(Request::StopPreview).map(|_| ())
    }

    fn autofocus(&mut self) -> Result<(), CameraError> {
        self.call(Request::Autofocus).map(|_| ())
    }

    fn stream_properties(&self) -> Result<StreamProperties, CameraError> {
        match self.call(Request::GetProps)? {
            Reply::Props(props) => Ok(props),
            _ => Err(CameraError::Backend(
                "unexpected reply from camera service".to_string(),
            )),
        }
    }

    fn set_stream_properties(&mut self, props: StreamProperties) -> Result<(), CameraError> {
        self.call(Request::SetProps(props)).map(|_| ())
    }

    fn capture_frame(
        &mut self,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<Frame, CameraError> {
        match self.call(Request::Capture {
            format,
            width,
            height,
        })? {
            Reply::Frame(frame) => Ok(frame),
            _ => Err(CameraError::Backend(
                "unexpected reply from camera service".to_string(),
            )),
        }
    }
}

impl Drop for NokhwaSession {
    fn drop(&mut self) {
        let _ = self.requests.send(Request::Shutdown);
        if let Some(service) = self.service.take() {
            let _ = service.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_parsing() {
        assert_eq!(index_for("3"), CameraIndex::Index(3));
        assert_eq!(
            index_for("FaceTime HD"),
            CameraIndex::String("FaceTime HD".to_string())
        );
    }

    #[test]
    fn test_rgb_to_gray() {
        // Pure white, pure black, pure red
        let rgb = [255, 255, 255, 0, 0, 0, 255, 0, 0];
        let gray = rgb_to_gray(&rgb);
        assert_eq!(gray.len(), 3);
        assert_eq!(gray[0], 255);
        assert_eq!(gray[1], 0);
        assert_eq!(gray[2], 76);
    }
}
