//! Display surface abstraction for preview attachment and scan results.
//!
//! The controller never touches UI directly. It drives a
//! [`DisplaySurface`]: attach and clear the preview, hold the display
//! awake while scanning, and present one [`ScanUpdate`] per tick.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::camera::PixelFormat;

/// Result of one scan tick, published to the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanUpdate {
    /// Width of the captured frame in pixels.
    pub width: u32,
    /// Height of the captured frame in pixels.
    pub height: u32,
    /// Pixel format of the captured frame.
    pub format: PixelFormat,
    /// Decoded symbol text, or `None` when no symbol was found.
    pub text: Option<String>,
}

impl ScanUpdate {
    /// Returns the frame description line, e.g. `"640x480 Gray8"`.
    pub fn frame_info(&self) -> String {
        format!("{}x{} {}", self.width, self.height, self.format)
    }

    /// Returns the decoded text, or an empty string when none.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Trait for display surfaces the scan loop renders into.
///
/// Calls arrive from both the controller thread and the scan worker.
pub trait DisplaySurface: Send + Sync {
    /// Attaches the live preview stream, mirrored when requested.
    fn attach_preview(&self, mirrored: bool);

    /// Detaches the preview stream.
    fn clear_preview(&self);

    /// Requests the display stay awake (or releases that request).
    fn set_keep_awake(&self, keep_awake: bool);

    /// Presents the result of one scan tick.
    fn present(&self, update: ScanUpdate);
}

/// Something that happened on a display surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// Preview was attached.
    PreviewAttached {
        /// Whether the preview renders mirrored.
        mirrored: bool,
    },
    /// Preview was detached.
    PreviewCleared,
    /// Keep-awake request changed.
    KeepAwake(bool),
    /// A scan tick result was presented.
    Update(ScanUpdate),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Display surface that forwards events over a channel.
///
/// Useful for headless frontends: the consumer drains the receiver at
/// its own pace. Events sent after the receiver is dropped are
/// discarded.
pub struct ChannelDisplay {
    tx: Mutex<mpsc::Sender<DisplayEvent>>,
}

impl ChannelDisplay {
    /// Creates a display and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::Receiver<DisplayEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Mutex::new(tx) }, rx)
    }

    fn send(&self, event: DisplayEvent) {
        if lock(&self.tx).send(event).is_err() {
            tracing::trace!("display receiver dropped, event discarded");
        }
    }
}

impl DisplaySurface for ChannelDisplay {
    fn attach_preview(&self, mirrored: bool) {
        self.send(DisplayEvent::PreviewAttached { mirrored });
    }

    fn clear_preview(&self) {
        self.send(DisplayEvent::PreviewCleared);
    }

    fn set_keep_awake(&self, keep_awake: bool) {
        self.send(DisplayEvent::KeepAwake(keep_awake));
    }

    fn present(&self, update: ScanUpdate) {
        self.send(DisplayEvent::Update(update));
    }
}

/// Display surface that records everything for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    events: Arc<Mutex<Vec<DisplayEvent>>>,
}

impl RecordingDisplay {
    /// Creates an empty recording display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events, in order.
    pub fn events(&self) -> Vec<DisplayEvent> {
        lock(&self.events).clone()
    }

    /// Returns only the presented scan updates, in order.
    pub fn updates(&self) -> Vec<ScanUpdate> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                DisplayEvent::Update(update) => Some(update.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the most recently presented update, if any.
    pub fn last_update(&self) -> Option<ScanUpdate> {
        self.updates().pop()
    }

    fn record(&self, event: DisplayEvent) {
        lock(&self.events).push(event);
    }
}

impl DisplaySurface for RecordingDisplay {
    fn attach_preview(&self, mirrored: bool) {
        self.record(DisplayEvent::PreviewAttached { mirrored });
    }

    fn clear_preview(&self) {
        self.record(DisplayEvent::PreviewCleared);
    }

    fn set_keep_awake(&self, keep_awake: bool) {
        self.record(DisplayEvent::KeepAwake(keep_awake));
    }

    fn present(&self, update: ScanUpdate) {
        self.record(DisplayEvent::Update(update));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(text: Option<&str>) -> ScanUpdate {
        ScanUpdate {
            width: 640,
            height: 480,
            format: PixelFormat::Gray8,
            text: text.map(String::from),
        }
    }

    #[test]
    fn test_frame_info_format() {
        assert_eq!(update(None).frame_info(), "640x480 Gray8");
    }

    #[test]
    fn test_text_or_empty() {
        assert_eq!(update(Some("HELLO")).text_or_empty(), "HELLO");
        assert_eq!(update(None).text_or_empty(), "");
    }

    #[test]
    fn test_recording_display_order() {
        let display = RecordingDisplay::new();
        display.set_keep_awake(true);
        display.attach_preview(true);
        display.present(update(Some("QR")));
        display.clear_preview();
        display.set_keep_awake(false);

        assert_eq!(
            display.events(),
            vec![
                DisplayEvent::KeepAwake(true),
                DisplayEvent::PreviewAttached { mirrored: true },
                DisplayEvent::Update(update(Some("QR"))),
                DisplayEvent::PreviewCleared,
                DisplayEvent::KeepAwake(false),
            ]
        );
        assert_eq!(display.updates().len(), 1);
    }

    #[test]
    fn test_channel_display_delivers() {
        let (display, rx) = ChannelDisplay::new();
        display.attach_preview(false);
        display.present(update(None));

        assert_eq!(
            rx.recv().unwrap(),
            DisplayEvent::PreviewAttached { mirrored: false }
        );
        assert_eq!(rx.recv().unwrap(), DisplayEvent::Update(update(None)));
    }

    #[test]
    fn test_channel_display_survives_dropped_receiver() {
        let (display, rx) = ChannelDisplay::new();
        drop(rx);
        display.present(update(None));
    }
}
