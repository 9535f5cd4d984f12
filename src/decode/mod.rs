//! QR symbol decoding from captured frames.
//!
//! The scan loop hands each captured frame to a [`Decoder`] and
//! publishes whatever text comes back. The rqrr-backed decoder is the
//! production implementation; the mock decoder scripts results for
//! deterministic loop tests.

mod rqrr;

pub use self::rqrr::RqrrDecoder;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::camera::Frame;

/// Options controlling a decode attempt.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Retry with a quarter-turn rotated copy when the first pass
    /// finds no symbol.
    pub auto_rotate: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { auto_rotate: true }
    }
}

/// Trait for QR decoders.
///
/// Implementations must be callable from the scan worker thread.
pub trait Decoder: Send + Sync {
    /// Attempts to decode a symbol from the frame.
    ///
    /// Returns the decoded text, or `None` when no symbol was found.
    fn decode(&self, frame: &Frame, options: &DecodeOptions) -> Option<String>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct MockDecoderInner {
    script: Mutex<VecDeque<Option<String>>>,
    delay_ms: AtomicU64,
    calls: AtomicU64,
    active: AtomicU64,
    max_active: AtomicU64,
}

/// Mock decoder that replays a scripted sequence of results.
///
/// Once the script runs out every further call returns `None`. Tracks
/// call counts and peak concurrency so tests can assert the loop never
/// overlaps decode work.
#[derive(Debug, Clone, Default)]
pub struct MockDecoder {
    inner: Arc<MockDecoderInner>,
}

impl MockDecoder {
    /// Creates a decoder whose every call returns `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder that replays the given results in order.
    pub fn scripted(results: impl IntoIterator<Item = Option<String>>) -> Self {
        let decoder = Self::default();
        lock(&decoder.inner.script).extend(results);
        decoder
    }

    /// Makes every decode call sleep for the given duration first.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.inner
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }

    /// Returns how many decode calls have been made.
    pub fn calls(&self) -> u64 {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Returns the peak number of decode calls running at once.
    pub fn max_concurrency(&self) -> u64 {
        self.inner.max_active.load(Ordering::SeqCst)
    }
}

impl Decoder for MockDecoder {
    fn decode(&self, _frame: &Frame, _options: &DecodeOptions) -> Option<String> {
        let active = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_active.fetch_max(active, Ordering::SeqCst);
        self.inner.calls.fetch_add(1, Ordering::SeqCst);

        let delay_ms = self.inner.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(delay_ms));
        }

        let result = lock(&self.inner.script).pop_front().flatten();
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PixelFormat;

    fn test_frame() -> Frame {
        Frame::new(vec![0u8; 16 * 16], 16, 16, PixelFormat::Gray8)
    }

    #[test]
    fn test_scripted_sequence() {
        let decoder = MockDecoder::scripted(vec![
            Some("FIRST".to_string()),
            None,
            Some("THIRD".to_string()),
        ]);
        let options = DecodeOptions::default();

        assert_eq!(
            decoder.decode(&test_frame(), &options),
            Some("FIRST".to_string())
        );
        assert_eq!(decoder.decode(&test_frame(), &options), None);
        assert_eq!(
            decoder.decode(&test_frame(), &options),
            Some("THIRD".to_string())
        );
        // Script exhausted
        assert_eq!(decoder.decode(&test_frame(), &options), None);
        assert_eq!(decoder.calls(), 4);
    }

    #[test]
    fn test_clones_share_script() {
        let decoder = MockDecoder::scripted(vec![Some("ONLY".to_string())]);
        let clone = decoder.clone();
        let options = DecodeOptions::default();

        assert_eq!(
            clone.decode(&test_frame(), &options),
            Some("ONLY".to_string())
        );
        assert_eq!(decoder.decode(&test_frame(), &options), None);
        assert_eq!(decoder.calls(), 2);
    }
}
