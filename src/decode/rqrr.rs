//! QR decoding backed by the rqrr crate.

use super::{DecodeOptions, Decoder};
use crate::camera::Frame;

/// QR decoder using rqrr's pure-Rust detection pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    /// Creates a new decoder.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RqrrDecoder {
    fn decode(&self, frame: &Frame, options: &DecodeOptions) -> Option<String> {
        if !frame.is_valid() {
            tracing::warn!(
                width = frame.width(),
                height = frame.height(),
                pixel_bytes = frame.pixels().len(),
                "skipping frame with inconsistent buffer size"
            );
            return None;
        }

        let width = frame.width() as usize;
        let height = frame.height() as usize;

        if let Some(text) = decode_gray(frame.pixels(), width, height) {
            return Some(text);
        }

        if options.auto_rotate {
            // Second pass a quarter turn over catches symbols held
            // sideways relative to the sensor.
            let rotated = rotate_cw(frame.pixels(), width, height);
            return decode_gray(&rotated, height, width);
        }

        None
    }
}

fn decode_gray(gray: &[u8], width: usize, height: usize) -> Option<String> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
        gray.get(y * width + x).copied().unwrap_or(0)
    });

    let grids = prepared.detect_grids();
    for grid in &grids {
        match grid.decode() {
            Ok((meta, content)) => {
                tracing::debug!(
                    ecc_level = ?meta.ecc_level,
                    bytes = content.len(),
                    "qr symbol decoded"
                );
                return Some(content);
            }
            Err(e) => {
                tracing::debug!("qr grid failed to decode: {:?}", e);
            }
        }
    }
    None
}

/// Rotates a grayscale buffer a quarter turn clockwise.
///
/// The result has swapped dimensions: `width` columns become rows.
fn rotate_cw(gray: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut rotated = vec![0u8; gray.len()];
    for y in 0..height {
        for x in 0..width {
            // (x, y) lands at column height-1-y of row x
            rotated[x * height + (height - 1 - y)] = gray[y * width + x];
        }
    }
    rotated
}
