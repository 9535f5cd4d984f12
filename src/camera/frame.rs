//! Frame type representing a captured image with metadata.

/// Pixel layout of a captured frame.
///
/// The scan loop requests grayscale because the decoder operates on
/// luminance only; converting at capture time avoids a copy per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit grayscale, one byte per pixel.
    Gray8,
}

impl PixelFormat {
    /// Returns the number of bytes a single pixel occupies.
    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Gray8 => write!(f, "Gray8"),
        }
    }
}

/// A single captured frame from the camera.
///
/// Contains raw pixel data along with the dimensions and format
/// needed for decoding and display.
#[derive(Clone)]
pub struct Frame {
    /// Raw pixel data in the declared format.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Pixel layout of the buffer.
    format: PixelFormat,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            pixels,
            width,
            height,
            format,
        }
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixel format.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Returns the buffer length the dimensions and format imply.
    #[inline]
    pub fn expected_len(&self) -> usize {
        self.pixel_count() * self.format.bytes_per_pixel()
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.expected_len()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
