use image::{GrayImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

/// A single-channel intensity frame
///
/// Thin wrapper around a grayscale image buffer; this is the representation
/// motion estimation works on.
#[derive(Clone, Debug)]
pub struct GrayFrame {
    buffer: GrayImage,
}

impl GrayFrame {
    /// Create a new frame from a grayscale image buffer
    pub fn new(buffer: GrayImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with every pixel set to `value`
    pub fn new_filled(width: u32, height: u32, value: u8) -> Self {
        Self::new(ImageBuffer::from_pixel(width, height, Luma([value])))
    }

    /// Create a frame by evaluating `f(x, y)` for every pixel
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> u8,
    {
        Self::new(ImageBuffer::from_fn(width, height, |x, y| Luma([f(x, y)])))
    }

    /// Create a frame from raw 8-bit gray bytes (row-major)
    pub fn from_gray_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Intensity at the given coordinates
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.buffer.get_pixel(x, y)[0]
    }

    /// Raw row-major pixel data
    pub fn as_raw(&self) -> &[u8] {
        self.buffer.as_raw()
    }
}

/// What the probing collaborator reports about a source video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Total duration in seconds
    pub duration: f64,

    /// Frames per second of the first video stream
    pub fps: f64,

    /// Width and height of the first video stream
    pub width: u32,
    pub height: u32,

    /// Whether an audio stream is present
    pub has_audio: bool,
}

impl MediaInfo {
    /// Analysis resolution for a target width, preserving aspect ratio with an even height
    pub fn analysis_size(&self, target_width: u32) -> (u32, u32) {
        if self.width == 0 || self.height == 0 || self.width <= target_width {
            return (self.width & !1, self.height & !1);
        }

        let scale = target_width as f64 / self.width as f64;
        let height = ((self.height as f64 * scale).round() as u32).max(2);
        (target_width & !1, height & !1)
    }
}
