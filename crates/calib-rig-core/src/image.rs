use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A decoded video frame: an 8-bit intensity buffer tagged with the
/// acquisition timestamp in milliseconds.
///
/// Frames are immutable once built; timelines hand out clones of them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Frame {
    width: usize,
    height: usize,
    timestamp: f64,
    data: Vec<u8>,
}

/// Borrowed view over a frame's pixels.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl Frame {
    /// Build a frame from a single-channel buffer.
    ///
    /// The buffer length must be exactly `width * height`; anything else is
    /// a malformed-frame error (a precondition violation, not a soft
    /// detection failure).
    pub fn from_gray(
        width: usize,
        height: usize,
        timestamp: f64,
        data: Vec<u8>,
    ) -> Result<Self, CoreError> {
        if data.len() != width * height {
            return Err(CoreError::PixelLayout {
                expected: width * height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            timestamp,
            data,
        })
    }

    /// Build a frame from interleaved multi-component pixels (RGB, RGBA, ...)
    /// by converting to intensity with the Rec. 601 luma weights.
    pub fn from_interleaved(
        width: usize,
        height: usize,
        components: usize,
        timestamp: f64,
        data: &[u8],
    ) -> Result<Self, CoreError> {
        if components == 0 || data.len() != width * height * components {
            return Err(CoreError::PixelLayout {
                expected: width * height * components.max(1),
                actual: data.len(),
            });
        }
        if components == 1 {
            return Self::from_gray(width, height, timestamp, data.to_vec());
        }
        let mut gray = Vec::with_capacity(width * height);
        for px in data.chunks_exact(components) {
            let v = if components >= 3 {
                0.299 * f64::from(px[0]) + 0.587 * f64::from(px[1]) + 0.114 * f64::from(px[2])
            } else {
                f64::from(px[0])
            };
            gray.push(v.round().clamp(0.0, 255.0) as u8);
        }
        Self::from_gray(width, height, timestamp, gray)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}
