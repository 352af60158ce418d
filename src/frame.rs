//! Captured frames.
//!
//! A `Frame` carries packed RGB pixels plus its dimensions and capture time.
//! Frames are produced by a frame source, handed to the detector backend by
//! reference, and dropped at the end of the tick.

use anyhow::{anyhow, Result};
use std::time::Instant;

use crate::error::GuidanceResult;
use crate::zone::FrameDimensions;

const BYTES_PER_PIXEL: usize = 3;

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

pub struct Frame {
    /// Packed RGB, row-major, `width * height * 3` bytes.
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Position in the source's stream, starting at 0.
    pub index: u64,
    captured_at: Instant,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            index,
            captured_at: Instant::now(),
        })
    }

    /// Uniform grey frame.
    pub fn blank(width: u32, height: u32, index: u64) -> Self {
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        Self {
            data: vec![0x80; len],
            width,
            height,
            index,
            captured_at: Instant::now(),
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn dimensions(&self) -> GuidanceResult<FrameDimensions> {
        FrameDimensions::new(self.width, self.height)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuidanceError;

    #[test]
    fn rejects_wrong_buffer_length() {
        assert!(Frame::new(vec![0; 11], 2, 2, 0).is_err());
        assert!(Frame::new(vec![0; 12], 2, 2, 0).is_ok());
    }

    #[test]
    fn zero_sized_frame_has_no_valid_dimensions() {
        let frame = Frame::blank(0, 480, 0);
        assert!(matches!(
            frame.dimensions(),
            Err(GuidanceError::Config { param: "frame_width", .. })
        ));
    }
}
