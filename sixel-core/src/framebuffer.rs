use crate::error::{Result, SixelError};

/// A dense, row-major grid of palette indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedFrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl IndexedFrameBuffer {
    /// Create a buffer filled with index 0. Both dimensions must be non-zero.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SixelError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; width * height],
        })
    }

    /// Wrap existing row-major pixel data.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return Err(SixelError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Panics if `(x, y)` is outside the buffer.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.pixels[y * self.width + x]
    }

    /// Panics if `(x, y)` is outside the buffer.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, index: u8) {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.pixels[y * self.width + x] = index;
    }

    pub fn fill(&mut self, index: u8) {
        self.pixels.fill(index);
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimensions_rejected() {
        assert!(matches!(
            IndexedFrameBuffer::new(0, 4),
            Err(SixelError::InvalidDimensions { width: 0, height: 4 })
        ));
        assert!(IndexedFrameBuffer::new(4, 0).is_err());
        assert!(IndexedFrameBuffer::from_pixels(2, 2, vec![0; 3]).is_err());
    }

    #[test]
    fn row_major_layout() {
        let mut fb = IndexedFrameBuffer::new(3, 2).unwrap();
        fb.set(2, 0, 5);
        fb.set(0, 1, 7);
        assert_eq!(fb.pixels(), &[0, 0, 5, 7, 0, 0]);
        assert_eq!(fb.get(2, 0), 5);
        assert_eq!(fb.row(1), &[7, 0, 0]);

        fb.fill(9);
        assert!(fb.pixels().iter().all(|&p| p == 9));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn get_out_of_bounds_panics() {
        let fb = IndexedFrameBuffer::new(2, 2).unwrap();
        fb.get(2, 0);
    }
}
