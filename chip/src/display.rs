//! The monochrome frame buffer of the chip.
use crate::{definitions::display, DisplayError};

/// The graphics of the Chip 8 are black and white and the screen has a total of `2048` pixels
/// `(64 x 32)`. Every pixel is a single byte holding either `0` or `1`, stored row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pixels: Vec<u8>,
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

impl Display {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; display::RESOLUTION],
        }
    }

    /// Maps the coordinate to a buffer index, coordinates outside of the
    /// screen wrap around on both axes.
    ///
    /// # Example
    /// ```rust
    /// # use chippy::display::Display;
    /// assert_eq!(Display::index(0, 1), 64);
    /// assert_eq!(Display::index(65, 33), 64 + 1);
    /// ```
    #[inline]
    pub fn index(x: usize, y: usize) -> usize {
        (y % display::HEIGHT) * display::WIDTH + (x % display::WIDTH)
    }

    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|pixel| *pixel = 0);
    }

    /// Flips the pixel at `index`.
    pub fn toggle_pixel(&mut self, index: usize) -> Result<(), DisplayError> {
        let len = self.pixels.len();
        let pixel = self
            .pixels
            .get_mut(index)
            .ok_or(DisplayError::OutOfBounds { index, len })?;
        *pixel ^= 1;
        Ok(())
    }

    pub fn is_pixel_on(&self, index: usize) -> Result<bool, DisplayError> {
        self.pixels
            .get(index)
            .map(|pixel| *pixel == 1)
            .ok_or(DisplayError::OutOfBounds {
                index,
                len: self.pixels.len(),
            })
    }

    /// The raw buffer a renderer samples once per frame.
    pub fn buffer(&self) -> &[u8] {
        &self.pixels[..]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.pixels.chunks(display::WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut screen = Display::new();
        let index = Display::index(3, 4);

        assert_eq!(Ok(false), screen.is_pixel_on(index));
        assert_eq!(Ok(()), screen.toggle_pixel(index));
        assert_eq!(Ok(true), screen.is_pixel_on(index));
        assert_eq!(Ok(()), screen.toggle_pixel(index));
        assert_eq!(Ok(false), screen.is_pixel_on(index));

        assert!(screen.buffer().iter().all(|pixel| *pixel <= 1));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut screen = Display::new();
        let err = DisplayError::OutOfBounds {
            index: display::RESOLUTION,
            len: display::RESOLUTION,
        };
        assert_eq!(Err(err), screen.toggle_pixel(display::RESOLUTION));
        assert_eq!(Err(err), screen.is_pixel_on(display::RESOLUTION));
    }

    #[test]
    fn test_clear() {
        let mut screen = Display::new();
        for index in (0..display::RESOLUTION).step_by(3) {
            screen.toggle_pixel(index).unwrap();
        }
        screen.clear();
        assert!((0..display::RESOLUTION).all(|i| screen.is_pixel_on(i) == Ok(false)));
    }

    #[test]
    fn test_rows() {
        let mut screen = Display::new();
        screen.toggle_pixel(Display::index(63, 31)).unwrap();

        let rows: Vec<_> = screen.rows().collect();
        assert_eq!(rows.len(), display::HEIGHT);
        assert!(rows.iter().all(|row| row.len() == display::WIDTH));
        assert_eq!(rows[31][63], 1);
    }
}
