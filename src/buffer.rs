// Pixel Buffer module - Fixed-length RGBA frame owned by a single layer

use rand::Rng;
use std::ops::{Index, IndexMut};

use crate::types::Rgba;

/// Ordered RGBA pixels in wiring order. Starts fully transparent.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    pixels: Vec<Rgba>,
}

impl PixelBuffer {
    pub fn new(len: usize) -> Self {
        PixelBuffer { pixels: vec![Rgba::TRANSPARENT; len] }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Rgba> {
        self.pixels.get(index).copied()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Rgba> {
        self.pixels.get_mut(index)
    }

    pub fn as_slice(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rgba> {
        self.pixels.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Rgba> {
        self.pixels.iter_mut()
    }

    pub fn fill(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    pub fn clear(&mut self) {
        self.fill(Rgba::TRANSPARENT);
    }

    /// Copies `other` into this buffer; lengths must match or only the overlap is copied.
    pub fn copy_from(&mut self, other: &PixelBuffer) {
        let n = self.len().min(other.len());
        self.pixels[..n].copy_from_slice(&other.pixels[..n]);
    }

    pub fn fade_to_black_by(&mut self, amount: u8) {
        for px in self.pixels.iter_mut() {
            px.fade_to_black_by(amount);
        }
    }

    /// Each pixel fades toward black with probability `chance/256`.
    pub fn fade_randomly<R: Rng>(&mut self, rng: &mut R, chance: u8, amount: u8) {
        for px in self.pixels.iter_mut() {
            if rng.gen::<u8>() < chance {
                px.fade_to_black_by(amount);
            }
        }
    }

    /// Each pixel loses color and opacity with probability `chance/256`.
    pub fn decay_randomly<R: Rng>(&mut self, rng: &mut R, chance: u8, amount: u8) {
        for px in self.pixels.iter_mut() {
            if rng.gen::<u8>() < chance {
                px.decay_by(amount);
            }
        }
    }

    /// Moves every pixel one slot toward the end and returns the vacated head
    /// slot, or toward the start when `backward`, vacating the tail.
    pub fn shift(&mut self, backward: bool) -> Option<&mut Rgba> {
        if self.pixels.is_empty() {
            return None;
        }
        if backward {
            self.pixels.rotate_left(1);
            self.pixels.last_mut()
        } else {
            self.pixels.rotate_right(1);
            self.pixels.first_mut()
        }
    }

    pub fn is_all_dark(&self) -> bool {
        self.pixels.iter().all(Rgba::is_dark)
    }

    pub fn is_all_transparent(&self) -> bool {
        self.pixels.iter().all(Rgba::is_transparent)
    }
}

impl Index<usize> for PixelBuffer {
    type Output = Rgba;

    fn index(&self, index: usize) -> &Rgba {
        &self.pixels[index]
    }
}

impl IndexMut<usize> for PixelBuffer {
    fn index_mut(&mut self, index: usize) -> &mut Rgba {
        &mut self.pixels[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_buffer_is_transparent() {
        let buf = PixelBuffer::new(16);
        assert_eq!(buf.len(), 16);
        assert!(buf.is_all_transparent());
        assert!(buf.is_all_dark());
    }

    #[test]
    fn test_shift_forward_vacates_head() {
        let mut buf = PixelBuffer::new(4);
        buf[0] = Rgba::opaque(Rgb::new(1, 0, 0));
        buf[3] = Rgba::opaque(Rgb::new(4, 0, 0));
        if let Some(head) = buf.shift(false) {
            *head = Rgba::opaque(Rgb::new(9, 0, 0));
        }
        assert_eq!(buf[0].r, 9);
        assert_eq!(buf[1].r, 1);
        assert!(buf[3].is_transparent());
    }

    #[test]
    fn test_shift_backward_vacates_tail() {
        let mut buf = PixelBuffer::new(4);
        buf[1] = Rgba::opaque(Rgb::new(2, 0, 0));
        if let Some(tail) = buf.shift(true) {
            *tail = Rgba::TRANSPARENT;
        }
        assert_eq!(buf[0].r, 2);
        assert!(buf[3].is_transparent());
    }

    #[test]
    fn test_decay_reaches_dark() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut buf = PixelBuffer::new(8);
        buf.fill(Rgba::opaque(Rgb::WHITE));
        for _ in 0..200 {
            buf.decay_randomly(&mut rng, 255, 100);
        }
        assert!(buf.is_all_dark());
        assert!(buf.is_all_transparent());
    }

    #[test]
    fn test_black_opaque_is_dark_but_not_transparent() {
        let mut buf = PixelBuffer::new(2);
        buf.fill(Rgba::opaque(Rgb::BLACK));
        assert!(buf.is_all_dark());
        assert!(!buf.is_all_transparent());
    }
}
