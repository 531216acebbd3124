//! Dense 2D boolean grid packed into 32-bit words.
//!
//! A [`Bitmask`] stores one bit per cell; the bit for cell `(x, y)` lives at
//! flattened index `y * width + x`. Tilemaps use it as their static
//! obstruction layer, where `true` means blocked.
//!
//! Masks can be imported from and exported to images: pure black pixels are
//! free cells, any other colour is blocked. Row 0 is the top row of the image.

use image::{Rgba, RgbaImage};
use std::ops::{BitAnd, BitOr, BitXor, Not, Sub};

use crate::GridError;

const WORD_BITS: u32 = 32;
const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Region predicate for [`Bitmask::get_square`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Check {
    /// At least one cell is set.
    AnyBlocked,
    /// At least one cell is clear.
    AnyFree,
    /// Every cell is set.
    AllBlocked,
    /// Every cell is clear.
    AllFree,
}

/// A `width` x `height` grid of bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitmask {
    bits: Vec<u32>,
    width: u32,
    height: u32,
}

impl Bitmask {
    /// Create a mask with every cell set to `initial`.
    pub fn new(width: u32, height: u32, initial: bool) -> Result<Self, GridError> {
        let size = width as u64 * height as u64;
        if size == 0 {
            return Err(GridError::InvalidArgument { width, height });
        }
        let words = size.div_ceil(WORD_BITS as u64) as usize;
        let mut mask = Self {
            bits: vec![0; words],
            width,
            height,
        };
        mask.fill(initial);
        Ok(mask)
    }

    /// Build a mask from an image: opaque black pixels clear, everything
    /// else set. Transparent black counts as blocked.
    pub fn from_image(source: &RgbaImage) -> Result<Self, GridError> {
        let mut mask = Self::new(source.width(), source.height(), false)?;
        for (x, y, pixel) in source.enumerate_pixels() {
            if *pixel != OPAQUE_BLACK {
                mask.set(x, y, true);
            }
        }
        Ok(mask)
    }

    /// Render the mask as an opaque image: white for set, black for clear.
    pub fn export(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) {
                Rgba([255, 255, 255, 255])
            } else {
                OPAQUE_BLACK
            }
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn locate(&self, x: u32, y: u32) -> (usize, u32) {
        debug_assert!(
            x < self.width && y < self.height,
            "cell ({x}, {y}) out of a {}x{} mask",
            self.width,
            self.height
        );
        let flat = y as usize * self.width as usize + x as usize;
        (flat / WORD_BITS as usize, flat as u32 % WORD_BITS)
    }

    /// Read one cell. Coordinates must be in range.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        let (word, bit) = self.locate(x, y);
        self.bits[word] & (1 << bit) != 0
    }

    /// Write one cell. Coordinates must be in range.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let (word, bit) = self.locate(x, y);
        if value {
            self.bits[word] |= 1 << bit;
        } else {
            self.bits[word] &= !(1 << bit);
        }
    }

    /// Set every cell to `value`.
    pub fn fill(&mut self, value: bool) {
        let filler = if value { u32::MAX } else { 0 };
        self.bits.iter_mut().for_each(|w| *w = filler);
        self.clear_padding();
    }

    /// Number of set cells.
    pub fn count_ones(&self) -> u32 {
        self.bits.iter().map(|w| w.count_ones()).sum()
    }

    /// Bits past `width * height` in the last word stay zero so that
    /// equality and counting only see real cells.
    fn clear_padding(&mut self) {
        let used = (self.width as u64 * self.height as u64 % WORD_BITS as u64) as u32;
        if used != 0 {
            if let Some(last) = self.bits.last_mut() {
                *last &= (1u32 << used) - 1;
            }
        }
    }

    /// Copy this mask into a new `new_width` x `new_height` mask, shifted by
    /// `(offset_x, offset_y)`.
    ///
    /// Cells of the new mask not covered by the shifted source take
    /// `fill`. Source cells that fall outside the new mask are dropped.
    ///
    /// E.g. a 4x4 mask of ones translated to 6x6 at offset (1, 1) yields
    /// `000000 011110 011110 011110 011110 000000`.
    pub fn translated(
        &self,
        new_width: u32,
        new_height: u32,
        offset_x: i32,
        offset_y: i32,
        fill: bool,
    ) -> Result<Bitmask, GridError> {
        let mut result = Bitmask::new(new_width, new_height, fill)?;

        let start_x = (offset_x as i64).max(0);
        let end_x = (offset_x as i64 + self.width as i64).min(new_width as i64);
        let start_y = (offset_y as i64).max(0);
        let end_y = (offset_y as i64 + self.height as i64).min(new_height as i64);

        for y in start_y..end_y {
            for x in start_x..end_x {
                let source = self.get((x - offset_x as i64) as u32, (y - offset_y as i64) as u32);
                result.set(x as u32, y as u32, source);
            }
        }
        Ok(result)
    }

    // -- boolean algebra ----------------------------------------------------

    fn check_same_dimensions(&self, other: &Bitmask) -> Result<(), GridError> {
        if self.width != other.width || self.height != other.height {
            return Err(GridError::DimensionMismatch {
                left_width: self.width,
                left_height: self.height,
                right_width: other.width,
                right_height: other.height,
            });
        }
        Ok(())
    }

    fn combine(&mut self, other: &Bitmask, op: impl Fn(u32, u32) -> u32) -> Result<(), GridError> {
        self.check_same_dimensions(other)?;
        for (mine, theirs) in self.bits.iter_mut().zip(&other.bits) {
            *mine = op(*mine, *theirs);
        }
        self.clear_padding();
        Ok(())
    }

    /// In-place OR.
    pub fn unite(&mut self, other: &Bitmask) -> Result<(), GridError> {
        self.combine(other, |a, b| a | b)
    }

    /// In-place AND.
    pub fn intersect(&mut self, other: &Bitmask) -> Result<(), GridError> {
        self.combine(other, |a, b| a & b)
    }

    /// In-place AND-NOT: clears every cell set in `other`.
    pub fn subtract(&mut self, other: &Bitmask) -> Result<(), GridError> {
        self.combine(other, |a, b| a & !b)
    }

    /// In-place XOR.
    pub fn symmetric_subtract(&mut self, other: &Bitmask) -> Result<(), GridError> {
        self.combine(other, |a, b| a ^ b)
    }

    /// In-place NOT.
    pub fn invert(&mut self) {
        self.bits.iter_mut().for_each(|w| *w = !*w);
        self.clear_padding();
    }

    // -- region access ------------------------------------------------------

    /// Clamp both corners into the mask and order them.
    fn normalize(&self, xi: u32, yi: u32, xf: u32, yf: u32) -> (u32, u32, u32, u32) {
        let xi = xi.min(self.width - 1);
        let xf = xf.min(self.width - 1);
        let yi = yi.min(self.height - 1);
        let yf = yf.min(self.height - 1);
        (xi.min(xf), yi.min(yf), xi.max(xf), yi.max(yf))
    }

    /// Set every cell in the rectangle spanned by two corners.
    ///
    /// Corners are clamped into range and may be given in any order.
    pub fn set_square(&mut self, xi: u32, yi: u32, xf: u32, yf: u32, value: bool) {
        let (x0, y0, x1, y1) = self.normalize(xi, yi, xf, yf);
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set(x, y, value);
            }
        }
    }

    /// Evaluate `check` over the rectangle spanned by two corners.
    ///
    /// Corners are clamped and ordered as in [`Bitmask::set_square`]. The
    /// scan stops at the first cell that decides the answer.
    pub fn get_square(&self, xi: u32, yi: u32, xf: u32, yf: u32, check: Check) -> bool {
        let (x0, y0, x1, y1) = self.normalize(xi, yi, xf, yf);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let cell = self.get(x, y);
                match check {
                    Check::AnyBlocked if cell => return true,
                    Check::AnyFree if !cell => return true,
                    Check::AllBlocked if !cell => return false,
                    Check::AllFree if cell => return false,
                    _ => {}
                }
            }
        }
        matches!(check, Check::AllBlocked | Check::AllFree)
    }

    pub fn set_row(&mut self, xi: u32, xf: u32, y: u32, value: bool) {
        self.set_square(xi, y, xf, y, value);
    }

    pub fn get_row(&self, xi: u32, xf: u32, y: u32, check: Check) -> bool {
        self.get_square(xi, y, xf, y, check)
    }

    pub fn set_column(&mut self, x: u32, yi: u32, yf: u32, value: bool) {
        self.set_square(x, yi, x, yf, value);
    }

    pub fn get_column(&self, x: u32, yi: u32, yf: u32, check: Check) -> bool {
        self.get_square(x, yi, x, yf, check)
    }

    /// Clamped single-cell write.
    pub fn set_cell(&mut self, x: u32, y: u32, value: bool) {
        self.set(x.min(self.width - 1), y.min(self.height - 1), value);
    }

    /// Clamped single-cell read.
    pub fn get_cell(&self, x: u32, y: u32) -> bool {
        self.get(x.min(self.width - 1), y.min(self.height - 1))
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

impl BitOr for &Bitmask {
    type Output = Result<Bitmask, GridError>;

    fn bitor(self, other: &Bitmask) -> Self::Output {
        let mut result = self.clone();
        result.unite(other)?;
        Ok(result)
    }
}

impl BitAnd for &Bitmask {
    type Output = Result<Bitmask, GridError>;

    fn bitand(self, other: &Bitmask) -> Self::Output {
        let mut result = self.clone();
        result.intersect(other)?;
        Ok(result)
    }
}

impl Sub for &Bitmask {
    type Output = Result<Bitmask, GridError>;

    fn sub(self, other: &Bitmask) -> Self::Output {
        let mut result = self.clone();
        result.subtract(other)?;
        Ok(result)
    }
}

impl BitXor for &Bitmask {
    type Output = Result<Bitmask, GridError>;

    fn bitxor(self, other: &Bitmask) -> Self::Output {
        let mut result = self.clone();
        result.symmetric_subtract(other)?;
        Ok(result)
    }
}

impl Not for &Bitmask {
    type Output = Bitmask;

    fn not(self) -> Bitmask {
        let mut result = self.clone();
        result.invert();
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
