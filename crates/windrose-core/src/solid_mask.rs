//! Reference-counted dynamic occupancy.
//!
//! A [`SolidMask`] keeps one `i16` counter per cell. Occupying objects add
//! one over their footprint, holes subtract one, and a movement in flight
//! adds one over the strip it is about to enter. A cell is busy while its
//! counter is positive.
//!
//! Counters saturate: pushing one past `i16::MAX` or `i16::MIN` is an error,
//! never a wraparound. Every rectangle is validated before any counter is
//! touched, so a failed call leaves the mask unchanged.

use crate::{GridError, MAX_HEIGHT, MAX_WIDTH};

/// Per-cell occupancy counters for a tilemap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SolidMask {
    width: u32,
    height: u32,
    positions: Vec<i16>,
}

impl SolidMask {
    /// Create an all-zero mask. Both dimensions are clamped to `1..=100`.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.clamp(1, MAX_WIDTH);
        let height = height.clamp(1, MAX_HEIGHT);
        Self {
            width,
            height,
            positions: vec![0; (width * height) as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fail unless the rectangle lies entirely inside the mask.
    pub fn check_dimensions(&self, x: u32, y: u32, width: u32, height: u32) -> Result<(), GridError> {
        let fits_x = x as u64 + width as u64 <= self.width as u64;
        let fits_y = y as u64 + height as u64 <= self.height as u64;
        if fits_x && fits_y {
            Ok(())
        } else {
            Err(GridError::InvalidSpatialSpec {
                x,
                y,
                width,
                height,
                mask_width: self.width,
                mask_height: self.height,
            })
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn cells(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
        (y..y + height).flat_map(move |j| (x..x + width).map(move |i| (i, j)))
    }

    /// Add one to every counter in the rectangle.
    pub fn inc_square(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<(), GridError> {
        self.check_dimensions(x, y, width, height)?;
        if let Some((cx, cy)) = Self::cells(x, y, width, height)
            .find(|&(i, j)| self.positions[self.offset(i, j)] == i16::MAX)
        {
            return Err(GridError::CannotIncrement { x: cx, y: cy });
        }
        for j in y..y + height {
            let start = self.offset(x, j);
            for counter in &mut self.positions[start..start + width as usize] {
                *counter += 1;
            }
        }
        Ok(())
    }

    /// Subtract one from every counter in the rectangle.
    pub fn dec_square(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<(), GridError> {
        self.check_dimensions(x, y, width, height)?;
        if let Some((cx, cy)) = Self::cells(x, y, width, height)
            .find(|&(i, j)| self.positions[self.offset(i, j)] == i16::MIN)
        {
            return Err(GridError::CannotDecrement { x: cx, y: cy });
        }
        for j in y..y + height {
            let start = self.offset(x, j);
            for counter in &mut self.positions[start..start + width as usize] {
                *counter -= 1;
            }
        }
        Ok(())
    }

    pub fn inc_row(&mut self, x: u32, y: u32, width: u32) -> Result<(), GridError> {
        self.inc_square(x, y, width, 1)
    }

    pub fn inc_column(&mut self, x: u32, y: u32, height: u32) -> Result<(), GridError> {
        self.inc_square(x, y, 1, height)
    }

    pub fn dec_row(&mut self, x: u32, y: u32, width: u32) -> Result<(), GridError> {
        self.dec_square(x, y, width, 1)
    }

    pub fn dec_column(&mut self, x: u32, y: u32, height: u32) -> Result<(), GridError> {
        self.dec_square(x, y, 1, height)
    }

    /// Whether no counter in the rectangle is positive.
    ///
    /// Cells pushed below zero by holes count as empty.
    pub fn empty_square(&self, x: u32, y: u32, width: u32, height: u32) -> Result<bool, GridError> {
        self.check_dimensions(x, y, width, height)?;
        Ok(Self::cells(x, y, width, height)
            .all(|(i, j)| self.positions[self.offset(i, j)] <= 0))
    }

    pub fn empty_row(&self, x: u32, y: u32, width: u32) -> Result<bool, GridError> {
        self.empty_square(x, y, width, 1)
    }

    pub fn empty_column(&self, x: u32, y: u32, height: u32) -> Result<bool, GridError> {
        self.empty_square(x, y, 1, height)
    }

    /// Whether the counter at `(x, y)` is exactly zero.
    #[inline]
    pub fn is_free(&self, x: u32, y: u32) -> bool {
        self.counter(x, y) == 0
    }

    /// Raw counter at `(x, y)`. Coordinates must be in range.
    #[inline]
    pub fn counter(&self, x: u32, y: u32) -> i16 {
        debug_assert!(x < self.width && y < self.height);
        self.positions[self.offset(x, y)]
    }

    /// Sum of all counters.
    pub fn total(&self) -> i64 {
        self.positions.iter().map(|&c| c as i64).sum()
    }

    /// Row-major view of every counter.
    pub fn counters(&self) -> &[i16] {
        &self.positions
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_are_clamped() {
        let mask = SolidMask::new(0, 500);
        assert_eq!((mask.width(), mask.height()), (1, 100));
        assert_eq!(mask.counters().len(), 100);
        assert_eq!(mask.total(), 0);
    }

    #[test]
    fn inc_then_dec_restores() {
        let mut mask = SolidMask::new(6, 6);
        mask.inc_square(1, 1, 3, 2).unwrap();
        mask.inc_square(2, 2, 2, 2).unwrap();
        let snapshot = mask.clone();
        mask.inc_square(0, 0, 4, 4).unwrap();
        mask.dec_square(0, 0, 4, 4).unwrap();
        assert_eq!(mask, snapshot);
        assert_eq!(mask.counter(2, 2), 2);
        assert_eq!(mask.counter(1, 1), 1);
        assert_eq!(mask.total(), 10);
    }

    #[test]
    fn rectangle_must_fit() {
        let mut mask = SolidMask::new(4, 3);
        assert!(mask.inc_square(0, 0, 4, 3).is_ok());
        assert_eq!(
            mask.inc_square(2, 0, 3, 1),
            Err(GridError::InvalidSpatialSpec {
                x: 2,
                y: 0,
                width: 3,
                height: 1,
                mask_width: 4,
                mask_height: 3,
            })
        );
        assert!(mask.dec_row(0, 3, 1).is_err());
        assert!(mask.empty_column(4, 0, 1).is_err());
    }

    #[test]
    fn empty_queries() {
        let mut mask = SolidMask::new(5, 5);
        assert!(mask.empty_square(0, 0, 5, 5).unwrap());
        mask.inc_column(2, 1, 2).unwrap();
        assert!(!mask.empty_square(0, 0, 5, 5).unwrap());
        assert!(!mask.empty_row(0, 2, 5).unwrap());
        assert!(mask.empty_row(0, 3, 5).unwrap());
        assert!(mask.empty_column(3, 0, 5).unwrap());
        assert!(!mask.is_free(2, 1));
        assert!(mask.is_free(2, 3));
    }

    #[test]
    fn negative_counters_are_empty_but_not_free() {
        let mut mask = SolidMask::new(3, 3);
        mask.dec_row(0, 0, 3).unwrap();
        assert!(mask.empty_row(0, 0, 3).unwrap());
        assert!(!mask.is_free(0, 0));
        assert_eq!(mask.counter(1, 0), -1);
    }

    #[test]
    fn saturation_is_an_error_and_atomic() {
        let mut mask = SolidMask::new(2, 1);
        for _ in 0..i16::MAX {
            mask.inc_square(1, 0, 1, 1).unwrap();
        }
        let before = mask.clone();
        assert_eq!(
            mask.inc_row(0, 0, 2),
            Err(GridError::CannotIncrement { x: 1, y: 0 })
        );
        assert_eq!(mask, before, "failed increment must not touch any counter");

        let mut mask = SolidMask::new(1, 1);
        for _ in 0..(i16::MAX as i32 + 1) {
            mask.dec_square(0, 0, 1, 1).unwrap();
        }
        assert_eq!(mask.counter(0, 0), i16::MIN);
        assert_eq!(
            mask.dec_square(0, 0, 1, 1),
            Err(GridError::CannotDecrement { x: 0, y: 0 })
        );
    }
}
