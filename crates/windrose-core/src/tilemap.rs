//! The occupancy map objects live on.
//!
//! A [`Tilemap`] owns an immutable block mask (map-authored obstructions)
//! and a mutable [`SolidMask`] (object occupancy). The mutating helpers are
//! crate-private: only a [`TilemapObject`](crate::object::TilemapObject)
//! bound to this map changes its counters.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bitmask::{Bitmask, Check};
use crate::direction::Direction;
use crate::solid_mask::SolidMask;
use crate::{GridError, MAX_HEIGHT, MAX_WIDTH};

// ---------------------------------------------------------------------------
// MapId
// ---------------------------------------------------------------------------

static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Tilemap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(u64);

impl MapId {
    fn next() -> Self {
        Self(NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tilemap
// ---------------------------------------------------------------------------

/// Static blocking plus dynamic occupancy for one map.
#[derive(Debug)]
pub struct Tilemap {
    id: MapId,
    width: u32,
    height: u32,
    block_mask: Bitmask,
    solid_mask: SolidMask,
}

impl Tilemap {
    /// Build a map of `width` x `height` cells, each clamped to `1..=100`.
    ///
    /// When `block_source` is given and its size or the offset differs from
    /// the map, it is translated onto the map (clipped, padded with free
    /// cells). Without a source the map has no static obstructions.
    pub fn new(
        width: u32,
        height: u32,
        block_source: Option<&Bitmask>,
        offset_x: i32,
        offset_y: i32,
    ) -> Self {
        let width = width.clamp(1, MAX_WIDTH);
        let height = height.clamp(1, MAX_HEIGHT);

        let block_mask = match block_source {
            Some(source)
                if source.width() == width
                    && source.height() == height
                    && offset_x == 0
                    && offset_y == 0 =>
            {
                Ok(source.clone())
            }
            Some(source) => source.translated(width, height, offset_x, offset_y, false),
            None => Bitmask::new(width, height, false),
        }
        .expect("clamped tilemap dimensions are never empty");

        let id = MapId::next();
        tracing::debug!(%id, width, height, blocked = block_mask.count_ones(), "tilemap created");

        Self {
            id,
            width,
            height,
            solid_mask: SolidMask::new(width, height),
            block_mask,
        }
    }

    /// Build a map whose obstructions come from an image (see
    /// [`Bitmask::from_image`]).
    pub fn from_image(
        width: u32,
        height: u32,
        source: &RgbaImage,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<Self, GridError> {
        let blocks = Bitmask::from_image(source)?;
        Ok(Self::new(width, height, Some(&blocks), offset_x, offset_y))
    }

    #[inline]
    pub fn id(&self) -> MapId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Static obstruction layer (`true` = blocked).
    pub fn block_mask(&self) -> &Bitmask {
        &self.block_mask
    }

    /// Dynamic occupancy counters.
    pub fn solid_mask(&self) -> &SolidMask {
        &self.solid_mask
    }

    /// Whether a footprint at `(x, y)` fits inside the map.
    pub fn fits(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        x as u64 + width as u64 <= self.width as u64 && y as u64 + height as u64 <= self.height as u64
    }

    // -- occupancy helpers (object use only) --------------------------------

    pub(crate) fn increment_body(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<(), GridError> {
        self.solid_mask.inc_square(x, y, width, height)
    }

    pub(crate) fn decrement_body(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<(), GridError> {
        self.solid_mask.dec_square(x, y, width, height)
    }

    /// Whether one step in `direction` would leave the map.
    pub(crate) fn is_hitting_edge(&self, x: u32, y: u32, width: u32, height: u32, direction: Direction) -> bool {
        match direction {
            Direction::Left => x == 0,
            Direction::Up => y == 0,
            Direction::Right => x + width == self.width,
            Direction::Down => y + height == self.height,
        }
    }

    /// Whether any static obstruction lies on the strip beyond the footprint.
    ///
    /// The caller must have ruled out [`Self::is_hitting_edge`].
    pub(crate) fn is_adjacency_blocked(&self, x: u32, y: u32, width: u32, height: u32, direction: Direction) -> bool {
        let mask = &self.block_mask;
        match direction {
            Direction::Left => mask.get_column(x - 1, y, y + height - 1, Check::AnyBlocked),
            Direction::Up => mask.get_row(x, x + width - 1, y - 1, Check::AnyBlocked),
            Direction::Right => mask.get_column(x + width, y, y + height - 1, Check::AnyBlocked),
            Direction::Down => mask.get_row(x, x + width - 1, y + height, Check::AnyBlocked),
        }
    }

    /// Whether the whole strip beyond the footprint is unoccupied.
    ///
    /// The caller must have ruled out [`Self::is_hitting_edge`].
    pub(crate) fn is_adjacency_free(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        direction: Direction,
    ) -> Result<bool, GridError> {
        let mask = &self.solid_mask;
        match direction {
            Direction::Left => mask.empty_column(x - 1, y, height),
            Direction::Up => mask.empty_row(x, y - 1, width),
            Direction::Right => mask.empty_column(x + width, y, height),
            Direction::Down => mask.empty_row(x, y + height, width),
        }
    }

    /// Reserve the strip beyond the footprint. No-op at the map edge.
    pub(crate) fn increment_adjacent(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        direction: Direction,
    ) -> Result<(), GridError> {
        if self.is_hitting_edge(x, y, width, height, direction) {
            return Ok(());
        }
        let mask = &mut self.solid_mask;
        match direction {
            Direction::Left => mask.inc_column(x - 1, y, height),
            Direction::Up => mask.inc_row(x, y - 1, width),
            Direction::Right => mask.inc_column(x + width, y, height),
            Direction::Down => mask.inc_row(x, y + height, width),
        }
    }

    /// Release the strip beyond the footprint. No-op at the map edge.
    pub(crate) fn decrement_adjacent(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        direction: Direction,
    ) -> Result<(), GridError> {
        if self.is_hitting_edge(x, y, width, height, direction) {
            return Ok(());
        }
        let mask = &mut self.solid_mask;
        match direction {
            Direction::Left => mask.dec_column(x - 1, y, height),
            Direction::Up => mask.dec_row(x, y - 1, width),
            Direction::Right => mask.dec_column(x + width, y, height),
            Direction::Down => mask.dec_row(x, y + height, width),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
