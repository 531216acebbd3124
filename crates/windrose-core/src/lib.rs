//! WindRose core -- grid occupancy and movement for tile-based games.
//!
//! A [`Tilemap`](tilemap::Tilemap) combines a static obstruction layer (a
//! packed [`Bitmask`](bitmask::Bitmask)) with a dynamic occupancy layer (a
//! reference-counted [`SolidMask`](solid_mask::SolidMask)). Occupants are
//! [`TilemapObject`](object::TilemapObject)s: rectangular footprints with a
//! solidness mode and a start/cancel/finish movement state machine that keeps
//! the occupancy counters consistent while several objects move at once.
//!
//! # Quick Start
//!
//! ```
//! use windrose_core::prelude::*;
//!
//! let mut map = Tilemap::new(5, 5, None, 0, 0);
//! let mut hero = TilemapObject::new(0, 0, 1, 1, Solidness::Solid).unwrap();
//! hero.attach(&mut map, Some(2), Some(2)).unwrap();
//!
//! assert!(hero.start_movement(&mut map, Direction::Up).unwrap());
//! assert_eq!(hero.movement(), Some(Direction::Up));
//! assert!(hero.finish_movement(&mut map).unwrap());
//! assert_eq!((hero.x(), hero.y()), (2, 1));
//! assert_eq!(hero.movement(), None);
//! ```

#![deny(unsafe_code)]

pub mod bitmask;
pub mod direction;
pub mod event;
pub mod object;
pub mod solid_mask;
pub mod solidness;
pub mod tilemap;

/// Largest width a tilemap or an object footprint may have.
pub const MAX_WIDTH: u32 = 100;
/// Largest height a tilemap or an object footprint may have.
pub const MAX_HEIGHT: u32 = 100;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by grid operations.
///
/// Every variant signals a structural problem or a broken invariant. An
/// operation that is merely declined (a blocked move, a call on a detached
/// object) is reported through its `bool` return value instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// A mask or image was requested with zero area.
    #[error("invalid argument: {width}x{height} has no cells")]
    InvalidArgument { width: u32, height: u32 },

    /// Two bitmasks of different shapes were combined.
    #[error("bitmask dimensions differ: {left_width}x{left_height} vs {right_width}x{right_height}")]
    DimensionMismatch {
        left_width: u32,
        left_height: u32,
        right_width: u32,
        right_height: u32,
    },

    /// A rectangle does not fit inside a solid mask.
    #[error("{width}x{height} at ({x}, {y}) does not fit in a {mask_width}x{mask_height} mask")]
    InvalidSpatialSpec {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    /// A solid mask counter is already at its maximum.
    #[error("cannot increment position ({x}, {y}) beyond its maximum")]
    CannotIncrement { x: u32, y: u32 },

    /// A solid mask counter is already at its minimum.
    #[error("cannot decrement position ({x}, {y}) beyond its minimum")]
    CannotDecrement { x: u32, y: u32 },

    /// An object footprint is empty or larger than the maximum map size.
    #[error("invalid object dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// An object position does not fit inside the map it targets.
    #[error("position ({x}, {y}) is not valid for the object's dimensions")]
    InvalidPosition { x: u32, y: u32 },

    /// `attach` was called on an object that is already bound to a map.
    #[error("object is already attached to {map}")]
    AlreadyAttached { map: tilemap::MapId },

    /// An attached object was operated on with a different map.
    #[error("object is attached to {expected}, but {found} was supplied")]
    WrongMap {
        expected: tilemap::MapId,
        found: tilemap::MapId,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bitmask::{Bitmask, Check};
    pub use crate::direction::Direction;
    pub use crate::event::{ObjectEvent, ObjectListener};
    pub use crate::object::TilemapObject;
    pub use crate::solid_mask::SolidMask;
    pub use crate::solidness::Solidness;
    pub use crate::tilemap::{MapId, Tilemap};
    pub use crate::GridError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
