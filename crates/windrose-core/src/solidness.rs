//! Occupancy modes for grid objects.
//!
//! The classification is static data: [`Solidness::occupies`],
//! [`Solidness::makes_hole`] and [`Solidness::traverses`] are plain matches.
//!
//! | Mode             | Occupies | Makes hole | Traverses |
//! |------------------|----------|------------|-----------|
//! | `Solid`          | yes      | no         | no        |
//! | `SolidForOthers` | yes      | no         | yes       |
//! | `Ghost`          | no       | no         | yes       |
//! | `Hole`           | no       | yes        | yes       |

use serde::{Deserialize, Serialize};

/// How an object takes part in dynamic occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Solidness {
    /// Occupies its cells and cannot enter occupied cells.
    #[default]
    Solid,
    /// Occupies its cells for others, but may itself enter occupied cells.
    SolidForOthers,
    /// Neither occupies nor is blocked by occupancy.
    Ghost,
    /// Cancels one unit of occupancy on its cells.
    Hole,
}

/// Signed contribution an object makes to the counters under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    Occupy,
    Unoccupy,
    None,
}

impl Solidness {
    /// Whether the object increments the occupancy counters it covers.
    #[inline]
    pub fn occupies(self) -> bool {
        matches!(self, Solidness::Solid | Solidness::SolidForOthers)
    }

    /// Whether the object decrements the occupancy counters it covers.
    #[inline]
    pub fn makes_hole(self) -> bool {
        matches!(self, Solidness::Hole)
    }

    /// Whether the object may move into cells others occupy.
    ///
    /// True for every mode except [`Solidness::Solid`], including
    /// [`Solidness::SolidForOthers`].
    #[inline]
    pub fn traverses(self) -> bool {
        !matches!(self, Solidness::Solid)
    }

    /// Whether switching from `self` to `other` changes the counters.
    #[inline]
    pub fn occupancy_changes(self, other: Solidness) -> bool {
        self.occupies() != other.occupies() || self.makes_hole() != other.makes_hole()
    }

    #[inline]
    pub(crate) fn effect(self) -> Effect {
        if self.occupies() {
            Effect::Occupy
        } else if self.makes_hole() {
            Effect::Unoccupy
        } else {
            Effect::None
        }
    }
}
