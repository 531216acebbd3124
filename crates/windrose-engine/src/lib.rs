//! WindRose Engine -- host-side driver for the grid core.
//!
//! This crate builds on [`windrose_core`] to provide what a game loop needs
//! around the occupancy engine: a [`Stage`](stage::Stage) that owns maps and
//! objects behind generational handles, sub-cell [`Motion`](motion::Motion)
//! that finishes steps as time passes, a fixed-timestep
//! [`TickLoop`](tick::TickLoop), JSON configuration, and a BLAKE3 state
//! fingerprint for determinism checks.
//!
//! # Quick Start
//!
//! ```
//! use windrose_engine::prelude::*;
//!
//! let mut stage = Stage::new();
//! let map = stage.insert_map(Tilemap::new(8, 8, None, 0, 0));
//! let hero = stage.spawn(&ObjectSpec::new(0, 0, 1, 1)).unwrap();
//! stage.attach(hero, map, Some(3), Some(3)).unwrap();
//!
//! let mut tick_loop = TickLoop::new(stage, TickConfig::default());
//! tick_loop.add_system("walk", |stage| {
//!     for id in stage.object_ids() {
//!         let _ = stage.start_movement(id, Direction::Right);
//!     }
//! });
//!
//! // Default speed is two cells per second: one second at 60 Hz is two steps.
//! tick_loop.run_ticks(60).unwrap();
//! assert_eq!(tick_loop.stage().object(hero).unwrap().x(), 5);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod fingerprint;
pub mod handle;
pub mod logging;
pub mod motion;
pub mod stage;
pub mod tick;

use std::sync::{Arc, Mutex};

use windrose_core::tilemap::MapId;
use windrose_core::GridError;

use crate::handle::ObjectId;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the core crate for convenience.
pub use windrose_core;

/// A stage shared between threads.
///
/// The mutex is the single exclusive-access boundary: every grid mutation
/// happens while it is held.
pub type SharedStage = Arc<Mutex<stage::Stage>>;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the engine layer.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The handle refers to an object that was despawned (or never existed).
    #[error("stale object handle: {0}")]
    StaleObject(ObjectId),

    /// The map id is not registered with this stage.
    #[error("unknown map: {0}")]
    UnknownMap(MapId),

    /// A configured placement names a map index past the end of the list.
    #[error("placement refers to map index {0}, which is not configured")]
    UnknownMapIndex(usize),

    /// A motion speed that is not positive and finite.
    #[error("invalid speed {0}: must be positive and finite")]
    InvalidSpeed(f64),

    /// A core grid operation failed.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// A block-mask image could not be read or decoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// A configuration document could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// A configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use windrose_core::prelude::*;

    pub use crate::config::{MapSpec, ObjectSpec, StageConfig};
    pub use crate::handle::ObjectId;
    pub use crate::motion::Motion;
    pub use crate::stage::Stage;
    pub use crate::tick::{SystemFn, TickConfig, TickDiagnostics, TickLoop};
    pub use crate::{SharedStage, StageError};
}
