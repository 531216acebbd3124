//! Declarative stage setup.
//!
//! A [`StageConfig`] is a JSON document describing the tick rate, the maps
//! and the objects placed on them at start-up:
//!
//! ```json
//! {
//!   "tick": { "fixed_dt": 0.05 },
//!   "maps": [ { "width": 16, "height": 12, "block_image": "walls.png" } ],
//!   "objects": [ { "map": 0, "x": 2, "y": 3, "width": 1, "height": 1, "solidness": "Ghost" } ]
//! }
//! ```
//!
//! Every field except map and object dimensions has a default. Relative
//! image paths in a file loaded with [`StageConfig::load`] resolve against
//! the file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use windrose_core::solidness::Solidness;
use windrose_core::tilemap::Tilemap;

use crate::motion::DEFAULT_SPEED;
use crate::stage::Stage;
use crate::tick::TickConfig;
use crate::StageError;

// ---------------------------------------------------------------------------
// MapSpec
// ---------------------------------------------------------------------------

/// How to build one [`Tilemap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSpec {
    pub width: u32,
    pub height: u32,
    /// Image whose non-black pixels become static obstructions.
    #[serde(default)]
    pub block_image: Option<PathBuf>,
    #[serde(default)]
    pub offset_x: i32,
    #[serde(default)]
    pub offset_y: i32,
}

impl MapSpec {
    /// An open map with no obstructions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            block_image: None,
            offset_x: 0,
            offset_y: 0,
        }
    }

    pub fn with_block_image(mut self, path: impl Into<PathBuf>, offset_x: i32, offset_y: i32) -> Self {
        self.block_image = Some(path.into());
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    /// Build the map, decoding the block image if one is named.
    pub fn build(&self) -> Result<Tilemap, StageError> {
        match &self.block_image {
            Some(path) => {
                let source = image::open(path)?.to_rgba8();
                debug!(path = %path.display(), "loaded block image");
                Ok(Tilemap::from_image(
                    self.width,
                    self.height,
                    &source,
                    self.offset_x,
                    self.offset_y,
                )?)
            }
            None => Ok(Tilemap::new(self.width, self.height, None, 0, 0)),
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectSpec
// ---------------------------------------------------------------------------

fn default_speed() -> f64 {
    DEFAULT_SPEED
}

/// How to build one grid object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub solidness: Solidness,
    /// Cells per second.
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl ObjectSpec {
    /// A solid object at the default speed.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            solidness: Solidness::default(),
            speed: DEFAULT_SPEED,
        }
    }

    pub fn with_solidness(mut self, solidness: Solidness) -> Self {
        self.solidness = solidness;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }
}

/// An object attached to one of the configured maps at start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Index into [`StageConfig::maps`].
    pub map: usize,
    #[serde(flatten)]
    pub object: ObjectSpec,
}

// ---------------------------------------------------------------------------
// StageConfig
// ---------------------------------------------------------------------------

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(default)]
    pub tick: TickConfig,
    #[serde(default)]
    pub maps: Vec<MapSpec>,
    #[serde(default)]
    pub objects: Vec<Placement>,
}

impl StageConfig {
    pub fn from_json_str(json: &str) -> Result<Self, StageError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a config file. Relative `block_image` paths are rebased onto the
    /// file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StageError> {
        let path = path.as_ref();
        let mut config = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        if let Some(base) = path.parent() {
            for map in &mut config.maps {
                if let Some(image) = map.block_image.as_mut() {
                    if image.is_relative() {
                        *image = base.join(&*image);
                    }
                }
            }
        }
        Ok(config)
    }

    /// Build a stage with every configured map and placed object.
    ///
    /// Maps are inserted in order, so `stage.map_ids()[i]` is `maps[i]`.
    /// Placements are spawned in order and attached at their own
    /// coordinates.
    pub fn build_stage(&self) -> Result<Stage, StageError> {
        let mut stage = Stage::new();
        let mut map_ids = Vec::with_capacity(self.maps.len());
        for spec in &self.maps {
            map_ids.push(stage.add_map(spec)?);
        }
        for placement in &self.objects {
            let map = *map_ids.get(placement.map).ok_or(StageError::UnknownMapIndex(placement.map))?;
            let id = stage.spawn(&placement.object)?;
            stage.attach(id, map, None, None)?;
        }
        Ok(stage)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
