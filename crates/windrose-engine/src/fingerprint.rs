//! BLAKE3 fingerprint of a stage's simulation state.
//!
//! [`Stage::state_hash`] digests everything that affects future behavior:
//! each map's dimensions, static blocks and occupancy counters, and each
//! object's handle, placement, footprint, solidness, movement, motion and
//! pause flag. Two stages driven by the same calls hash the same.
//!
//! Map ids come from a process-wide counter, so maps are referred to by
//! their position in [`Stage::map_ids`] rather than by id. This keeps the
//! hash stable across stages built in the same process.

use serde::Serialize;
use windrose_core::direction::Direction;
use windrose_core::solidness::Solidness;

use crate::motion::Motion;
use crate::stage::Stage;

#[derive(Serialize)]
struct MapState<'a> {
    width: u32,
    height: u32,
    paused: bool,
    /// Row-major indices of blocked cells.
    blocked: Vec<u32>,
    counters: &'a [i16],
}

#[derive(Serialize)]
struct ObjectState<'a> {
    id: u64,
    /// Position of the bound map in `Stage::map_ids`.
    map: Option<usize>,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    solidness: Solidness,
    movement: Option<Direction>,
    motion: &'a Motion,
    paused: bool,
}

#[derive(Serialize)]
struct HashableState<'a> {
    maps: Vec<MapState<'a>>,
    objects: Vec<ObjectState<'a>>,
}

impl Stage {
    /// BLAKE3 hex digest (64 lowercase hex chars) of the simulation state.
    ///
    /// A determinism check, not a persistence format.
    pub fn state_hash(&self) -> String {
        let map_ids = self.map_ids();

        let maps = map_ids
            .iter()
            .filter_map(|&id| self.map(id))
            .map(|map| {
                let blocks = map.block_mask();
                let blocked = (0..map.height())
                    .flat_map(|y| (0..map.width()).map(move |x| (x, y)))
                    .filter(|&(x, y)| blocks.get(x, y))
                    .map(|(x, y)| y * map.width() + x)
                    .collect();
                MapState {
                    width: map.width(),
                    height: map.height(),
                    paused: self.is_map_paused(map.id()),
                    blocked,
                    counters: map.solid_mask().counters(),
                }
            })
            .collect();

        let objects = self
            .object_ids()
            .into_iter()
            .filter_map(|id| {
                let object = self.object(id).ok()?;
                let motion = self.motion(id).ok()?;
                Some(ObjectState {
                    id: id.to_raw(),
                    map: object.map().and_then(|m| map_ids.iter().position(|&k| k == m)),
                    x: object.x(),
                    y: object.y(),
                    width: object.width(),
                    height: object.height(),
                    solidness: object.solidness(),
                    movement: object.movement(),
                    motion,
                    paused: self.is_paused(id).ok()?,
                })
            })
            .collect();

        let json_bytes = serde_json::to_vec(&HashableState { maps, objects })
            .expect("stage state should always be JSON-serializable");
        blake3::hash(&json_bytes).to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
