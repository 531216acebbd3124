//! Ownership of maps and objects.
//!
//! The core state machine needs the object and its map passed in together
//! on every call. The [`Stage`] owns both sides: maps are keyed by
//! [`MapId`], objects live in slots addressed by generational
//! [`ObjectId`]s, and every lifecycle call is forwarded with the map the
//! object is bound to.
//!
//! On top of forwarding the stage adds:
//!
//! - **Pause.** A paused object (or any object on a paused map) declines
//!   teleport, solidness and movement calls and is not advanced by time.
//!   Attach and detach still work.
//! - **Motion.** [`Stage::advance`] moves in-flight steps forward by
//!   `speed * dt` and finishes them once a full cell is covered.
//! - **Events.** Once [`Stage::capture_events`] is switched on, every object
//!   reports its transitions into one channel, tagged with its handle, and
//!   [`Stage::drain_events`] collects them. Capture is off by default, so a
//!   host that never drains buffers nothing.
//!
//! Iteration over objects is always in slot order, so a scripted sequence
//! of calls replays identically.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, trace, warn};
use windrose_core::direction::Direction;
use windrose_core::event::{ObjectEvent, ObjectListener};
use windrose_core::object::TilemapObject;
use windrose_core::solidness::Solidness;
use windrose_core::tilemap::{MapId, Tilemap};
use windrose_core::GridError;

use crate::config::{MapSpec, ObjectSpec};
use crate::handle::{ObjectAllocator, ObjectId};
use crate::motion::Motion;
use crate::StageError;

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct MapSlot {
    tilemap: Tilemap,
    paused: bool,
}

#[derive(Debug)]
struct Entry {
    id: ObjectId,
    object: TilemapObject,
    motion: Motion,
    paused: bool,
}

/// Forwards an object's events into the stage channel while capture is on.
struct ChannelListener {
    id: ObjectId,
    sender: Sender<(ObjectId, ObjectEvent)>,
    capturing: Arc<AtomicBool>,
}

impl ObjectListener for ChannelListener {
    fn on_event(&mut self, event: &ObjectEvent) {
        if !self.capturing.load(Ordering::Relaxed) {
            return;
        }
        // The receiver is owned by the same stage, so this only fails while
        // the stage itself is being dropped.
        let _ = self.sender.send((self.id, *event));
    }
}

/// Look up a live entry without borrowing the rest of the stage.
fn lookup<'a>(
    allocator: &ObjectAllocator,
    entries: &'a mut [Option<Entry>],
    id: ObjectId,
) -> Result<&'a mut Entry, StageError> {
    if !allocator.is_live(id) {
        return Err(StageError::StaleObject(id));
    }
    entries
        .get_mut(id.index() as usize)
        .and_then(Option::as_mut)
        .ok_or(StageError::StaleObject(id))
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Owner of maps and the objects moving on them.
#[derive(Debug)]
pub struct Stage {
    maps: BTreeMap<MapId, MapSlot>,
    allocator: ObjectAllocator,
    entries: Vec<Option<Entry>>,
    events_tx: Sender<(ObjectId, ObjectEvent)>,
    events_rx: Receiver<(ObjectId, ObjectEvent)>,
    capturing: Arc<AtomicBool>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            maps: BTreeMap::new(),
            allocator: ObjectAllocator::new(),
            entries: Vec::new(),
            events_tx,
            events_rx,
            capturing: Arc::new(AtomicBool::new(false)),
        }
    }

    // -- maps ---------------------------------------------------------------

    /// Take ownership of an already built map.
    pub fn insert_map(&mut self, tilemap: Tilemap) -> MapId {
        let id = tilemap.id();
        self.maps.insert(
            id,
            MapSlot {
                tilemap,
                paused: false,
            },
        );
        id
    }

    /// Build a map from its spec and take ownership of it.
    pub fn add_map(&mut self, spec: &MapSpec) -> Result<MapId, StageError> {
        Ok(self.insert_map(spec.build()?))
    }

    /// Detach every object on `map`, then hand the map back.
    pub fn remove_map(&mut self, map: MapId) -> Result<Tilemap, StageError> {
        if !self.maps.contains_key(&map) {
            return Err(StageError::UnknownMap(map));
        }
        for id in self.objects_on(map) {
            self.detach(id)?;
        }
        let slot = self.maps.remove(&map).ok_or(StageError::UnknownMap(map))?;
        Ok(slot.tilemap)
    }

    pub fn map(&self, id: MapId) -> Option<&Tilemap> {
        self.maps.get(&id).map(|slot| &slot.tilemap)
    }

    /// Every map id, in creation order.
    pub fn map_ids(&self) -> Vec<MapId> {
        self.maps.keys().copied().collect()
    }

    // -- objects ------------------------------------------------------------

    /// Create a detached object.
    pub fn spawn(&mut self, spec: &ObjectSpec) -> Result<ObjectId, StageError> {
        if !Motion::is_valid_speed(spec.speed) {
            return Err(StageError::InvalidSpeed(spec.speed));
        }
        let object = TilemapObject::new(spec.x, spec.y, spec.width, spec.height, spec.solidness)?;
        let id = self.allocator.allocate();
        let object = object.with_listener(Box::new(ChannelListener {
            id,
            sender: self.events_tx.clone(),
            capturing: Arc::clone(&self.capturing),
        }));
        let entry = Entry {
            id,
            object,
            motion: Motion::new(spec.speed),
            paused: false,
        };

        let index = id.index() as usize;
        if index == self.entries.len() {
            self.entries.push(Some(entry));
        } else {
            self.entries[index] = Some(entry);
        }
        trace!(%id, x = spec.x, y = spec.y, "spawned");
        Ok(id)
    }

    /// Detach the object if needed and free its handle.
    pub fn despawn(&mut self, id: ObjectId) -> Result<(), StageError> {
        self.detach(id)?;
        self.entries[id.index() as usize] = None;
        self.allocator.free(id);
        trace!(%id, "despawned");
        Ok(())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.allocator.is_live(id)
    }

    fn entry(&self, id: ObjectId) -> Result<&Entry, StageError> {
        if !self.allocator.is_live(id) {
            return Err(StageError::StaleObject(id));
        }
        self.entries
            .get(id.index() as usize)
            .and_then(Option::as_ref)
            .ok_or(StageError::StaleObject(id))
    }

    /// Read-only view of an object.
    pub fn object(&self, id: ObjectId) -> Result<&TilemapObject, StageError> {
        Ok(&self.entry(id)?.object)
    }

    pub fn motion(&self, id: ObjectId) -> Result<&Motion, StageError> {
        Ok(&self.entry(id)?.motion)
    }

    /// Handles of every live object, in slot order.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.entries.iter().flatten().map(|e| e.id).collect()
    }

    /// Handles of the objects attached to `map`, in slot order.
    pub fn objects_on(&self, map: MapId) -> Vec<ObjectId> {
        self.entries
            .iter()
            .flatten()
            .filter(|e| e.object.map() == Some(map))
            .map(|e| e.id)
            .collect()
    }

    pub fn object_count(&self) -> usize {
        self.allocator.live_count()
    }

    pub fn set_speed(&mut self, id: ObjectId, speed: f64) -> Result<(), StageError> {
        if !Motion::is_valid_speed(speed) {
            return Err(StageError::InvalidSpeed(speed));
        }
        lookup(&self.allocator, &mut self.entries, id)?.motion.set_speed(speed);
        Ok(())
    }

    /// Turn to face `direction` without moving.
    pub fn face(&mut self, id: ObjectId, direction: Direction) -> Result<(), StageError> {
        lookup(&self.allocator, &mut self.entries, id)?.motion.face(direction);
        Ok(())
    }

    // -- lifecycle ----------------------------------------------------------

    /// The object's entry plus the slot of the map it is bound to.
    fn parts(&mut self, id: ObjectId) -> Result<(&mut Entry, Option<&mut MapSlot>), StageError> {
        let entry = lookup(&self.allocator, &mut self.entries, id)?;
        let slot = match entry.object.map() {
            Some(map) => Some(self.maps.get_mut(&map).ok_or(StageError::UnknownMap(map))?),
            None => None,
        };
        Ok((entry, slot))
    }

    /// Run a declinable operation on an attached, unpaused object.
    fn drive(
        &mut self,
        id: ObjectId,
        op: &'static str,
        f: impl FnOnce(&mut TilemapObject, &mut Motion, &mut Tilemap) -> Result<bool, GridError>,
    ) -> Result<bool, StageError> {
        let (entry, slot) = self.parts(id)?;
        let Some(slot) = slot else {
            return Ok(false);
        };
        if entry.paused || slot.paused {
            debug!(%id, op, "dropped while paused");
            return Ok(false);
        }
        Ok(f(&mut entry.object, &mut entry.motion, &mut slot.tilemap)?)
    }

    /// Bind an object to `map`.
    pub fn attach(
        &mut self,
        id: ObjectId,
        map: MapId,
        x: Option<u32>,
        y: Option<u32>,
    ) -> Result<(), StageError> {
        let entry = lookup(&self.allocator, &mut self.entries, id)?;
        let slot = self.maps.get_mut(&map).ok_or(StageError::UnknownMap(map))?;
        entry.object.attach(&mut slot.tilemap, x, y)?;
        entry.motion.reset();
        Ok(())
    }

    /// Attach even if already attached, detaching from the current map first.
    ///
    /// If the new position is invalid the object is left detached.
    pub fn reattach(
        &mut self,
        id: ObjectId,
        map: MapId,
        x: Option<u32>,
        y: Option<u32>,
    ) -> Result<(), StageError> {
        if !self.maps.contains_key(&map) {
            return Err(StageError::UnknownMap(map));
        }
        self.detach(id)?;
        self.attach(id, map, x, y)
    }

    /// Unbind an object. Works while paused. `Ok(false)` if already detached.
    pub fn detach(&mut self, id: ObjectId) -> Result<bool, StageError> {
        let (entry, slot) = self.parts(id)?;
        let Some(slot) = slot else {
            return Ok(false);
        };
        let detached = entry.object.detach(&mut slot.tilemap)?;
        entry.motion.reset();
        Ok(detached)
    }

    pub fn teleport(&mut self, id: ObjectId, x: Option<u32>, y: Option<u32>) -> Result<bool, StageError> {
        self.drive(id, "teleport", |object, motion, map| {
            let moved = object.teleport(map, x, y)?;
            if moved {
                motion.reset();
            }
            Ok(moved)
        })
    }

    pub fn set_solidness(&mut self, id: ObjectId, solidness: Solidness) -> Result<bool, StageError> {
        self.drive(id, "set_solidness", |object, motion, map| {
            let changed = object.set_solidness(map, solidness)?;
            if object.movement().is_none() {
                motion.reset();
            }
            Ok(changed)
        })
    }

    /// Begin a step. On success the object also turns to face `direction`.
    pub fn start_movement(&mut self, id: ObjectId, direction: Direction) -> Result<bool, StageError> {
        self.drive(id, "start_movement", |object, motion, map| {
            let started = object.start_movement(map, direction)?;
            if started {
                motion.begin(direction);
            }
            Ok(started)
        })
    }

    pub fn cancel_movement(&mut self, id: ObjectId) -> Result<bool, StageError> {
        self.drive(id, "cancel_movement", |object, motion, map| {
            let cancelled = object.cancel_movement(map)?;
            if cancelled {
                motion.reset();
            }
            Ok(cancelled)
        })
    }

    /// Complete the step in flight immediately, whatever its progress.
    pub fn finish_movement(&mut self, id: ObjectId) -> Result<bool, StageError> {
        self.drive(id, "finish_movement", |object, motion, map| {
            let finished = object.finish_movement(map)?;
            if finished {
                motion.reset();
            }
            Ok(finished)
        })
    }

    // -- pause --------------------------------------------------------------

    /// Pause one object. Returns `false` if it was already paused.
    pub fn pause(&mut self, id: ObjectId) -> Result<bool, StageError> {
        let entry = lookup(&self.allocator, &mut self.entries, id)?;
        Ok(!std::mem::replace(&mut entry.paused, true))
    }

    /// Resume one object. Returns `false` if it was not paused.
    pub fn resume(&mut self, id: ObjectId) -> Result<bool, StageError> {
        let entry = lookup(&self.allocator, &mut self.entries, id)?;
        Ok(std::mem::replace(&mut entry.paused, false))
    }

    /// Pause every object on `map`, including ones attached later.
    pub fn pause_map(&mut self, map: MapId) -> Result<(), StageError> {
        self.maps.get_mut(&map).ok_or(StageError::UnknownMap(map))?.paused = true;
        Ok(())
    }

    pub fn resume_map(&mut self, map: MapId) -> Result<(), StageError> {
        self.maps.get_mut(&map).ok_or(StageError::UnknownMap(map))?.paused = false;
        Ok(())
    }

    /// `false` for unknown maps.
    pub fn is_map_paused(&self, map: MapId) -> bool {
        self.maps.get(&map).is_some_and(|slot| slot.paused)
    }

    /// Whether the object, or the map it is on, is paused.
    pub fn is_paused(&self, id: ObjectId) -> Result<bool, StageError> {
        let entry = self.entry(id)?;
        let map_paused = entry
            .object
            .map()
            .and_then(|map| self.maps.get(&map))
            .is_some_and(|slot| slot.paused);
        Ok(entry.paused || map_paused)
    }

    // -- time ---------------------------------------------------------------

    /// Move every unpaused step in flight forward by `dt` seconds, finishing
    /// those that cover a full cell. Returns the number finished.
    pub fn advance(&mut self, dt: f64) -> Result<usize, StageError> {
        if !(dt > 0.0 && dt.is_finite()) {
            warn!(dt, "ignoring non-positive or non-finite time step");
            return Ok(0);
        }
        let mut finished = 0;
        for entry in self.entries.iter_mut().flatten() {
            let Some(map) = entry.object.map() else {
                continue;
            };
            if entry.paused || entry.object.movement().is_none() {
                continue;
            }
            let slot = self.maps.get_mut(&map).ok_or(StageError::UnknownMap(map))?;
            if slot.paused {
                continue;
            }
            if entry.motion.advance(dt) {
                entry.object.finish_movement(&mut slot.tilemap)?;
                entry.motion.reset();
                finished += 1;
            }
        }
        Ok(finished)
    }

    /// Sub-cell render offset of an object, in cells.
    pub fn visual_offset(&self, id: ObjectId) -> Result<(f64, f64), StageError> {
        let entry = self.entry(id)?;
        Ok(entry.motion.offset(entry.object.movement()))
    }

    // -- events -------------------------------------------------------------

    /// Start or stop buffering object events. Stopping discards whatever
    /// was buffered and not yet drained.
    pub fn capture_events(&mut self, enabled: bool) {
        self.capturing.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.events_rx.try_iter().for_each(drop);
        }
    }

    pub fn is_capturing_events(&self) -> bool {
        self.capturing.load(Ordering::Relaxed)
    }

    /// Every event reported since the last drain, in emission order. Empty
    /// unless capture is on.
    pub fn drain_events(&self) -> Vec<(ObjectId, ObjectEvent)> {
        self.events_rx.try_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
