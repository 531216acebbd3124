//! Grid occupants and their movement state machine.
//!
//! A [`TilemapObject`] is in one of three states:
//!
//! - **Detached**: not bound to any map (initial state).
//! - **Idle**: attached, `movement() == None`.
//! - **Moving(d)**: attached, a one-cell step in direction `d` is in flight.
//!
//! ```text
//!            attach                 start_movement(d)
//! Detached ---------> Idle  <-----------------------------> Moving(d)
//!    ^                 |      cancel_movement / finish_movement   |
//!    +---- detach -----+------------------ detach ----------------+
//! ```
//!
//! While attached the object contributes its footprint to the map's solid
//! mask according to its [`Solidness`]: occupying modes add one per cell,
//! holes subtract one, ghosts contribute nothing. While moving it also
//! reserves the strip it is entering with the same sign. Finishing a move
//! shifts the object first and then releases the strip left behind it, so
//! the reservation becomes part of the footprint without being counted twice.
//!
//! Operations that can be declined (`start_movement`, `cancel_movement`,
//! `finish_movement`, `set_solidness`, `teleport`, `detach`) return
//! `Ok(false)` when nothing happened. `Err` is reserved for structural
//! problems: invalid positions, double attach, the wrong map, or a broken
//! occupancy invariant.

use std::fmt;

use tracing::{debug, trace};

use crate::direction::Direction;
use crate::event::{ObjectEvent, ObjectListener};
use crate::solidness::{Effect, Solidness};
use crate::tilemap::{MapId, Tilemap};
use crate::{GridError, MAX_HEIGHT, MAX_WIDTH};

/// One occupant of a [`Tilemap`].
pub struct TilemapObject {
    map: Option<MapId>,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    solidness: Solidness,
    movement: Option<Direction>,
    listener: Option<Box<dyn ObjectListener>>,
}

impl TilemapObject {
    /// Create a detached object with its initial position and footprint.
    ///
    /// Fails with [`GridError::InvalidDimensions`] unless both dimensions are
    /// in `1..=100`, and with [`GridError::InvalidPosition`] when the
    /// footprint could not fit on even the largest map.
    pub fn new(x: u32, y: u32, width: u32, height: u32, solidness: Solidness) -> Result<Self, GridError> {
        if !(1..=MAX_WIDTH).contains(&width) || !(1..=MAX_HEIGHT).contains(&height) {
            return Err(GridError::InvalidDimensions { width, height });
        }
        if x as u64 + width as u64 > MAX_WIDTH as u64 || y as u64 + height as u64 > MAX_HEIGHT as u64 {
            return Err(GridError::InvalidPosition { x, y });
        }
        Ok(Self {
            map: None,
            x,
            y,
            width,
            height,
            solidness,
            movement: None,
            listener: None,
        })
    }

    /// Builder form of [`TilemapObject::set_listener`].
    pub fn with_listener(mut self, listener: Box<dyn ObjectListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Install (or remove) the receiver of this object's events, returning
    /// the previous one.
    pub fn set_listener(&mut self, listener: Option<Box<dyn ObjectListener>>) -> Option<Box<dyn ObjectListener>> {
        std::mem::replace(&mut self.listener, listener)
    }

    // -- observation --------------------------------------------------------

    /// The map this object is bound to, if any.
    #[inline]
    pub fn map(&self) -> Option<MapId> {
        self.map
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.map.is_some()
    }

    #[inline]
    pub fn x(&self) -> u32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Rightmost column of the footprint.
    #[inline]
    pub fn xf(&self) -> u32 {
        self.x + self.width - 1
    }

    /// Bottom row of the footprint.
    #[inline]
    pub fn yf(&self) -> u32 {
        self.y + self.height - 1
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
    pub fn solidness(&self) -> Solidness {
        self.solidness
    }

    /// Direction of the step in flight, if any.
    #[inline]
    pub fn movement(&self) -> Option<Direction> {
        self.movement
    }

    // -- internals ----------------------------------------------------------

    /// `Ok(true)` if bound to `map`, `Ok(false)` if detached.
    fn bound_to(&self, map: &Tilemap) -> Result<bool, GridError> {
        match self.map {
            None => Ok(false),
            Some(id) if id == map.id() => Ok(true),
            Some(expected) => Err(GridError::WrongMap {
                expected,
                found: map.id(),
            }),
        }
    }

    fn notify(&mut self, event: ObjectEvent) {
        trace!(?event, x = self.x, y = self.y, "object transition");
        if let Some(listener) = self.listener.as_mut() {
            listener.on_event(&event);
        }
    }

    fn add_body(&self, map: &mut Tilemap) -> Result<(), GridError> {
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        match self.solidness.effect() {
            Effect::Occupy => map.increment_body(x, y, w, h),
            Effect::Unoccupy => map.decrement_body(x, y, w, h),
            Effect::None => Ok(()),
        }
    }

    fn remove_body(&self, map: &mut Tilemap) -> Result<(), GridError> {
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        match self.solidness.effect() {
            Effect::Occupy => map.decrement_body(x, y, w, h),
            Effect::Unoccupy => map.increment_body(x, y, w, h),
            Effect::None => Ok(()),
        }
    }

    fn reserve_adjacent(&self, map: &mut Tilemap, direction: Direction) -> Result<(), GridError> {
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        match self.solidness.effect() {
            Effect::Occupy => map.increment_adjacent(x, y, w, h, direction),
            Effect::Unoccupy => map.decrement_adjacent(x, y, w, h, direction),
            Effect::None => Ok(()),
        }
    }

    fn release_adjacent(&self, map: &mut Tilemap, direction: Direction) -> Result<(), GridError> {
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        match self.solidness.effect() {
            Effect::Occupy => map.decrement_adjacent(x, y, w, h, direction),
            Effect::Unoccupy => map.increment_adjacent(x, y, w, h, direction),
            Effect::None => Ok(()),
        }
    }

    fn place(&mut self, map: &mut Tilemap, x: u32, y: u32) -> Result<(), GridError> {
        let previous = (self.x, self.y);
        self.x = x;
        self.y = y;
        if let Err(e) = self.add_body(map) {
            (self.x, self.y) = previous;
            return Err(e);
        }
        Ok(())
    }

    // -- predicates ---------------------------------------------------------

    /// Whether a step in `direction` is currently allowed.
    ///
    /// The step must stay on the map, the strip ahead must be free of static
    /// obstructions and, unless the object traverses, the whole strip must
    /// be unoccupied. Returns `Ok(false)` for a detached object. Never
    /// mutates anything.
    pub fn can_move_to(&self, map: &Tilemap, direction: Direction) -> Result<bool, GridError> {
        if !self.bound_to(map)? {
            return Ok(false);
        }
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        if map.is_hitting_edge(x, y, w, h, direction) {
            return Ok(false);
        }
        if map.is_adjacency_blocked(x, y, w, h, direction) {
            return Ok(false);
        }
        if self.solidness.traverses() {
            return Ok(true);
        }
        map.is_adjacency_free(x, y, w, h, direction)
    }

    // -- transitions --------------------------------------------------------

    /// Bind this object to `map`, optionally overriding its coordinates.
    ///
    /// The footprint must fit on the map. On success the solidness effect is
    /// applied to the map's counters.
    pub fn attach(&mut self, map: &mut Tilemap, x: Option<u32>, y: Option<u32>) -> Result<(), GridError> {
        if let Some(current) = self.map {
            return Err(GridError::AlreadyAttached { map: current });
        }
        let x = x.unwrap_or(self.x);
        let y = y.unwrap_or(self.y);
        if !map.fits(x, y, self.width, self.height) {
            return Err(GridError::InvalidPosition { x, y });
        }
        self.place(map, x, y)?;
        self.map = Some(map.id());
        self.notify(ObjectEvent::Attached { map: map.id() });
        Ok(())
    }

    /// Unbind this object, cancelling any movement and removing its
    /// footprint. Returns `Ok(false)` if it was not attached.
    pub fn detach(&mut self, map: &mut Tilemap) -> Result<bool, GridError> {
        if !self.bound_to(map)? {
            return Ok(false);
        }
        self.cancel_movement(map)?;
        self.remove_body(map)?;
        self.map = None;
        self.notify(ObjectEvent::Detached);
        Ok(true)
    }

    /// Begin a one-cell step in `direction`, reserving the strip ahead.
    ///
    /// Declined (`Ok(false)`) when detached, already moving, or when
    /// [`TilemapObject::can_move_to`] says no.
    pub fn start_movement(&mut self, map: &mut Tilemap, direction: Direction) -> Result<bool, GridError> {
        if !self.bound_to(map)? {
            return Ok(false);
        }
        if self.movement.is_some() || !self.can_move_to(map, direction)? {
            debug!(%direction, x = self.x, y = self.y, "movement declined");
            return Ok(false);
        }
        self.reserve_adjacent(map, direction)?;
        self.movement = Some(direction);
        self.notify(ObjectEvent::MovementStarted(direction));
        Ok(true)
    }

    /// Abort the step in flight without moving, releasing its reservation.
    pub fn cancel_movement(&mut self, map: &mut Tilemap) -> Result<bool, GridError> {
        if !self.bound_to(map)? {
            return Ok(false);
        }
        let Some(direction) = self.movement else {
            return Ok(false);
        };
        self.release_adjacent(map, direction)?;
        self.movement = None;
        self.notify(ObjectEvent::MovementCancelled(direction));
        Ok(true)
    }

    /// Complete the step in flight.
    ///
    /// The coordinates shift first; the strip released is the one behind
    /// the object at its new position.
    pub fn finish_movement(&mut self, map: &mut Tilemap) -> Result<bool, GridError> {
        if !self.bound_to(map)? {
            return Ok(false);
        }
        let Some(direction) = self.movement else {
            return Ok(false);
        };
        match direction {
            Direction::Up => self.y -= 1,
            Direction::Down => self.y += 1,
            Direction::Left => self.x -= 1,
            Direction::Right => self.x += 1,
        }
        self.release_adjacent(map, direction.opposite())?;
        self.movement = None;
        self.notify(ObjectEvent::MovementFinished(direction));
        Ok(true)
    }

    /// Change the solidness mode.
    ///
    /// If the occupancy classification changes, any movement is cancelled
    /// and the footprint is re-applied under the new mode; otherwise only
    /// the mode is swapped. Attached objects always emit
    /// [`ObjectEvent::SolidnessChanged`]; detached ones are left untouched.
    pub fn set_solidness(&mut self, map: &mut Tilemap, solidness: Solidness) -> Result<bool, GridError> {
        if !self.bound_to(map)? {
            return Ok(false);
        }
        if self.solidness.occupancy_changes(solidness) {
            self.cancel_movement(map)?;
            self.remove_body(map)?;
            self.solidness = solidness;
            self.add_body(map)?;
        } else {
            self.solidness = solidness;
        }
        self.notify(ObjectEvent::SolidnessChanged(self.solidness));
        Ok(true)
    }

    /// Jump to a new position, cancelling any movement.
    ///
    /// Missing coordinates keep their current value. Declined when detached
    /// or when the target equals the current position.
    pub fn teleport(&mut self, map: &mut Tilemap, x: Option<u32>, y: Option<u32>) -> Result<bool, GridError> {
        if !self.bound_to(map)? {
            return Ok(false);
        }
        let x = x.unwrap_or(self.x);
        let y = y.unwrap_or(self.y);
        if (x, y) == (self.x, self.y) {
            return Ok(false);
        }
        if !map.fits(x, y, self.width, self.height) {
            return Err(GridError::InvalidPosition { x, y });
        }
        self.cancel_movement(map)?;
        self.remove_body(map)?;
        if let Err(e) = self.place(map, x, y) {
            // Counters saturated at the target: put the body back where it was.
            self.add_body(map)?;
            return Err(e);
        }
        self.notify(ObjectEvent::Teleported { x, y });
        Ok(true)
    }
}

impl fmt::Debug for TilemapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TilemapObject")
            .field("map", &self.map)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("solidness", &self.solidness)
            .field("movement", &self.movement)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmask::Bitmask;
    use std::sync::{Arc, Mutex};

    /// Listener that records every event into a shared log.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<ObjectEvent>>>);

    impl Recorder {
        fn take(&self) -> Vec<ObjectEvent> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl ObjectListener for Recorder {
        fn on_event(&mut self, event: &ObjectEvent) {
            self.0.lock().unwrap().push(*event);
        }
    }

    fn recorded(x: u32, y: u32, w: u32, h: u32, mode: Solidness) -> (TilemapObject, Recorder) {
        let recorder = Recorder::default();
        let obj = TilemapObject::new(x, y, w, h, mode)
            .unwrap()
            .with_listener(Box::new(recorder.clone()));
        (obj, recorder)
    }

    // -- construction -------------------------------------------------------

    #[test]
    fn construction_validates_dimensions() {
        assert_eq!(
            TilemapObject::new(0, 0, 0, 1, Solidness::Solid).unwrap_err(),
            GridError::InvalidDimensions { width: 0, height: 1 }
        );
        assert!(TilemapObject::new(0, 0, 1, 101, Solidness::Solid).is_err());
        assert_eq!(
            TilemapObject::new(99, 0, 2, 1, Solidness::Solid).unwrap_err(),
            GridError::InvalidPosition { x: 99, y: 0 }
        );
        let obj = TilemapObject::new(98, 97, 2, 3, Solidness::Ghost).unwrap();
        assert_eq!((obj.xf(), obj.yf()), (99, 99));
        assert!(!obj.is_attached());
    }

    // -- attach / detach ----------------------------------------------------

    #[test]
    fn attach_applies_footprint_and_notifies() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let (mut obj, log) = recorded(0, 0, 2, 2, Solidness::Solid);
        obj.attach(&mut map, Some(1), None).unwrap();

        assert_eq!(obj.map(), Some(map.id()));
        assert_eq!((obj.x(), obj.y()), (1, 0));
        assert_eq!(map.solid_mask().total(), 4);
        assert_eq!(map.solid_mask().counter(2, 1), 1);
        assert_eq!(log.take(), vec![ObjectEvent::Attached { map: map.id() }]);
    }

    #[test]
    fn attach_twice_is_an_error() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let mut obj = TilemapObject::new(0, 0, 1, 1, Solidness::Solid).unwrap();
        obj.attach(&mut map, None, None).unwrap();
        assert_eq!(
            obj.attach(&mut map, None, None),
            Err(GridError::AlreadyAttached { map: map.id() })
        );
        assert_eq!(map.solid_mask().total(), 1);
    }

    #[test]
    fn attach_out_of_bounds_leaves_object_untouched() {
        let mut map = Tilemap::new(4, 4, None, 0, 0);
        let mut obj = TilemapObject::new(1, 1, 2, 2, Solidness::Solid).unwrap();
        assert_eq!(
            obj.attach(&mut map, Some(3), None),
            Err(GridError::InvalidPosition { x: 3, y: 1 })
        );
        assert!(!obj.is_attached());
        assert_eq!((obj.x(), obj.y()), (1, 1));
        assert_eq!(map.solid_mask().total(), 0);
    }

    #[test]
    fn hole_attach_decrements() {
        let mut map = Tilemap::new(3, 3, None, 0, 0);
        let mut hole = TilemapObject::new(1, 1, 1, 1, Solidness::Hole).unwrap();
        hole.attach(&mut map, None, None).unwrap();
        assert_eq!(map.solid_mask().counter(1, 1), -1);
        assert!(hole.detach(&mut map).unwrap());
        assert_eq!(map.solid_mask().counter(1, 1), 0);
    }

    #[test]
    fn ghost_attach_is_invisible() {
        let mut map = Tilemap::new(3, 3, None, 0, 0);
        let mut ghost = TilemapObject::new(0, 0, 3, 3, Solidness::Ghost).unwrap();
        ghost.attach(&mut map, None, None).unwrap();
        assert_eq!(map.solid_mask().total(), 0);
    }

    #[test]
    fn detach_is_idempotent() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let (mut obj, log) = recorded(2, 2, 1, 1, Solidness::Solid);
        obj.attach(&mut map, None, None).unwrap();
        log.take();

        assert!(obj.detach(&mut map).unwrap());
        assert!(!obj.detach(&mut map).unwrap());
        assert_eq!(log.take(), vec![ObjectEvent::Detached]);
        assert_eq!(map.solid_mask().total(), 0);
    }

    #[test]
    fn detach_while_moving_cancels_first() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let (mut obj, log) = recorded(2, 2, 1, 1, Solidness::Solid);
        obj.attach(&mut map, None, None).unwrap();
        obj.start_movement(&mut map, Direction::Down).unwrap();
        log.take();

        assert!(obj.detach(&mut map).unwrap());
        assert_eq!(
            log.take(),
            vec![
                ObjectEvent::MovementCancelled(Direction::Down),
                ObjectEvent::Detached
            ]
        );
        assert_eq!(obj.movement(), None);
        assert_eq!(map.solid_mask().total(), 0);
    }

    #[test]
    fn reattach_to_another_map() {
        let mut first = Tilemap::new(5, 5, None, 0, 0);
        let mut second = Tilemap::new(3, 3, None, 0, 0);
        let mut obj = TilemapObject::new(4, 4, 1, 1, Solidness::Solid).unwrap();
        obj.attach(&mut first, None, None).unwrap();
        obj.detach(&mut first).unwrap();

        assert!(obj.attach(&mut second, None, None).is_err());
        obj.attach(&mut second, Some(0), Some(0)).unwrap();
        assert_eq!(obj.map(), Some(second.id()));
        assert_eq!(second.solid_mask().total(), 1);
        assert_eq!(first.solid_mask().total(), 0);
    }

    #[test]
    fn wrong_map_is_an_error() {
        let mut home = Tilemap::new(5, 5, None, 0, 0);
        let mut other = Tilemap::new(5, 5, None, 0, 0);
        let mut obj = TilemapObject::new(1, 1, 1, 1, Solidness::Solid).unwrap();
        obj.attach(&mut home, None, None).unwrap();

        let err = obj.start_movement(&mut other, Direction::Up).unwrap_err();
        assert_eq!(
            err,
            GridError::WrongMap {
                expected: home.id(),
                found: other.id()
            }
        );
        assert!(obj.detach(&mut other).is_err());
        assert_eq!(other.solid_mask().total(), 0);
    }

    // -- movement -----------------------------------------------------------

    #[test]
    fn detached_objects_decline_everything() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let (mut obj, log) = recorded(2, 2, 1, 1, Solidness::Solid);
        assert!(!obj.start_movement(&mut map, Direction::Up).unwrap());
        assert!(!obj.cancel_movement(&mut map).unwrap());
        assert!(!obj.finish_movement(&mut map).unwrap());
        assert!(!obj.set_solidness(&mut map, Solidness::Ghost).unwrap());
        assert!(!obj.teleport(&mut map, Some(0), Some(0)).unwrap());
        assert!(!obj.can_move_to(&map, Direction::Up).unwrap());
        assert_eq!(obj.solidness(), Solidness::Solid);
        assert!(log.take().is_empty());
    }

    #[test]
    fn edge_rejects_regardless_of_mode() {
        let mut map = Tilemap::new(4, 4, None, 0, 0);
        for mode in [Solidness::Solid, Solidness::Ghost, Solidness::Hole] {
            let mut obj = TilemapObject::new(0, 1, 1, 1, mode).unwrap();
            obj.attach(&mut map, None, None).unwrap();
            assert!(!obj.start_movement(&mut map, Direction::Left).unwrap());
            obj.detach(&mut map).unwrap();
        }
    }

    #[test]
    fn start_while_moving_is_declined() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let mut obj = TilemapObject::new(2, 2, 1, 1, Solidness::Solid).unwrap();
        obj.attach(&mut map, None, None).unwrap();
        assert!(obj.start_movement(&mut map, Direction::Up).unwrap());
        assert!(!obj.start_movement(&mut map, Direction::Left).unwrap());
        assert_eq!(obj.movement(), Some(Direction::Up));
        assert_eq!(map.solid_mask().total(), 2);
    }

    #[test]
    fn movement_events_carry_direction() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let (mut obj, log) = recorded(2, 2, 1, 1, Solidness::Solid);
        obj.attach(&mut map, None, None).unwrap();
        obj.start_movement(&mut map, Direction::Right).unwrap();
        obj.cancel_movement(&mut map).unwrap();
        obj.start_movement(&mut map, Direction::Left).unwrap();
        obj.finish_movement(&mut map).unwrap();

        assert_eq!(
            log.take(),
            vec![
                ObjectEvent::Attached { map: map.id() },
                ObjectEvent::MovementStarted(Direction::Right),
                ObjectEvent::MovementCancelled(Direction::Right),
                ObjectEvent::MovementStarted(Direction::Left),
                ObjectEvent::MovementFinished(Direction::Left),
            ]
        );
        assert_eq!(obj.x(), 1);
    }

    #[test]
    fn wide_object_blocked_anywhere_on_leading_edge() {
        let mut map = Tilemap::new(6, 6, None, 0, 0);
        let mut wide = TilemapObject::new(1, 3, 3, 1, Solidness::Solid).unwrap();
        wide.attach(&mut map, None, None).unwrap();
        let mut pebble = TilemapObject::new(3, 2, 1, 1, Solidness::Solid).unwrap();
        pebble.attach(&mut map, None, None).unwrap();

        assert!(!wide.start_movement(&mut map, Direction::Up).unwrap());
        assert!(wide.start_movement(&mut map, Direction::Down).unwrap());
    }

    #[test]
    fn solid_for_others_traverses_but_blocks() {
        let mut map = Tilemap::new(5, 1, None, 0, 0);
        let mut sfo = TilemapObject::new(1, 0, 1, 1, Solidness::SolidForOthers).unwrap();
        sfo.attach(&mut map, None, None).unwrap();
        let mut solid = TilemapObject::new(2, 0, 1, 1, Solidness::Solid).unwrap();
        solid.attach(&mut map, None, None).unwrap();

        // The solid cannot step onto the SolidForOthers cell...
        assert!(!solid.start_movement(&mut map, Direction::Left).unwrap());
        // ...but SolidForOthers can step onto the solid one.
        assert!(sfo.start_movement(&mut map, Direction::Right).unwrap());
        assert_eq!(map.solid_mask().counter(2, 0), 2);
        assert!(sfo.finish_movement(&mut map).unwrap());
        assert_eq!(map.solid_mask().counter(2, 0), 2);
        assert_eq!(map.solid_mask().counter(1, 0), 0);
    }

    #[test]
    fn hole_movement_moves_the_deficit() {
        let mut map = Tilemap::new(4, 1, None, 0, 0);
        let mut hole = TilemapObject::new(0, 0, 1, 1, Solidness::Hole).unwrap();
        hole.attach(&mut map, None, None).unwrap();
        assert!(hole.start_movement(&mut map, Direction::Right).unwrap());
        assert_eq!(map.solid_mask().counters(), &[-1, -1, 0, 0]);
        assert!(hole.finish_movement(&mut map).unwrap());
        assert_eq!(map.solid_mask().counters(), &[0, -1, 0, 0]);
    }

    #[test]
    fn finish_releases_strip_behind_new_position() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let mut obj = TilemapObject::new(1, 1, 2, 2, Solidness::Solid).unwrap();
        obj.attach(&mut map, None, None).unwrap();
        assert!(obj.start_movement(&mut map, Direction::Right).unwrap());
        assert!(obj.finish_movement(&mut map).unwrap());

        let mask = map.solid_mask();
        for y in 1..=2 {
            assert_eq!(mask.counter(1, y), 0, "column left behind is released");
            assert_eq!(mask.counter(2, y), 1);
            assert_eq!(mask.counter(3, y), 1);
        }
        assert_eq!(mask.total(), 4);
    }

    // -- solidness ----------------------------------------------------------

    #[test]
    fn equivalent_solidness_swap_keeps_movement() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let (mut obj, log) = recorded(2, 2, 1, 1, Solidness::Solid);
        obj.attach(&mut map, None, None).unwrap();
        obj.start_movement(&mut map, Direction::Up).unwrap();
        let before = map.solid_mask().clone();
        log.take();

        assert!(obj.set_solidness(&mut map, Solidness::SolidForOthers).unwrap());
        assert_eq!(obj.movement(), Some(Direction::Up));
        assert_eq!(map.solid_mask(), &before);
        assert_eq!(
            log.take(),
            vec![ObjectEvent::SolidnessChanged(Solidness::SolidForOthers)]
        );
    }

    #[test]
    fn occupancy_change_cancels_and_reapplies() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let (mut obj, log) = recorded(2, 2, 1, 1, Solidness::Solid);
        obj.attach(&mut map, None, None).unwrap();
        obj.start_movement(&mut map, Direction::Up).unwrap();
        log.take();

        assert!(obj.set_solidness(&mut map, Solidness::Hole).unwrap());
        assert_eq!(obj.movement(), None);
        assert_eq!(map.solid_mask().counter(2, 2), -1);
        assert_eq!(map.solid_mask().counter(2, 1), 0);
        assert_eq!(
            log.take(),
            vec![
                ObjectEvent::MovementCancelled(Direction::Up),
                ObjectEvent::SolidnessChanged(Solidness::Hole)
            ]
        );
    }

    #[test]
    fn same_solidness_still_notifies() {
        let mut map = Tilemap::new(3, 3, None, 0, 0);
        let (mut obj, log) = recorded(0, 0, 1, 1, Solidness::Ghost);
        obj.attach(&mut map, None, None).unwrap();
        log.take();
        assert!(obj.set_solidness(&mut map, Solidness::Ghost).unwrap());
        assert_eq!(log.take(), vec![ObjectEvent::SolidnessChanged(Solidness::Ghost)]);
    }

    // -- teleport -----------------------------------------------------------

    #[test]
    fn teleport_moves_footprint() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let (mut obj, log) = recorded(0, 0, 2, 1, Solidness::Solid);
        obj.attach(&mut map, None, None).unwrap();
        obj.start_movement(&mut map, Direction::Down).unwrap();
        log.take();

        assert!(obj.teleport(&mut map, Some(3), Some(4)).unwrap());
        assert_eq!((obj.x(), obj.y()), (3, 4));
        assert_eq!(obj.movement(), None);
        assert_eq!(map.solid_mask().total(), 2);
        assert_eq!(map.solid_mask().counter(4, 4), 1);
        assert_eq!(
            log.take(),
            vec![
                ObjectEvent::MovementCancelled(Direction::Down),
                ObjectEvent::Teleported { x: 3, y: 4 }
            ]
        );
    }

    #[test]
    fn teleport_to_same_place_is_noop() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let (mut obj, log) = recorded(1, 1, 1, 1, Solidness::Solid);
        obj.attach(&mut map, None, None).unwrap();
        obj.start_movement(&mut map, Direction::Up).unwrap();
        log.take();

        assert!(!obj.teleport(&mut map, None, Some(1)).unwrap());
        assert_eq!(obj.movement(), Some(Direction::Up));
        assert!(log.take().is_empty());
    }

    #[test]
    fn teleport_out_of_bounds_fails_cleanly() {
        let mut map = Tilemap::new(5, 5, None, 0, 0);
        let mut obj = TilemapObject::new(1, 1, 2, 2, Solidness::Solid).unwrap();
        obj.attach(&mut map, None, None).unwrap();
        let before = map.solid_mask().clone();

        assert_eq!(
            obj.teleport(&mut map, Some(4), None),
            Err(GridError::InvalidPosition { x: 4, y: 1 })
        );
        assert_eq!((obj.x(), obj.y()), (1, 1));
        assert_eq!(map.solid_mask(), &before);
    }

    #[test]
    fn teleport_onto_saturated_cell_keeps_footprint() {
        let mut map = Tilemap::new(4, 1, None, 0, 0);
        for _ in 0..(i16::MAX as i32 + 1) {
            map.decrement_body(2, 0, 1, 1).unwrap();
        }
        assert_eq!(map.solid_mask().counter(2, 0), i16::MIN);

        let (mut obj, log) = recorded(0, 0, 1, 1, Solidness::Hole);
        obj.attach(&mut map, None, None).unwrap();
        log.take();
        assert_eq!(
            obj.teleport(&mut map, Some(2), None),
            Err(GridError::CannotDecrement { x: 2, y: 0 })
        );
        assert_eq!((obj.x(), obj.y()), (0, 0));
        assert!(obj.is_attached());
        assert_eq!(map.solid_mask().counter(0, 0), -1);
        assert!(log.take().is_empty());

        assert!(obj.detach(&mut map).unwrap());
        assert_eq!(map.solid_mask().counter(0, 0), 0);
    }

    #[test]
    fn teleport_ignores_static_blocks() {
        let blocks = Bitmask::new(4, 4, true).unwrap();
        let mut map = Tilemap::new(4, 4, Some(&blocks), 0, 0);
        let mut obj = TilemapObject::new(0, 0, 1, 1, Solidness::Solid).unwrap();
        obj.attach(&mut map, None, None).unwrap();
        assert!(obj.teleport(&mut map, Some(3), Some(3)).unwrap());
        assert!(!obj.can_move_to(&map, Direction::Up).unwrap());
    }
}
