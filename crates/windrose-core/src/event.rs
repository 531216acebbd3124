//! Transition notifications for grid objects.
//!
//! Every successful state change of a
//! [`TilemapObject`](crate::object::TilemapObject) produces one
//! [`ObjectEvent`], delivered synchronously to the object's
//! [`ObjectListener`] (if any) before the operation returns.

use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::solidness::Solidness;
use crate::tilemap::MapId;

/// A completed transition of a grid object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectEvent {
    Attached { map: MapId },
    Detached,
    MovementStarted(Direction),
    MovementCancelled(Direction),
    MovementFinished(Direction),
    SolidnessChanged(Solidness),
    Teleported { x: u32, y: u32 },
}

/// Receiver for [`ObjectEvent`]s.
///
/// Implement the typed handlers you care about; the rest default to no-ops.
/// Override [`ObjectListener::on_event`] instead to see every event in one
/// place.
pub trait ObjectListener: Send {
    fn on_attached(&mut self, _map: MapId) {}

    fn on_detached(&mut self) {}

    fn on_movement_started(&mut self, _direction: Direction) {}

    fn on_movement_cancelled(&mut self, _direction: Direction) {}

    fn on_movement_finished(&mut self, _direction: Direction) {}

    fn on_solidness_changed(&mut self, _solidness: Solidness) {}

    fn on_teleported(&mut self, _x: u32, _y: u32) {}

    /// Dispatch an event to its typed handler.
    fn on_event(&mut self, event: &ObjectEvent) {
        match *event {
            ObjectEvent::Attached { map } => self.on_attached(map),
            ObjectEvent::Detached => self.on_detached(),
            ObjectEvent::MovementStarted(d) => self.on_movement_started(d),
            ObjectEvent::MovementCancelled(d) => self.on_movement_cancelled(d),
            ObjectEvent::MovementFinished(d) => self.on_movement_finished(d),
            ObjectEvent::SolidnessChanged(s) => self.on_solidness_changed(s),
            ObjectEvent::Teleported { x, y } => self.on_teleported(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        moves: u32,
        teleports: Vec<(u32, u32)>,
    }

    impl ObjectListener for Counter {
        fn on_movement_finished(&mut self, _direction: Direction) {
            self.moves += 1;
        }

        fn on_teleported(&mut self, x: u32, y: u32) {
            self.teleports.push((x, y));
        }
    }

    #[test]
    fn dispatch_reaches_typed_handlers() {
        let mut counter = Counter::default();
        counter.on_event(&ObjectEvent::MovementFinished(Direction::Left));
        counter.on_event(&ObjectEvent::MovementStarted(Direction::Left));
        counter.on_event(&ObjectEvent::Teleported { x: 3, y: 4 });
        counter.on_event(&ObjectEvent::Detached);
        assert_eq!(counter.moves, 1);
        assert_eq!(counter.teleports, vec![(3, 4)]);
    }
}
