use crate::*;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// A door counter shared between its worker and the aggregator.
///
/// The mutex is the only synchronization point per door: `process_frame` and `reset` never interleave.
pub type SharedDoor = Arc<Mutex<DoorCounter>>;

/// A read-only view of all doors at one moment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OccupancySnapshot {
    /// Totals for each door in registration order.
    pub doors: IndexMap<String, DoorTotals>,
    pub total_entries: u64,
    pub total_exits: u64,
    /// `total_entries - total_exits`. Not clamped, so a negative value exposes people who were already inside.
    pub occupancy: i64,
    /// The most recent crossing across all doors.
    pub last_event: Option<CrossingEvent>,
}

/// Combines the totals of independent door counters into one occupancy figure.
#[derive(Debug, Clone, Default)]
pub struct OccupancyAggregator {
    doors: IndexMap<String, SharedDoor>,
}

impl OccupancyAggregator {
    /// Returns a new, empty OccupancyAggregator
    pub fn new() -> OccupancyAggregator {
        OccupancyAggregator::default()
    }

    /// Register a door counter, returning the handle its worker should use.
    pub fn register(&mut self, door: DoorCounter) -> Result<SharedDoor> {
        let name = door.name().to_string();
        if self.doors.contains_key(&name) {
            return Err(Error::DuplicateDoor(name));
        }

        let shared = Arc::new(Mutex::new(door));
        self.doors.insert(name, Arc::clone(&shared));
        Ok(shared)
    }

    /// Return the handle of door `name`
    pub fn door(&self, name: &str) -> Result<SharedDoor> {
        self.doors
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownDoor(name.to_string()))
    }

    /// Return the registered door names in registration order
    pub fn door_names(&self) -> impl Iterator<Item = &str> {
        self.doors.keys().map(String::as_str)
    }

    /// Return the number of registered doors
    pub fn len(&self) -> usize {
        self.doors.len()
    }

    /// Return true if no door is registered
    pub fn is_empty(&self) -> bool {
        self.doors.is_empty()
    }

    /// Read the committed totals of every door.
    ///
    /// Each door is locked only long enough to copy its counters, so the totals of one door are always consistent
    /// with each other. A door that has stopped receiving frames simply contributes its last totals.
    pub fn snapshot(&self) -> OccupancySnapshot {
        let mut snapshot = OccupancySnapshot::default();

        for (name, door) in &self.doors {
            let (totals, last_event) = {
                let door = door.lock();
                (door.totals(), door.last_event().cloned())
            };

            snapshot.total_entries += totals.entries;
            snapshot.total_exits += totals.exits;
            snapshot.doors.insert(name.clone(), totals);

            if let Some(event) = last_event {
                let newer = snapshot
                    .last_event
                    .as_ref()
                    .map_or(true, |latest| event.sequence > latest.sequence);
                if newer {
                    snapshot.last_event = Some(event);
                }
            }
        }

        snapshot.occupancy = snapshot.total_entries as i64 - snapshot.total_exits as i64;
        snapshot
    }

    /// Reset every door.
    pub fn reset_all(&self) {
        self.doors.values().for_each(|door| door.lock().reset());
    }
}
