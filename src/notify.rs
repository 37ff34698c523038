use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Live booking feed for coworking front ends.
///
/// A room's calendar view follows that room's channel. Occupancy dashboards
/// follow the floor-wide feed, which repeats every event. Slow listeners
/// lag and skip; the store never waits on them.
pub struct NotifyHub {
    rooms: DashMap<Ulid, broadcast::Sender<Event>>,
    floor: broadcast::Sender<Event>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            floor: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    /// Follow one room's bookings, e.g. for the calendar on its door panel.
    pub fn subscribe(&self, resource_id: Ulid) -> broadcast::Receiver<Event> {
        self.rooms
            .entry(resource_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Follow every room at once.
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.floor.subscribe()
    }

    /// Publish a committed change to the room's channel (if anyone opened
    /// one) and to the floor feed.
    pub fn send(&self, resource_id: Ulid, event: &Event) {
        if let Some(room) = self.rooms.get(&resource_id) {
            // Err only means no receivers are left.
            let _ = room.send(event.clone());
        }
        let _ = self.floor.send(event.clone());
    }

    /// Close a deleted room's channel. Its listeners see `RecvError::Closed`.
    pub fn remove(&self, resource_id: &Ulid) {
        self.rooms.remove(resource_id);
    }
}
