use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ulid::Ulid;

use crate::model::*;
use crate::notify::NotifyHub;
use crate::source::{BookingSink, DataSource, SourceError};

/// In-process data service: resources, bookings, and change notifications.
pub struct InMemoryStore {
    /// Resource by id, tagged with insertion sequence so listings are stable.
    resources: DashMap<Ulid, (u64, Resource)>,
    /// Bookings per resource, sorted by `span.start`.
    bookings: DashMap<Ulid, Vec<Booking>>,
    /// Reverse lookup: booking id → resource id
    booking_to_resource: DashMap<Ulid, Ulid>,
    next_seq: AtomicU64,
    notify: Arc<NotifyHub>,
}

impl InMemoryStore {
    pub fn new(notify: Arc<NotifyHub>) -> Self {
        Self {
            resources: DashMap::new(),
            bookings: DashMap::new(),
            booking_to_resource: DashMap::new(),
            next_seq: AtomicU64::new(0),
            notify,
        }
    }

    pub fn notify(&self) -> &Arc<NotifyHub> {
        &self.notify
    }

    // ── Resource CRUD ────────────────────────────────────────

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn get_resource(&self, id: &Ulid) -> Option<Resource> {
        self.resources.get(id).map(|e| e.value().1.clone())
    }

    pub fn insert_resource(&self, resource: Resource) -> Result<(), SourceError> {
        let id = resource.id;
        let name = resource.name.clone();
        match self.resources.entry(id) {
            Entry::Occupied(_) => return Err(SourceError::AlreadyExists(id)),
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert((seq, resource));
            }
        }
        self.notify.send(id, &Event::ResourceCreated { id, name });
        Ok(())
    }

    /// Refuses while the resource still has bookings.
    pub fn remove_resource(&self, id: Ulid) -> Result<Resource, SourceError> {
        let removed = {
            let kept = self.bookings.entry(id).or_default();
            if !kept.is_empty() {
                return Err(SourceError::InUse(id));
            }
            self.resources
                .remove(&id)
                .map(|(_, (_, r))| r)
                .ok_or(SourceError::NotFound(id))
        };
        self.bookings.remove_if(&id, |_, list| list.is_empty());
        let removed = removed?;
        self.notify.send(id, &Event::ResourceDeleted { id });
        self.notify.remove(&id);
        Ok(removed)
    }

    fn sorted_resources(&self) -> Vec<Resource> {
        let mut all: Vec<(u64, Resource)> = self
            .resources
            .iter()
            .map(|e| e.value().clone())
            .collect();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, r)| r).collect()
    }

    // ── Bookings ─────────────────────────────────────────────

    pub fn get_resource_for_booking(&self, booking_id: &Ulid) -> Option<Ulid> {
        self.booking_to_resource.get(booking_id).map(|e| *e.value())
    }

    pub fn list_bookings(&self, resource_id: &Ulid) -> Vec<Booking> {
        self.bookings
            .get(resource_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    fn bookings_touching(&self, resource_id: &Ulid, day: &Span) -> Vec<Booking> {
        let Some(list) = self.bookings.get(resource_id) else {
            return Vec::new();
        };
        // Everything at index >= right_bound starts at or after day.end.
        let right_bound = list.partition_point(|b| b.span.start < day.end);
        list[..right_bound]
            .iter()
            .filter(|b| b.span.end > day.start)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DataSource for InMemoryStore {
    async fn fetch_resources(&self) -> Result<Vec<Resource>, SourceError> {
        Ok(self.sorted_resources())
    }

    async fn fetch_bookings_for_date(&self, date: NaiveDate) -> Result<Vec<Booking>, SourceError> {
        let day = day_span(date);
        Ok(self
            .sorted_resources()
            .iter()
            .flat_map(|r| self.bookings_touching(&r.id, &day))
            .collect())
    }

    async fn fetch_bookings_for_resource_on_date(
        &self,
        resource_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, SourceError> {
        if !self.resources.contains_key(&resource_id) {
            return Err(SourceError::NotFound(resource_id));
        }
        Ok(self.bookings_touching(&resource_id, &day_span(date)))
    }
}

#[async_trait]
impl BookingSink for InMemoryStore {
    async fn insert_booking(&self, booking: Booking) -> Result<(), SourceError> {
        let resource_id = booking.resource_id;
        let event = Event::BookingCreated {
            id: booking.id,
            resource_id,
            span: booking.span,
        };
        if !self.resources.contains_key(&resource_id) {
            return Err(SourceError::NotFound(resource_id));
        }
        {
            // The entry guard serialises writers on this resource, so the
            // overlap check and the insert are atomic.
            let mut list = self.bookings.entry(resource_id).or_default();
            // Lost a race with remove_resource.
            if !self.resources.contains_key(&resource_id) {
                drop(list);
                self.bookings.remove_if(&resource_id, |_, list| list.is_empty());
                return Err(SourceError::NotFound(resource_id));
            }
            if self.booking_to_resource.contains_key(&booking.id) {
                return Err(SourceError::AlreadyExists(booking.id));
            }
            if let Some(clash) = list.iter().find(|b| b.span.overlaps(&booking.span)) {
                return Err(SourceError::Conflict(clash.id));
            }
            let pos = list
                .binary_search_by_key(&booking.span.start, |b| b.span.start)
                .unwrap_or_else(|e| e);
            self.booking_to_resource.insert(booking.id, resource_id);
            list.insert(pos, booking);
        }
        self.notify.send(resource_id, &event);
        Ok(())
    }

    async fn remove_booking(&self, id: Ulid) -> Result<Booking, SourceError> {
        let resource_id = self
            .get_resource_for_booking(&id)
            .ok_or(SourceError::NotFound(id))?;
        let removed = {
            let mut list = self
                .bookings
                .get_mut(&resource_id)
                .ok_or(SourceError::NotFound(id))?;
            let pos = list
                .iter()
                .position(|b| b.id == id)
                .ok_or(SourceError::NotFound(id))?;
            list.remove(pos)
        };
        self.booking_to_resource.remove(&id);
        self.notify
            .send(resource_id, &Event::BookingCancelled { id, resource_id });
        Ok(removed)
    }
}
