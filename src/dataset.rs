//! JSON fixtures for the `deskslot` binary: a list of resources and the
//! bookings already committed against them.
//!
//! ```json
//! {
//!   "resources": [{ "name": "Room A", "amenities": ["WiFi"], "capacity": 8 }],
//!   "bookings": [{ "resource": "Room A",
//!                  "start": "2024-06-10T09:00:00Z", "end": "2024-06-10T11:00:00Z" }]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use ulid::Ulid;

use crate::limits::MAX_NAME_LEN;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::source::{BookingSink, SourceError};
use crate::store::InMemoryStore;

#[derive(Debug)]
pub enum DatasetError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
    Store(SourceError),
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Io(e) => write!(f, "cannot read dataset: {e}"),
            DatasetError::Parse(e) => write!(f, "cannot parse dataset: {e}"),
            DatasetError::Invalid(msg) => write!(f, "invalid dataset: {msg}"),
            DatasetError::Store(e) => write!(f, "cannot load dataset: {e}"),
        }
    }
}

impl std::error::Error for DatasetError {}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceRecord {
    #[serde(default)]
    pub id: Option<Ulid>,
    pub name: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRecord {
    #[serde(default)]
    pub id: Option<Ulid>,
    /// Resource id or resource name.
    pub resource: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    #[serde(default)]
    pub bookings: Vec<BookingRecord>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let raw = std::fs::read_to_string(path).map_err(DatasetError::Io)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, DatasetError> {
        serde_json::from_str(raw).map_err(DatasetError::Parse)
    }

    /// Build a populated store. Overlapping bookings in the fixture are an error.
    pub async fn into_store(self, notify: Arc<NotifyHub>) -> Result<InMemoryStore, DatasetError> {
        let store = InMemoryStore::new(notify);
        let mut loaded: Vec<Resource> = Vec::with_capacity(self.resources.len());

        for record in self.resources {
            if record.name.is_empty() || record.name.len() > MAX_NAME_LEN {
                return Err(DatasetError::Invalid(format!("bad resource name {:?}", record.name)));
            }
            let resource = Resource::new(
                record.id.unwrap_or_else(Ulid::new),
                record.name,
                record.amenities,
                record.capacity,
            );
            store.insert_resource(resource.clone()).map_err(DatasetError::Store)?;
            loaded.push(resource);
        }

        for record in self.bookings {
            let resource_id = resolve_resource(&loaded, &record.resource)?;
            let span = Span::try_new(record.start.timestamp_millis(), record.end.timestamp_millis())
                .ok_or_else(|| {
                    DatasetError::Invalid(format!(
                        "booking on {:?} ends before it starts",
                        record.resource
                    ))
                })?;
            let booking = Booking {
                id: record.id.unwrap_or_else(Ulid::new),
                resource_id,
                span,
                created_at: record.created_at.map_or(0, |t| t.timestamp_millis()),
                label: record.label,
            };
            store.insert_booking(booking).await.map_err(DatasetError::Store)?;
        }

        Ok(store)
    }
}

/// Find a resource by id or, failing that, by exact name.
pub fn resolve_resource(resources: &[Resource], key: &str) -> Result<Ulid, DatasetError> {
    if let Ok(id) = key.parse::<Ulid>()
        && resources.iter().any(|r| r.id == id) {
            return Ok(id);
        }
    resources
        .iter()
        .find(|r| r.name == key)
        .map(|r| r.id)
        .ok_or_else(|| DatasetError::Invalid(format!("unknown resource {key:?}")))
}
