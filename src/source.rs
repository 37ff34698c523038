use async_trait::async_trait;
use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::{Booking, Resource};

/// Failure reported by the backing data service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The service could not be reached or timed out.
    Unavailable(String),
    /// The service answered with rows that do not decode.
    Malformed(String),
    NotFound(Ulid),
    AlreadyExists(Ulid),
    /// The resource still has bookings.
    InUse(Ulid),
    /// A write was rejected because it overlaps this booking.
    Conflict(Ulid),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unavailable(msg) => write!(f, "unavailable: {msg}"),
            SourceError::Malformed(msg) => write!(f, "malformed rows: {msg}"),
            SourceError::NotFound(id) => write!(f, "not found: {id}"),
            SourceError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            SourceError::InUse(id) => write!(f, "resource {id} still has bookings"),
            SourceError::Conflict(id) => write!(f, "overlaps booking {id}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Read side of the data service.
///
/// Implementations may be remote; every call can fail and callers must not
/// substitute empty results for errors.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch_resources(&self) -> Result<Vec<Resource>, SourceError>;

    /// Bookings on any resource whose span touches `date` (UTC).
    async fn fetch_bookings_for_date(&self, date: NaiveDate) -> Result<Vec<Booking>, SourceError>;

    /// Bookings on one resource whose span touches `date` (UTC).
    async fn fetch_bookings_for_resource_on_date(
        &self,
        resource_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, SourceError>;
}

/// Write side used when committing bookings.
#[async_trait]
pub trait BookingSink: Send + Sync {
    /// Commit a booking. Must reject overlaps atomically with
    /// [`SourceError::Conflict`] so concurrent writers cannot double-book.
    async fn insert_booking(&self, booking: Booking) -> Result<(), SourceError>;

    async fn remove_booking(&self, id: Ulid) -> Result<Booking, SourceError>;
}
