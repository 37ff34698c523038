use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds (UTC). The only time type.
pub type Ms = i64;

pub const HOUR_MS: Ms = 3_600_000;
pub const DAY_MS: Ms = 24 * HOUR_MS;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Checked constructor for spans coming from callers.
    pub fn try_new(start: Ms, end: Ms) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

// ── Calendar helpers ─────────────────────────────────────────────

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
}

/// The whole UTC day `[00:00, 24:00)` for a date.
pub fn day_span(date: NaiveDate) -> Span {
    let start = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
    Span::new(start, start + DAY_MS)
}

/// Calendar date (UTC) containing `t`.
pub fn date_of(t: Ms) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(t).map(|dt| dt.date_naive())
}

/// Hour of day (0..24, UTC); minutes are dropped.
pub fn hour_of_day(t: Ms) -> u32 {
    (t.rem_euclid(DAY_MS) / HOUR_MS) as u32
}

/// Whole hours needed to cover `span`, rounding partial hours up.
pub fn ceil_hours(span: &Span) -> u32 {
    ((span.duration_ms() + HOUR_MS - 1) / HOUR_MS) as u32
}

// ── Records ──────────────────────────────────────────────────────

/// A bookable room, desk, or piece of equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Ulid,
    pub name: String,
    /// Set semantics, first-seen order kept for display.
    #[serde(default)]
    pub amenities: Vec<String>,
    /// `None` means unconstrained.
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl Resource {
    pub fn new<I, A>(id: Ulid, name: impl Into<String>, amenities: I, capacity: Option<u32>) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for amenity in amenities {
            let amenity = amenity.into();
            if !deduped.contains(&amenity) {
                deduped.push(amenity);
            }
        }
        Self {
            id,
            name: name.into(),
            amenities: deduped,
            capacity,
        }
    }

    pub fn has_amenity(&self, amenity: &str) -> bool {
        self.amenities.iter().any(|a| a == amenity)
    }

    /// Whether `requested` people fit. Unconstrained resources always fit.
    pub fn fits(&self, requested: Option<u32>) -> bool {
        match (self.capacity, requested) {
            (Some(cap), Some(wanted)) => cap >= wanted,
            _ => true,
        }
    }
}

/// A committed reservation of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub resource_id: Ulid,
    pub span: Span,
    pub created_at: Ms,
    #[serde(default)]
    pub label: Option<String>,
}

/// A booking that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub id: Ulid,
    pub resource_id: Ulid,
    pub span: Span,
    #[serde(default)]
    pub label: Option<String>,
}

impl BookingRequest {
    pub fn new(resource_id: Ulid, span: Span) -> Self {
        Self {
            id: Ulid::new(),
            resource_id,
            span,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn into_booking(self, created_at: Ms) -> Booking {
        Booking {
            id: self.id,
            resource_id: self.resource_id,
            span: self.span,
            created_at,
            label: self.label,
        }
    }
}

// ── Derived values ───────────────────────────────────────────────

/// A free slot on one resource. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub resource_id: Ulid,
    pub span: Span,
    /// Start hour of day, used for scoring.
    pub hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub resource_id: Ulid,
    pub resource_name: String,
    pub start: Ms,
    pub end: Ms,
    /// Desirability in `[0, 1]`.
    pub confidence: f64,
    pub reason: String,
}

/// Returned when a candidate booking overlaps committed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub booking_id: Ulid,
    pub conflicts: Vec<Booking>,
    /// Alternatives on other resources.
    pub suggestions: Vec<Suggestion>,
}

/// Change feed events, broadcast after every committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ResourceCreated { id: Ulid, name: String },
    ResourceDeleted { id: Ulid },
    BookingCreated { id: Ulid, resource_id: Ulid, span: Span },
    BookingCancelled { id: Ulid, resource_id: Ulid },
}

impl Event {
    pub fn resource_id(&self) -> Ulid {
        match self {
            Event::ResourceCreated { id, .. } | Event::ResourceDeleted { id } => *id,
            Event::BookingCreated { resource_id, .. } | Event::BookingCancelled { resource_id, .. } => {
                *resource_id
            }
        }
    }
}
