use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::limits::*;
use crate::model::*;

use super::availability::compute_free_windows;
use super::scoring::score;
use super::EngineError;

pub const DEFAULT_LIMIT: usize = 5;

/// What the caller is looking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub date: NaiveDate,
    pub duration_hours: u32,
    /// Minimum seats. `None` accepts every resource.
    pub capacity: Option<u32>,
    pub amenities: Vec<String>,
    pub limit: usize,
}

impl SuggestionRequest {
    pub fn new(date: NaiveDate, duration_hours: u32) -> Self {
        Self {
            date,
            duration_hours,
            capacity: None,
            amenities: Vec::new(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Build from raw caller input, rejecting unparseable dates and
    /// non-positive durations.
    pub fn parse(date: &str, duration_hours: i64) -> Result<Self, EngineError> {
        let date = parse_date(date)
            .map_err(|e| EngineError::InvalidInput(format!("date {date:?}: {e}")))?;
        if duration_hours <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "duration must be positive, got {duration_hours}h"
            )));
        }
        // Anything past u32 can never fit a day; it ranks to nothing.
        let duration_hours = u32::try_from(duration_hours).unwrap_or(u32::MAX);
        let request = Self::new(date, duration_hours);
        request.validate()?;
        Ok(request)
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_amenities<I, A>(mut self, amenities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.amenities = amenities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.duration_hours == 0 {
            return Err(EngineError::InvalidInput("duration must be positive".into()));
        }
        if self.limit == 0 {
            return Err(EngineError::InvalidInput("limit must be positive".into()));
        }
        if self.limit > MAX_SUGGESTION_LIMIT {
            return Err(EngineError::LimitExceeded("too many suggestions requested"));
        }
        if self.amenities.len() > MAX_AMENITIES {
            return Err(EngineError::LimitExceeded("too many amenities"));
        }
        if self.amenities.iter().any(|a| a.len() > MAX_NAME_LEN) {
            return Err(EngineError::LimitExceeded("amenity name too long"));
        }
        Ok(())
    }
}

// ── Ranking ──────────────────────────────────────────────────────

/// Free windows across all resources, scored, best first, at most
/// `request.limit` of them.
///
/// Ties keep input order (resources as given, then ascending start hour).
/// No candidates is an empty vector, not an error.
pub fn rank(
    resources: &[Resource],
    bookings: &[Booking],
    request: &SuggestionRequest,
    config: &EngineConfig,
) -> Result<Vec<Suggestion>, EngineError> {
    request.validate()?;

    let mut suggestions: Vec<Suggestion> = Vec::new();
    for resource in resources.iter().filter(|r| r.fits(request.capacity)) {
        let windows = compute_free_windows(
            resource,
            request.date,
            request.duration_hours,
            bookings,
            config.hours,
            config.precision,
        );
        for window in windows {
            let scored = score(resource, &window, &request.amenities, &config.weights);
            suggestions.push(Suggestion {
                resource_id: resource.id,
                resource_name: resource.name.clone(),
                start: window.span.start,
                end: window.span.end,
                confidence: scored.confidence,
                reason: scored.reason,
            });
        }
    }

    // Vec::sort_by is stable.
    suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    suggestions.truncate(request.limit);
    Ok(suggestions)
}
