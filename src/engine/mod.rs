mod availability;
mod conflict;
mod error;
pub mod ranking;
mod scoring;
#[cfg(test)]
mod tests;

pub use availability::{compute_free_windows, OperatingHours, OverlapPrecision};
pub use conflict::{classify, detect_conflicts, ConflictState};
pub use error::EngineError;
pub use ranking::{rank, SuggestionRequest, DEFAULT_LIMIT};
pub use scoring::{score, Score, ScoringWeights};

use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::config::EngineConfig;
use crate::model::*;
use crate::observability::*;
use crate::source::{BookingSink, DataSource, SourceError};

use conflict::{now_ms, validate_request};

/// Result of trying to commit a booking.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    Created(Booking),
    /// Nothing was written; the caller picks an alternative.
    Conflicted(ConflictResolution),
}

/// Suggestion and conflict engine over an injected data service.
///
/// Holds no mutable state; calls may run concurrently.
pub struct Engine<S> {
    source: Arc<S>,
    config: EngineConfig,
}

impl<S> Clone for Engine<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            config: self.config.clone(),
        }
    }
}

/// Convert a data service error. Outages are counted and logged; domain
/// answers (unknown id, overlap) pass through as rejections.
fn source_failure(op: &'static str) -> impl FnOnce(SourceError) -> EngineError {
    move |e| match e {
        SourceError::Unavailable(_) | SourceError::Malformed(_) => {
            metrics::counter!(UPSTREAM_FAILURES_TOTAL, "op" => op).increment(1);
            warn!(op, error = %e, "data service failure");
            EngineError::Upstream(e)
        }
        other => rejected(other.into()),
    }
}

fn rejected(e: EngineError) -> EngineError {
    metrics::counter!(REJECTED_TOTAL, "kind" => e.kind()).increment(1);
    debug!(error = %e, "request rejected");
    e
}

impl<S: DataSource> Engine<S> {
    pub fn new(source: Arc<S>, config: EngineConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Best free slots across all resources for the request.
    ///
    /// Resources and the day's bookings are fetched concurrently. A fetch
    /// failure is returned as [`EngineError::Upstream`], never as an empty day.
    pub async fn generate_booking_suggestions(
        &self,
        request: &SuggestionRequest,
    ) -> Result<Vec<Suggestion>, EngineError> {
        request.validate().map_err(rejected)?;

        let (resources, bookings) = tokio::try_join!(
            self.source.fetch_resources(),
            self.source.fetch_bookings_for_date(request.date),
        )
        .map_err(source_failure("fetch_for_suggestions"))?;

        let started = Instant::now();
        let suggestions = rank(&resources, &bookings, request, &self.config)?;
        metrics::histogram!(RANK_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        let outcome = if suggestions.is_empty() { "empty" } else { "found" };
        metrics::counter!(SUGGESTIONS_TOTAL, "outcome" => outcome).increment(1);
        debug!(
            date = %request.date,
            duration_hours = request.duration_hours,
            resources = resources.len(),
            bookings = bookings.len(),
            returned = suggestions.len(),
            "ranked suggestions"
        );
        Ok(suggestions)
    }

    /// Check a candidate booking against committed ones.
    ///
    /// `Ok(None)` means the slot is clear. On overlap, the resolution carries
    /// the overlapping bookings and ranked alternatives on other resources.
    /// Fails closed: if bookings cannot be fetched the error is returned.
    pub async fn detect_conflicts(
        &self,
        candidate: &BookingRequest,
    ) -> Result<Option<ConflictResolution>, EngineError> {
        validate_request(candidate).map_err(rejected)?;

        let existing = self.fetch_candidate_bookings(candidate).await?;
        let conflicts = match classify(candidate, &existing) {
            ConflictState::NoConflict => {
                metrics::counter!(CONFLICT_CHECKS_TOTAL, "outcome" => "clear").increment(1);
                return Ok(None);
            }
            ConflictState::Conflicted(conflicts) => conflicts,
        };
        metrics::counter!(CONFLICT_CHECKS_TOTAL, "outcome" => "conflicted").increment(1);
        info!(
            booking = %candidate.id,
            resource = %candidate.resource_id,
            conflicts = conflicts.len(),
            "booking conflicts"
        );

        let suggestions = self.alternatives(candidate).await?;
        Ok(Some(ConflictResolution {
            booking_id: candidate.id,
            conflicts,
            suggestions,
        }))
    }

    /// Bookings on the candidate's resource for every UTC date it touches.
    async fn fetch_candidate_bookings(&self, candidate: &BookingRequest) -> Result<Vec<Booking>, EngineError> {
        let dates = dates_touched(&candidate.span).map_err(rejected)?;
        let per_date = try_join_all(
            dates
                .iter()
                .map(|&date| self.source.fetch_bookings_for_resource_on_date(candidate.resource_id, date)),
        )
        .await
        .map_err(source_failure("fetch_for_conflicts"))?;

        // Multi-day bookings come back once per date.
        let mut bookings: Vec<Booking> = per_date.into_iter().flatten().collect();
        bookings.sort_by_key(|b| (b.span.start, b.id));
        bookings.dedup_by_key(|b| b.id);
        Ok(bookings)
    }

    /// Ranked suggestions for the candidate's date and (rounded-up) duration,
    /// minus the candidate's own resource.
    async fn alternatives(&self, candidate: &BookingRequest) -> Result<Vec<Suggestion>, EngineError> {
        let hours = ceil_hours(&candidate.span);
        if hours > self.config.hours.len_hours() {
            return Ok(Vec::new());
        }
        let Some(date) = date_of(candidate.span.start) else {
            return Ok(Vec::new());
        };
        let request = SuggestionRequest::new(date, hours).with_limit(self.config.suggestion_limit);
        let mut suggestions = self.generate_booking_suggestions(&request).await?;
        suggestions.retain(|s| s.resource_id != candidate.resource_id);
        Ok(suggestions)
    }
}

impl<S: DataSource + BookingSink> Engine<S> {
    /// Conflict-check, then commit. A conflict found up front returns
    /// [`BookingOutcome::Conflicted`] without writing. A conflict raised by
    /// the store itself (a concurrent writer won) is [`EngineError::Conflict`].
    pub async fn create_booking(&self, candidate: BookingRequest) -> Result<BookingOutcome, EngineError> {
        if let Some(resolution) = self.detect_conflicts(&candidate).await? {
            return Ok(BookingOutcome::Conflicted(resolution));
        }

        let booking = candidate.into_booking(now_ms());
        self.source
            .insert_booking(booking.clone())
            .await
            .map_err(source_failure("insert_booking"))?;

        metrics::counter!(BOOKINGS_CREATED_TOTAL).increment(1);
        info!(booking = %booking.id, resource = %booking.resource_id, "booking created");
        Ok(BookingOutcome::Created(booking))
    }

    pub async fn cancel_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let booking = self
            .source
            .remove_booking(id)
            .await
            .map_err(source_failure("remove_booking"))?;
        metrics::counter!(BOOKINGS_CANCELLED_TOTAL).increment(1);
        info!(booking = %id, resource = %booking.resource_id, "booking cancelled");
        Ok(booking)
    }
}

/// Every UTC date `span` touches, first to last.
fn dates_touched(span: &Span) -> Result<Vec<chrono::NaiveDate>, EngineError> {
    let out_of_range = || EngineError::InvalidInput("timestamp out of range".into());
    let first = date_of(span.start).ok_or_else(out_of_range)?;
    let last = date_of(span.end - 1).ok_or_else(out_of_range)?;
    let mut dates = vec![first];
    let mut date = first;
    while date < last {
        date = date.succ_opt().ok_or_else(out_of_range)?;
        dates.push(date);
    }
    Ok(dates)
}
