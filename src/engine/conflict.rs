use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

/// Outcome of checking a candidate against committed bookings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictState {
    NoConflict,
    /// Overlapping bookings, in input order. The caller offers alternatives;
    /// nothing is rebooked automatically.
    Conflicted(Vec<Booking>),
}

pub(crate) fn validate_request(candidate: &BookingRequest) -> Result<(), EngineError> {
    if candidate.span.start >= candidate.span.end {
        return Err(EngineError::InvalidInput(format!(
            "booking start {} is not before end {}",
            candidate.span.start, candidate.span.end
        )));
    }
    if candidate.span.duration_ms() > MAX_BOOKING_DURATION_MS {
        return Err(EngineError::LimitExceeded("booking too long"));
    }
    if let Some(ref label) = candidate.label
        && label.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("booking label too long"));
        }
    Ok(())
}

/// Committed bookings that overlap `candidate` on the same resource, at
/// full timestamp precision. A booking carrying the candidate's own id is
/// skipped so re-saving an unchanged booking does not collide with itself.
pub fn detect_conflicts(candidate: &BookingRequest, bookings: &[Booking]) -> Vec<Booking> {
    bookings
        .iter()
        .filter(|b| {
            b.resource_id == candidate.resource_id
                && b.id != candidate.id
                && b.span.overlaps(&candidate.span)
        })
        .cloned()
        .collect()
}

pub fn classify(candidate: &BookingRequest, bookings: &[Booking]) -> ConflictState {
    let conflicts = detect_conflicts(candidate, bookings);
    if conflicts.is_empty() {
        ConflictState::NoConflict
    } else {
        ConflictState::Conflicted(conflicts)
    }
}
