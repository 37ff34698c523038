use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::*;

/// Daily opening hours, `[open, close)` in whole hours (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHours {
    pub open: u32,
    pub close: u32,
}

impl Default for OperatingHours {
    fn default() -> Self {
        Self { open: 8, close: 20 }
    }
}

impl OperatingHours {
    pub fn len_hours(&self) -> u32 {
        self.close.saturating_sub(self.open)
    }

    pub fn is_valid(&self) -> bool {
        self.open < self.close && self.close <= 24
    }
}

/// How booking times are compared against candidate windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPrecision {
    /// Truncate booking times to the hour (minutes ignored), bookings matched
    /// by start date only.
    Hour,
    /// Compare full millisecond timestamps.
    #[default]
    Exact,
}

// ── Free window algorithm ────────────────────────────────────────

/// Every free `duration_hours` window on `resource` for `date`, one per start
/// hour, ascending.
///
/// Start hours run from `hours.open` through `hours.close - duration_hours`
/// inclusive. A duration longer than the opening hours yields nothing.
pub fn compute_free_windows(
    resource: &Resource,
    date: NaiveDate,
    duration_hours: u32,
    bookings: &[Booking],
    hours: OperatingHours,
    precision: OverlapPrecision,
) -> Vec<TimeWindow> {
    if duration_hours == 0 || duration_hours > hours.len_hours() {
        return Vec::new();
    }
    let day = day_span(date);
    let own = bookings.iter().filter(|b| b.resource_id == resource.id);

    let taken: Box<dyn Fn(u32, &Span) -> bool> = match precision {
        OverlapPrecision::Exact => {
            let busy: Vec<Span> = own.filter(|b| b.span.overlaps(&day)).map(|b| b.span).collect();
            Box::new(move |_: u32, window: &Span| busy.iter().any(|b| b.overlaps(window)))
        }
        OverlapPrecision::Hour => {
            let busy: Vec<(u32, u32)> = own
                .filter(|b| date_of(b.span.start) == Some(date))
                .map(|b| truncated_hours(&b.span, &day))
                .collect();
            Box::new(move |h: u32, _: &Span| {
                let end = h + duration_hours;
                busy.iter().any(|&(s, e)| h < e && s < end)
            })
        }
    };

    (hours.open..=hours.close - duration_hours)
        .filter_map(|h| {
            let span = Span::new(
                day.start + h as Ms * HOUR_MS,
                day.start + (h + duration_hours) as Ms * HOUR_MS,
            );
            (!taken(h, &span)).then_some(TimeWindow {
                resource_id: resource.id,
                span,
                hour: h,
            })
        })
        .collect()
}

/// `[start_hour, end_hour)` of a booking starting on `day`. Bookings running
/// past midnight end at hour 24.
fn truncated_hours(span: &Span, day: &Span) -> (u32, u32) {
    let start = hour_of_day(span.start);
    let end = if span.end >= day.end {
        24
    } else {
        hour_of_day(span.end)
    };
    (start, end)
}
