use super::*;
use crate::notify::NotifyHub;
use crate::store::InMemoryStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};

const M: Ms = 60_000; // 1 minute in ms

fn date() -> NaiveDate {
    parse_date("2024-06-10").unwrap()
}

/// Absolute timestamp `hour` hours into 2024-06-10 (UTC).
fn at(hour: i64) -> Ms {
    day_span(date()).start + hour * HOUR_MS
}

fn room_a() -> Resource {
    Resource::new(Ulid::new(), "Room A", ["WiFi", "Projector"], Some(8))
}

fn room_b() -> Resource {
    Resource::new(Ulid::new(), "Room B", ["WiFi"], Some(12))
}

fn test_engine(resources: &[Resource]) -> Engine<InMemoryStore> {
    let store = InMemoryStore::new(Arc::new(NotifyHub::new()));
    for r in resources {
        store.insert_resource(r.clone()).unwrap();
    }
    Engine::new(Arc::new(store), EngineConfig::default())
}

async fn seed_booking(engine: &Engine<InMemoryStore>, resource: &Resource, start: Ms, end: Ms) -> Booking {
    let booking = BookingRequest::new(resource.id, Span::new(start, end)).into_booking(0);
    engine.source().insert_booking(booking.clone()).await.unwrap();
    booking
}

// ── Fake data services ───────────────────────────────────

/// Every read fails.
struct DownSource;

#[async_trait]
impl DataSource for DownSource {
    async fn fetch_resources(&self) -> Result<Vec<Resource>, SourceError> {
        Err(SourceError::Unavailable("connection refused".into()))
    }

    async fn fetch_bookings_for_date(&self, _date: NaiveDate) -> Result<Vec<Booking>, SourceError> {
        Err(SourceError::Unavailable("connection refused".into()))
    }

    async fn fetch_bookings_for_resource_on_date(
        &self,
        _resource_id: Ulid,
        _date: NaiveDate,
    ) -> Result<Vec<Booking>, SourceError> {
        Err(SourceError::Unavailable("connection refused".into()))
    }
}

/// Resources load fine; bookings never do.
struct FlakyBookings {
    resources: Vec<Resource>,
    booking_calls: AtomicUsize,
}

#[async_trait]
impl DataSource for FlakyBookings {
    async fn fetch_resources(&self) -> Result<Vec<Resource>, SourceError> {
        Ok(self.resources.clone())
    }

    async fn fetch_bookings_for_date(&self, _date: NaiveDate) -> Result<Vec<Booking>, SourceError> {
        self.booking_calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Malformed("bad row".into()))
    }

    async fn fetch_bookings_for_resource_on_date(
        &self,
        _resource_id: Ulid,
        _date: NaiveDate,
    ) -> Result<Vec<Booking>, SourceError> {
        self.booking_calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Malformed("bad row".into()))
    }
}

// ── Suggestions ──────────────────────────────────────────

#[tokio::test]
async fn suggestions_for_empty_day() {
    let a = room_a();
    let engine = test_engine(std::slice::from_ref(&a));
    let request = SuggestionRequest::new(date(), 2)
        .with_capacity(8)
        .with_amenities(["WiFi", "Projector"]);

    let out = engine.generate_booking_suggestions(&request).await.unwrap();
    assert_eq!(out.len(), 5);
    let top = &out[0];
    assert_eq!(top.resource_id, a.id);
    assert_eq!((top.start, top.end), (at(9), at(11)));
    assert!((top.confidence - 1.0).abs() < 1e-9);
    assert!(top
        .reason
        .starts_with("Highly recommended, Popular morning time slot, Includes WiFi, Projector"));
}

#[tokio::test]
async fn existing_booking_removes_start_hour() {
    let a = room_a();
    let engine = test_engine(std::slice::from_ref(&a));
    seed_booking(&engine, &a, at(9), at(11)).await;

    let request = SuggestionRequest::new(date(), 2).with_limit(50);
    let out = engine.generate_booking_suggestions(&request).await.unwrap();
    assert!(out.iter().all(|s| s.start != at(9)));
    assert!(out.iter().all(|s| !Span::new(s.start, s.end).overlaps(&Span::new(at(9), at(11)))));
    assert!(out.iter().any(|s| s.start == at(11)));
}

#[tokio::test]
async fn no_resources_means_no_suggestions() {
    let engine = test_engine(&[]);
    let request = SuggestionRequest::new(date(), 1);
    assert!(engine.generate_booking_suggestions(&request).await.unwrap().is_empty());
}

#[tokio::test]
async fn longer_than_a_day_is_empty() {
    let engine = test_engine(&[room_a(), room_b()]);
    let request = SuggestionRequest::parse("2024-06-10", 25).unwrap();
    assert!(engine.generate_booking_suggestions(&request).await.unwrap().is_empty());
}

#[tokio::test]
async fn zero_duration_rejected_before_fetching() {
    let engine = Engine::new(Arc::new(DownSource), EngineConfig::default());
    let request = SuggestionRequest::new(date(), 0);
    let err = engine.generate_booking_suggestions(&request).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn suggestions_surface_fetch_failure() {
    let engine = Engine::new(Arc::new(DownSource), EngineConfig::default());
    let err = engine
        .generate_booking_suggestions(&SuggestionRequest::new(date(), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Upstream(SourceError::Unavailable(_))));
}

#[tokio::test]
async fn hour_precision_config_is_honoured() {
    let a = room_a();
    let store = InMemoryStore::new(Arc::new(NotifyHub::new()));
    store.insert_resource(a.clone()).unwrap();
    let config = EngineConfig {
        precision: OverlapPrecision::Hour,
        ..EngineConfig::default()
    };
    let engine = Engine::new(Arc::new(store), config);
    seed_booking(&engine, &a, at(10) + 30 * M, at(11) + 15 * M).await;

    let request = SuggestionRequest::new(date(), 1).with_limit(50);
    let starts: Vec<Ms> = engine
        .generate_booking_suggestions(&request)
        .await
        .unwrap()
        .iter()
        .map(|s| s.start)
        .collect();
    assert!(!starts.contains(&at(10)));
    assert!(starts.contains(&at(11)));
}

// ── Conflicts ────────────────────────────────────────────

#[tokio::test]
async fn conflict_returns_overlap_and_alternatives_elsewhere() {
    let a = room_a();
    let b = room_b();
    let engine = test_engine(&[a.clone(), b.clone()]);
    let existing = seed_booking(&engine, &a, at(9), at(11)).await;

    let candidate = BookingRequest::new(a.id, Span::new(at(10), at(12)));
    let resolution = engine.detect_conflicts(&candidate).await.unwrap().unwrap();
    assert_eq!(resolution.booking_id, candidate.id);
    assert_eq!(resolution.conflicts, vec![existing]);
    assert!(!resolution.suggestions.is_empty());
    assert!(resolution.suggestions.iter().all(|s| s.resource_id != a.id));
    assert!(resolution.suggestions.iter().all(|s| s.end - s.start == 2 * HOUR_MS));
}

#[tokio::test]
async fn clear_slot_has_no_conflict() {
    let a = room_a();
    let engine = test_engine(std::slice::from_ref(&a));
    seed_booking(&engine, &a, at(9), at(11)).await;

    let adjacent = BookingRequest::new(a.id, Span::new(at(11), at(12)));
    assert!(engine.detect_conflicts(&adjacent).await.unwrap().is_none());
}

#[tokio::test]
async fn partial_hour_candidate_rounds_alternatives_up() {
    let a = room_a();
    let b = room_b();
    let engine = test_engine(&[a.clone(), b.clone()]);
    seed_booking(&engine, &a, at(9), at(11)).await;

    let candidate = BookingRequest::new(a.id, Span::new(at(10), at(11) + 30 * M));
    let resolution = engine.detect_conflicts(&candidate).await.unwrap().unwrap();
    assert!(resolution.suggestions.iter().all(|s| s.end - s.start == 2 * HOUR_MS));
}

#[tokio::test]
async fn overnight_booking_from_previous_day_conflicts() {
    let a = room_a();
    let engine = test_engine(std::slice::from_ref(&a));
    let late = seed_booking(&engine, &a, at(-2), at(1)).await;

    let candidate = BookingRequest::new(a.id, Span::new(at(0), at(2)));
    let resolution = engine.detect_conflicts(&candidate).await.unwrap().unwrap();
    assert_eq!(resolution.conflicts, vec![late]);
}

#[tokio::test]
async fn multi_day_candidate_sees_each_booking_once() {
    let a = room_a();
    let engine = test_engine(std::slice::from_ref(&a));
    let spanning = seed_booking(&engine, &a, at(20), at(24 + 10)).await;
    let next_morning = seed_booking(&engine, &a, at(24 + 11), at(24 + 12)).await;

    let candidate = BookingRequest::new(a.id, Span::new(at(8), at(24 + 12)));
    let resolution = engine.detect_conflicts(&candidate).await.unwrap().unwrap();
    assert_eq!(resolution.conflicts, vec![spanning, next_morning]);
    // Longer than opening hours: no alternatives to offer.
    assert!(resolution.suggestions.is_empty());
}

#[tokio::test]
async fn conflict_check_fails_closed() {
    let a = room_a();
    let source = Arc::new(FlakyBookings {
        resources: vec![a.clone()],
        booking_calls: AtomicUsize::new(0),
    });
    let engine = Engine::new(source.clone(), EngineConfig::default());

    let candidate = BookingRequest::new(a.id, Span::new(at(10), at(12)));
    let err = engine.detect_conflicts(&candidate).await.unwrap_err();
    assert!(matches!(err, EngineError::Upstream(SourceError::Malformed(_))));
    assert_eq!(source.booking_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn inverted_candidate_rejected() {
    let engine = Engine::new(Arc::new(DownSource), EngineConfig::default());
    let candidate = BookingRequest {
        id: Ulid::new(),
        resource_id: Ulid::new(),
        span: Span { start: at(12), end: at(10) },
        label: None,
    };
    let err = engine.detect_conflicts(&candidate).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn unknown_resource_is_not_found() {
    let engine = test_engine(&[room_a()]);
    let ghost = Ulid::new();
    let candidate = BookingRequest::new(ghost, Span::new(at(10), at(11)));
    let err = engine.detect_conflicts(&candidate).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(id) if id == ghost));
}

// ── Booking lifecycle ────────────────────────────────────

#[tokio::test]
async fn create_then_conflict_then_cancel() {
    let a = room_a();
    let b = room_b();
    let engine = test_engine(&[a.clone(), b.clone()]);

    let first = BookingRequest::new(a.id, Span::new(at(9), at(11))).with_label("standup");
    let created = match engine.create_booking(first.clone()).await.unwrap() {
        BookingOutcome::Created(booking) => booking,
        other => panic!("expected Created, got {other:?}"),
    };
    assert_eq!(created.id, first.id);
    assert_eq!(created.label.as_deref(), Some("standup"));
    assert!(created.created_at > 0);

    let second = BookingRequest::new(a.id, Span::new(at(10), at(12)));
    match engine.create_booking(second.clone()).await.unwrap() {
        BookingOutcome::Conflicted(resolution) => {
            assert_eq!(resolution.conflicts[0].id, first.id);
            assert!(resolution.suggestions.iter().all(|s| s.resource_id == b.id));
        }
        other => panic!("expected Conflicted, got {other:?}"),
    }
    assert_eq!(engine.source().list_bookings(&a.id).len(), 1);

    let cancelled = engine.cancel_booking(first.id).await.unwrap();
    assert_eq!(cancelled.id, first.id);
    assert!(matches!(
        engine.create_booking(second).await.unwrap(),
        BookingOutcome::Created(_)
    ));
}

#[tokio::test]
async fn cancel_unknown_booking_is_not_found() {
    let engine = test_engine(&[room_a()]);
    let id = Ulid::new();
    assert!(matches!(
        engine.cancel_booking(id).await.unwrap_err(),
        EngineError::NotFound(x) if x == id
    ));
}

#[tokio::test]
async fn concurrent_creates_never_double_book() {
    let a = room_a();
    let engine = test_engine(std::slice::from_ref(&a));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        let rid = a.id;
        handles.push(tokio::spawn(async move {
            engine
                .create_booking(BookingRequest::new(rid, Span::new(at(9), at(10))))
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(BookingOutcome::Created(_)) => created += 1,
            Ok(BookingOutcome::Conflicted(_)) | Err(EngineError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(engine.source().list_bookings(&a.id).len(), 1);
}

#[tokio::test]
async fn created_booking_is_broadcast() {
    let a = room_a();
    let engine = test_engine(std::slice::from_ref(&a));
    let mut rx = engine.source().notify().subscribe(a.id);

    let request = BookingRequest::new(a.id, Span::new(at(14), at(15)));
    engine.create_booking(request.clone()).await.unwrap();

    assert_eq!(
        rx.recv().await.unwrap(),
        Event::BookingCreated {
            id: request.id,
            resource_id: a.id,
            span: request.span,
        }
    );
}

#[test]
fn dates_touched_covers_overnight_spans() {
    let one_day = dates_touched(&Span::new(at(9), at(24))).unwrap();
    assert_eq!(one_day, vec![date()]);
    let two_days = dates_touched(&Span::new(at(23), at(25))).unwrap();
    assert_eq!(two_days, vec![date(), date().succ_opt().unwrap()]);
}
