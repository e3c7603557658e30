use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tutor_booking_bot::config::WorkingHours;
use tutor_booking_bot::database::connection::DatabaseManager;
use tutor_booking_bot::database::models::{Booking, BookingPatch, NewBooking};
use tutor_booking_bot::error::{DateError, LedgerError, TimeError, ValidationError};
use tutor_booking_bot::services::ledger::SlotLedger;

async fn setup_ledger() -> Result<(SlotLedger, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((SlotLedger::new(db_manager), temp_dir))
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap()
}

fn day(offset: i64) -> NaiveDate {
    now().date() + Duration::days(offset)
}

fn date_key(offset: i64) -> String {
    day(offset).format("%Y-%m-%d").to_string()
}

fn hm(time: &str) -> NaiveTime {
    NaiveTime::parse_from_str(time, "%H:%M").unwrap()
}

fn request(owner_id: i64, date: &str, time: &str) -> NewBooking {
    NewBooking {
        owner_id,
        first_name: Some("Test".to_string()),
        last_name: None,
        username: Some("tester".to_string()),
        subject: "Math".to_string(),
        service: "Tutoring".to_string(),
        date: date.to_string(),
        time: time.to_string(),
        comment: Some("first lesson".to_string()),
    }
}

#[tokio::test]
async fn test_booking_scenario() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let tomorrow = date_key(1);

    let booking = ledger
        .reserve(
            NewBooking {
                comment: None,
                ..request(42, &tomorrow, "14:00")
            },
            now(),
        )
        .await?;
    assert_eq!(booking.owner_id, 42);
    assert!(!booking.id.is_empty());

    let second = ledger.reserve(request(99, &tomorrow, "14:00"), now()).await;
    assert!(matches!(second, Err(LedgerError::Conflict { .. })));

    let patch = BookingPatch {
        time: Some("15:00".to_string()),
        ..BookingPatch::default()
    };
    let moved = ledger.update(&booking.id, 42, patch, now()).await?;
    assert_eq!(moved.id, booking.id);
    assert_eq!(moved.time, "15:00");

    assert!(!ledger.is_occupied(day(1), hm("14:00"), None).await?);
    assert!(ledger.is_occupied(day(1), hm("15:00"), None).await?);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_reserves_yield_exactly_one_booking() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let ledger = Arc::new(ledger);
    let date = date_key(2);

    let mut tasks = Vec::new();
    for owner_id in 0..12 {
        let ledger = ledger.clone();
        let new = request(owner_id, &date, "11:00");
        tasks.push(tokio::spawn(async move { ledger.reserve(new, now()).await }));
    }

    let mut booked = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => booked += 1,
            Err(LedgerError::Conflict { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(booked, 1);
    assert_eq!(conflicts, 11);
    assert!(ledger.is_occupied(day(2), hm("11:00"), None).await?);

    let rows = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bookings WHERE date = ? AND time = ?",
    )
    .bind(&date)
    .bind("11:00")
    .fetch_one(ledger.pool())
    .await?;
    assert_eq!(rows, 1);

    Ok(())
}

#[tokio::test]
async fn test_unique_index_is_final_authority() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let date = date_key(3);

    ledger.reserve(request(1, &date, "12:00"), now()).await?;

    // A writer that skips the ledger's pre-check still cannot double-book
    let raw = request(2, &date, "12:00");
    let err = Booking::insert(ledger.pool(), &raw).await.unwrap_err();
    assert!(tutor_booking_bot::database::connection::is_unique_violation(&err));

    Ok(())
}

#[tokio::test]
async fn test_slot_is_stored_in_canonical_form() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let date = date_key(1);

    let booking = ledger.reserve(request(1, &date, "9:00"), now()).await?;
    assert_eq!(booking.time, "09:00");

    let clash = ledger.reserve(request(2, &date, "09:00"), now()).await;
    assert!(matches!(clash, Err(LedgerError::Conflict { .. })));

    Ok(())
}

#[tokio::test]
async fn test_reserve_rejects_invalid_slots_without_writing() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;

    let cases = [
        (date_key(-1), "12:00", ValidationError::Date(DateError::Past)),
        (date_key(31), "12:00", ValidationError::Date(DateError::TooFarAhead)),
        ("2024-3-x".to_string(), "12:00", ValidationError::Date(DateError::Malformed)),
        (date_key(0), "10:30", ValidationError::Time(TimeError::Past)),
        (date_key(1), "25:00", ValidationError::Time(TimeError::Malformed)),
    ];

    for (date, time, expected) in cases {
        match ledger.reserve(request(1, &date, time), now()).await {
            Err(LedgerError::Validation(e)) => assert_eq!(e, expected, "{date} {time}"),
            other => panic!("expected validation error for {date} {time}, got {other:?}"),
        }
    }

    assert!(ledger.list_for_owner(1, now()).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_update_of_comment_never_conflicts_with_itself() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let booking = ledger.reserve(request(7, &date_key(1), "16:00"), now()).await?;

    let patch = BookingPatch {
        comment: Some("bring the workbook".to_string()),
        ..BookingPatch::default()
    };
    let updated = ledger.update(&booking.id, 7, patch, now()).await?;
    assert_eq!(updated.comment.as_deref(), Some("bring the workbook"));

    // Restating the same slot is not a conflict either
    let patch = BookingPatch {
        date: Some(booking.date.clone()),
        time: Some(booking.time.clone()),
        ..BookingPatch::default()
    };
    let same = ledger.update(&booking.id, 7, patch, now()).await?;
    assert_eq!(same.time, "16:00");

    Ok(())
}

#[tokio::test]
async fn test_empty_update_leaves_booking_untouched() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let booking = ledger.reserve(request(8, &date_key(1), "10:00"), now()).await?;

    // Even once the slot is in the past
    let later = now() + Duration::days(3);
    let same = ledger.update(&booking.id, 8, BookingPatch::default(), later).await?;
    assert_eq!(same, booking);

    Ok(())
}

#[tokio::test]
async fn test_update_into_taken_slot_is_all_or_nothing() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let date = date_key(4);

    ledger.reserve(request(1, &date, "10:00"), now()).await?;
    let mine = ledger.reserve(request(2, &date, "11:00"), now()).await?;

    let patch = BookingPatch {
        time: Some("10:00".to_string()),
        subject: Some("Physics".to_string()),
        ..BookingPatch::default()
    };
    let result = ledger.update(&mine.id, 2, patch, now()).await;
    assert!(matches!(result, Err(LedgerError::Conflict { .. })));

    let stored = ledger.list_for_owner(2, now()).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].booking.time, "11:00");
    assert_eq!(stored[0].booking.subject, "Math");

    Ok(())
}

#[tokio::test]
async fn test_update_revalidates_moved_slot() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let booking = ledger.reserve(request(5, &date_key(1), "12:00"), now()).await?;

    // 09:00 today is already past at 10:30
    let patch = BookingPatch {
        date: Some(date_key(0)),
        time: Some("09:00".to_string()),
        ..BookingPatch::default()
    };
    let result = ledger.update(&booking.id, 5, patch, now()).await;
    assert!(matches!(
        result,
        Err(LedgerError::Validation(ValidationError::Time(TimeError::Past)))
    ));

    let patch = BookingPatch {
        date: Some(date_key(45)),
        ..BookingPatch::default()
    };
    let result = ledger.update(&booking.id, 5, patch, now()).await;
    assert!(matches!(
        result,
        Err(LedgerError::Validation(ValidationError::Date(DateError::TooFarAhead)))
    ));

    Ok(())
}

#[tokio::test]
async fn test_past_booking_cannot_be_edited() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let booking = ledger.reserve(request(9, &date_key(1), "10:00"), now()).await?;

    let later = now() + Duration::days(3);
    let listed = ledger.list_for_owner(9, later).await?;
    assert!(!listed[0].can_modify);

    let patch = BookingPatch {
        comment: Some("edited".to_string()),
        ..BookingPatch::default()
    };
    let result = ledger.update(&booking.id, 9, patch, later).await;
    assert!(matches!(
        result,
        Err(LedgerError::Validation(ValidationError::Date(DateError::Past)))
    ));

    let stored = ledger.list_for_owner(9, later).await?;
    assert_eq!(stored[0].booking.comment.as_deref(), Some("first lesson"));

    // Same day, but the hour has already gone
    let same_day = now() + Duration::days(1) + Duration::hours(1);
    let patch = BookingPatch {
        subject: Some("Physics".to_string()),
        ..BookingPatch::default()
    };
    let result = ledger.update(&booking.id, 9, patch, same_day).await;
    assert!(matches!(
        result,
        Err(LedgerError::Validation(ValidationError::Time(TimeError::Past)))
    ));

    Ok(())
}

#[tokio::test]
async fn test_locked_storage_times_out_as_retryable() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;

    let mut lock = ledger.pool().acquire().await?;
    sqlx::query("BEGIN EXCLUSIVE").execute(&mut *lock).await?;

    let impatient = ledger
        .clone()
        .with_timeout(std::time::Duration::from_millis(200));
    let result = impatient.reserve(request(60, &date_key(1), "10:00"), now()).await;

    match result {
        Err(e @ LedgerError::Timeout(_)) => assert!(e.is_retryable()),
        other => panic!("expected timeout, got {other:?}"),
    }

    sqlx::query("ROLLBACK").execute(&mut *lock).await?;
    drop(lock);

    assert!(!ledger.is_occupied(day(1), hm("10:00"), None).await?);

    Ok(())
}

#[tokio::test]
async fn test_ownership_isolation() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let booking = ledger.reserve(request(10, &date_key(1), "13:00"), now()).await?;

    let cancel = ledger.cancel(&booking.id, 11).await;
    assert!(matches!(cancel, Err(LedgerError::Forbidden(_))));

    let patch = BookingPatch {
        comment: Some("hijacked".to_string()),
        ..BookingPatch::default()
    };
    let update = ledger.update(&booking.id, 11, patch, now()).await;
    assert!(matches!(update, Err(LedgerError::Forbidden(_))));

    let still_there = ledger.list_for_owner(10, now()).await?;
    assert_eq!(still_there.len(), 1);
    assert_eq!(still_there[0].booking, booking);

    Ok(())
}

#[tokio::test]
async fn test_unknown_booking_is_not_found() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;

    assert!(matches!(
        ledger.cancel("missing", 1).await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(
        ledger.update("missing", 1, BookingPatch::default(), now()).await,
        Err(LedgerError::NotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_round_trip_and_cancel() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let booking = ledger.reserve(request(20, &date_key(5), "17:00"), now()).await?;

    let listed = ledger.list_for_owner(20, now()).await?;
    assert_eq!(listed.len(), 1);
    let entry = &listed[0].booking;
    assert_eq!(entry.id, booking.id);
    assert_eq!(entry.date, date_key(5));
    assert_eq!(entry.time, "17:00");
    assert_eq!(entry.subject, "Math");
    assert_eq!(entry.service, "Tutoring");
    assert_eq!(entry.comment.as_deref(), Some("first lesson"));

    let removed = ledger.cancel(&booking.id, 20).await?;
    assert_eq!(removed.id, booking.id);

    let listed = ledger.list_for_owner(20, now()).await?;
    assert!(listed.iter().all(|v| v.booking.id != booking.id));
    assert!(!ledger.is_occupied(day(5), hm("17:00"), None).await?);

    // The freed slot can be booked again
    ledger.reserve(request(21, &date_key(5), "17:00"), now()).await?;

    Ok(())
}

#[tokio::test]
async fn test_list_order_and_can_modify() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;

    ledger.reserve(request(30, &date_key(1), "09:00"), now()).await?;
    ledger.reserve(request(30, &date_key(3), "08:00"), now()).await?;
    ledger.reserve(request(30, &date_key(3), "18:00"), now()).await?;
    ledger.reserve(request(31, &date_key(2), "09:00"), now()).await?;

    let listed = ledger.list_for_owner(30, now()).await?;
    let slots: Vec<(String, String)> = listed
        .iter()
        .map(|v| (v.booking.date.clone(), v.booking.time.clone()))
        .collect();
    assert_eq!(
        slots,
        vec![
            (date_key(3), "18:00".to_string()),
            (date_key(3), "08:00".to_string()),
            (date_key(1), "09:00".to_string()),
        ]
    );
    assert!(listed.iter().all(|v| v.can_modify));

    // Two days later the first booking is in the past
    let later = now() + Duration::days(2);
    let listed = ledger.list_for_owner(30, later).await?;
    let past: Vec<_> = listed.iter().filter(|v| !v.can_modify).collect();
    assert_eq!(past.len(), 1);
    assert_eq!(past[0].booking.date, date_key(1));

    Ok(())
}

#[tokio::test]
async fn test_is_occupied_excludes_given_booking() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let booking = ledger.reserve(request(40, &date_key(1), "10:00"), now()).await?;

    assert!(ledger.is_occupied(day(1), hm("10:00"), None).await?);
    assert!(!ledger.is_occupied(day(1), hm("10:00"), Some(&booking.id)).await?);
    assert!(!ledger.is_occupied(day(1), hm("11:00"), None).await?);

    Ok(())
}

#[tokio::test]
async fn test_candidate_slots_skip_past_and_occupied() -> Result<()> {
    let (ledger, _temp_dir) = setup_ledger().await?;
    let hours = WorkingHours::default();

    ledger.reserve(request(50, &date_key(0), "12:00"), now()).await?;
    ledger.reserve(request(51, &date_key(1), "09:00"), now()).await?;

    // now() is 10:30, so 09:00 and 10:00 are gone today
    let today = ledger.candidate_slots(&date_key(0), now(), hours).await?;
    assert_eq!(
        today,
        vec!["11:00", "13:00", "14:00", "15:00", "16:00", "17:00", "18:00"]
    );

    let tomorrow = ledger.candidate_slots(&date_key(1), now(), hours).await?;
    assert_eq!(tomorrow.len(), 9);
    assert!(!tomorrow.contains(&"09:00".to_string()));

    let out_of_window = ledger.candidate_slots(&date_key(40), now(), hours).await;
    assert!(matches!(
        out_of_window,
        Err(LedgerError::Validation(ValidationError::Date(DateError::TooFarAhead)))
    ));

    assert_eq!(ledger.occupied_times(day(0)).await?, vec!["12:00"]);

    Ok(())
}
