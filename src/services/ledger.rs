//! The slot ledger: sole authority over booking occupancy.
//!
//! Slot uniqueness is enforced by the `UNIQUE (date, time)` index on the
//! `bookings` table. The occupancy pre-check only produces a friendlier early
//! answer; the insert or update itself is the final arbiter, so two processes
//! sharing one database file still cannot double-book a slot.

use std::future::Future;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::SqlitePool;

use crate::config::WorkingHours;
use crate::database::connection::{is_unique_violation, DatabaseManager, DEFAULT_TIMEOUT};
use crate::database::models::{Booking, BookingPatch, BookingView, NewBooking};
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::utils::logging::{
    log_booking_start, log_booking_success, log_conflict, log_database_error,
    log_database_operation, log_forbidden, log_timeout, log_validation_error,
};
use crate::utils::validation::{
    format_date_key, format_time_key, parse_date, validate_date, validate_slot, validate_time,
};

const TABLE: &str = "bookings";

#[derive(Clone)]
pub struct SlotLedger {
    db: DatabaseManager,
    timeout: Duration,
}

impl SlotLedger {
    pub fn new(db: DatabaseManager) -> Self {
        Self {
            db,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db.pool
    }

    /// Runs one storage call under the configured deadline.
    async fn bounded<T, F>(&self, operation: &str, fut: F) -> LedgerResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        log_database_operation(operation, TABLE, None);
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if !is_unique_violation(&e) {
                    log_database_error(operation, TABLE, &e.to_string(), None);
                }
                Err(LedgerError::Database(e))
            }
            Err(_) => {
                log_timeout(operation, self.timeout.as_millis(), None);
                Err(LedgerError::Timeout(self.timeout))
            }
        }
    }

    pub async fn is_occupied(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        exclude_id: Option<&str>,
    ) -> LedgerResult<bool> {
        let date = format_date_key(date);
        let time = format_time_key(time);
        self.bounded(
            "is_occupied",
            Booking::slot_taken(self.pool(), &date, &time, exclude_id),
        )
        .await
    }

    /// Booked times on `date`, in `HH:MM` order.
    pub async fn occupied_times(&self, date: NaiveDate) -> LedgerResult<Vec<String>> {
        let date = format_date_key(date);
        self.bounded("occupied_times", Booking::times_on(self.pool(), &date))
            .await
    }

    /// Free hourly slots of the working day that are still bookable at `now`.
    pub async fn candidate_slots(
        &self,
        date: &str,
        now: NaiveDateTime,
        hours: WorkingHours,
    ) -> LedgerResult<Vec<String>> {
        let date = validate_date(date, now).map_err(ValidationError::from)?;
        let occupied = self.occupied_times(date).await?;

        let slots = (hours.start_hour..=hours.end_hour)
            .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
            .map(format_time_key)
            .filter(|slot| validate_time(slot, date, now).is_ok())
            .filter(|slot| !occupied.contains(slot))
            .collect();

        Ok(slots)
    }

    pub async fn reserve(&self, new: NewBooking, now: NaiveDateTime) -> LedgerResult<Booking> {
        let requested = format!("{} {}", new.date, new.time);
        log_booking_start("reserve", new.owner_id, Some(&requested));

        let (date, time) = validate_slot(&new.date, &new.time, now).map_err(|e| {
            log_validation_error("reserve", "slot", &requested, &e.to_string(), new.owner_id);
            e
        })?;

        let new = NewBooking {
            date: format_date_key(date),
            time: format_time_key(time),
            ..new
        };

        if self.is_occupied(date, time, None).await? {
            log_conflict("reserve", new.owner_id, &new.date, &new.time);
            return Err(conflict(&new.date, &new.time));
        }

        match self.bounded("reserve", Booking::insert(self.pool(), &new)).await {
            Ok(booking) => {
                log_booking_success("reserve", booking.owner_id, &booking.id, Some(&requested));
                Ok(booking)
            }
            Err(LedgerError::Database(e)) if is_unique_violation(&e) => {
                log_conflict("reserve", new.owner_id, &new.date, &new.time);
                Err(conflict(&new.date, &new.time))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update(
        &self,
        booking_id: &str,
        owner_id: i64,
        patch: BookingPatch,
        now: NaiveDateTime,
    ) -> LedgerResult<Booking> {
        log_booking_start("update", owner_id, Some(booking_id));

        let mut booking = self.owned_booking("update", booking_id, owner_id).await?;
        if patch.is_empty() {
            return Ok(booking);
        }

        // Every write re-checks the effective slot, label-only edits included.
        let raw_date = patch.date.as_deref().unwrap_or(&booking.date);
        let raw_time = patch.time.as_deref().unwrap_or(&booking.time);
        let requested = format!("{raw_date} {raw_time}");
        let (date, time) = validate_slot(raw_date, raw_time, now).map_err(|e| {
            log_validation_error("update", "slot", &requested, &e.to_string(), owner_id);
            e
        })?;
        let date_key = format_date_key(date);
        let time_key = format_time_key(time);

        // An unchanged slot is not re-checked for occupancy.
        if date_key != booking.date || time_key != booking.time {
            if self.is_occupied(date, time, Some(&booking.id)).await? {
                log_conflict("update", owner_id, &date_key, &time_key);
                return Err(conflict(&date_key, &time_key));
            }

            booking.date = date_key;
            booking.time = time_key;
        }

        if let Some(subject) = patch.subject {
            booking.subject = subject;
        }
        if let Some(service) = patch.service {
            booking.service = service;
        }
        if let Some(comment) = patch.comment {
            booking.comment = if comment.trim().is_empty() { None } else { Some(comment) };
        }

        match self.bounded("update", booking.save(self.pool())).await {
            Ok(0) => Err(LedgerError::NotFound(booking.id)),
            Ok(_) => {
                log_booking_success("update", owner_id, &booking.id, None);
                Ok(booking)
            }
            Err(LedgerError::Database(e)) if is_unique_violation(&e) => {
                log_conflict("update", owner_id, &booking.date, &booking.time);
                Err(conflict(&booking.date, &booking.time))
            }
            Err(e) => Err(e),
        }
    }

    /// Removes the booking and hands it back so the caller can notify.
    pub async fn cancel(&self, booking_id: &str, owner_id: i64) -> LedgerResult<Booking> {
        log_booking_start("cancel", owner_id, Some(booking_id));

        let booking = self.owned_booking("cancel", booking_id, owner_id).await?;

        let removed = self
            .bounded("cancel", Booking::delete(self.pool(), &booking.id, owner_id))
            .await?;
        if removed == 0 {
            return Err(LedgerError::NotFound(booking.id));
        }

        log_booking_success("cancel", owner_id, &booking.id, None);
        Ok(booking)
    }

    pub async fn list_for_owner(
        &self,
        owner_id: i64,
        now: NaiveDateTime,
    ) -> LedgerResult<Vec<BookingView>> {
        let today = now.date();
        let bookings = self
            .bounded("list_for_owner", Booking::find_by_owner(self.pool(), owner_id))
            .await?;

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let can_modify = parse_date(&booking.date).is_ok_and(|d| d >= today);
                BookingView { booking, can_modify }
            })
            .collect())
    }

    async fn owned_booking(
        &self,
        operation: &str,
        booking_id: &str,
        owner_id: i64,
    ) -> LedgerResult<Booking> {
        let booking = self
            .bounded(operation, Booking::find_by_id(self.pool(), booking_id))
            .await?
            .ok_or_else(|| LedgerError::NotFound(booking_id.to_string()))?;

        if booking.owner_id != owner_id {
            log_forbidden(operation, owner_id, booking_id);
            return Err(LedgerError::Forbidden(booking_id.to_string()));
        }

        Ok(booking)
    }
}

fn conflict(date: &str, time: &str) -> LedgerError {
    LedgerError::Conflict {
        date: date.to_string(),
        time: time.to_string(),
    }
}
