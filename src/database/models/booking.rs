use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

const BOOKING_COLUMNS: &str =
    "id, owner_id, first_name, last_name, username, subject, service, date, time, comment, created_at";

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub owner_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub subject: String,
    pub service: String,
    pub date: String, // YYYY-MM-DD
    pub time: String, // HH:MM
    pub comment: Option<String>,
    pub created_at: String,
}

/// A booking as shown to its owner. `can_modify` is derived at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub can_modify: bool,
}

/// Fields supplied by the caller when reserving a slot.
#[derive(Debug, Clone, Default)]
pub struct NewBooking {
    pub owner_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub subject: String,
    pub service: String,
    pub date: String,
    pub time: String,
    pub comment: Option<String>,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub date: Option<String>,
    pub time: Option<String>,
    pub subject: Option<String>,
    pub service: Option<String>,
    pub comment: Option<String>,
}

impl BookingPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.time.is_none()
            && self.subject.is_none()
            && self.service.is_none()
            && self.comment.is_none()
    }
}

impl Booking {
    /// Inserts a booking. `new.date` and `new.time` must already be canonical.
    ///
    /// Fails with a unique violation if the slot is taken.
    pub async fn insert(
        pool: &sqlx::SqlitePool,
        new: &NewBooking,
    ) -> Result<Self, sqlx::Error> {
        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            owner_id: new.owner_id,
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            username: new.username.clone(),
            subject: new.subject.clone(),
            service: new.service.clone(),
            date: new.date.clone(),
            time: new.time.clone(),
            comment: new.comment.clone(),
            created_at: Utc::now().to_rfc3339(),
        };

        sqlx::query(
            r#"
            INSERT INTO bookings (id, owner_id, first_name, last_name, username, subject, service, date, time, comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&booking.id)
        .bind(booking.owner_id)
        .bind(&booking.first_name)
        .bind(&booking.last_name)
        .bind(&booking.username)
        .bind(&booking.subject)
        .bind(&booking.service)
        .bind(&booking.date)
        .bind(&booking.time)
        .bind(&booking.comment)
        .bind(&booking.created_at)
        .execute(pool)
        .await?;

        Ok(booking)
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        booking_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?");
        sqlx::query_as::<_, Booking>(&query)
            .bind(booking_id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent slot first.
    pub async fn find_by_owner(
        pool: &sqlx::SqlitePool,
        owner_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE owner_id = ? ORDER BY date DESC, time DESC"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    pub async fn slot_taken(
        pool: &sqlx::SqlitePool,
        date: &str,
        time: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let count = match exclude_id {
            Some(exclude_id) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM bookings WHERE date = ? AND time = ? AND id != ?",
                )
                .bind(date)
                .bind(time)
                .bind(exclude_id)
                .fetch_one(pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM bookings WHERE date = ? AND time = ?",
                )
                .bind(date)
                .bind(time)
                .fetch_one(pool)
                .await?
            }
        };

        Ok(count > 0)
    }

    pub async fn times_on(
        pool: &sqlx::SqlitePool,
        date: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT time FROM bookings WHERE date = ? ORDER BY time")
            .bind(date)
            .fetch_all(pool)
            .await
    }

    /// Writes every mutable field in one statement, guarded by owner.
    ///
    /// Returns the number of rows touched; zero means the booking is gone.
    pub async fn save(&self, pool: &sqlx::SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET date = ?, time = ?, subject = ?, service = ?, comment = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(&self.date)
        .bind(&self.time)
        .bind(&self.subject)
        .bind(&self.service)
        .bind(&self.comment)
        .bind(&self.id)
        .bind(self.owner_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(
        pool: &sqlx::SqlitePool,
        booking_id: &str,
        owner_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = ? AND owner_id = ?")
            .bind(booking_id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
