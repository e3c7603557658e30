//! Error types for booking validation and the slot ledger.

use std::time::Duration;
use thiserror::Error;

/// Why a candidate date was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid date format, expected YYYY-MM-DD")]
    Malformed,

    #[error("cannot book a date in the past")]
    Past,

    #[error("bookings are only available up to 30 days ahead")]
    TooFarAhead,
}

/// Why a candidate time was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimeError {
    #[error("invalid time format, expected HH:MM")]
    Malformed,

    #[error("cannot book a time that has already passed")]
    Past,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    Date(#[from] DateError),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("slot {date} {time} is already booked")]
    Conflict { date: String, time: String },

    #[error("booking not found: {0}")]
    NotFound(String),

    #[error("booking {0} belongs to another user")]
    Forbidden(String),

    #[error("storage did not respond within {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result tag handed to the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Forbidden,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::Conflict { .. } => ErrorKind::Conflict,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::Forbidden(_) => ErrorKind::Forbidden,
            LedgerError::Timeout(_) => ErrorKind::Timeout,
            LedgerError::Database(_) => ErrorKind::Internal,
        }
    }

    /// Only a timed-out storage call is safe for the caller to retry blindly.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Timeout(_))
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
