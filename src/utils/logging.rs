use tracing::{debug, error, info, warn};

/// Logs the start of a ledger operation with consistent format
pub fn log_booking_start(operation: &str, owner_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!("BOOKING_START: {} by user {} - {}", operation, owner_id, d),
        None => info!("BOOKING_START: {} by user {}", operation, owner_id),
    }
}

/// Logs ledger operation completion with consistent format
pub fn log_booking_success(operation: &str, owner_id: i64, booking_id: &str, details: Option<&str>) {
    match details {
        Some(d) => info!(
            "BOOKING_SUCCESS: {} of {} by user {} - {}",
            operation, booking_id, owner_id, d
        ),
        None => info!("BOOKING_SUCCESS: {} of {} by user {}", operation, booking_id, owner_id),
    }
}

/// Logs a lost slot race
pub fn log_conflict(operation: &str, owner_id: i64, date: &str, time: &str) {
    warn!(
        "CONFLICT: {} by user {} - slot {} {} already taken",
        operation, owner_id, date, time
    );
}

/// Logs an ownership mismatch
pub fn log_forbidden(operation: &str, owner_id: i64, booking_id: &str) {
    warn!(
        "FORBIDDEN: {} of {} attempted by user {}",
        operation, booking_id, owner_id
    );
}

/// Logs validation errors with consistent format
pub fn log_validation_error(operation: &str, field: &str, value: &str, error: &str, owner_id: i64) {
    warn!(
        "VALIDATION_ERROR: {} - field {} '{}' invalid: {} - user {}",
        operation, field, value, error, owner_id
    );
}

/// Logs database operations with consistent format
pub fn log_database_operation(operation: &str, table: &str, details: Option<&str>) {
    match details {
        Some(d) => debug!("DB_OP: {} on {} - {}", operation, table, d),
        None => debug!("DB_OP: {} on {}", operation, table),
    }
}

/// Logs database errors with consistent format
pub fn log_database_error(operation: &str, table: &str, error: &str, details: Option<&str>) {
    match details {
        Some(d) => error!("DB_ERROR: {} on {} failed: {} - {}", operation, table, error, d),
        None => error!("DB_ERROR: {} on {} failed: {}", operation, table, error),
    }
}

/// Logs timeout events with consistent format
pub fn log_timeout(operation: &str, duration_ms: u128, details: Option<&str>) {
    match details {
        Some(d) => warn!("TIMEOUT: {} after {}ms - {}", operation, duration_ms, d),
        None => warn!("TIMEOUT: {} after {}ms", operation, duration_ms),
    }
}

/// Logs system events with consistent format
pub fn log_system_event(event: &str, details: Option<&str>) {
    match details {
        Some(d) => info!("SYSTEM: {} - {}", event, d),
        None => info!("SYSTEM: {}", event),
    }
}
