use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::database::connection::DatabaseManager;
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DatabaseHealth,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connection_pool_size: u32,
    pub response_time_ms: u64,
    pub live_bookings: Option<i64>,
}

#[derive(Clone)]
struct HealthState {
    db: Arc<DatabaseManager>,
    start_time: DateTime<Utc>,
}

pub struct HealthService {
    pub router: Router,
}

impl HealthService {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        let state = HealthState {
            db,
            start_time: Utc::now(),
        };

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(liveness_check))
            .with_state(state);

        Self { router }
    }
}

async fn health_check(State(state): State<HealthState>) -> Result<Json<HealthResponse>, StatusCode> {
    let start = std::time::Instant::now();

    // Counting bookings checks connectivity and that the schema exists
    let live_bookings = count_bookings(&state.db).await.ok();
    let db_status = if live_bookings.is_some() { "healthy" } else { "unhealthy" };

    let response_time_ms = start.elapsed().as_millis() as u64;
    let uptime = Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    if db_status != "healthy" {
        tracing::warn!("Health check failed: bookings table unreachable");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(HealthResponse {
        status: db_status.to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            status: db_status.to_string(),
            connection_pool_size: state.db.pool.size(),
            response_time_ms,
            live_bookings,
        },
        uptime_seconds: uptime,
    }))
}

async fn readiness_check(State(state): State<HealthState>) -> Result<Json<&'static str>, StatusCode> {
    match count_bookings(&state.db).await {
        Ok(_) => Ok(Json("ready")),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn liveness_check() -> Json<&'static str> {
    Json("alive")
}

async fn count_bookings(db: &DatabaseManager) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings")
        .fetch_one(&db.pool)
        .await
}
