//! JSON API consumed by the booking mini-app.
//!
//! Request bodies are translated into ledger inputs here; the ledger never sees
//! missing fields or unknown keys.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

use crate::config::WorkingHours;
use crate::database::models::{Booking, BookingPatch, BookingView, NewBooking};
use crate::error::{DateError, ErrorKind, LedgerError, ValidationError};
use crate::services::ledger::SlotLedger;
use crate::services::notifier::Notifier;
use crate::utils::datetime::Clock;
use crate::utils::validation::{parse_date, parse_time, validate_required, validate_time};

/// Telegram `WebAppUser`. Telegram adds fields over time, so extra keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookingPayload {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl BookingPayload {
    pub fn into_new_booking(self, user: UserPayload) -> Result<NewBooking, ValidationError> {
        let owner_id = user.id.ok_or(ValidationError::MissingField("user.id"))?;

        Ok(NewBooking {
            owner_id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            subject: validate_required("subject", self.subject.as_deref())?,
            service: validate_required("service", self.service.as_deref())?,
            date: validate_required("date", self.date.as_deref())?,
            time: validate_required("time", self.time.as_deref())?,
            comment: self.comment.filter(|c| !c.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookRequest {
    #[serde(default)]
    pub user: UserPayload,
    #[serde(default)]
    pub booking: BookingPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRequest {
    pub user_id: i64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl UpdateRequest {
    fn into_patch(self) -> Result<(i64, BookingPatch), ValidationError> {
        let subject = match self.subject {
            Some(s) => Some(validate_required("subject", Some(&s))?),
            None => None,
        };
        let service = match self.service {
            Some(s) => Some(validate_required("service", Some(&s))?),
            None => None,
        };

        Ok((
            self.user_id,
            BookingPatch {
                date: self.date,
                time: self.time,
                subject,
                service,
                comment: self.comment,
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateTimeRequest {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub success: bool,
    pub message: String,
    pub booking: Booking,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvailableTimesResponse {
    pub valid: bool,
    pub message: String,
    pub times: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeCheckResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Storage details stay in the logs.
        let error = match kind {
            ErrorKind::Internal => "internal error".to_string(),
            _ => self.to_string(),
        };

        let retryable = self.is_retryable();

        let mut response = (
            status,
            Json(ErrorResponse {
                error,
                kind: kind.as_str().to_string(),
            }),
        )
            .into_response();
        if retryable {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

/// A body or query string that never reached a handler.
fn malformed_request(reason: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: reason,
            kind: ErrorKind::Validation.as_str().to_string(),
        }),
    )
        .into_response()
}

/// `Json` whose rejections use the API error body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(malformed_request(rejection.body_text())),
        }
    }
}

/// `Query` whose rejections use the API error body.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(malformed_request(rejection.body_text())),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub ledger: SlotLedger,
    pub notifier: Notifier,
    pub clock: Arc<dyn Clock>,
    pub hours: WorkingHours,
}

pub struct ApiService {
    pub router: Router,
}

impl ApiService {
    pub fn new(state: ApiState) -> Self {
        let router = Router::new()
            .route("/api/book", post(create_booking))
            .route("/api/bookings", get(list_bookings))
            .route("/api/bookings/:id", put(update_booking).delete(cancel_booking))
            .route("/api/available-times", get(available_times))
            .route("/api/validate-time", post(check_time))
            .with_state(state);

        Self { router }
    }
}

async fn create_booking(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<BookRequest>,
) -> Result<Json<BookingResponse>, LedgerError> {
    let new = request.booking.into_new_booking(request.user)?;
    let booking = state.ledger.reserve(new, state.clock.now()).await?;

    state.notifier.booking_created(&booking).await;

    Ok(Json(BookingResponse {
        success: true,
        message: "Booking created".to_string(),
        booking,
    }))
}

async fn list_bookings(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<OwnerQuery>,
) -> Result<Json<BookingListResponse>, LedgerError> {
    let bookings = state
        .ledger
        .list_for_owner(query.user_id, state.clock.now())
        .await?;

    Ok(Json(BookingListResponse { bookings }))
}

async fn update_booking(
    State(state): State<ApiState>,
    Path(booking_id): Path<String>,
    ApiJson(request): ApiJson<UpdateRequest>,
) -> Result<Json<BookingResponse>, LedgerError> {
    let (owner_id, patch) = request.into_patch()?;
    let booking = state
        .ledger
        .update(&booking_id, owner_id, patch, state.clock.now())
        .await?;

    state.notifier.booking_updated(&booking).await;

    Ok(Json(BookingResponse {
        success: true,
        message: "Booking updated".to_string(),
        booking,
    }))
}

async fn cancel_booking(
    State(state): State<ApiState>,
    Path(booking_id): Path<String>,
    ApiQuery(query): ApiQuery<OwnerQuery>,
) -> Result<Json<CancelResponse>, LedgerError> {
    let booking = state.ledger.cancel(&booking_id, query.user_id).await?;

    state.notifier.booking_cancelled(&booking).await;

    Ok(Json(CancelResponse {
        success: true,
        message: "Booking cancelled".to_string(),
    }))
}

async fn available_times(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Json<AvailableTimesResponse>, LedgerError> {
    let date = query
        .date
        .filter(|d| !d.trim().is_empty())
        .ok_or(ValidationError::MissingField("date"))?;

    match state
        .ledger
        .candidate_slots(&date, state.clock.now(), state.hours)
        .await
    {
        Ok(times) => Ok(Json(AvailableTimesResponse {
            valid: true,
            message: "Date is valid".to_string(),
            times,
        })),
        // Out-of-window dates are a normal answer, not a bad request.
        Err(LedgerError::Validation(ValidationError::Date(e))) if e != DateError::Malformed => {
            Ok(Json(AvailableTimesResponse {
                valid: false,
                message: e.to_string(),
                times: Vec::new(),
            }))
        }
        Err(e) => Err(e),
    }
}

async fn check_time(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<ValidateTimeRequest>,
) -> Result<Json<TimeCheckResponse>, LedgerError> {
    let invalid = |error: String| {
        Ok(Json(TimeCheckResponse {
            valid: false,
            error: Some(error),
        }))
    };

    let Some(raw_time) = request.time.filter(|t| !t.trim().is_empty()) else {
        return invalid("Enter a time".to_string());
    };

    let time = match parse_time(&raw_time) {
        Ok(time) => time,
        Err(e) => return invalid(e.to_string()),
    };

    // The date is optional here; an unusable one simply skips the date-bound checks.
    if let Some(date) = request.date.as_deref().and_then(|d| parse_date(d).ok()) {
        if let Err(e) = validate_time(&raw_time, date, state.clock.now()) {
            return invalid(e.to_string());
        }
        if state.ledger.is_occupied(date, time, None).await? {
            return invalid("This time is already booked".to_string());
        }
    }

    Ok(Json(TimeCheckResponse {
        valid: true,
        error: None,
    }))
}
