use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{NaiveDate, NaiveDateTime};

/// Expected, recoverable outcomes of scheduling operations. Every variant
/// except `Unavailable` and `Storage` is something the caller fixes by
/// picking different input or re-reading availability.
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("that time is no longer available on {date} at {time}, please pick another slot")]
    SlotConflict { date: NaiveDate, time: String },

    #[error("bookings are closed on {date}: {reason}")]
    BlockedDate { date: NaiveDate, reason: String },

    #[error("the slot {slot} has already started or is too soon to book")]
    PastSlot { slot: NaiveDateTime },

    #[error("cannot block {date}: date is in the past")]
    PastDate { date: NaiveDate },

    #[error("an active slot already exists at {time}")]
    DuplicateSlot { time: String },

    #[error("booking {id} is {status} and can no longer be changed")]
    InvalidTransition { id: String, status: &'static str },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid request: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Transient lock contention; retried inside the ledger, never surfaced as is.
    #[error("storage busy")]
    StorageConflict,

    #[error("storage unavailable, try again shortly")]
    Unavailable,

    #[error("storage error: {0}")]
    Storage(String),
}

impl SchedulingError {
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulingError::SlotConflict { .. } => "slot_conflict",
            SchedulingError::BlockedDate { .. } => "blocked_date",
            SchedulingError::PastSlot { .. } => "past_slot",
            SchedulingError::PastDate { .. } => "past_date",
            SchedulingError::DuplicateSlot { .. } => "duplicate_slot",
            SchedulingError::InvalidTransition { .. } => "invalid_transition",
            SchedulingError::NotFound(_) => "not_found",
            SchedulingError::Validation(_) => "validation",
            SchedulingError::StorageConflict => "storage_conflict",
            SchedulingError::Unavailable => "unavailable",
            SchedulingError::Storage(_) => "storage",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SchedulingError::SlotConflict { .. }
            | SchedulingError::DuplicateSlot { .. }
            | SchedulingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            SchedulingError::BlockedDate { .. }
            | SchedulingError::PastSlot { .. }
            | SchedulingError::PastDate { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SchedulingError::NotFound(_) => StatusCode::NOT_FOUND,
            SchedulingError::Validation(_) => StatusCode::BAD_REQUEST,
            SchedulingError::StorageConflict | SchedulingError::Unavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            SchedulingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        SchedulingError::Validation(vec![msg.into()])
    }
}

impl From<rusqlite::Error> for SchedulingError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                SchedulingError::StorageConflict
            }
            Some(rusqlite::ErrorCode::CannotOpen) => SchedulingError::Unavailable,
            _ => SchedulingError::Storage(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for SchedulingError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<rusqlite::Error>() {
            Ok(sqlite) => sqlite.into(),
            Err(other) => SchedulingError::Storage(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("unauthorized")]
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            AppError::Scheduling(e) => (e.status_code(), e.kind()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, kind, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string(), "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}
