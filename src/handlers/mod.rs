pub mod admin;
pub mod bookings;
pub mod events;
pub mod health;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;

use crate::errors::{AppError, SchedulingError};

/// Malformed or mistyped JSON bodies are reported like any other invalid
/// request.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(SchedulingError::validation(rejection.body_text()).into()),
    }
}

/// Same treatment for query strings, e.g. `?days=abc`.
pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    match query {
        Ok(Query(value)) => Ok(value),
        Err(rejection) => Err(SchedulingError::validation(rejection.body_text()).into()),
    }
}
