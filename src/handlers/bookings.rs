use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{json_body, query_params};
use crate::errors::AppError;
use crate::models::{Booking, DayAvailability, NewBooking, Reminder};
use crate::services::reminders;
use crate::services::scheduling::{self, RescheduleRequest};
use crate::state::AppState;

const REMINDER_LIST_LIMIT: i64 = 50;

// GET /api/availability
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub days: Option<u32>,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<Vec<DayAvailability>>, AppError> {
    let query = query_params(query)?;
    Ok(Json(scheduling::get_availability(&state, query.days)?))
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewBooking>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let request = json_body(body)?;
    let booking = scheduling::book(&state, request)?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings?user_id=
#[derive(Deserialize)]
pub struct UserBookingsQuery {
    pub user_id: Option<String>,
}

pub async fn list_user_bookings(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserBookingsQuery>, QueryRejection>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let user_id = query_params(query)?.user_id.unwrap_or_default();
    Ok(Json(scheduling::bookings_for_user(&state, &user_id)?))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(scheduling::get_booking(&state, &id)?))
}

// POST /api/bookings/:id/reschedule
#[derive(Deserialize)]
pub struct CustomerRescheduleRequest {
    pub date: Option<String>,
    pub time: Option<String>,
}

pub async fn reschedule_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<CustomerRescheduleRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let body = json_body(body)?;
    // Customers move their booking; only admins change the worker.
    let request = RescheduleRequest {
        date: body.date,
        time: body.time,
        ..Default::default()
    };
    Ok(Json(scheduling::reschedule(&state, &id, request)?))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(scheduling::cancel(&state, &id)?))
}

// GET /api/users/:user_id/reminders
pub async fn list_user_reminders(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Reminder>>, AppError> {
    let conn = state.conn()?;
    Ok(Json(reminders::list_for_user(
        &conn,
        &user_id,
        REMINDER_LIST_LIMIT,
    )?))
}
