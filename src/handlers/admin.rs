use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;

use super::{json_body, query_params};
use crate::errors::{AppError, SchedulingError};
use crate::models::booking::parse_date;
use crate::models::{BlockedDay, Booking, MasterSlot, Worker};
use crate::services::reminders::{self, DispatchSummary};
use crate::services::scheduling::{self, RescheduleRequest};
use crate::services::{blackout, catalog, workers};
use crate::state::AppState;

/// Default window for listing blocked days when no range is given.
const BLOCKED_DAYS_HORIZON: i64 = 365;

pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn date_param(raw: &str) -> Result<NaiveDate, AppError> {
    parse_date(raw.trim()).map_err(|e| SchedulingError::validation(e.to_string()).into())
}

// ── Bookings ──

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub date: Option<String>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<BookingsQuery>, QueryRejection>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let query = query_params(query)?;
    let bookings =
        scheduling::list_bookings(&state, query.status.as_deref(), query.date.as_deref())?;
    Ok(Json(bookings))
}

// POST /api/bookings/:id/assign-worker
#[derive(Deserialize)]
pub struct AssignWorkerRequest {
    pub worker_id: Option<String>,
    pub worker_name: Option<String>,
}

pub async fn assign_worker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<AssignWorkerRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let body = json_body(body)?;
    let worker_id = body.worker_id.unwrap_or_default();
    let booking =
        scheduling::assign_worker(&state, &id, &worker_id, body.worker_name.as_deref())?;
    Ok(Json(booking))
}

// POST /api/admin/bookings/:id/reschedule
pub async fn reschedule_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<RescheduleRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let request = json_body(body)?;
    Ok(Json(scheduling::reschedule(&state, &id, request)?))
}

// POST /api/admin/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(scheduling::complete(&state, &id)?))
}

// ── Slots ──

// GET /api/admin/slots
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<MasterSlot>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let conn = state.conn()?;
    Ok(Json(catalog::list_all_slots(&conn)?))
}

// POST /api/admin/slots
#[derive(Deserialize)]
pub struct NewSlotRequest {
    #[serde(alias = "time_of_day")]
    pub time: Option<String>,
}

pub async fn add_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<NewSlotRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MasterSlot>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let body = json_body(body)?;
    let time = body
        .time
        .ok_or_else(|| SchedulingError::validation("time is required"))?;

    let slot = {
        let conn = state.conn()?;
        catalog::add_slot(&conn, &time)?
    };
    state.availability_cache.invalidate();
    Ok((StatusCode::CREATED, Json(slot)))
}

// POST /api/admin/slots/:id/active
#[derive(Deserialize)]
pub struct SlotActiveRequest {
    pub active: bool,
}

pub async fn set_slot_active(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<SlotActiveRequest>, JsonRejection>,
) -> Result<Json<MasterSlot>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let body = json_body(body)?;

    let slot = {
        let conn = state.conn()?;
        catalog::set_active(&conn, &id, body.active)?
    };
    state.availability_cache.invalidate();
    Ok(Json(slot))
}

// DELETE /api/admin/slots/:id
pub async fn remove_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    {
        let conn = state.conn()?;
        catalog::remove_slot(&conn, &id)?;
    }
    state.availability_cache.invalidate();
    Ok(StatusCode::NO_CONTENT)
}

// ── Blocked days ──

// GET /api/admin/blocked-days?from=&to=
#[derive(Deserialize)]
pub struct BlockedDaysQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn list_blocked_days(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<BlockedDaysQuery>, QueryRejection>,
) -> Result<Json<Vec<BlockedDay>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let query = query_params(query)?;

    let from = match query.from.as_deref() {
        Some(raw) => date_param(raw)?,
        None => state.clock.today(),
    };
    let to = match query.to.as_deref() {
        Some(raw) => date_param(raw)?,
        None => from + Duration::days(BLOCKED_DAYS_HORIZON),
    };

    let conn = state.conn()?;
    Ok(Json(blackout::list_blocked(&conn, &from, &to)?))
}

// POST /api/admin/blocked-days
#[derive(Deserialize)]
pub struct BlockDayRequest {
    pub date: Option<String>,
    pub reason: Option<String>,
}

pub async fn block_day(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<BlockDayRequest>, JsonRejection>,
) -> Result<Json<BlockedDay>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let body = json_body(body)?;
    let date = match body.date.as_deref() {
        Some(raw) => date_param(raw)?,
        None => return Err(SchedulingError::validation("date is required").into()),
    };

    let day = {
        let conn = state.conn()?;
        blackout::block(&conn, date, body.reason.as_deref(), state.clock.today())?
    };
    state.availability_cache.invalidate();
    Ok(Json(day))
}

// DELETE /api/admin/blocked-days/:date
pub async fn unblock_day(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(date): Path<String>,
) -> Result<StatusCode, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let date = date_param(&date)?;
    {
        let conn = state.conn()?;
        blackout::unblock(&conn, date)?;
    }
    state.availability_cache.invalidate();
    Ok(StatusCode::NO_CONTENT)
}

// ── Workers ──

// GET /api/admin/workers
pub async fn list_workers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Worker>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let conn = state.conn()?;
    Ok(Json(workers::list_workers(&conn)?))
}

// POST /api/admin/workers
#[derive(Deserialize)]
pub struct NewWorkerRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

pub async fn add_worker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<NewWorkerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Worker>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let body = json_body(body)?;
    let conn = state.conn()?;
    let worker = workers::add_worker(&conn, &body.name, &body.phone)?;
    Ok((StatusCode::CREATED, Json(worker)))
}

// ── Reminders ──

// POST /api/admin/reminders/dispatch
pub async fn dispatch_reminders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DispatchSummary>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let summary =
        reminders::dispatch_due(&state.db, state.push.as_ref(), state.clock.now()).await?;
    Ok(Json(summary))
}
