//! Entry points used by the HTTP handlers. Each write goes through the
//! ledger, then keeps reminders, the event stream and the availability cache
//! in step with the committed booking.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer};

use crate::db::ledger::{self, WorkerChange};
use crate::errors::SchedulingError;
use crate::models::booking::parse_date;
use crate::models::slot::parse_time_of_day;
use crate::models::{Booking, BookingEvent, BookingEventKind, BookingStatus, DayAvailability, NewBooking};
use crate::services::{availability, reminders, workers};
use crate::state::AppState;

const ADMIN_LIST_LIMIT: i64 = 200;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    /// Absent keeps the current worker; `null` or `""` unassigns.
    #[serde(default, deserialize_with = "present")]
    pub worker_id: Option<Option<String>>,
    #[serde(default)]
    pub worker_name: Option<String>,
}

/// Tells an explicit `null` apart from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl RescheduleRequest {
    fn target(&self) -> Result<(NaiveDate, NaiveTime), SchedulingError> {
        let mut problems = vec![];

        let date = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            None => {
                problems.push("date is required".to_string());
                None
            }
            Some(d) => parse_date(d).map_err(|e| problems.push(e.to_string())).ok(),
        };
        let time = match self.time.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            None => {
                problems.push("time is required".to_string());
                None
            }
            Some(t) => parse_time_of_day(t)
                .map_err(|e| problems.push(e.to_string()))
                .ok(),
        };

        match (date, time) {
            (Some(date), Some(time)) => Ok((date, time)),
            _ => Err(SchedulingError::Validation(problems)),
        }
    }
}

/// Slot table for today and the following days. `days` defaults to the
/// configured window and is capped at the configured maximum; zero days is
/// an empty table.
pub fn get_availability(
    state: &AppState,
    days: Option<u32>,
) -> Result<Vec<DayAvailability>, SchedulingError> {
    let max = state.config.max_availability_days.max(1);
    let days = days
        .unwrap_or(state.config.default_availability_days)
        .min(max);
    if days == 0 {
        return Ok(vec![]);
    }

    let now = state.clock.now();
    let today = now.date();
    if let Some(table) = state.availability_cache.get(today, days) {
        return Ok(table);
    }

    let dates = availability::date_range(today, days);
    let table = {
        let conn = state.conn()?;
        availability::compute_availability(&conn, &dates, now, state.min_lead())?
    };
    state.availability_cache.put(today, days, &table);
    Ok(table)
}

/// Validates the request and reserves its slot. A lost race surfaces as
/// `SlotConflict`; the caller picks another slot.
pub fn book(state: &AppState, request: NewBooking) -> Result<Booking, SchedulingError> {
    let draft = request.validate().map_err(SchedulingError::Validation)?;
    let now = state.clock.now();
    let policy = state.ledger_policy();

    let booking = {
        let mut conn = state.conn()?;
        let booking = ledger::create(&mut conn, &draft, now, &policy)?;
        if let Err(e) = reminders::schedule_for(&conn, &booking, state.reminder_lead(), now) {
            tracing::warn!(error = %e, booking_id = %booking.id, "failed to queue reminder");
        }
        booking
    };

    tracing::info!(
        booking_id = %booking.id,
        user_id = %booking.user_id,
        date = %booking.date,
        time = %booking.time.format("%H:%M"),
        "booking created"
    );
    publish(state, BookingEventKind::Created, &booking);
    Ok(booking)
}

pub fn reschedule(
    state: &AppState,
    id: &str,
    request: RescheduleRequest,
) -> Result<Booking, SchedulingError> {
    let (date, time) = request.target()?;
    let now = state.clock.now();
    let policy = state.ledger_policy();

    let booking = {
        let mut conn = state.conn()?;
        let worker = match request.worker_id.as_ref().map(|w| w.as_deref().map(str::trim)) {
            None => WorkerChange::Keep,
            Some(None) | Some(Some("")) => WorkerChange::Clear,
            Some(Some(worker_id)) => WorkerChange::Assign(workers::resolve_assignment(
                &conn,
                worker_id,
                request.worker_name.as_deref(),
            )?),
        };

        let booking = ledger::reschedule(&mut conn, id, date, time, &worker, now, &policy)?;
        if let Err(e) = reminders::reschedule_for(&conn, &booking, state.reminder_lead(), now) {
            tracing::warn!(error = %e, booking_id = %booking.id, "failed to move reminder");
        }
        booking
    };

    tracing::info!(
        booking_id = %booking.id,
        date = %booking.date,
        time = %booking.time.format("%H:%M"),
        status = booking.status.as_str(),
        "booking rescheduled"
    );
    publish(state, BookingEventKind::Rescheduled, &booking);
    Ok(booking)
}

pub fn assign_worker(
    state: &AppState,
    id: &str,
    worker_id: &str,
    worker_name: Option<&str>,
) -> Result<Booking, SchedulingError> {
    let now = state.clock.now();
    let policy = state.ledger_policy();

    let booking = {
        let mut conn = state.conn()?;
        let worker = workers::resolve_assignment(&conn, worker_id, worker_name)?;
        ledger::assign_worker(&mut conn, id, &worker, now, &policy)?
    };

    tracing::info!(booking_id = %booking.id, worker_id, "worker assigned");
    publish(state, BookingEventKind::WorkerAssigned, &booking);
    Ok(booking)
}

pub fn cancel(state: &AppState, id: &str) -> Result<Booking, SchedulingError> {
    let booking = close(state, id, ledger::cancel)?;
    tracing::info!(booking_id = %booking.id, "booking cancelled");
    publish(state, BookingEventKind::Cancelled, &booking);
    Ok(booking)
}

pub fn complete(state: &AppState, id: &str) -> Result<Booking, SchedulingError> {
    let booking = close(state, id, ledger::complete)?;
    tracing::info!(booking_id = %booking.id, "booking completed");
    publish(state, BookingEventKind::Completed, &booking);
    Ok(booking)
}

pub fn get_booking(state: &AppState, id: &str) -> Result<Booking, SchedulingError> {
    let conn = state.conn()?;
    ledger::get(&conn, id)
}

pub fn bookings_for_user(state: &AppState, user_id: &str) -> Result<Vec<Booking>, SchedulingError> {
    if user_id.trim().is_empty() {
        return Err(SchedulingError::validation("user_id is required"));
    }
    let conn = state.conn()?;
    ledger::list_by_user(&conn, user_id.trim())
}

/// Admin listing, newest first. Both filters are optional.
pub fn list_bookings(
    state: &AppState,
    status: Option<&str>,
    date: Option<&str>,
) -> Result<Vec<Booking>, SchedulingError> {
    let mut problems = vec![];

    let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(s) => {
            let parsed = BookingStatus::parse(s);
            if parsed.is_none() {
                problems.push(format!("unknown status {s:?}"));
            }
            parsed
        }
    };
    let date = match date.map(str::trim).filter(|d| !d.is_empty()) {
        None => None,
        Some(d) => parse_date(d).map_err(|e| problems.push(e.to_string())).ok(),
    };
    if !problems.is_empty() {
        return Err(SchedulingError::Validation(problems));
    }

    let conn = state.conn()?;
    ledger::list_by_filter(&conn, status, date.as_ref(), ADMIN_LIST_LIMIT)
}

/// Cancel and complete both end the booking, so its queued reminder goes too.
fn close(
    state: &AppState,
    id: &str,
    transition: fn(
        &mut rusqlite::Connection,
        &str,
        chrono::NaiveDateTime,
        &ledger::LedgerPolicy,
    ) -> Result<Booking, SchedulingError>,
) -> Result<Booking, SchedulingError> {
    let now = state.clock.now();
    let policy = state.ledger_policy();

    let mut conn = state.conn()?;
    let booking = transition(&mut conn, id, now, &policy)?;
    if let Err(e) = reminders::drop_for(&conn, &booking.id) {
        tracing::warn!(error = %e, booking_id = %booking.id, "failed to drop reminder");
    }
    Ok(booking)
}

fn publish(state: &AppState, kind: BookingEventKind, booking: &Booking) {
    state.availability_cache.invalidate();
    // No subscribers is fine.
    let _ = state.events_tx.send(BookingEvent::new(kind, booking));
}
