//! Booking ledger: the only code that writes booking rows.
//!
//! Every mutation runs in its own `BEGIN IMMEDIATE` transaction. Slot
//! exclusivity is not decided by the pre-checks below but by the partial
//! unique index `idx_bookings_active_slot`: whichever writer commits first
//! owns `(date, time)`, and every other writer gets a constraint failure that
//! is reported as `SlotConflict`. This holds across connections and
//! processes sharing the database file.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

use super::is_unique_violation;
use super::queries::{self, fmt_date, fmt_ts};
use crate::errors::SchedulingError;
use crate::models::slot::canonical_time;
use crate::models::{AssignedWorker, Booking, BookingDraft, BookingStatus, MasterSlot};

#[derive(Debug, Clone)]
pub struct LedgerPolicy {
    pub min_lead: Duration,
    /// Attempts per operation when the store reports lock contention.
    pub retry_attempts: u32,
}

/// What a reschedule does to the assigned worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WorkerChange {
    #[default]
    Keep,
    Clear,
    Assign(AssignedWorker),
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            min_lead: Duration::minutes(120),
            retry_attempts: 3,
        }
    }
}

pub fn create(
    conn: &mut Connection,
    draft: &BookingDraft,
    now: NaiveDateTime,
    policy: &LedgerPolicy,
) -> Result<Booking, SchedulingError> {
    with_retry(policy.retry_attempts, || create_once(conn, draft, now, policy))
}

pub fn reschedule(
    conn: &mut Connection,
    id: &str,
    date: NaiveDate,
    time: NaiveTime,
    worker: &WorkerChange,
    now: NaiveDateTime,
    policy: &LedgerPolicy,
) -> Result<Booking, SchedulingError> {
    with_retry(policy.retry_attempts, || {
        reschedule_once(conn, id, date, time, worker, now, policy)
    })
}

/// Worker assignment never re-checks slot availability.
pub fn assign_worker(
    conn: &mut Connection,
    id: &str,
    worker: &AssignedWorker,
    now: NaiveDateTime,
    policy: &LedgerPolicy,
) -> Result<Booking, SchedulingError> {
    with_retry(policy.retry_attempts, || {
        transition_once(conn, id, now, |booking| {
            booking.assigned_worker = Some(worker.clone());
            booking.status = booking.status.after_assignment();
        })
    })
}

pub fn cancel(
    conn: &mut Connection,
    id: &str,
    now: NaiveDateTime,
    policy: &LedgerPolicy,
) -> Result<Booking, SchedulingError> {
    with_retry(policy.retry_attempts, || {
        transition_once(conn, id, now, |booking| {
            booking.status = BookingStatus::Cancelled;
        })
    })
}

pub fn complete(
    conn: &mut Connection,
    id: &str,
    now: NaiveDateTime,
    policy: &LedgerPolicy,
) -> Result<Booking, SchedulingError> {
    with_retry(policy.retry_attempts, || {
        transition_once(conn, id, now, |booking| {
            booking.status = BookingStatus::Completed;
        })
    })
}

pub fn get(conn: &Connection, id: &str) -> Result<Booking, SchedulingError> {
    queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| SchedulingError::NotFound(format!("booking {id}")))
}

pub fn list_by_user(conn: &Connection, user_id: &str) -> Result<Vec<Booking>, SchedulingError> {
    Ok(queries::get_bookings_for_user(conn, user_id)?)
}

pub fn list_by_filter(
    conn: &Connection,
    status: Option<BookingStatus>,
    date: Option<&NaiveDate>,
    limit: i64,
) -> Result<Vec<Booking>, SchedulingError> {
    Ok(queries::get_bookings_filtered(conn, status, date, limit)?)
}

fn with_retry<T>(
    attempts: u32,
    mut op: impl FnMut() -> Result<T, SchedulingError>,
) -> Result<T, SchedulingError> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match op() {
            Err(SchedulingError::StorageConflict) if attempt < attempts => {
                tracing::warn!(attempt, attempts, "storage busy, retrying ledger write");
            }
            Err(SchedulingError::StorageConflict) => {
                tracing::error!(attempts, "storage still busy, giving up");
                return Err(SchedulingError::Unavailable);
            }
            other => return other,
        }
    }
    Err(SchedulingError::Unavailable)
}

fn create_once(
    conn: &mut Connection,
    draft: &BookingDraft,
    now: NaiveDateTime,
    policy: &LedgerPolicy,
) -> Result<Booking, SchedulingError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    ensure_slot_open(&tx, draft.date, draft.time, now, policy)?;
    let slot = resolve_slot(&tx, draft.slot_id.as_deref(), draft.time)?;

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: draft.user_id.clone(),
        user_name: draft.user_name.clone(),
        user_phone: draft.user_phone.clone(),
        vehicle: draft.vehicle.clone(),
        address: draft.address.clone(),
        service: draft.service.clone(),
        add_ons: draft.add_ons.clone(),
        date: draft.date,
        slot_id: Some(slot.id),
        time: draft.time,
        total_price: draft.total_price,
        total_time: draft.total_time,
        payment: draft.payment.clone(),
        status: BookingStatus::Pending,
        assigned_worker: None,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = insert_booking(&tx, &booking) {
        return Err(slot_write_error(e, &booking));
    }
    tx.commit()?;

    Ok(booking)
}

fn reschedule_once(
    conn: &mut Connection,
    id: &str,
    date: NaiveDate,
    time: NaiveTime,
    worker: &WorkerChange,
    now: NaiveDateTime,
    policy: &LedgerPolicy,
) -> Result<Booking, SchedulingError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut booking = load_live(&tx, id)?;
    ensure_slot_open(&tx, date, time, now, policy)?;
    let slot = resolve_slot(&tx, None, time)?;

    booking.date = date;
    booking.time = time;
    booking.slot_id = Some(slot.id);
    booking.status = booking.status.after_reschedule();
    match worker {
        WorkerChange::Keep => {}
        WorkerChange::Clear => booking.assigned_worker = None,
        WorkerChange::Assign(worker) => booking.assigned_worker = Some(worker.clone()),
    }
    booking.updated_at = now;

    // A failed update leaves the row exactly as it was; the transaction rolls back on drop.
    if let Err(e) = update_booking(&tx, &booking) {
        return Err(slot_write_error(e, &booking));
    }
    tx.commit()?;

    Ok(booking)
}

fn transition_once(
    conn: &mut Connection,
    id: &str,
    now: NaiveDateTime,
    apply: impl FnOnce(&mut Booking),
) -> Result<Booking, SchedulingError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut booking = load_live(&tx, id)?;
    apply(&mut booking);
    booking.updated_at = now;

    update_booking(&tx, &booking)?;
    tx.commit()?;

    Ok(booking)
}

/// Loads a booking that may still change.
fn load_live(tx: &Transaction, id: &str) -> Result<Booking, SchedulingError> {
    let booking = get(tx, id)?;
    if booking.status.is_terminal() {
        return Err(SchedulingError::InvalidTransition {
            id: booking.id,
            status: booking.status.as_str(),
        });
    }
    Ok(booking)
}

/// Date and clock checks, evaluated inside the write transaction so a block
/// added after the customer read availability is still honoured.
fn ensure_slot_open(
    tx: &Transaction,
    date: NaiveDate,
    time: NaiveTime,
    now: NaiveDateTime,
    policy: &LedgerPolicy,
) -> Result<(), SchedulingError> {
    let slot_at = date.and_time(time);

    if date < now.date() {
        return Err(SchedulingError::PastSlot { slot: slot_at });
    }
    if let Some(day) = queries::get_blocked_day(tx, &date)? {
        return Err(SchedulingError::BlockedDate {
            date,
            reason: day.reason,
        });
    }
    if slot_at < now + policy.min_lead {
        return Err(SchedulingError::PastSlot { slot: slot_at });
    }
    Ok(())
}

/// Finds the active master slot for `time`. A caller-supplied slot id must
/// agree with the time.
fn resolve_slot(
    tx: &Transaction,
    slot_id: Option<&str>,
    time: NaiveTime,
) -> Result<MasterSlot, SchedulingError> {
    let time_str = canonical_time(&time);
    let slot = match slot_id {
        Some(id) => queries::get_slot(tx, id)?
            .filter(|s| s.active && s.time_of_day == time_str)
            .ok_or_else(|| {
                SchedulingError::validation(format!("slot {id} is not an active slot at {time_str}"))
            })?,
        None => queries::find_active_slot_at(tx, &time_str)?.ok_or_else(|| {
            SchedulingError::validation(format!("no active slot is offered at {time_str}"))
        })?,
    };
    Ok(slot)
}

fn slot_write_error(e: rusqlite::Error, booking: &Booking) -> SchedulingError {
    if is_unique_violation(&e) {
        tracing::warn!(
            date = %booking.date,
            time = %canonical_time(&booking.time),
            "slot already taken"
        );
        SchedulingError::SlotConflict {
            date: booking.date,
            time: canonical_time(&booking.time),
        }
    } else {
        e.into()
    }
}

fn insert_booking(tx: &Transaction, booking: &Booking) -> rusqlite::Result<()> {
    let (worker_id, worker_name) = worker_columns(booking);
    tx.execute(
        &format!(
            "INSERT INTO bookings ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            queries::BOOKING_COLUMNS
        ),
        params![
            booking.id,
            booking.user_id,
            booking.user_name,
            booking.user_phone,
            to_json(&booking.vehicle)?,
            to_json(&booking.address)?,
            to_json(&booking.service)?,
            to_json(&booking.add_ons)?,
            fmt_date(&booking.date),
            booking.slot_id,
            canonical_time(&booking.time),
            booking.total_price,
            booking.total_time,
            to_json(&booking.payment)?,
            booking.status.as_str(),
            worker_id,
            worker_name,
            fmt_ts(&booking.created_at),
            fmt_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

fn update_booking(tx: &Transaction, booking: &Booking) -> rusqlite::Result<()> {
    let (worker_id, worker_name) = worker_columns(booking);
    tx.execute(
        "UPDATE bookings
         SET date = ?1, slot_id = ?2, time = ?3, status = ?4, worker_id = ?5, worker_name = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            fmt_date(&booking.date),
            booking.slot_id,
            canonical_time(&booking.time),
            booking.status.as_str(),
            worker_id,
            worker_name,
            fmt_ts(&booking.updated_at),
            booking.id,
        ],
    )?;
    Ok(())
}

fn worker_columns(booking: &Booking) -> (Option<&str>, Option<&str>) {
    match &booking.assigned_worker {
        Some(w) => (Some(w.worker_id.as_str()), Some(w.worker_name.as_str())),
        None => (None, None),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
