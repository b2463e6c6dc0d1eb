use std::sync::Mutex;

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::SchedulingError;
use crate::models::reminder::BOOKING_REMINDER;
use crate::models::slot::canonical_time;
use crate::models::{Booking, Reminder};
use crate::services::push::{PushOutcome, PushProvider};

/// Queues a reminder for `lead` before the booking starts. Nothing is queued
/// when that moment has already passed.
pub fn schedule_for(
    conn: &Connection,
    booking: &Booking,
    lead: Duration,
    now: NaiveDateTime,
) -> anyhow::Result<Option<Reminder>> {
    let notify_at = booking.service_at() - lead;
    if notify_at <= now {
        return Ok(None);
    }

    let reminder = Reminder {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: booking.user_id.clone(),
        booking_id: booking.id.clone(),
        kind: BOOKING_REMINDER.to_string(),
        title: "Booking Reminder".to_string(),
        message: format!(
            "Your car wash is scheduled at {} on {}. Please keep your vehicle ready.",
            canonical_time(&booking.time),
            booking.date.format("%d %b %Y"),
        ),
        scheduled_at: notify_at,
        sent: false,
        sent_at: None,
        skipped: None,
        created_at: now,
    };
    queries::insert_reminder(conn, &reminder)?;
    Ok(Some(reminder))
}

/// Replaces any unsent reminder of the booking with one for its new time.
pub fn reschedule_for(
    conn: &Connection,
    booking: &Booking,
    lead: Duration,
    now: NaiveDateTime,
) -> anyhow::Result<Option<Reminder>> {
    queries::delete_pending_reminders(conn, &booking.id)?;
    schedule_for(conn, booking, lead, now)
}

pub fn drop_for(conn: &Connection, booking_id: &str) -> anyhow::Result<usize> {
    queries::delete_pending_reminders(conn, booking_id)
}

pub fn list_for_user(
    conn: &Connection,
    user_id: &str,
    limit: i64,
) -> Result<Vec<Reminder>, SchedulingError> {
    Ok(queries::get_reminders_for_user(conn, user_id, limit)?)
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DispatchSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Hands every due reminder to `push`. Rows are claimed before pushing, so
/// two dispatchers never deliver the same reminder and reminders of
/// cancelled or completed bookings are left alone. Failed deliveries are
/// released and retried on the next run. The database lock is not held while
/// pushing.
pub async fn dispatch_due(
    db: &Mutex<Connection>,
    push: &dyn PushProvider,
    now: NaiveDateTime,
) -> Result<DispatchSummary, SchedulingError> {
    let due = {
        let conn = db.lock().map_err(|_| SchedulingError::Unavailable)?;
        queries::claim_due_reminders(&conn, &now)?
    };

    let mut summary = DispatchSummary::default();
    for reminder in due {
        let outcome = push.send(&reminder).await;

        let conn = db.lock().map_err(|_| SchedulingError::Unavailable)?;
        match outcome {
            Ok(PushOutcome::Delivered) => summary.sent += 1,
            Ok(PushOutcome::Skipped(reason)) => {
                queries::set_reminder_skipped(&conn, &reminder.id, &reason)?;
                summary.skipped += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, reminder_id = %reminder.id, "failed to push reminder");
                queries::release_reminder(&conn, &reminder.id)?;
                summary.failed += 1;
            }
        }
    }

    if summary != DispatchSummary::default() {
        tracing::info!(
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "reminder dispatch finished"
        );
    }
    Ok(summary)
}
