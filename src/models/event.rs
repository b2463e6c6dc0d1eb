use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::booking::{hhmm, Booking, BookingStatus};

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    Created,
    Rescheduled,
    WorkerAssigned,
    Cancelled,
    Completed,
}

/// Emitted after every committed ledger mutation and streamed to admins.
#[derive(Clone, Debug, Serialize)]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub booking_id: String,
    pub user_id: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: chrono::NaiveTime,
    pub service_at: NaiveDateTime,
    pub status: BookingStatus,
    pub at: NaiveDateTime,
}

impl BookingEvent {
    pub fn new(kind: BookingEventKind, booking: &Booking) -> Self {
        Self {
            kind,
            booking_id: booking.id.clone(),
            user_id: booking.user_id.clone(),
            date: booking.date,
            time: booking.time,
            service_at: booking.service_at(),
            status: booking.status,
            at: booking.updated_at,
        }
    }
}
