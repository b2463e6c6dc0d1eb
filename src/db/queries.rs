use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::booking::{DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::models::slot::TIME_FORMAT;
use crate::models::{
    AssignedWorker, BlockedDay, Booking, BookingStatus, MasterSlot, Reminder, Worker,
};

pub fn fmt_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

pub fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| anyhow::anyhow!("bad timestamp {s:?} in database: {e}"))
}

fn parse_stored_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| anyhow::anyhow!("bad date {s:?} in database: {e}"))
}

fn parse_stored_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|e| anyhow::anyhow!("bad time {s:?} in database: {e}"))
}

// ── Master Slots ──

pub fn list_slots(conn: &Connection, active_only: bool) -> anyhow::Result<Vec<MasterSlot>> {
    let sql = if active_only {
        "SELECT id, time_of_day, active FROM master_slots WHERE active = 1 ORDER BY time_of_day ASC"
    } else {
        "SELECT id, time_of_day, active FROM master_slots ORDER BY time_of_day ASC, active DESC"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], slot_from_row)?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

pub fn get_slot(conn: &Connection, id: &str) -> anyhow::Result<Option<MasterSlot>> {
    let slot = conn
        .query_row(
            "SELECT id, time_of_day, active FROM master_slots WHERE id = ?1",
            params![id],
            slot_from_row,
        )
        .optional()?;
    Ok(slot)
}

pub fn find_active_slot_at(conn: &Connection, time: &str) -> anyhow::Result<Option<MasterSlot>> {
    let slot = conn
        .query_row(
            "SELECT id, time_of_day, active FROM master_slots WHERE time_of_day = ?1 AND active = 1",
            params![time],
            slot_from_row,
        )
        .optional()?;
    Ok(slot)
}

/// Fails with a constraint violation when an active slot already holds the time.
pub fn insert_slot(conn: &Connection, slot: &MasterSlot) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO master_slots (id, time_of_day, active) VALUES (?1, ?2, ?3)",
        params![slot.id, slot.time_of_day, slot.active],
    )?;
    Ok(())
}

pub fn set_slot_active(conn: &Connection, id: &str, active: bool) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE master_slots SET active = ?1 WHERE id = ?2",
        params![active, id],
    )
}

pub fn delete_slot(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM master_slots WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn slot_from_row(row: &rusqlite::Row) -> rusqlite::Result<MasterSlot> {
    Ok(MasterSlot {
        id: row.get(0)?,
        time_of_day: row.get(1)?,
        active: row.get(2)?,
    })
}

// ── Blocked Days ──

pub fn list_blocked_days(
    conn: &Connection,
    from: &NaiveDate,
    to: &NaiveDate,
) -> anyhow::Result<Vec<BlockedDay>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, reason FROM blocked_days WHERE date >= ?1 AND date <= ?2 ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(params![fmt_date(from), fmt_date(to)], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut days = vec![];
    for row in rows {
        let (id, date, reason) = row?;
        days.push(BlockedDay {
            id,
            date: parse_stored_date(&date)?,
            reason,
        });
    }
    Ok(days)
}

pub fn get_blocked_day(conn: &Connection, date: &NaiveDate) -> anyhow::Result<Option<BlockedDay>> {
    let row = conn
        .query_row(
            "SELECT id, reason FROM blocked_days WHERE date = ?1",
            params![fmt_date(date)],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    Ok(row.map(|(id, reason)| BlockedDay {
        id,
        date: *date,
        reason,
    }))
}

/// Returns false when the date was already blocked.
pub fn insert_blocked_day(conn: &Connection, day: &BlockedDay) -> anyhow::Result<bool> {
    let count = conn.execute(
        "INSERT INTO blocked_days (id, date, reason) VALUES (?1, ?2, ?3)
         ON CONFLICT(date) DO NOTHING",
        params![day.id, fmt_date(&day.date), day.reason],
    )?;
    Ok(count > 0)
}

pub fn delete_blocked_day(conn: &Connection, date: &NaiveDate) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM blocked_days WHERE date = ?1",
        params![fmt_date(date)],
    )?;
    Ok(count > 0)
}

// ── Workers ──

pub fn list_workers(conn: &Connection) -> anyhow::Result<Vec<Worker>> {
    let mut stmt = conn.prepare("SELECT id, name, phone FROM workers ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Worker {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
        })
    })?;

    let mut workers = vec![];
    for row in rows {
        workers.push(row?);
    }
    Ok(workers)
}

pub fn get_worker(conn: &Connection, id: &str) -> anyhow::Result<Option<Worker>> {
    let worker = conn
        .query_row(
            "SELECT id, name, phone FROM workers WHERE id = ?1",
            params![id],
            |row| {
                Ok(Worker {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    phone: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(worker)
}

pub fn insert_worker(conn: &Connection, worker: &Worker) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO workers (id, name, phone) VALUES (?1, ?2, ?3)",
        params![worker.id, worker.name, worker.phone],
    )?;
    Ok(())
}

// ── Bookings ──

pub(crate) const BOOKING_COLUMNS: &str = "id, user_id, user_name, user_phone, vehicle, address, service, add_ons, \
     date, slot_id, time, total_price, total_time, payment, status, worker_id, worker_name, \
     created_at, updated_at";

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All bookings of one customer, newest first.
pub fn get_bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![user_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_bookings_filtered(
    conn: &Connection,
    status: Option<BookingStatus>,
    date: Option<&NaiveDate>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let mut clauses: Vec<&str> = vec![];
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(status) = status {
        params_vec.push(Box::new(status.as_str()));
        clauses.push("status = ?");
    }
    if let Some(date) = date {
        params_vec.push(Box::new(fmt_date(date)));
        clauses.push("date = ?");
    }
    params_vec.push(Box::new(limit));

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings {where_sql} ORDER BY created_at DESC, id DESC LIMIT ?"
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// `(date, time)` of every live booking between `from` and `to`, inclusive.
pub fn get_occupied_slots(
    conn: &Connection,
    from: &NaiveDate,
    to: &NaiveDate,
) -> anyhow::Result<Vec<(NaiveDate, NaiveTime)>> {
    let mut stmt = conn.prepare(
        "SELECT date, time FROM bookings
         WHERE date >= ?1 AND date <= ?2 AND status IN ('pending', 'confirmed', 'rescheduled')",
    )?;
    let rows = stmt.query_map(params![fmt_date(from), fmt_date(to)], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut occupied = vec![];
    for row in rows {
        let (date, time) = row?;
        occupied.push((parse_stored_date(&date)?, parse_stored_time(&time)?));
    }
    Ok(occupied)
}

pub(crate) fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let vehicle: String = row.get(4)?;
    let address: String = row.get(5)?;
    let service: String = row.get(6)?;
    let add_ons: String = row.get(7)?;
    let date: String = row.get(8)?;
    let time: String = row.get(10)?;
    let payment: String = row.get(13)?;
    let status: String = row.get(14)?;
    let worker_id: Option<String> = row.get(15)?;
    let worker_name: Option<String> = row.get(16)?;
    let created_at: String = row.get(17)?;
    let updated_at: String = row.get(18)?;

    let assigned_worker = worker_id.map(|worker_id| AssignedWorker {
        worker_id,
        worker_name: worker_name.unwrap_or_default(),
    });

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user_name: row.get(2)?,
        user_phone: row.get(3)?,
        vehicle: serde_json::from_str(&vehicle)?,
        address: serde_json::from_str(&address)?,
        service: serde_json::from_str(&service)?,
        add_ons: serde_json::from_str(&add_ons)?,
        date: parse_stored_date(&date)?,
        slot_id: row.get(9)?,
        time: parse_stored_time(&time)?,
        total_price: row.get(11)?,
        total_time: row.get(12)?,
        payment: serde_json::from_str(&payment)?,
        status: BookingStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("unknown booking status {status:?} in database"))?,
        assigned_worker,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

// ── Reminders ──

pub fn insert_reminder(conn: &Connection, reminder: &Reminder) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO reminders (id, user_id, booking_id, kind, title, message, scheduled_at, sent, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
        params![
            reminder.id,
            reminder.user_id,
            reminder.booking_id,
            reminder.kind,
            reminder.title,
            reminder.message,
            fmt_ts(&reminder.scheduled_at),
            fmt_ts(&reminder.created_at),
        ],
    )?;
    Ok(())
}

pub fn delete_pending_reminders(conn: &Connection, booking_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM reminders WHERE booking_id = ?1 AND sent = 0",
        params![booking_id],
    )?;
    Ok(count)
}

/// Marks every due reminder of a live booking as sent and returns them, in a
/// single statement, so concurrent dispatchers never hand out the same row.
pub fn claim_due_reminders(
    conn: &Connection,
    now: &NaiveDateTime,
) -> anyhow::Result<Vec<Reminder>> {
    let mut stmt = conn.prepare(
        "UPDATE reminders SET sent = 1, sent_at = ?1
         WHERE sent = 0 AND scheduled_at <= ?1
           AND booking_id IN (SELECT id FROM bookings WHERE status NOT IN ('cancelled', 'completed'))
         RETURNING id, user_id, booking_id, kind, title, message, scheduled_at, sent, sent_at, skipped, created_at",
    )?;
    let rows = stmt.query_map(params![fmt_ts(now)], |row| Ok(parse_reminder_row(row)))?;

    let mut reminders = vec![];
    for row in rows {
        reminders.push(row??);
    }
    reminders.sort_by_key(|r| r.scheduled_at);
    Ok(reminders)
}

pub fn get_reminders_for_user(
    conn: &Connection,
    user_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<Reminder>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, booking_id, kind, title, message, scheduled_at, sent, sent_at, skipped, created_at
         FROM reminders WHERE user_id = ?1 ORDER BY created_at DESC, scheduled_at DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id, limit], |row| Ok(parse_reminder_row(row)))?;

    let mut reminders = vec![];
    for row in rows {
        reminders.push(row??);
    }
    Ok(reminders)
}

pub fn set_reminder_skipped(conn: &Connection, id: &str, reason: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE reminders SET skipped = ?1 WHERE id = ?2",
        params![reason, id],
    )?;
    Ok(())
}

/// Returns a claimed reminder to the queue after a failed push.
pub fn release_reminder(conn: &Connection, id: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE reminders SET sent = 0, sent_at = NULL WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

fn parse_reminder_row(row: &rusqlite::Row) -> anyhow::Result<Reminder> {
    let scheduled_at: String = row.get(6)?;
    let sent_at: Option<String> = row.get(8)?;
    let created_at: String = row.get(10)?;

    Ok(Reminder {
        id: row.get(0)?,
        user_id: row.get(1)?,
        booking_id: row.get(2)?,
        kind: row.get(3)?,
        title: row.get(4)?,
        message: row.get(5)?,
        scheduled_at: parse_ts(&scheduled_at)?,
        sent: row.get(7)?,
        sent_at: sent_at.as_deref().map(parse_ts).transpose()?,
        skipped: row.get(9)?,
        created_at: parse_ts(&created_at)?,
    })
}
