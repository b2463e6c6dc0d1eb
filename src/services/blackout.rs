use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::SchedulingError;
use crate::models::BlockedDay;

pub const DEFAULT_REASON: &str = "Holiday";

pub fn list_blocked(
    conn: &Connection,
    from: &NaiveDate,
    to: &NaiveDate,
) -> Result<Vec<BlockedDay>, SchedulingError> {
    Ok(queries::list_blocked_days(conn, from, to)?)
}

/// Blocks `date` for new bookings. Blocking an already blocked date returns
/// the existing entry unchanged.
pub fn block(
    conn: &Connection,
    date: NaiveDate,
    reason: Option<&str>,
    today: NaiveDate,
) -> Result<BlockedDay, SchedulingError> {
    if date < today {
        return Err(SchedulingError::PastDate { date });
    }

    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REASON);
    let day = BlockedDay {
        id: uuid::Uuid::new_v4().to_string(),
        date,
        reason: reason.to_string(),
    };

    if queries::insert_blocked_day(conn, &day)? {
        tracing::info!(date = %date, reason, "day blocked");
        return Ok(day);
    }

    queries::get_blocked_day(conn, &date)?
        .ok_or_else(|| SchedulingError::Storage(format!("blocked day {date} vanished")))
}

pub fn unblock(conn: &Connection, date: NaiveDate) -> Result<(), SchedulingError> {
    if !queries::delete_blocked_day(conn, &date)? {
        return Err(SchedulingError::NotFound(format!("blocked day {date}")));
    }
    tracing::info!(date = %date, "day unblocked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_block_rejects_past_dates() {
        let conn = db::init_db(":memory:").unwrap();
        let err = block(&conn, d("2025-05-31"), None, d("2025-06-01")).unwrap_err();
        assert!(matches!(err, SchedulingError::PastDate { .. }));

        // Today itself is allowed.
        assert!(block(&conn, d("2025-06-01"), None, d("2025-06-01")).is_ok());
    }

    #[test]
    fn test_block_is_idempotent() {
        let conn = db::init_db(":memory:").unwrap();
        let today = d("2025-06-01");
        let first = block(&conn, d("2025-06-03"), Some("Diwali"), today).unwrap();
        let second = block(&conn, d("2025-06-03"), Some("Other"), today).unwrap();
        assert_eq!(first, second);

        let days = list_blocked(&conn, &today, &d("2025-06-30")).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].reason, "Diwali");
    }

    #[test]
    fn test_default_reason_and_range() {
        let conn = db::init_db(":memory:").unwrap();
        let today = d("2025-06-01");
        block(&conn, d("2025-06-03"), Some("  "), today).unwrap();
        block(&conn, d("2025-07-10"), None, today).unwrap();

        let june = list_blocked(&conn, &today, &d("2025-06-30")).unwrap();
        assert_eq!(june.len(), 1);
        assert_eq!(june[0].reason, DEFAULT_REASON);
    }

    #[test]
    fn test_unblock() {
        let conn = db::init_db(":memory:").unwrap();
        let today = d("2025-06-01");
        block(&conn, d("2025-06-03"), None, today).unwrap();
        unblock(&conn, d("2025-06-03")).unwrap();
        assert!(matches!(
            unblock(&conn, d("2025-06-03")),
            Err(SchedulingError::NotFound(_))
        ));
        assert!(list_blocked(&conn, &today, &d("2025-06-30")).unwrap().is_empty());
    }
}
