use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Instant;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::SchedulingError;
use crate::models::DayAvailability;

/// `days` consecutive dates starting at `start`.
pub fn date_range(start: NaiveDate, days: u32) -> Vec<NaiveDate> {
    start.iter_days().take(days as usize).collect()
}

/// Advisory slot table for `dates`, in the order given.
///
/// Reads catalog, blackout days and live bookings inside one read
/// transaction so the table reflects a single snapshot. Nothing is written.
pub fn compute_availability(
    conn: &Connection,
    dates: &[NaiveDate],
    now: NaiveDateTime,
    min_lead: Duration,
) -> Result<Vec<DayAvailability>, SchedulingError> {
    let (Some(from), Some(to)) = (dates.iter().min(), dates.iter().max()) else {
        return Ok(Vec::new());
    };

    let tx = conn.unchecked_transaction()?;

    let slots = queries::list_slots(&tx, true)?;
    let blocked: HashMap<NaiveDate, String> = queries::list_blocked_days(&tx, from, to)?
        .into_iter()
        .map(|day| (day.date, day.reason))
        .collect();

    let mut occupied: HashMap<NaiveDate, HashSet<NaiveTime>> = HashMap::new();
    for (date, time) in queries::get_occupied_slots(&tx, from, to)? {
        occupied.entry(date).or_default().insert(time);
    }

    drop(tx);

    let none = HashSet::new();
    Ok(dates
        .iter()
        .map(|date| {
            DayAvailability::resolve(
                *date,
                now,
                min_lead,
                &slots,
                blocked.get(date).map(String::as_str),
                occupied.get(date).unwrap_or(&none),
            )
        })
        .collect())
}

/// Short-lived cache over the availability table. Writes made through this
/// process invalidate it; writes from elsewhere are visible after `ttl`.
pub struct AvailabilityCache {
    ttl: std::time::Duration,
    entry: Mutex<Option<CachedTable>>,
}

struct CachedTable {
    key: (NaiveDate, u32),
    stored_at: Instant,
    days: Vec<DayAvailability>,
}

impl AvailabilityCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get(&self, start: NaiveDate, days: u32) -> Option<Vec<DayAvailability>> {
        if !self.is_enabled() {
            return None;
        }
        let guard = self.entry.lock().ok()?;
        guard
            .as_ref()
            .filter(|c| c.key == (start, days) && c.stored_at.elapsed() < self.ttl)
            .map(|c| c.days.clone())
    }

    pub fn put(&self, start: NaiveDate, days: u32, table: &[DayAvailability]) {
        if !self.is_enabled() {
            return;
        }
        if let Ok(mut guard) = self.entry.lock() {
            *guard = Some(CachedTable {
                key: (start, days),
                stored_at: Instant::now(),
                days: table.to_vec(),
            });
        }
    }

    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.entry.lock() {
            *guard = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, ledger};
    use crate::models::{
        Address, BookingDraft, DayStatus, PaymentInfo, ServiceSelection, Vehicle,
    };
    use crate::services::{blackout, catalog};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-06-01 08:00", "%Y-%m-%d %H:%M").unwrap()
    }

    fn draft(date: &str, time: &str) -> BookingDraft {
        BookingDraft {
            user_id: "u1".to_string(),
            user_name: None,
            user_phone: None,
            vehicle: Vehicle {
                brand: "Tata".to_string(),
                name: "Nexon".to_string(),
                ..Default::default()
            },
            address: Address {
                house: "7".to_string(),
                street: "Ring Road".to_string(),
                landmark: None,
                pincode: "110001".to_string(),
            },
            service: ServiceSelection {
                service_name: "Interior Clean".to_string(),
                ..Default::default()
            },
            add_ons: vec![],
            date: d(date),
            time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            slot_id: None,
            total_price: 0.0,
            total_time: 0,
            payment: PaymentInfo::default(),
        }
    }

    #[test]
    fn test_date_range() {
        let range = date_range(d("2025-06-30"), 3);
        assert_eq!(range, vec![d("2025-06-30"), d("2025-07-01"), d("2025-07-02")]);
        assert!(date_range(d("2025-06-30"), 0).is_empty());
    }

    #[test]
    fn test_availability_reflects_bookings_blocks_and_clock() {
        let mut conn = db::init_db(":memory:").unwrap();
        catalog::add_slot(&conn, "09:00").unwrap();
        catalog::add_slot(&conn, "10:30").unwrap();
        blackout::block(&conn, d("2025-06-03"), None, d("2025-06-01")).unwrap();
        ledger::create(
            &mut conn,
            &draft("2025-06-02", "09:00"),
            now(),
            &ledger::LedgerPolicy::default(),
        )
        .unwrap();

        let dates = date_range(d("2025-05-31"), 4);
        let table = compute_availability(&conn, &dates, now(), Duration::minutes(120)).unwrap();
        assert_eq!(table.len(), 4);

        assert_eq!(table[0].status, DayStatus::Past);
        assert!(table[0].slots.is_empty());

        assert_eq!(table[1].status, DayStatus::Open);
        let today: Vec<&str> = table[1].slots.iter().map(|s| s.time.as_str()).collect();
        assert_eq!(today, vec!["10:30"]);

        assert_eq!(table[2].slots.len(), 2);
        assert_eq!(table[2].slots[0].time, "09:00");
        assert!(table[2].slots[0].is_booked);
        assert_eq!(table[2].slots[1].time, "10:30");
        assert!(!table[2].slots[1].is_booked);

        assert_eq!(table[3].status, DayStatus::Blocked);
        assert!(table[3].slots.is_empty());
    }

    #[test]
    fn test_cancelled_booking_not_marked() {
        let mut conn = db::init_db(":memory:").unwrap();
        catalog::add_slot(&conn, "09:00").unwrap();
        let policy = ledger::LedgerPolicy::default();
        let b = ledger::create(&mut conn, &draft("2025-06-02", "09:00"), now(), &policy).unwrap();
        ledger::cancel(&mut conn, &b.id, now(), &policy).unwrap();

        let table =
            compute_availability(&conn, &[d("2025-06-02")], now(), Duration::zero()).unwrap();
        assert!(!table[0].slots[0].is_booked);
    }

    #[test]
    fn test_empty_range() {
        let conn = db::init_db(":memory:").unwrap();
        assert!(compute_availability(&conn, &[], now(), Duration::zero())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_cache_hits_until_invalidated() {
        let cache = AvailabilityCache::new(std::time::Duration::from_secs(60));
        let table = vec![DayAvailability::resolve(
            d("2025-06-02"),
            now(),
            Duration::zero(),
            &[],
            None,
            &HashSet::new(),
        )];
        cache.put(d("2025-06-02"), 1, &table);
        assert_eq!(cache.get(d("2025-06-02"), 1), Some(table));
        assert_eq!(cache.get(d("2025-06-02"), 2), None);

        cache.invalidate();
        assert_eq!(cache.get(d("2025-06-02"), 1), None);
    }

    #[test]
    fn test_cache_disabled_and_expiry() {
        let disabled = AvailabilityCache::new(std::time::Duration::ZERO);
        disabled.put(d("2025-06-02"), 1, &[]);
        assert_eq!(disabled.get(d("2025-06-02"), 1), None);

        let short = AvailabilityCache::new(std::time::Duration::from_millis(1));
        short.put(d("2025-06-02"), 1, &[]);
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(short.get(d("2025-06-02"), 1), None);
    }
}
