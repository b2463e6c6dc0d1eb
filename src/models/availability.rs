use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::slot::MasterSlot;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Open,
    Blocked,
    Past,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotAvailability {
    pub slot_id: String,
    pub time: String,
    pub is_booked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub status: DayStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub slots: Vec<SlotAvailability>,
}

impl DayAvailability {
    /// Projects one calendar day.
    ///
    /// `active_slots` must already be sorted by time; `booked` holds the
    /// times of live bookings on `date`. A past day or a blocked day offers
    /// nothing. On the current day only slots starting at or after
    /// `now + min_lead` survive.
    pub fn resolve(
        date: NaiveDate,
        now: NaiveDateTime,
        min_lead: Duration,
        active_slots: &[MasterSlot],
        blocked_reason: Option<&str>,
        booked: &HashSet<NaiveTime>,
    ) -> Self {
        if date < now.date() {
            return Self::closed(date, DayStatus::Past, None);
        }
        if let Some(reason) = blocked_reason {
            return Self::closed(date, DayStatus::Blocked, Some(reason.to_string()));
        }

        let earliest = now + min_lead;
        let slots = active_slots
            .iter()
            .filter_map(|slot| slot.time().map(|t| (slot, t)))
            .filter(|(_, t)| date.and_time(*t) >= earliest)
            .map(|(slot, t)| SlotAvailability {
                slot_id: slot.id.clone(),
                time: slot.time_of_day.clone(),
                is_booked: booked.contains(&t),
            })
            .collect();

        Self {
            date,
            status: DayStatus::Open,
            reason: None,
            slots,
        }
    }

    fn closed(date: NaiveDate, status: DayStatus, reason: Option<String>) -> Self {
        Self {
            date,
            status,
            reason,
            slots: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: &str, time: &str) -> MasterSlot {
        MasterSlot {
            id: id.to_string(),
            time_of_day: time.to_string(),
            active: true,
        }
    }

    fn slots() -> Vec<MasterSlot> {
        vec![slot("a", "09:00"), slot("b", "10:30"), slot("c", "14:00")]
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    #[test]
    fn test_future_day_marks_booked_slots() {
        let booked: HashSet<NaiveTime> = [t("09:00")].into_iter().collect();
        let day = DayAvailability::resolve(
            d("2025-06-02"),
            dt("2025-06-01 08:00"),
            Duration::minutes(120),
            &slots(),
            None,
            &booked,
        );
        assert_eq!(day.status, DayStatus::Open);
        assert_eq!(day.slots.len(), 3);
        assert!(day.slots[0].is_booked);
        assert!(!day.slots[1].is_booked);
        assert!(!day.slots[2].is_booked);
        assert_eq!(day.slots.iter().filter(|s| !s.is_booked).count(), 2);
    }

    #[test]
    fn test_blocked_day_offers_nothing() {
        let day = DayAvailability::resolve(
            d("2025-06-03"),
            dt("2025-06-01 08:00"),
            Duration::zero(),
            &slots(),
            Some("Holiday"),
            &HashSet::new(),
        );
        assert_eq!(day.status, DayStatus::Blocked);
        assert_eq!(day.reason.as_deref(), Some("Holiday"));
        assert!(day.slots.is_empty());
    }

    #[test]
    fn test_past_day_wins_over_block() {
        let day = DayAvailability::resolve(
            d("2025-05-31"),
            dt("2025-06-01 08:00"),
            Duration::zero(),
            &slots(),
            Some("Holiday"),
            &HashSet::new(),
        );
        assert_eq!(day.status, DayStatus::Past);
        assert!(day.slots.is_empty());
    }

    #[test]
    fn test_today_respects_lead_time() {
        let now = dt("2025-06-01 08:00");
        let day = DayAvailability::resolve(
            d("2025-06-01"),
            now,
            Duration::minutes(120),
            &slots(),
            None,
            &HashSet::new(),
        );
        let times: Vec<&str> = day.slots.iter().map(|s| s.time.as_str()).collect();
        assert_eq!(times, vec!["10:30", "14:00"]);

        let day = DayAvailability::resolve(
            d("2025-06-01"),
            now,
            Duration::minutes(60),
            &slots(),
            None,
            &HashSet::new(),
        );
        assert_eq!(day.slots.len(), 3);
    }

    #[test]
    fn test_late_evening_empties_today() {
        let day = DayAvailability::resolve(
            d("2025-06-01"),
            dt("2025-06-01 15:00"),
            Duration::zero(),
            &slots(),
            None,
            &HashSet::new(),
        );
        assert_eq!(day.status, DayStatus::Open);
        assert!(day.slots.is_empty());
    }

    #[test]
    fn test_lead_time_crossing_midnight() {
        let day = DayAvailability::resolve(
            d("2025-06-02"),
            dt("2025-06-01 23:00"),
            Duration::minutes(11 * 60),
            &slots(),
            None,
            &HashSet::new(),
        );
        let times: Vec<&str> = day.slots.iter().map(|s| s.time.as_str()).collect();
        assert_eq!(times, vec!["10:30", "14:00"]);
    }
}
