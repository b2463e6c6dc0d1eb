use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MasterSlot {
    pub id: String,
    pub time_of_day: String,
    pub active: bool,
}

impl MasterSlot {
    pub fn time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.time_of_day, TIME_FORMAT).ok()
    }
}

/// Parses a time of day as typed by customers or admins.
///
/// Accepts 24h `HH:MM` / `H:MM` and 12h `h:MM AM` / `h:MM pm`. Seconds are
/// not accepted; slots are minute granular.
pub fn parse_time_of_day(s: &str) -> anyhow::Result<NaiveTime> {
    let s = s.trim();
    let (clock, meridian) = match s.rsplit_once(' ') {
        Some((clock, m)) => (clock.trim(), Some(m.to_ascii_uppercase())),
        None => (s, None),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 2
        || parts[1].len() != 2
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(anyhow::anyhow!("invalid time format: {s}"));
    }
    let mut hour: u32 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;

    match meridian.as_deref() {
        None => {}
        Some("AM") | Some("PM") => {
            if hour == 0 || hour > 12 {
                return Err(anyhow::anyhow!("hour out of range for 12h clock: {s}"));
            }
            if meridian.as_deref() == Some("PM") && hour < 12 {
                hour += 12;
            }
            if meridian.as_deref() == Some("AM") && hour == 12 {
                hour = 0;
            }
        }
        Some(other) => return Err(anyhow::anyhow!("invalid meridian {other} in: {s}")),
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
}

/// Canonical `HH:MM` form used for storage and slot keys.
pub fn canonical_time(t: &NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_24h() {
        assert_eq!(parse_time_of_day("09:00").unwrap(), t(9, 0));
        assert_eq!(parse_time_of_day("9:30").unwrap(), t(9, 30));
        assert_eq!(parse_time_of_day("23:59").unwrap(), t(23, 59));
    }

    #[test]
    fn test_parse_12h() {
        assert_eq!(parse_time_of_day("5:00 PM").unwrap(), t(17, 0));
        assert_eq!(parse_time_of_day("12:00 AM").unwrap(), t(0, 0));
        assert_eq!(parse_time_of_day("12:15 pm").unwrap(), t(12, 15));
        assert_eq!(parse_time_of_day("10:30 am").unwrap(), t(10, 30));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_time_of_day("").is_err());
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("10:60").is_err());
        assert!(parse_time_of_day("10").is_err());
        assert!(parse_time_of_day("10:5").is_err());
        assert!(parse_time_of_day("13:00 PM").is_err());
        assert!(parse_time_of_day("10:00 XM").is_err());
        assert!(parse_time_of_day("+9:+0").is_err());
        assert!(parse_time_of_day("+9:00").is_err());
        assert!(parse_time_of_day(":30").is_err());
    }

    #[test]
    fn test_canonical_time() {
        assert_eq!(canonical_time(&t(9, 5)), "09:05");
        let slot = MasterSlot {
            id: "s1".to_string(),
            time_of_day: "14:00".to_string(),
            active: true,
        };
        assert_eq!(slot.time(), Some(t(14, 0)));
    }
}
