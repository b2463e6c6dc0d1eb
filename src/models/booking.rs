use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::slot::parse_time_of_day;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
    pub vehicle: Vehicle,
    pub address: Address,
    pub service: ServiceSelection,
    pub add_ons: Vec<AddOn>,
    pub date: NaiveDate,
    pub slot_id: Option<String>,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub total_price: f64,
    pub total_time: i64,
    pub payment: PaymentInfo,
    pub status: BookingStatus,
    pub assigned_worker: Option<AssignedWorker>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    /// When the wash starts, in the business's local time.
    pub fn service_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rescheduled,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Rescheduled => "rescheduled",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "rescheduled" => Some(BookingStatus::Rescheduled),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    /// Terminal bookings no longer occupy their slot and accept no further changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// Status after a successful reschedule: a pending booking becomes
    /// `rescheduled`, anything already past pending keeps its status.
    pub fn after_reschedule(self) -> Self {
        match self {
            BookingStatus::Pending => BookingStatus::Rescheduled,
            other => other,
        }
    }

    /// Status after a worker is assigned.
    pub fn after_assignment(self) -> Self {
        match self {
            BookingStatus::Pending => BookingStatus::Confirmed,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    #[serde(default)]
    pub house: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub landmark: Option<String>,
    #[serde(default)]
    pub pincode: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceSelection {
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddOn {
    pub name: String,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInfo {
    pub method: String,
    pub status: String,
    #[serde(default)]
    pub payment_id: Option<String>,
}

impl Default for PaymentInfo {
    fn default() -> Self {
        Self {
            method: "UPI".to_string(),
            status: "pending".to_string(),
            payment_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignedWorker {
    pub worker_id: String,
    pub worker_name: String,
}

/// Booking request as it arrives over the wire. Everything is optional so
/// that a missing field surfaces as a validation error rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBooking {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
    pub vehicle: Option<Vehicle>,
    pub address: Option<Address>,
    pub service: Option<ServiceSelection>,
    #[serde(default)]
    pub add_ons: Vec<AddOn>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub slot_id: Option<String>,
    pub total_price: Option<f64>,
    pub total_time: Option<i64>,
    pub payment: Option<PaymentInfo>,
}

/// A booking request that passed boundary validation. Only drafts reach the ledger.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
    pub vehicle: Vehicle,
    pub address: Address,
    pub service: ServiceSelection,
    pub add_ons: Vec<AddOn>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub slot_id: Option<String>,
    pub total_price: f64,
    pub total_time: i64,
    pub payment: PaymentInfo,
}

impl NewBooking {
    /// Checks required fields and normalises date and time. Returns every
    /// problem found, not just the first.
    pub fn validate(self) -> Result<BookingDraft, Vec<String>> {
        let mut problems = Vec::new();

        let user_id = non_empty(self.user_id);
        if user_id.is_none() {
            problems.push("user_id is required".to_string());
        }

        match &self.vehicle {
            None => problems.push("vehicle is required".to_string()),
            Some(v) if v.brand.trim().is_empty() || v.name.trim().is_empty() => {
                problems.push("vehicle brand and name are required".to_string())
            }
            Some(_) => {}
        }

        match &self.address {
            None => problems.push("address is required".to_string()),
            Some(a)
                if a.house.trim().is_empty()
                    || a.street.trim().is_empty()
                    || a.pincode.trim().is_empty() =>
            {
                problems.push("address house, street and pincode are required".to_string())
            }
            Some(_) => {}
        }

        match &self.service {
            None => problems.push("service is required".to_string()),
            Some(s) if s.service_name.trim().is_empty() => {
                problems.push("service name is required".to_string())
            }
            Some(_) => {}
        }

        let date = match non_empty(self.date) {
            None => {
                problems.push("date is required".to_string());
                None
            }
            Some(d) => match parse_date(&d) {
                Ok(date) => Some(date),
                Err(e) => {
                    problems.push(e.to_string());
                    None
                }
            },
        };

        let time = match non_empty(self.time) {
            None => {
                problems.push("time is required".to_string());
                None
            }
            Some(t) => match parse_time_of_day(&t) {
                Ok(time) => Some(time),
                Err(e) => {
                    problems.push(e.to_string());
                    None
                }
            },
        };

        if self.total_price.is_some_and(|p| p < 0.0) {
            problems.push("total_price must not be negative".to_string());
        }

        match (user_id, self.vehicle, self.address, self.service, date, time) {
            (Some(user_id), Some(vehicle), Some(address), Some(service), Some(date), Some(time))
                if problems.is_empty() =>
            {
                Ok(BookingDraft {
                    user_id,
                    user_name: self.user_name,
                    user_phone: self.user_phone,
                    vehicle,
                    address,
                    service,
                    add_ons: self.add_ons,
                    date,
                    time,
                    slot_id: non_empty(self.slot_id),
                    total_price: self.total_price.unwrap_or(0.0),
                    total_time: self.total_time.unwrap_or(0),
                    payment: self.payment.unwrap_or_default(),
                })
            }
            _ => Err(problems),
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| anyhow::anyhow!("invalid date (expected YYYY-MM-DD): {s}"))
}

/// `HH:MM` serde representation for times of day.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::models::slot::{canonical_time, parse_time_of_day};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&canonical_time(t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_time_of_day(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::slot::canonical_time;

    fn full_request() -> NewBooking {
        serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "vehicle": {"brand": "Honda", "name": "City", "size": "sedan"},
            "address": {"house": "12", "street": "MG Road", "pincode": "560001"},
            "service": {"service_name": "Foam Wash"},
            "date": "2025-06-02",
            "time": "9:00 AM",
            "total_price": 499.0
        }))
        .unwrap()
    }

    #[test]
    fn test_validate_full_request() {
        let draft = full_request().validate().unwrap();
        assert_eq!(draft.user_id, "u1");
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        assert_eq!(canonical_time(&draft.time), "09:00");
        assert_eq!(draft.payment, PaymentInfo::default());
        assert_eq!(draft.total_time, 0);
    }

    #[test]
    fn test_validate_reports_all_missing_fields() {
        let problems = NewBooking::default().validate().unwrap_err();
        assert!(problems.contains(&"user_id is required".to_string()));
        assert!(problems.contains(&"vehicle is required".to_string()));
        assert!(problems.contains(&"address is required".to_string()));
        assert!(problems.contains(&"service is required".to_string()));
        assert!(problems.contains(&"date is required".to_string()));
        assert!(problems.contains(&"time is required".to_string()));
    }

    #[test]
    fn test_validate_rejects_blank_nested_fields() {
        let mut req = full_request();
        req.vehicle = Some(Vehicle::default());
        req.address = Some(Address {
            house: "1".to_string(),
            street: " ".to_string(),
            landmark: None,
            pincode: "1".to_string(),
        });
        let problems = req.validate().unwrap_err();
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn test_validate_rejects_bad_date_and_time() {
        let mut req = full_request();
        req.date = Some("02/06/2025".to_string());
        req.time = Some("25:00".to_string());
        let problems = req.validate().unwrap_err();
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn test_status_rules() {
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::Completed.is_terminal());
        assert!(!BookingStatus::Rescheduled.is_terminal());
        assert_eq!(BookingStatus::Pending.after_reschedule(), BookingStatus::Rescheduled);
        assert_eq!(BookingStatus::Confirmed.after_reschedule(), BookingStatus::Confirmed);
        assert_eq!(BookingStatus::Pending.after_assignment(), BookingStatus::Confirmed);
        assert_eq!(BookingStatus::Rescheduled.after_assignment(), BookingStatus::Rescheduled);
        assert_eq!(BookingStatus::parse("completed"), Some(BookingStatus::Completed));
        assert_eq!(BookingStatus::parse("nope"), None);
    }
}
