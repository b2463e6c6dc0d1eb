use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const BOOKING_REMINDER: &str = "BOOKING_REMINDER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub user_id: String,
    pub booking_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub scheduled_at: NaiveDateTime,
    pub sent: bool,
    pub sent_at: Option<NaiveDateTime>,
    pub skipped: Option<String>,
    pub created_at: NaiveDateTime,
}
