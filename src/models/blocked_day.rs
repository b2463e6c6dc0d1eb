use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockedDay {
    pub id: String,
    pub date: NaiveDate,
    pub reason: String,
}
