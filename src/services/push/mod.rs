pub mod log_only;
pub mod webhook;

use async_trait::async_trait;

use crate::models::Reminder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// Nothing to deliver to; the reminder is closed with this reason.
    Skipped(String),
}

/// Delivers booking reminders to the customer's device. Delivery itself is
/// someone else's job; implementations only hand the reminder over.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, reminder: &Reminder) -> anyhow::Result<PushOutcome>;
}
