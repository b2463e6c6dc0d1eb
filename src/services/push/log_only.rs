use async_trait::async_trait;

use super::{PushOutcome, PushProvider};
use crate::models::Reminder;

/// Used when no push endpoint is configured.
pub struct LogPushProvider;

#[async_trait]
impl PushProvider for LogPushProvider {
    async fn send(&self, reminder: &Reminder) -> anyhow::Result<PushOutcome> {
        tracing::info!(
            reminder_id = %reminder.id,
            user_id = %reminder.user_id,
            booking_id = %reminder.booking_id,
            "reminder due (no push endpoint configured): {}",
            reminder.message
        );
        Ok(PushOutcome::Delivered)
    }
}
