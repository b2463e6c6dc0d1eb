use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use super::{PushOutcome, PushProvider};
use crate::models::Reminder;

/// Posts reminders as JSON to the notification service.
///
/// A `404` or `410` answer means the user has no registered device; the
/// reminder is then closed as skipped instead of retried.
pub struct WebhookPushProvider {
    url: String,
    token: String,
    client: reqwest::Client,
}

impl WebhookPushProvider {
    pub fn new(url: String, token: String) -> Self {
        Self {
            url,
            token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PushProvider for WebhookPushProvider {
    async fn send(&self, reminder: &Reminder) -> anyhow::Result<PushOutcome> {
        let body = json!({
            "user_id": reminder.user_id,
            "title": reminder.title,
            "body": reminder.message,
            "data": {
                "type": reminder.kind,
                "booking_id": reminder.booking_id,
            },
        });

        let mut request = self.client.post(&self.url).json(&body);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let resp = request
            .send()
            .await
            .context("failed to reach push webhook")?;

        match resp.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(PushOutcome::Skipped("NO_TOKENS".to_string())),
            _ => {
                resp.error_for_status().context("push webhook returned error")?;
                Ok(PushOutcome::Delivered)
            }
        }
    }
}
