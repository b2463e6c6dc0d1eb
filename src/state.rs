use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::db::ledger::LedgerPolicy;
use crate::errors::SchedulingError;
use crate::models::BookingEvent;
use crate::services::availability::AvailabilityCache;
use crate::services::push::PushProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub clock: Arc<dyn Clock>,
    pub push: Box<dyn PushProvider>,
    pub events_tx: broadcast::Sender<BookingEvent>,
    pub availability_cache: AvailabilityCache,
}

impl AppState {
    pub fn new(
        conn: Connection,
        config: AppConfig,
        clock: Arc<dyn Clock>,
        push: Box<dyn PushProvider>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        let availability_cache = AvailabilityCache::new(std::time::Duration::from_secs(
            config.availability_cache_ttl_secs,
        ));
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            clock,
            push,
            events_tx,
            availability_cache,
        }
    }

    /// A poisoned lock means a writer panicked mid-request; callers get a 503.
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, SchedulingError> {
        self.db.lock().map_err(|_| {
            tracing::error!("database mutex poisoned");
            SchedulingError::Unavailable
        })
    }

    pub fn ledger_policy(&self) -> LedgerPolicy {
        LedgerPolicy {
            min_lead: self.min_lead(),
            retry_attempts: self.config.storage_retry_attempts,
        }
    }

    pub fn min_lead(&self) -> Duration {
        Duration::minutes(self.config.min_lead_minutes)
    }

    pub fn reminder_lead(&self) -> Duration {
        Duration::minutes(self.config.reminder_lead_minutes)
    }
}
