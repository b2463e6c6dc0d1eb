use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use washbay::clock::SystemClock;
use washbay::config::AppConfig;
use washbay::db;
use washbay::services::push::log_only::LogPushProvider;
use washbay::services::push::webhook::WebhookPushProvider;
use washbay::services::push::PushProvider;
use washbay::services::reminders;
use washbay::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    if config.admin_token == AppConfig::default().admin_token {
        tracing::warn!("ADMIN_TOKEN not set, using the default token");
    }

    let conn = db::init_db(&config.database_url)?;
    let clock = Arc::new(SystemClock::new(config.utc_offset_minutes)?);

    let push: Box<dyn PushProvider> = if config.reminder_webhook_url.is_empty() {
        tracing::info!("no REMINDER_WEBHOOK_URL, reminders will only be logged");
        Box::new(LogPushProvider)
    } else {
        tracing::info!("pushing reminders to {}", config.reminder_webhook_url);
        Box::new(WebhookPushProvider::new(
            config.reminder_webhook_url.clone(),
            config.reminder_webhook_token.clone(),
        ))
    };

    let state = Arc::new(AppState::new(conn, config.clone(), clock, push));

    if config.reminder_poll_secs > 0 {
        tokio::spawn(reminder_loop(
            state.clone(),
            Duration::from_secs(config.reminder_poll_secs),
        ));
    }

    let app = washbay::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn reminder_loop(state: Arc<AppState>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        if let Err(e) =
            reminders::dispatch_due(&state.db, state.push.as_ref(), state.clock.now()).await
        {
            tracing::error!(error = %e, "reminder dispatch failed");
        }
    }
}
