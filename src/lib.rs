pub mod clock;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/availability", get(handlers::bookings::get_availability))
        .route(
            "/api/bookings",
            get(handlers::bookings::list_user_bookings).post(handlers::bookings::create_booking),
        )
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/reschedule",
            post(handlers::bookings::reschedule_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:id/assign-worker",
            post(handlers::admin::assign_worker),
        )
        .route(
            "/api/users/:user_id/reminders",
            get(handlers::bookings::list_user_reminders),
        )
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route(
            "/api/admin/bookings/:id/reschedule",
            post(handlers::admin::reschedule_booking),
        )
        .route(
            "/api/admin/bookings/:id/complete",
            post(handlers::admin::complete_booking),
        )
        .route(
            "/api/admin/slots",
            get(handlers::admin::list_slots).post(handlers::admin::add_slot),
        )
        .route(
            "/api/admin/slots/:id/active",
            post(handlers::admin::set_slot_active),
        )
        .route("/api/admin/slots/:id", delete(handlers::admin::remove_slot))
        .route(
            "/api/admin/blocked-days",
            get(handlers::admin::list_blocked_days).post(handlers::admin::block_day),
        )
        .route(
            "/api/admin/blocked-days/:date",
            delete(handlers::admin::unblock_day),
        )
        .route(
            "/api/admin/workers",
            get(handlers::admin::list_workers).post(handlers::admin::add_worker),
        )
        .route(
            "/api/admin/reminders/dispatch",
            post(handlers::admin::dispatch_reminders),
        )
        .route("/api/admin/events", get(handlers::events::events_stream))
        .with_state(state)
}
