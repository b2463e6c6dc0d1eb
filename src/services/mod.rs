pub mod availability;
pub mod blackout;
pub mod catalog;
pub mod push;
pub mod reminders;
pub mod scheduling;
pub mod workers;
