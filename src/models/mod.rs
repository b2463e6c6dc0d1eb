pub mod availability;
pub mod blocked_day;
pub mod booking;
pub mod event;
pub mod reminder;
pub mod slot;
pub mod worker;

pub use availability::{DayAvailability, DayStatus, SlotAvailability};
pub use blocked_day::BlockedDay;
pub use booking::{
    AddOn, Address, AssignedWorker, Booking, BookingDraft, BookingStatus, NewBooking, PaymentInfo,
    ServiceSelection, Vehicle,
};
pub use event::{BookingEvent, BookingEventKind};
pub use reminder::Reminder;
pub use slot::MasterSlot;
pub use worker::Worker;
