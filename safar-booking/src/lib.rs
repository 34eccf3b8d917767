pub mod conflict;
pub mod finance;
pub mod lifecycle;
pub mod locks;
pub mod notify;

pub use conflict::SeatAvailability;
pub use lifecycle::BookingEngine;
pub use notify::{FanoutNotifier, NotificationRequest, Notifier};
