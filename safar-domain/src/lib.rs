pub mod booking;
pub mod error;
pub mod events;
pub mod notification;
pub mod pii;
pub mod trip;

pub use booking::{Booking, BookingStatus, PaymentStatus};
pub use error::BookingError;
pub use notification::{Notification, NotificationKind};
pub use trip::{SeatAssignment, SeatMap, TransportKind, Trip};
