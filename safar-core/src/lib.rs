pub mod directory;
pub mod repository;

pub use directory::{Company, InMemoryDirectory, OperatorDirectory, UserProfile};
pub use repository::{BookingRepository, NotificationRepository, TripRepository};
