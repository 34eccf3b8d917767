use async_trait::async_trait;
use safar_domain::{Booking, Notification, Trip};
use uuid::Uuid;

/// Repository trait for trip seat data access.
///
/// Trip content (itinerary, media, search) is managed elsewhere; the booking
/// core reads trips and writes back seat-map mutations via `save_trip`.
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn get_trip(
        &self,
        id: Uuid,
    ) -> Result<Option<Trip>, Box<dyn std::error::Error + Send + Sync>>;

    async fn save_trip(
        &self,
        trip: &Trip,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for the booking ledger.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get_booking(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    async fn update_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn list_by_requester(
        &self,
        requester_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_by_company(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// Pending bookings for a trip, the provisional holds merged into the
    /// unavailable set by the conflict resolver.
    async fn list_pending_for_trip(
        &self,
        trip_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for the persisted notification ledger.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn list_for_recipient(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<Notification>, Box<dyn std::error::Error + Send + Sync>>;
}
