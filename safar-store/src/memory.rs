use async_trait::async_trait;
use safar_core::{BookingRepository, NotificationRepository, TripRepository};
use safar_domain::{Booking, BookingStatus, Notification, Trip};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory store backing development and tests. Repository calls clone
/// records in and out; all interior mutability stays behind the locks.
#[derive(Default)]
pub struct MemoryStore {
    trips: RwLock<HashMap<Uuid, Trip>>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
    notifications: RwLock<Vec<Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TripRepository for MemoryStore {
    async fn get_trip(
        &self,
        id: Uuid,
    ) -> Result<Option<Trip>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.trips.read().await.get(&id).cloned())
    }

    async fn save_trip(
        &self,
        trip: &Trip,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.trips.write().await.insert(trip.id, trip.clone());
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.bookings
            .write()
            .await
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn update_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut bookings = self.bookings.write().await;
        if !bookings.contains_key(&booking.id) {
            return Err(format!("booking {} does not exist", booking.id).into());
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn list_by_requester(
        &self,
        requester_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut result: Vec<Booking> = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.requester_id == requester_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_by_company(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut result: Vec<Booking> = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.company_id == company_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_pending_for_trip(
        &self,
        trip_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.trip_id == trip_id && b.status == BookingStatus::Pending)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create_notification(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn list_for_recipient(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<Notification>, Box<dyn std::error::Error + Send + Sync>> {
        let mut result: Vec<Notification> = self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use safar_domain::booking::{CreateBookingRequest, Financials};
    use safar_domain::trip::TransportKind;

    fn trip() -> Trip {
        Trip::new(
            Uuid::new_v4(),
            "Eastern province loop",
            TransportKind::Minibus,
            "400",
            NaiveDate::from_ymd_opt(2026, 9, 3).unwrap(),
        )
    }

    fn booking(trip: &Trip, requester: Uuid) -> Booking {
        let request = CreateBookingRequest {
            trip_id: trip.id,
            seat_count: 1,
            seat_labels: vec![],
            travel_date: trip.departure_date,
            contact_name: "Salem".to_string(),
            contact_phone: "0501234567".to_string(),
            special_requests: None,
        };
        let financials = Financials {
            unit_price: 400,
            total_price: 400,
            commission: 20,
            net_to_operator: 380,
        };
        Booking::new(trip, requester, &request, financials)
    }

    #[tokio::test]
    async fn trips_round_trip() {
        let store = MemoryStore::new();
        let trip = trip();
        store.save_trip(&trip).await.unwrap();
        let loaded = store.get_trip(trip.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, trip.id);
        assert!(store.get_trip(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pending_filter_only_returns_pending_bookings() {
        let store = MemoryStore::new();
        let trip = trip();
        store.save_trip(&trip).await.unwrap();

        let mut accepted = booking(&trip, Uuid::new_v4());
        store.create_booking(&accepted).await.unwrap();
        accepted.update_status(BookingStatus::Accepted);
        store.update_booking(&accepted).await.unwrap();

        let pending = booking(&trip, Uuid::new_v4());
        store.create_booking(&pending).await.unwrap();

        let listed = store.list_pending_for_trip(trip.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, pending.id);
    }

    #[tokio::test]
    async fn updating_a_missing_booking_fails() {
        let store = MemoryStore::new();
        let trip = trip();
        let ghost = booking(&trip, Uuid::new_v4());
        assert!(store.update_booking(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn requester_listing_is_scoped_and_newest_first() {
        let store = MemoryStore::new();
        let trip = trip();
        let requester = Uuid::new_v4();

        let first = booking(&trip, requester);
        let second = booking(&trip, requester);
        let other = booking(&trip, Uuid::new_v4());
        store.create_booking(&first).await.unwrap();
        store.create_booking(&second).await.unwrap();
        store.create_booking(&other).await.unwrap();

        let listed = store.list_by_requester(requester).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at >= listed[1].created_at);
    }
}
