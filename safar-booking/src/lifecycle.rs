use std::sync::Arc;

use chrono::Utc;
use safar_core::{BookingRepository, OperatorDirectory, TripRepository};
use safar_domain::booking::{BookingPatch, CreateBookingRequest, PaymentUpdate};
use safar_domain::events::{SeatEvent, SeatEventKind};
use safar_domain::trip::{ClaimResult, SeatAssignment};
use safar_domain::{
    Booking, BookingError, BookingStatus, NotificationKind, Trip,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::conflict::{self, SeatAvailability};
use crate::finance;
use crate::locks::TripLocks;
use crate::notify::{NotificationRequest, Notifier};

/// Governs the booking lifecycle: creation, operator decisions, traveler
/// cancellation, pending edits and payment labels. The engine is the only
/// writer of trip seat maps; every seat-affecting operation runs under the
/// trip's lock so a membership check and the write it guards cannot be
/// interleaved with another request's.
pub struct BookingEngine {
    bookings: Arc<dyn BookingRepository>,
    trips: Arc<dyn TripRepository>,
    directory: Arc<dyn OperatorDirectory>,
    notifier: Arc<dyn Notifier>,
    seat_feed: broadcast::Sender<SeatEvent>,
    locks: TripLocks,
}

impl BookingEngine {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        trips: Arc<dyn TripRepository>,
        directory: Arc<dyn OperatorDirectory>,
        notifier: Arc<dyn Notifier>,
        seat_feed: broadcast::Sender<SeatEvent>,
    ) -> Self {
        Self {
            bookings,
            trips,
            directory,
            notifier,
            seat_feed,
            locks: TripLocks::new(),
        }
    }

    /// Create a pending booking, provisionally reserving its seats.
    pub async fn create_booking(
        &self,
        actor: Uuid,
        request: CreateBookingRequest,
    ) -> Result<Booking, BookingError> {
        // 1. Field validation before touching storage
        request.validate()?;

        // 2. Serialize against concurrent creates/accepts on this trip
        let _guard = self.locks.acquire(request.trip_id).await;

        let trip = self.load_trip(request.trip_id).await?;

        // 3. Price the request; a zero unit price is a malformed trip
        let financials = finance::quote(trip.unit_price, request.seat_count)?;

        if request.seat_count > trip.remaining_capacity() {
            return Err(BookingError::Validation(format!(
                "requested {} seats but only {} remain",
                request.seat_count,
                trip.remaining_capacity()
            )));
        }

        // 4. Requested labels must be free of confirmed and pending holds
        let pending = self
            .bookings
            .list_pending_for_trip(trip.id)
            .await
            .map_err(BookingError::storage)?;
        let unavailable = conflict::unavailable_seats(&trip, &pending, None);
        conflict::check_requested(&request.seat_labels, &unavailable)?;

        let booking = Booking::new(&trip, actor, &request, financials);
        self.bookings
            .create_booking(&booking)
            .await
            .map_err(BookingError::storage)?;

        tracing::info!(
            reference = %booking.reference,
            trip_id = %trip.id,
            seats = booking.seat_count,
            "Booking created"
        );

        if !booking.seat_labels.is_empty() {
            let _ = self.seat_feed.send(SeatEvent::now(
                trip.id,
                &booking.reference,
                booking.seat_labels.clone(),
                SeatEventKind::Held,
            ));
        }

        let operator = self
            .directory
            .operator_for_company(trip.company_id)
            .await
            .map_err(BookingError::storage)?;
        self.fire(NotificationRequest {
            recipient_id: operator,
            actor_id: actor,
            kind: NotificationKind::BookingRequested,
            message: format!(
                "New booking {} for {} ({} seats)",
                booking.reference, trip.title, booking.seat_count
            ),
            metadata: serde_json::json!({
                "booking_reference": booking.reference,
                "trip_id": trip.id,
                "event": "BOOKING_REQUESTED",
            }),
        })
        .await;

        Ok(booking)
    }

    /// Operator accepts a pending booking, materializing its seats.
    ///
    /// Retried accepts are tolerated: an already-accepted booking is
    /// returned unchanged and no seat entry or notification is duplicated.
    pub async fn accept(&self, actor: Uuid, booking_id: Uuid) -> Result<Booking, BookingError> {
        let booking = self.load_booking(booking_id).await?;
        self.ensure_operator(actor, booking.company_id).await?;

        let _guard = self.locks.acquire(booking.trip_id).await;
        let mut booking = self.load_booking(booking_id).await?;

        match booking.status {
            BookingStatus::Pending => {}
            BookingStatus::Accepted => {
                tracing::debug!(reference = %booking.reference, "Accept retried, no-op");
                return Ok(booking);
            }
            from => {
                return Err(BookingError::InvalidTransition {
                    from,
                    to: BookingStatus::Accepted,
                })
            }
        }

        let mut trip = self.load_trip(booking.trip_id).await?;

        // Conditional claim per slot; nothing is persisted on conflict
        let mut conflicts = Vec::new();
        for label in &booking.seat_labels {
            let outcome = trip.seat_map.claim(SeatAssignment {
                seat_label: label.clone(),
                occupant_name: booking.contact_name.clone(),
                occupant_user_id: booking.requester_id,
                booking_ref: booking.reference.clone(),
            });
            if let ClaimResult::Occupied { .. } = outcome {
                conflicts.push(label.clone());
            }
        }
        if !conflicts.is_empty() {
            return Err(BookingError::SeatConflict { seats: conflicts });
        }

        booking.update_status(BookingStatus::Accepted);
        self.bookings
            .update_booking(&booking)
            .await
            .map_err(BookingError::storage)?;
        self.trips
            .save_trip(&trip)
            .await
            .map_err(BookingError::storage)?;

        tracing::info!(reference = %booking.reference, "Booking accepted");

        if !booking.seat_labels.is_empty() {
            let _ = self.seat_feed.send(SeatEvent::now(
                trip.id,
                &booking.reference,
                booking.seat_labels.clone(),
                SeatEventKind::Confirmed,
            ));
        }

        self.fire(NotificationRequest {
            recipient_id: Some(booking.requester_id),
            actor_id: actor,
            kind: NotificationKind::BookingAccepted,
            message: format!("Your booking {} was accepted", booking.reference),
            metadata: serde_json::json!({
                "booking_reference": booking.reference,
                "trip_id": booking.trip_id,
                "event": "SEAT_ASSIGNMENT",
                "seats": booking.seat_labels,
            }),
        })
        .await;

        Ok(booking)
    }

    /// Operator declines a pending booking.
    pub async fn reject(
        &self,
        actor: Uuid,
        booking_id: Uuid,
        reason: String,
    ) -> Result<Booking, BookingError> {
        if reason.trim().is_empty() {
            return Err(BookingError::Validation(
                "a rejection reason is required".to_string(),
            ));
        }
        let booking = self.load_booking(booking_id).await?;
        self.ensure_operator(actor, booking.company_id).await?;

        let _guard = self.locks.acquire(booking.trip_id).await;
        let mut booking = self.load_booking(booking_id).await?;

        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Rejected,
            });
        }

        booking.rejection_reason = Some(reason.clone());
        booking.update_status(BookingStatus::Rejected);
        self.bookings
            .update_booking(&booking)
            .await
            .map_err(BookingError::storage)?;

        if !booking.seat_labels.is_empty() {
            // The provisional hold on these labels is gone
            let _ = self.seat_feed.send(SeatEvent::now(
                booking.trip_id,
                &booking.reference,
                booking.seat_labels.clone(),
                SeatEventKind::Released,
            ));
        }

        self.fire(NotificationRequest {
            recipient_id: Some(booking.requester_id),
            actor_id: actor,
            kind: NotificationKind::BookingRejected,
            message: format!("Your booking {} was declined: {}", booking.reference, reason),
            metadata: serde_json::json!({
                "booking_reference": booking.reference,
                "trip_id": booking.trip_id,
                "event": "BOOKING_REJECTED",
                "reason": reason,
            }),
        })
        .await;

        Ok(booking)
    }

    /// Traveler cancels their own booking, pending or accepted.
    pub async fn cancel_by_requester(
        &self,
        actor: Uuid,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> Result<Booking, BookingError> {
        let booking = self.load_booking(booking_id).await?;
        if booking.requester_id != actor {
            return Err(BookingError::Unauthorized(
                "only the requester may cancel this booking".to_string(),
            ));
        }

        let _guard = self.locks.acquire(booking.trip_id).await;
        let booking = self.load_booking(booking_id).await?;
        let booking = self.cancel_locked(booking, reason).await?;

        let operator = self
            .directory
            .operator_for_company(booking.company_id)
            .await
            .map_err(BookingError::storage)?;
        self.fire(NotificationRequest {
            recipient_id: operator,
            actor_id: actor,
            kind: NotificationKind::BookingCancelled,
            message: match &booking.cancellation_reason {
                Some(reason) => format!(
                    "Booking {} was cancelled by the traveler: {}",
                    booking.reference, reason
                ),
                None => format!("Booking {} was cancelled by the traveler", booking.reference),
            },
            metadata: serde_json::json!({
                "booking_reference": booking.reference,
                "trip_id": booking.trip_id,
                "event": "CANCELLED_BY_REQUESTER",
            }),
        })
        .await;

        Ok(booking)
    }

    /// Operator cancels an accepted booking, releasing its seats.
    pub async fn cancel_by_company(
        &self,
        actor: Uuid,
        booking_id: Uuid,
        reason: String,
    ) -> Result<Booking, BookingError> {
        if reason.trim().is_empty() {
            return Err(BookingError::Validation(
                "a cancellation reason is required".to_string(),
            ));
        }
        let booking = self.load_booking(booking_id).await?;
        self.ensure_operator(actor, booking.company_id).await?;

        let _guard = self.locks.acquire(booking.trip_id).await;
        let booking = self.load_booking(booking_id).await?;

        // Pending bookings are declined via reject, not cancelled
        if booking.status != BookingStatus::Accepted {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Cancelled,
            });
        }

        let booking = self.cancel_locked(booking, Some(reason.clone())).await?;

        self.fire(NotificationRequest {
            recipient_id: Some(booking.requester_id),
            actor_id: actor,
            kind: NotificationKind::BookingCancelled,
            message: format!(
                "Your booking {} was cancelled by the operator: {}",
                booking.reference, reason
            ),
            metadata: serde_json::json!({
                "booking_reference": booking.reference,
                "trip_id": booking.trip_id,
                "event": "CANCELLED_BY_COMPANY",
                "reason": reason,
            }),
        })
        .await;

        Ok(booking)
    }

    /// Shared cancellation: release confirmed seats if any, record the
    /// reason, move to CANCELLED. Caller must hold the trip lock.
    async fn cancel_locked(
        &self,
        mut booking: Booking,
        reason: Option<String>,
    ) -> Result<Booking, BookingError> {
        match booking.status {
            BookingStatus::Pending => {
                // Never materialized; only the provisional hold goes away
                if !booking.seat_labels.is_empty() {
                    let _ = self.seat_feed.send(SeatEvent::now(
                        booking.trip_id,
                        &booking.reference,
                        booking.seat_labels.clone(),
                        SeatEventKind::Released,
                    ));
                }
            }
            BookingStatus::Accepted => {
                let mut trip = self.load_trip(booking.trip_id).await?;
                let released = trip.seat_map.release_booking(&booking.reference);
                self.trips
                    .save_trip(&trip)
                    .await
                    .map_err(BookingError::storage)?;
                if !released.is_empty() {
                    let _ = self.seat_feed.send(SeatEvent::now(
                        trip.id,
                        &booking.reference,
                        released,
                        SeatEventKind::Released,
                    ));
                }
            }
            from => {
                return Err(BookingError::InvalidTransition {
                    from,
                    to: BookingStatus::Cancelled,
                })
            }
        }

        booking.cancellation_reason = reason;
        booking.update_status(BookingStatus::Cancelled);
        self.bookings
            .update_booking(&booking)
            .await
            .map_err(BookingError::storage)?;

        tracing::info!(reference = %booking.reference, "Booking cancelled");
        Ok(booking)
    }

    /// Requester edits a pending booking. Seat changes re-run the conflict
    /// check, and the financial fields are explicitly recomputed so edited
    /// totals never go stale.
    pub async fn edit_booking(
        &self,
        actor: Uuid,
        booking_id: Uuid,
        patch: BookingPatch,
    ) -> Result<Booking, BookingError> {
        if patch.is_empty() {
            return Err(BookingError::Validation("no fields to update".to_string()));
        }
        let booking = self.load_booking(booking_id).await?;
        if booking.requester_id != actor {
            return Err(BookingError::Unauthorized(
                "only the requester may edit this booking".to_string(),
            ));
        }

        let _guard = self.locks.acquire(booking.trip_id).await;
        let mut booking = self.load_booking(booking_id).await?;

        // Once accepted, capacity is committed; the traveler must go
        // through the operator instead of self-editing
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: booking.status,
            });
        }

        let new_count = patch.seat_count.unwrap_or(booking.seat_count);
        let new_labels = patch
            .seat_labels
            .clone()
            .unwrap_or_else(|| booking.seat_labels.clone());
        if new_count == 0 {
            return Err(BookingError::Validation(
                "seat_count must be at least 1".to_string(),
            ));
        }
        if !new_labels.is_empty() {
            safar_domain::booking::validate_seat_labels(&new_labels, new_count)?;
        }
        if let Some(phone) = &patch.contact_phone {
            safar_domain::booking::validate_phone(phone)?;
        }

        let trip = self.load_trip(booking.trip_id).await?;
        if new_count > trip.remaining_capacity() {
            return Err(BookingError::Validation(format!(
                "requested {} seats but only {} remain",
                new_count,
                trip.remaining_capacity()
            )));
        }
        if new_labels != booking.seat_labels {
            let pending = self
                .bookings
                .list_pending_for_trip(trip.id)
                .await
                .map_err(BookingError::storage)?;
            let unavailable = conflict::unavailable_seats(&trip, &pending, Some(booking.id));
            conflict::check_requested(&new_labels, &unavailable)?;
        }

        let old_labels = std::mem::replace(&mut booking.seat_labels, new_labels);
        booking.seat_count = new_count;
        if let Some(phone) = patch.contact_phone {
            booking.contact_phone = safar_domain::pii::Masked(phone);
        }
        if let Some(requests) = patch.special_requests {
            booking.special_requests = Some(requests);
        }
        booking.apply_financials(finance::quote(booking.unit_price, new_count)?);

        self.bookings
            .update_booking(&booking)
            .await
            .map_err(BookingError::storage)?;

        if old_labels != booking.seat_labels {
            let released: Vec<String> = old_labels
                .iter()
                .filter(|l| !booking.seat_labels.contains(l))
                .cloned()
                .collect();
            let held: Vec<String> = booking
                .seat_labels
                .iter()
                .filter(|l| !old_labels.contains(l))
                .cloned()
                .collect();
            if !released.is_empty() {
                let _ = self.seat_feed.send(SeatEvent::now(
                    trip.id,
                    &booking.reference,
                    released,
                    SeatEventKind::Released,
                ));
            }
            if !held.is_empty() {
                let _ = self.seat_feed.send(SeatEvent::now(
                    trip.id,
                    &booking.reference,
                    held,
                    SeatEventKind::Held,
                ));
            }
        }

        Ok(booking)
    }

    /// Operator updates the payment label on an accepted booking.
    pub async fn update_payment(
        &self,
        actor: Uuid,
        booking_id: Uuid,
        update: PaymentUpdate,
    ) -> Result<Booking, BookingError> {
        if update.payment_status.is_none() && update.payment_method.is_none() {
            return Err(BookingError::Validation(
                "payment_status or payment_method is required".to_string(),
            ));
        }
        let booking = self.load_booking(booking_id).await?;
        self.ensure_operator(actor, booking.company_id).await?;

        let _guard = self.locks.acquire(booking.trip_id).await;
        let mut booking = self.load_booking(booking_id).await?;

        if booking.status != BookingStatus::Accepted {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: booking.status,
            });
        }

        if let Some(status) = update.payment_status {
            booking.payment_status = status;
        }
        if let Some(method) = update.payment_method {
            booking.payment_method = Some(method);
        }
        booking.updated_at = Utc::now();
        self.bookings
            .update_booking(&booking)
            .await
            .map_err(BookingError::storage)?;

        Ok(booking)
    }

    pub async fn list_for_requester(&self, actor: Uuid) -> Result<Vec<Booking>, BookingError> {
        self.bookings
            .list_by_requester(actor)
            .await
            .map_err(BookingError::storage)
    }

    pub async fn list_for_company(&self, actor: Uuid) -> Result<Vec<Booking>, BookingError> {
        let company = self.resolve_company(actor).await?;
        self.bookings
            .list_by_company(company)
            .await
            .map_err(BookingError::storage)
    }

    /// Counts and revenue rollups for the actor's company.
    pub async fn company_analytics(&self, actor: Uuid) -> Result<serde_json::Value, BookingError> {
        let company = self.resolve_company(actor).await?;
        let bookings = self
            .bookings
            .list_by_company(company)
            .await
            .map_err(BookingError::storage)?;
        Ok(finance::revenue_summary(&bookings, Utc::now()))
    }

    /// The availability view shown to prospective bookers.
    pub async fn seat_availability(&self, trip_id: Uuid) -> Result<SeatAvailability, BookingError> {
        let trip = self.load_trip(trip_id).await?;
        let pending = self
            .bookings
            .list_pending_for_trip(trip_id)
            .await
            .map_err(BookingError::storage)?;
        Ok(conflict::availability(&trip, &pending))
    }

    async fn load_booking(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.bookings
            .get_booking(id)
            .await
            .map_err(BookingError::storage)?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", id)))
    }

    async fn load_trip(&self, id: Uuid) -> Result<Trip, BookingError> {
        self.trips
            .get_trip(id)
            .await
            .map_err(BookingError::storage)?
            .ok_or_else(|| BookingError::NotFound(format!("trip {}", id)))
    }

    async fn ensure_operator(&self, actor: Uuid, company_id: Uuid) -> Result<(), BookingError> {
        let linked = self
            .directory
            .is_operator_for(actor, company_id)
            .await
            .map_err(BookingError::storage)?;
        if linked {
            Ok(())
        } else {
            Err(BookingError::Unauthorized(
                "actor is not linked to the trip's company".to_string(),
            ))
        }
    }

    async fn resolve_company(&self, actor: Uuid) -> Result<Uuid, BookingError> {
        self.directory
            .company_for(actor)
            .await
            .map_err(BookingError::storage)?
            .ok_or_else(|| {
                BookingError::Unauthorized("actor has no company linkage".to_string())
            })
    }

    /// Notification failures never roll back the transition that triggered
    /// them; they are logged and swallowed here.
    async fn fire(&self, request: NotificationRequest) {
        if let Err(err) = self.notifier.notify(request).await {
            tracing::warn!(error = %err, "Notification fan-out failed after state change");
        }
    }
}
