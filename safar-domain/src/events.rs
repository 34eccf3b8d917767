use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatEventKind {
    /// Seats provisionally held by a new pending booking.
    Held,
    /// Seats materialized into the confirmed map on acceptance.
    Confirmed,
    /// Seats freed by a cancellation or rejection.
    Released,
}

/// Seat activity on one trip, pushed to live subscriber sessions so open
/// seat pickers refresh without polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatEvent {
    pub trip_id: Uuid,
    pub booking_reference: String,
    pub seats: Vec<String>,
    pub kind: SeatEventKind,
    pub occurred_at: DateTime<Utc>,
}

impl SeatEvent {
    pub fn now(
        trip_id: Uuid,
        booking_reference: &str,
        seats: Vec<String>,
        kind: SeatEventKind,
    ) -> Self {
        Self {
            trip_id,
            booking_reference: booking_reference.to_string(),
            seats,
            kind,
            occurred_at: Utc::now(),
        }
    }
}
