use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    BookingRequested,
    BookingAccepted,
    BookingRejected,
    BookingCancelled,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::BookingRequested => "BOOKING_REQUESTED",
            NotificationKind::BookingAccepted => "BOOKING_ACCEPTED",
            NotificationKind::BookingRejected => "BOOKING_REJECTED",
            NotificationKind::BookingCancelled => "BOOKING_CANCELLED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOKING_REQUESTED" => Ok(NotificationKind::BookingRequested),
            "BOOKING_ACCEPTED" => Ok(NotificationKind::BookingAccepted),
            "BOOKING_REJECTED" => Ok(NotificationKind::BookingRejected),
            "BOOKING_CANCELLED" => Ok(NotificationKind::BookingCancelled),
            other => Err(format!("unknown notification kind: {}", other)),
        }
    }
}

/// A message for one recipient, created as a side effect of a booking-state
/// change. Never created when the recipient is the acting party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    /// Free-form bag: booking reference, trip id, and the specific
    /// sub-event (e.g. assigned seat labels).
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: NotificationKind,
        message: String,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            actor_id,
            kind,
            message,
            metadata,
            created_at: Utc::now(),
        }
    }
}
