use crate::booking::BookingStatus;

/// Errors surfaced by the booking core.
///
/// Storage failures are carried as opaque strings so repository backends can
/// stay behind `Box<dyn Error>` trait objects.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Seats unavailable: {}", .seats.join(", "))]
    SeatConflict { seats: Vec<String> },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl BookingError {
    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        Self::Storage(err.to_string())
    }

    /// Machine-readable kind, used by the API error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "VALIDATION_ERROR",
            BookingError::SeatConflict { .. } => "SEAT_CONFLICT",
            BookingError::InvalidTransition { .. } => "INVALID_TRANSITION",
            BookingError::Unauthorized(_) => "AUTHORIZATION_ERROR",
            BookingError::NotFound(_) => "NOT_FOUND",
            BookingError::Storage(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_conflict_names_the_seats() {
        let err = BookingError::SeatConflict {
            seats: vec!["A1".to_string(), "A2".to_string()],
        };
        assert_eq!(err.to_string(), "Seats unavailable: A1, A2");
        assert_eq!(err.kind(), "SEAT_CONFLICT");
    }

    #[test]
    fn invalid_transition_reports_both_states() {
        let err = BookingError::InvalidTransition {
            from: BookingStatus::Cancelled,
            to: BookingStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from CANCELLED to CANCELLED"
        );
    }
}
