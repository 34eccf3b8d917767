use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::BookingError;
use crate::pii::Masked;
use crate::trip::Trip;

/// Primary booking state.
///
/// `Rejected` and `Cancelled` are terminal; there is no way back to
/// `Pending` from any other state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Rejected | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Accepted => "ACCEPTED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "ACCEPTED" => Ok(BookingStatus::Accepted),
            "REJECTED" => Ok(BookingStatus::Rejected),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// Secondary state tracked as a label only; no payment processing happens
/// in this system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    PartiallyPaid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::PartiallyPaid => "PARTIALLY_PAID",
            PaymentStatus::Refunded => "REFUNDED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "PARTIALLY_PAID" => Ok(PaymentStatus::PartiallyPaid),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// Monetary breakdown of a booking, fixed at creation time.
///
/// Only an explicit pending-state edit may replace these values; nothing
/// recomputes them silently after acceptance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Financials {
    pub unit_price: i64,
    pub total_price: i64,
    pub commission: i64,
    pub net_to_operator: i64,
}

/// A request for N seats on a trip, owned jointly by the traveler and the
/// trip's company until resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    /// Human-readable reference, generated once, immutable.
    pub reference: String,
    pub trip_id: Uuid,
    pub company_id: Uuid,
    pub requester_id: Uuid,
    pub seat_count: u32,
    /// Empty for capacity-only bookings (no per-seat selection).
    pub seat_labels: Vec<String>,
    pub travel_date: NaiveDate,
    /// Name shown on confirmed seat assignments.
    pub contact_name: String,
    pub contact_phone: Masked<String>,
    pub special_requests: Option<String>,
    pub unit_price: i64,
    pub total_price: i64,
    pub commission: i64,
    pub net_to_operator: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub status_updated_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        trip: &Trip,
        requester_id: Uuid,
        request: &CreateBookingRequest,
        financials: Financials,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            reference: generate_reference(),
            trip_id: trip.id,
            company_id: trip.company_id,
            requester_id,
            seat_count: request.seat_count,
            seat_labels: request.seat_labels.clone(),
            travel_date: request.travel_date,
            contact_name: request.contact_name.clone(),
            contact_phone: Masked(request.contact_phone.clone()),
            special_requests: request.special_requests.clone(),
            unit_price: financials.unit_price,
            total_price: financials.total_price,
            commission: financials.commission,
            net_to_operator: financials.net_to_operator,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            status_updated_at: now,
            rejection_reason: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to a new primary state, stamping the audit timestamps.
    pub fn update_status(&mut self, new_status: BookingStatus) {
        self.status = new_status;
        let now = Utc::now();
        self.status_updated_at = now;
        self.updated_at = now;
    }

    /// Replace the financial fields as part of an explicit pending edit.
    pub fn apply_financials(&mut self, financials: Financials) {
        self.unit_price = financials.unit_price;
        self.total_price = financials.total_price;
        self.commission = financials.commission;
        self.net_to_operator = financials.net_to_operator;
        self.updated_at = Utc::now();
    }
}

/// References look like `SFR-3F9A21C4D0`: short enough to read over the
/// phone, random enough to never collide in practice.
pub fn generate_reference() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("SFR-{}", hex[..10].to_uppercase())
}

/// Body of `POST /v1/bookings`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    pub seat_count: u32,
    #[serde(default)]
    pub seat_labels: Vec<String>,
    pub travel_date: NaiveDate,
    pub contact_name: String,
    pub contact_phone: String,
    pub special_requests: Option<String>,
}

impl CreateBookingRequest {
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.seat_count == 0 {
            return Err(BookingError::Validation(
                "seat_count must be at least 1".to_string(),
            ));
        }
        if !self.seat_labels.is_empty() {
            validate_seat_labels(&self.seat_labels, self.seat_count)?;
        }
        if self.contact_name.trim().is_empty() {
            return Err(BookingError::Validation(
                "contact_name is required".to_string(),
            ));
        }
        validate_phone(&self.contact_phone)?;
        Ok(())
    }
}

/// Requester-editable fields; legal only while the booking is pending.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPatch {
    pub seat_count: Option<u32>,
    pub seat_labels: Option<Vec<String>>,
    pub contact_phone: Option<String>,
    pub special_requests: Option<String>,
}

impl BookingPatch {
    pub fn is_empty(&self) -> bool {
        self.seat_count.is_none()
            && self.seat_labels.is_none()
            && self.contact_phone.is_none()
            && self.special_requests.is_none()
    }
}

/// Body of `PUT /v1/bookings/{id}/payment`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentUpdate {
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<String>,
}

pub fn validate_seat_labels(labels: &[String], seat_count: u32) -> Result<(), BookingError> {
    if labels.len() != seat_count as usize {
        return Err(BookingError::Validation(format!(
            "seat_labels count ({}) does not match seat_count ({})",
            labels.len(),
            seat_count
        )));
    }
    let mut seen = std::collections::BTreeSet::new();
    for label in labels {
        if label.trim().is_empty() {
            return Err(BookingError::Validation(
                "seat labels must not be empty".to_string(),
            ));
        }
        if !seen.insert(label.as_str()) {
            return Err(BookingError::Validation(format!(
                "duplicate seat label: {}",
                label
            )));
        }
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), BookingError> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let valid_chars = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
    if digits < 7 || !valid_chars {
        return Err(BookingError::Validation(
            "contact_phone is not a valid phone number".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trip::{TransportKind, Trip};

    fn sample_trip() -> Trip {
        Trip::new(
            Uuid::new_v4(),
            "Riyadh - Abha weekend",
            TransportKind::Bus,
            "500 SAR",
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        )
    }

    fn sample_request(trip_id: Uuid) -> CreateBookingRequest {
        CreateBookingRequest {
            trip_id,
            seat_count: 2,
            seat_labels: vec!["A1".to_string(), "A2".to_string()],
            travel_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            contact_name: "Huda".to_string(),
            contact_phone: "+966 50 123 4567".to_string(),
            special_requests: None,
        }
    }

    #[test]
    fn new_booking_starts_pending_with_fixed_financials() {
        let trip = sample_trip();
        let request = sample_request(trip.id);
        let financials = Financials {
            unit_price: 500,
            total_price: 1000,
            commission: 50,
            net_to_operator: 950,
        };
        let booking = Booking::new(&trip, Uuid::new_v4(), &request, financials);

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.total_price, 1000);
        assert_eq!(booking.commission, 50);
        assert_eq!(booking.net_to_operator, 950);
        assert!(booking.reference.starts_with("SFR-"));
        assert_eq!(booking.reference.len(), "SFR-".len() + 10);
    }

    #[test]
    fn references_are_unique() {
        let a = generate_reference();
        let b = generate_reference();
        assert_ne!(a, b);
    }

    #[test]
    fn label_count_must_match_seat_count() {
        let mut request = sample_request(Uuid::new_v4());
        request.seat_count = 3;
        assert!(matches!(
            request.validate(),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn duplicate_labels_rejected() {
        let mut request = sample_request(Uuid::new_v4());
        request.seat_labels = vec!["A1".to_string(), "A1".to_string()];
        assert!(matches!(
            request.validate(),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn capacity_only_request_is_valid_without_labels() {
        let mut request = sample_request(Uuid::new_v4());
        request.seat_labels = vec![];
        assert!(request.validate().is_ok());
    }

    #[test]
    fn malformed_phone_rejected() {
        let mut request = sample_request(Uuid::new_v4());
        request.contact_phone = "call me".to_string();
        assert!(matches!(
            request.validate(),
            Err(BookingError::Validation(_))
        ));
    }
}
