use safar_domain::{Booking, BookingError, Trip};
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

/// The complete set of seat labels a new booker must treat as taken:
/// the trip's confirmed seats plus the requested labels of every *other*
/// pending booking. Pending requests reserve their seats provisionally so
/// two concurrent bookers are never shown the same seat as free.
pub fn unavailable_seats(
    trip: &Trip,
    pending: &[Booking],
    exclude_booking: Option<Uuid>,
) -> BTreeSet<String> {
    let mut unavailable = trip.seat_map.occupied_labels();
    for booking in pending {
        if Some(booking.id) == exclude_booking {
            continue;
        }
        // Capacity-only bookings carry no labels and hold nothing here.
        for label in &booking.seat_labels {
            unavailable.insert(label.clone());
        }
    }
    unavailable
}

/// Reject a request whose labels intersect the unavailable set, naming the
/// exact conflicting seats. Requests without labels never conflict.
pub fn check_requested(
    requested: &[String],
    unavailable: &BTreeSet<String>,
) -> Result<(), BookingError> {
    let conflicts: Vec<String> = requested
        .iter()
        .filter(|label| unavailable.contains(*label))
        .cloned()
        .collect();
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(BookingError::SeatConflict { seats: conflicts })
    }
}

/// Availability view shown to a prospective booker.
#[derive(Debug, Clone, Serialize)]
pub struct SeatAvailability {
    pub trip_id: Uuid,
    pub capacity: u32,
    pub unavailable: Vec<String>,
    pub confirmed_count: usize,
    pub pending_held_count: usize,
}

pub fn availability(trip: &Trip, pending: &[Booking]) -> SeatAvailability {
    let unavailable = unavailable_seats(trip, pending, None);
    let confirmed_count = trip.seat_map.len();
    SeatAvailability {
        trip_id: trip.id,
        capacity: trip.capacity,
        pending_held_count: unavailable.len() - confirmed_count,
        confirmed_count,
        unavailable: unavailable.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use safar_domain::booking::{CreateBookingRequest, Financials};
    use safar_domain::trip::{SeatAssignment, TransportKind};

    fn trip() -> Trip {
        Trip::new(
            Uuid::new_v4(),
            "Riyadh - AlUla",
            TransportKind::Bus,
            "500",
            NaiveDate::from_ymd_opt(2026, 11, 5).unwrap(),
        )
    }

    fn pending_booking(trip: &Trip, labels: &[&str]) -> Booking {
        let request = CreateBookingRequest {
            trip_id: trip.id,
            seat_count: labels.len().max(1) as u32,
            seat_labels: labels.iter().map(|s| s.to_string()).collect(),
            travel_date: trip.departure_date,
            contact_name: "Salem".to_string(),
            contact_phone: "0501234567".to_string(),
            special_requests: None,
        };
        let financials = Financials {
            unit_price: 500,
            total_price: 500 * labels.len().max(1) as i64,
            commission: 25 * labels.len().max(1) as i64,
            net_to_operator: 475 * labels.len().max(1) as i64,
        };
        Booking::new(trip, Uuid::new_v4(), &request, financials)
    }

    #[test]
    fn unavailable_is_union_of_confirmed_and_other_pending() {
        let mut trip = trip();
        trip.seat_map.claim(SeatAssignment {
            seat_label: "A1".to_string(),
            occupant_name: "Huda".to_string(),
            occupant_user_id: Uuid::new_v4(),
            booking_ref: "SFR-CONFIRMED".to_string(),
        });
        let pending = vec![pending_booking(&trip, &["B1", "B2"])];

        let unavailable = unavailable_seats(&trip, &pending, None);
        assert_eq!(
            unavailable,
            ["A1", "B1", "B2"]
                .iter()
                .map(|s| s.to_string())
                .collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn excluded_booking_does_not_block_itself() {
        let trip = trip();
        let mine = pending_booking(&trip, &["B1"]);
        let pending = vec![mine.clone()];

        let unavailable = unavailable_seats(&trip, &pending, Some(mine.id));
        assert!(unavailable.is_empty());
    }

    #[test]
    fn capacity_only_bookings_hold_no_seats() {
        let trip = trip();
        let pending = vec![pending_booking(&trip, &[])];
        assert!(unavailable_seats(&trip, &pending, None).is_empty());
    }

    #[test]
    fn conflict_names_the_exact_seats() {
        let trip = trip();
        let pending = vec![pending_booking(&trip, &["A1", "A2"])];
        let unavailable = unavailable_seats(&trip, &pending, None);

        let err = check_requested(&["A1".to_string(), "C4".to_string()], &unavailable)
            .expect_err("A1 is held");
        match err {
            BookingError::SeatConflict { seats } => assert_eq!(seats, vec!["A1".to_string()]),
            other => panic!("expected SeatConflict, got {:?}", other),
        }

        assert!(check_requested(&["C4".to_string()], &unavailable).is_ok());
        assert!(check_requested(&[], &unavailable).is_ok());
    }

    #[test]
    fn availability_view_counts_pending_holds() {
        let mut trip = trip();
        trip.seat_map.claim(SeatAssignment {
            seat_label: "A1".to_string(),
            occupant_name: "Huda".to_string(),
            occupant_user_id: Uuid::new_v4(),
            booking_ref: "SFR-CONFIRMED".to_string(),
        });
        let pending = vec![pending_booking(&trip, &["B1"])];

        let view = availability(&trip, &pending);
        assert_eq!(view.capacity, 48);
        assert_eq!(view.confirmed_count, 1);
        assert_eq!(view.pending_held_count, 1);
        assert_eq!(view.unavailable, vec!["A1".to_string(), "B1".to_string()]);
    }
}
