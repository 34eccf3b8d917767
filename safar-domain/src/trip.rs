use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Transportation tiers with fixed seat counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportKind {
    Van,
    Minibus,
    Bus,
}

impl TransportKind {
    pub fn capacity(&self) -> u32 {
        match self {
            TransportKind::Van => 14,
            TransportKind::Minibus => 28,
            TransportKind::Bus => 48,
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportKind::Van => "VAN",
            TransportKind::Minibus => "MINIBUS",
            TransportKind::Bus => "BUS",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VAN" => Ok(TransportKind::Van),
            "MINIBUS" => Ok(TransportKind::Minibus),
            "BUS" => Ok(TransportKind::Bus),
            other => Err(format!("unknown transport kind: {}", other)),
        }
    }
}

/// One confirmed seat slot. Every assignment references a booking that is
/// currently in state ACCEPTED.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatAssignment {
    pub seat_label: String,
    pub occupant_name: String,
    pub occupant_user_id: Uuid,
    pub booking_ref: String,
}

/// Outcome of a conditional seat claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimResult {
    /// The slot was vacant and is now held by the claiming booking.
    Claimed,
    /// The slot is already held by the same booking (retried accept).
    AlreadyOwn,
    /// The slot is held by a different booking.
    Occupied { by: String },
}

/// Label-indexed arena of confirmed seats.
///
/// Labels are pairwise distinct by construction: the only way in is
/// [`SeatMap::claim`], which refuses a slot held by another booking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatMap(BTreeMap<String, SeatAssignment>);

impl SeatMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&SeatAssignment> {
        self.0.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SeatAssignment)> {
        self.0.iter()
    }

    pub fn occupied_labels(&self) -> BTreeSet<String> {
        self.0.keys().cloned().collect()
    }

    /// Claim a slot for a booking, succeeding only if the slot is vacant or
    /// already held by the same booking reference.
    pub fn claim(&mut self, assignment: SeatAssignment) -> ClaimResult {
        match self.0.get(&assignment.seat_label) {
            Some(existing) if existing.booking_ref == assignment.booking_ref => {
                ClaimResult::AlreadyOwn
            }
            Some(existing) => ClaimResult::Occupied {
                by: existing.booking_ref.clone(),
            },
            None => {
                self.0.insert(assignment.seat_label.clone(), assignment);
                ClaimResult::Claimed
            }
        }
    }

    /// Release every slot held by the given booking, returning the freed
    /// labels. Slots held by other bookings are untouched.
    pub fn release_booking(&mut self, booking_ref: &str) -> Vec<String> {
        let released: Vec<String> = self
            .0
            .iter()
            .filter(|(_, a)| a.booking_ref == booking_ref)
            .map(|(label, _)| label.clone())
            .collect();
        for label in &released {
            self.0.remove(label);
        }
        released
    }
}

/// A scheduled departure. Content fields (title, itinerary, media) are owned
/// by the trip service; this core only reads pricing and mutates the seat
/// map through the booking state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub transport: TransportKind,
    pub capacity: u32,
    /// Operator-entered free text, presentation only.
    pub price_display: String,
    /// Typed amount extracted once at creation; the booking path never
    /// parses `price_display`.
    pub unit_price: i64,
    pub departure_date: NaiveDate,
    pub seat_map: SeatMap,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(
        company_id: Uuid,
        title: &str,
        transport: TransportKind,
        price_display: &str,
        departure_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            title: title.to_string(),
            transport,
            capacity: transport.capacity(),
            price_display: price_display.to_string(),
            unit_price: extract_unit_price(price_display),
            departure_date,
            seat_map: SeatMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.seat_map.len() as u32)
    }
}

/// First contiguous digit run in a free-text price, 0 if none.
///
/// Prices arrive in mixed formats ("500 SAR", "من 750 ريال"); a result of 0
/// marks the trip as invalidly priced and blocks bookings against it.
pub fn extract_unit_price(display: &str) -> i64 {
    let mut digits = String::new();
    for c in display.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if !digits.is_empty() {
            break;
        }
    }
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(label: &str, booking_ref: &str) -> SeatAssignment {
        SeatAssignment {
            seat_label: label.to_string(),
            occupant_name: "Huda".to_string(),
            occupant_user_id: Uuid::new_v4(),
            booking_ref: booking_ref.to_string(),
        }
    }

    #[test]
    fn capacity_tiers() {
        assert_eq!(TransportKind::Van.capacity(), 14);
        assert_eq!(TransportKind::Minibus.capacity(), 28);
        assert_eq!(TransportKind::Bus.capacity(), 48);
    }

    #[test]
    fn unit_price_extraction() {
        assert_eq!(extract_unit_price("500 SAR"), 500);
        assert_eq!(extract_unit_price("من 750 ريال"), 750);
        assert_eq!(extract_unit_price("SAR1200/seat"), 1200);
        // Only the first contiguous run counts.
        assert_eq!(extract_unit_price("1,200"), 1);
        assert_eq!(extract_unit_price("contact us"), 0);
        assert_eq!(extract_unit_price(""), 0);
    }

    #[test]
    fn claim_is_conditional_and_idempotent() {
        let mut map = SeatMap::new();
        assert_eq!(map.claim(assignment("A1", "SFR-AAA")), ClaimResult::Claimed);
        assert_eq!(
            map.claim(assignment("A1", "SFR-AAA")),
            ClaimResult::AlreadyOwn
        );
        assert_eq!(
            map.claim(assignment("A1", "SFR-BBB")),
            ClaimResult::Occupied {
                by: "SFR-AAA".to_string()
            }
        );
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn release_frees_only_the_bookings_own_seats() {
        let mut map = SeatMap::new();
        map.claim(assignment("A1", "SFR-AAA"));
        map.claim(assignment("A2", "SFR-AAA"));
        map.claim(assignment("B1", "SFR-BBB"));

        let released = map.release_booking("SFR-AAA");
        assert_eq!(released, vec!["A1".to_string(), "A2".to_string()]);
        assert_eq!(map.len(), 1);
        assert!(map.get("B1").is_some());
    }

    #[test]
    fn remaining_capacity_tracks_confirmed_seats() {
        let mut trip = Trip::new(
            Uuid::new_v4(),
            "Jeddah coast day trip",
            TransportKind::Van,
            "300",
            NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
        );
        assert_eq!(trip.remaining_capacity(), 14);
        trip.seat_map.claim(assignment("A1", "SFR-AAA"));
        assert_eq!(trip.remaining_capacity(), 13);
    }
}
