use chrono::{DateTime, Duration, Utc};
use safar_domain::booking::Financials;
use safar_domain::{Booking, BookingError, BookingStatus};

/// Fixed platform commission; not configurable per trip or company.
pub const COMMISSION_RATE_PERCENT: i64 = 5;

/// Price a booking at creation (or pending-edit) time. A trip whose typed
/// unit price is zero carries a malformed free-text price and must never
/// produce a free booking.
pub fn quote(unit_price: i64, seat_count: u32) -> Result<Financials, BookingError> {
    if unit_price <= 0 {
        return Err(BookingError::Validation(
            "trip has no valid unit price".to_string(),
        ));
    }
    let total_price = unit_price * i64::from(seat_count);
    let commission = total_price * COMMISSION_RATE_PERCENT / 100;
    Ok(Financials {
        unit_price,
        total_price,
        commission,
        net_to_operator: total_price - commission,
    })
}

/// Counts and revenue rollups by time window for an operator's bookings.
pub fn revenue_summary(bookings: &[Booking], now: DateTime<Utc>) -> serde_json::Value {
    let today = now.date_naive();
    serde_json::json!({
        "generated_at": now.to_rfc3339(),
        "windows": {
            "today": window_stats(bookings, |b| b.created_at.date_naive() == today),
            "last_7_days": window_stats(bookings, |b| b.created_at >= now - Duration::days(7)),
            "last_30_days": window_stats(bookings, |b| b.created_at >= now - Duration::days(30)),
            "all_time": window_stats(bookings, |_| true),
        }
    })
}

fn window_stats<F>(bookings: &[Booking], in_window: F) -> serde_json::Value
where
    F: Fn(&Booking) -> bool,
{
    let mut total = 0_u32;
    let mut pending = 0_u32;
    let mut accepted = 0_u32;
    let mut rejected = 0_u32;
    let mut cancelled = 0_u32;
    let mut seats_sold = 0_u32;
    let mut gross = 0_i64;
    let mut commission = 0_i64;
    let mut net = 0_i64;

    for booking in bookings.iter().filter(|b| in_window(b)) {
        total += 1;
        match booking.status {
            BookingStatus::Pending => pending += 1,
            BookingStatus::Accepted => {
                accepted += 1;
                seats_sold += booking.seat_count;
                gross += booking.total_price;
                commission += booking.commission;
                net += booking.net_to_operator;
            }
            BookingStatus::Rejected => rejected += 1,
            BookingStatus::Cancelled => cancelled += 1,
        }
    }

    serde_json::json!({
        "bookings": {
            "total": total,
            "pending": pending,
            "accepted": accepted,
            "rejected": rejected,
            "cancelled": cancelled,
        },
        "seats_sold": seats_sold,
        "revenue": {
            "gross": gross,
            "commission": commission,
            "net_to_operator": net,
        }
    })
}
