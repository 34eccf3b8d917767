use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use serde_json::json;

use crate::state::AppState;

pub struct Metrics {
    registry: Registry,
    pub bookings_created: IntCounter,
    pub bookings_accepted: IntCounter,
    pub bookings_rejected: IntCounter,
    pub bookings_cancelled: IntCounter,
    pub seat_conflicts: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let bookings_created =
            IntCounter::new("safar_bookings_created_total", "Bookings created")
                .expect("counter definition");
        let bookings_accepted =
            IntCounter::new("safar_bookings_accepted_total", "Bookings accepted")
                .expect("counter definition");
        let bookings_rejected =
            IntCounter::new("safar_bookings_rejected_total", "Bookings rejected")
                .expect("counter definition");
        let bookings_cancelled =
            IntCounter::new("safar_bookings_cancelled_total", "Bookings cancelled")
                .expect("counter definition");
        let seat_conflicts = IntCounter::new(
            "safar_seat_conflicts_total",
            "Booking attempts refused because a requested seat was taken",
        )
        .expect("counter definition");

        for counter in [
            &bookings_created,
            &bookings_accepted,
            &bookings_rejected,
            &bookings_cancelled,
            &seat_conflicts,
        ] {
            registry
                .register(Box::new(counter.clone()))
                .expect("counter registration");
        }

        Self {
            registry,
            bookings_created,
            bookings_accepted,
            bookings_rejected,
            bookings_cancelled,
            seat_conflicts,
        }
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(render_metrics))
        .route("/healthz", get(healthz))
}

async fn render_metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .render()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    let redis = match state.redis.ping().await {
        Ok(()) => "up",
        Err(_) => "down",
    };
    Json(json!({ "status": "ok", "redis": redis }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_in_text_format() {
        let metrics = Metrics::new();
        metrics.bookings_created.inc();
        metrics.seat_conflicts.inc();

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("safar_bookings_created_total 1"));
        assert!(rendered.contains("safar_seat_conflicts_total 1"));
    }
}
