use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures_util::Stream;
use safar_booking::SeatAvailability;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips/{id}/seats", get(seat_availability))
        .route("/v1/trips/{id}/stream", get(stream_seat_activity))
}

/// GET /v1/trips/{id}/seats
/// The true availability shown to a prospective booker: confirmed seats
/// plus every pending booking's provisional holds.
async fn seat_availability(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<SeatAvailability>, AppError> {
    Ok(Json(state.engine.seat_availability(trip_id).await?))
}

/// GET /v1/trips/{id}/stream
/// Live seat activity for one trip over SSE, so open seat pickers refresh
/// without polling. Best-effort; reconnecting clients re-read the
/// availability endpoint.
async fn stream_seat_activity(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.seat_feed.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.trip_id == trip_id => Event::default()
            .event("seat_activity")
            .json_data(&event)
            .ok()
            .map(Ok::<Event, Infallible>),
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
