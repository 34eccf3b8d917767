use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use safar_domain::booking::{BookingPatch, CreateBookingRequest, PaymentUpdate};
use safar_domain::{Booking, BookingError};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Actor;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ReasonBody {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct CancelBody {
    reason: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/mine", get(list_mine))
        .route("/v1/bookings/company", get(list_company))
        .route("/v1/bookings/analytics", get(analytics))
        .route("/v1/bookings/{id}", put(edit_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/accept", post(accept_booking))
        .route("/v1/bookings/{id}/reject", post(reject_booking))
        .route(
            "/v1/bookings/{id}/cancel-by-company",
            post(cancel_by_company),
        )
        .route("/v1/bookings/{id}/payment", put(update_payment))
}

/// POST /v1/bookings
/// Create a pending booking; requested seats become provisionally held.
async fn create_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let result = state.engine.create_booking(actor.id, request).await;
    match &result {
        Ok(_) => state.metrics.bookings_created.inc(),
        Err(BookingError::SeatConflict { .. }) => state.metrics.seat_conflicts.inc(),
        Err(_) => {}
    }
    Ok((StatusCode::CREATED, Json(result?)))
}

/// GET /v1/bookings/mine
async fn list_mine(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.engine.list_for_requester(actor.id).await?))
}

/// GET /v1/bookings/company
async fn list_company(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.engine.list_for_company(actor.id).await?))
}

/// GET /v1/bookings/analytics
/// Counts and revenue rollups by time window for the actor's company.
async fn analytics(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(state.engine.company_analytics(actor.id).await?))
}

/// PUT /v1/bookings/{id}
/// Requester edit, pending bookings only.
async fn edit_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.engine.edit_booking(actor.id, id, patch).await?))
}

/// POST /v1/bookings/{id}/cancel
/// Requester cancellation; the body and its reason are optional.
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<Booking>, AppError> {
    let reason = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<CancelBody>(&body)
            .map_err(|e| BookingError::Validation(format!("invalid body: {}", e)))?
            .reason
    };
    let booking = state.engine.cancel_by_requester(actor.id, id, reason).await?;
    state.metrics.bookings_cancelled.inc();
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/accept
async fn accept_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let result = state.engine.accept(actor.id, id).await;
    match &result {
        Ok(_) => state.metrics.bookings_accepted.inc(),
        Err(BookingError::SeatConflict { .. }) => state.metrics.seat_conflicts.inc(),
        Err(_) => {}
    }
    Ok(Json(result?))
}

/// POST /v1/bookings/{id}/reject
async fn reject_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.engine.reject(actor.id, id, body.reason).await?;
    state.metrics.bookings_rejected.inc();
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/cancel-by-company
async fn cancel_by_company(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .engine
        .cancel_by_company(actor.id, id, body.reason)
        .await?;
    state.metrics.bookings_cancelled.inc();
    Ok(Json(booking))
}

/// PUT /v1/bookings/{id}/payment
async fn update_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(update): Json<PaymentUpdate>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.engine.update_payment(actor.id, id, update).await?))
}
