use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Json, Router,
};
use futures_util::Stream;
use safar_domain::Notification;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::error::AppError;
use crate::middleware::auth::Actor;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/notifications/stream", get(stream_notifications))
}

/// GET /v1/notifications
/// The actor's persisted notifications, newest first. Live delivery is
/// best-effort; this ledger is the source of truth.
async fn list_notifications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = state
        .notifications
        .list_for_recipient(actor.id)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("{}", e)))?;
    Ok(Json(notifications))
}

/// GET /v1/notifications/stream
/// Push notifications for the authenticated recipient over SSE.
async fn stream_notifications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let recipient = actor.id;
    let rx = state.notification_feed.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(notification) if notification.recipient_id == recipient => Event::default()
            .event("notification")
            .json_data(&notification)
            .ok()
            .map(Ok::<Event, Infallible>),
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
