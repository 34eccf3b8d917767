use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use safar_domain::BookingError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Authentication(String),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message, seats) = match &self {
            AppError::Authentication(msg) => (
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::Booking(err) => {
                let status = match err {
                    BookingError::Validation(_)
                    | BookingError::SeatConflict { .. }
                    | BookingError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
                    BookingError::Unauthorized(_) => StatusCode::FORBIDDEN,
                    BookingError::NotFound(_) => StatusCode::NOT_FOUND,
                    BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Internal error: {}", err);
                }
                let seats = match err {
                    BookingError::SeatConflict { seats } => Some(seats.clone()),
                    _ => None,
                };
                (status, err.kind(), err.to_string(), seats)
            }
            AppError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal Server Error".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "kind": kind,
            "message": message,
        });
        if let Some(seats) = seats {
            error["seats"] = json!(seats);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
