use safar_booking::BookingEngine;
use safar_core::NotificationRepository;
use safar_domain::events::SeatEvent;
use safar_domain::Notification;
use safar_store::RedisClient;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthSettings {
    pub secret: String,
    pub expiration_seconds: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub notification_feed: broadcast::Sender<Notification>,
    pub seat_feed: broadcast::Sender<SeatEvent>,
    pub redis: Arc<RedisClient>,
    pub auth: AuthSettings,
    pub metrics: Arc<Metrics>,
    pub rate_limit_per_minute: i64,
}
