use std::net::SocketAddr;
use std::sync::Arc;

use safar_api::{app, metrics::Metrics, state::{AppState, AuthSettings}};
use safar_booking::{BookingEngine, FanoutNotifier};
use safar_core::directory::InMemoryDirectory;
use safar_core::{BookingRepository, NotificationRepository, OperatorDirectory, TripRepository};
use safar_store::{MemoryStore, PgDirectory, PgStore, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safar_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = safar_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Safar API on port {}", config.server.port);

    let redis = Arc::new(RedisClient::new(&config.redis.url).expect("Invalid Redis URL"));

    let capacity = config.business_rules.live_channel_capacity;
    let (notification_feed, _) = tokio::sync::broadcast::channel(capacity);
    let (seat_feed, _) = tokio::sync::broadcast::channel(capacity);

    // Postgres when configured, the in-memory store otherwise
    let (bookings, trips, notifications, directory): (
        Arc<dyn BookingRepository>,
        Arc<dyn TripRepository>,
        Arc<dyn NotificationRepository>,
        Arc<dyn OperatorDirectory>,
    ) = match &config.database.url {
        Some(url) => {
            let store = Arc::new(
                PgStore::connect(url)
                    .await
                    .expect("Failed to connect to Postgres"),
            );
            let directory = Arc::new(PgDirectory::new(store.pool()));
            (store.clone(), store.clone(), store, directory)
        }
        None => {
            tracing::warn!("No database.url configured; using the in-memory store");
            let store = Arc::new(MemoryStore::new());
            let directory = Arc::new(InMemoryDirectory::new());
            (store.clone(), store.clone(), store, directory)
        }
    };

    let notifier = Arc::new(FanoutNotifier::new(
        notifications.clone(),
        notification_feed.clone(),
    ));
    let engine = Arc::new(BookingEngine::new(
        bookings,
        trips,
        directory,
        notifier,
        seat_feed.clone(),
    ));

    let state = AppState {
        engine,
        notifications,
        notification_feed,
        seat_feed,
        redis,
        auth: AuthSettings {
            secret: config.auth.jwt_secret.clone(),
            expiration_seconds: config.auth.jwt_expiration_seconds,
        },
        metrics: Arc::new(Metrics::new()),
        rate_limit_per_minute: config.business_rules.rate_limit_requests_per_minute,
    };

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
