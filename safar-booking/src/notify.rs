use async_trait::async_trait;
use safar_core::NotificationRepository;
use safar_domain::{Notification, NotificationKind};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Input to the fan-out. `recipient_id` is optional so callers can pass an
/// unresolved lookup straight through.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub recipient_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub metadata: serde_json::Value,
}

/// Narrow contract between the booking core and notification delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Create and deliver one notification. Returns `None` without side
    /// effect when the recipient is absent or is the acting party.
    async fn notify(
        &self,
        request: NotificationRequest,
    ) -> Result<Option<Notification>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Persists notifications and pushes them to live subscriber sessions over
/// a broadcast channel (drained by the SSE layer). Live delivery is
/// best-effort and at-most-once; the persisted record is the source of
/// truth either way.
pub struct FanoutNotifier {
    store: Arc<dyn NotificationRepository>,
    live: broadcast::Sender<Notification>,
}

impl FanoutNotifier {
    pub fn new(store: Arc<dyn NotificationRepository>, live: broadcast::Sender<Notification>) -> Self {
        Self { store, live }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(
        &self,
        request: NotificationRequest,
    ) -> Result<Option<Notification>, Box<dyn std::error::Error + Send + Sync>> {
        let recipient_id = match request.recipient_id {
            Some(id) if id != request.actor_id => id,
            _ => return Ok(None),
        };

        let notification = Notification::new(
            recipient_id,
            request.actor_id,
            request.kind,
            request.message,
            request.metadata,
        );
        self.store.create_notification(&notification).await?;

        // No subscribers is not a failure.
        let _ = self.live.send(notification.clone());

        tracing::debug!(
            recipient = %recipient_id,
            kind = %notification.kind,
            "Notification created"
        );
        Ok(Some(notification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safar_store::MemoryStore;

    fn fanout() -> (Arc<MemoryStore>, broadcast::Receiver<Notification>, FanoutNotifier) {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = broadcast::channel(8);
        let notifier = FanoutNotifier::new(store.clone(), tx);
        (store, rx, notifier)
    }

    fn request(recipient: Option<Uuid>, actor: Uuid) -> NotificationRequest {
        NotificationRequest {
            recipient_id: recipient,
            actor_id: actor,
            kind: NotificationKind::BookingAccepted,
            message: "Your booking SFR-TEST was accepted".to_string(),
            metadata: serde_json::json!({"booking_reference": "SFR-TEST"}),
        }
    }

    #[tokio::test]
    async fn persists_and_pushes_to_live_sessions() {
        let (store, mut rx, notifier) = fanout();
        let recipient = Uuid::new_v4();

        let created = notifier
            .notify(request(Some(recipient), Uuid::new_v4()))
            .await
            .unwrap()
            .expect("notification created");

        let stored = store.list_for_recipient(recipient).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, created.id);

        let pushed = rx.recv().await.unwrap();
        assert_eq!(pushed.id, created.id);
    }

    #[tokio::test]
    async fn never_notifies_the_actor_about_their_own_action() {
        let (store, _rx, notifier) = fanout();
        let actor = Uuid::new_v4();

        let created = notifier.notify(request(Some(actor), actor)).await.unwrap();
        assert!(created.is_none());
        assert!(store.list_for_recipient(actor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_recipient_is_a_quiet_no_op() {
        let (_store, _rx, notifier) = fanout();
        let created = notifier.notify(request(None, Uuid::new_v4())).await.unwrap();
        assert!(created.is_none());
    }

    #[tokio::test]
    async fn delivery_without_subscribers_still_persists() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        let notifier = FanoutNotifier::new(store.clone(), tx);
        let recipient = Uuid::new_v4();

        let created = notifier
            .notify(request(Some(recipient), Uuid::new_v4()))
            .await
            .unwrap();
        assert!(created.is_some());
        assert_eq!(store.list_for_recipient(recipient).await.unwrap().len(), 1);
    }
}
