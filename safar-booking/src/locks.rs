use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-trip mutual exclusion for seat-affecting operations.
///
/// A membership check followed by a separate write lets two concurrent
/// accepts both pass the check before either writes; holding the trip's
/// lock across the read-check-write sequence closes that window. Entries
/// are never reclaimed; the map is bounded by the trip catalog.
#[derive(Default)]
pub struct TripLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl TripLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, trip_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(trip_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serializes_critical_sections_per_trip() {
        let locks = Arc::new(TripLocks::new());
        let trip_id = Uuid::new_v4();
        let counter = Arc::new(Mutex::new(0_u32));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(trip_id).await;
                // Non-atomic read-then-write; only the trip lock keeps it safe.
                let current = *counter.lock().await;
                tokio::task::yield_now().await;
                *counter.lock().await = current + 1;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*counter.lock().await, 8);
    }

    #[tokio::test]
    async fn different_trips_do_not_block_each_other() {
        let locks = TripLocks::new();
        let guard_a = locks.acquire(Uuid::new_v4()).await;
        // Acquiring a second trip's lock while holding the first must not hang.
        let _guard_b = locks.acquire(Uuid::new_v4()).await;
        drop(guard_a);
    }
}
