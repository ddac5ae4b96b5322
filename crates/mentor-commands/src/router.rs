use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use mentor_core::events::{EventKind, GatewayEvent};

/// A subsystem interested in non-message gateway events.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    fn name(&self) -> &'static str;
    async fn handle(&self, event: &GatewayEvent) -> anyhow::Result<()>;
}

/// Fan-out router: subscribers for the same event run concurrently and
/// independently; one failing subscriber never affects the others.
pub struct Router {
    subscribers: Vec<(EventKind, Arc<dyn EventSubscriber>)>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, kind: EventKind, subscriber: Arc<dyn EventSubscriber>) {
        debug!(name = subscriber.name(), ?kind, "event subscriber registered");
        self.subscribers.push((kind, subscriber));
    }

    /// Dispatch an event to every matching subscriber, each on its own task.
    pub fn dispatch(&self, event: GatewayEvent) {
        let kind = event.kind();
        let event = Arc::new(event);
        for (_, subscriber) in self.subscribers.iter().filter(|(k, _)| *k == kind) {
            let subscriber = Arc::clone(subscriber);
            let event = Arc::clone(&event);
            tokio::spawn(async move {
                if let Err(e) = subscriber.handle(&event).await {
                    warn!(name = subscriber.name(), error = %e, "event subscriber failed");
                }
            });
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Recorder {
        hits: Arc<AtomicU32>,
        fail: bool,
    }

    #[async_trait]
    impl EventSubscriber for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn handle(&self, _event: &GatewayEvent) -> anyhow::Result<()> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("subscriber exploded");
            }
            Ok(())
        }
    }

    fn join_event() -> GatewayEvent {
        GatewayEvent::MemberJoin {
            guild_id: 1,
            user_id: 2,
            user_name: "newcomer".into(),
        }
    }

    #[tokio::test]
    async fn fan_out_reaches_all_matching_subscribers() {
        let a = Arc::new(AtomicU32::new(0));
        let b = Arc::new(AtomicU32::new(0));
        let mut router = Router::new();
        router.subscribe(
            EventKind::MemberJoin,
            Arc::new(Recorder { hits: Arc::clone(&a), fail: false }),
        );
        router.subscribe(
            EventKind::MemberJoin,
            Arc::new(Recorder { hits: Arc::clone(&b), fail: true }),
        );
        router.subscribe(
            EventKind::MemberLeave,
            Arc::new(Recorder { hits: Arc::new(AtomicU32::new(0)), fail: false }),
        );

        router.dispatch(join_event());
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Both join subscribers ran; the failing one did not block the other.
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_matching_kind_is_skipped() {
        let hits = Arc::new(AtomicU32::new(0));
        let mut router = Router::new();
        router.subscribe(
            EventKind::InviteCreate,
            Arc::new(Recorder { hits: Arc::clone(&hits), fail: false }),
        );

        router.dispatch(join_event());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
