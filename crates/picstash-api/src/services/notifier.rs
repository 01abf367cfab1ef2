//! In-memory notification hub for per-image terminal events.
//!
//! Subscriptions are process-local and never persisted: the hub itself never
//! replays an already-published event. Late subscribers are handled at the
//! route layer instead, which synthesizes the event from the persisted image
//! status. Both event kinds (`completed`, `failed`) are terminal, so
//! publishing also tears down every live connection for that image, which is
//! what ends the SSE streams on the HTTP side.

use futures::Stream;
use picstash_core::models::ImageEvent;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Per-connection channel capacity. A connection only ever receives one
/// event, so a small buffer is enough to keep `publish` non-blocking.
const SUBSCRIBER_BUFFER: usize = 8;

type ConnectionMap = HashMap<Uuid, HashMap<Uuid, mpsc::Sender<ImageEvent>>>;

/// Registry mapping image id to its live subscriber connections.
pub struct ImageNotifier {
    subscribers: Mutex<ConnectionMap>,
}

impl ImageNotifier {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    // A poisoned lock only means a subscriber task panicked mid-update; the
    // map itself stays usable.
    fn lock_subscribers(&self) -> MutexGuard<'_, ConnectionMap> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a new connection for the image. The returned subscription is
    /// a stream of events; dropping it deregisters the connection.
    pub fn subscribe(self: &Arc<Self>, image_id: Uuid) -> EventSubscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let connection_id = Uuid::new_v4();
        self.lock_subscribers()
            .entry(image_id)
            .or_default()
            .insert(connection_id, tx);
        tracing::debug!(image_id = %image_id, connection_id = %connection_id, "Image event subscription opened");

        EventSubscription {
            image_id,
            connection_id,
            rx,
            hub: Arc::clone(self),
        }
    }

    /// Deliver a terminal event to every live connection for its image.
    ///
    /// Connections are taken out of the registry before delivery, so each
    /// stream yields the event and then ends. Publishing with no subscribers
    /// is a silent no-op. Returns the number of connections reached.
    pub fn publish(&self, event: &ImageEvent) -> usize {
        let image_id = event.image_id();
        let connections = match self.lock_subscribers().remove(&image_id) {
            Some(connections) => connections,
            None => return 0,
        };

        let mut delivered = 0;
        for (connection_id, sender) in connections {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::debug!(
                        image_id = %image_id,
                        connection_id = %connection_id,
                        error = %err,
                        "Dropping undeliverable image event"
                    );
                }
            }
        }

        tracing::debug!(image_id = %image_id, subscribers = delivered, "Image event published");
        delivered
    }

    fn unsubscribe(&self, image_id: Uuid, connection_id: Uuid) {
        let mut subscribers = self.lock_subscribers();
        if let Some(connections) = subscribers.get_mut(&image_id) {
            connections.remove(&connection_id);
            if connections.is_empty() {
                subscribers.remove(&image_id);
            }
        }
    }

    /// Live connections for one image.
    pub fn subscriber_count(&self, image_id: Uuid) -> usize {
        self.lock_subscribers()
            .get(&image_id)
            .map_or(0, |connections| connections.len())
    }

    /// Live connections across all images.
    pub fn total_subscriber_count(&self) -> usize {
        self.lock_subscribers()
            .values()
            .map(|connections| connections.len())
            .sum()
    }
}

impl Default for ImageNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// One live connection's view of the hub. Yields the terminal event when it
/// is published, then ends. Dropping the subscription deregisters it.
pub struct EventSubscription {
    image_id: Uuid,
    connection_id: Uuid,
    rx: mpsc::Receiver<ImageEvent>,
    hub: Arc<ImageNotifier>,
}

impl Stream for EventSubscription {
    type Item = ImageEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ImageEvent>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.image_id, self.connection_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use picstash_core::models::IMAGE_PROCESSED_MESSAGE;

    #[tokio::test]
    async fn test_publish_fans_out_to_all_subscribers() {
        let hub = Arc::new(ImageNotifier::new());
        let image_id = Uuid::new_v4();
        let mut first = hub.subscribe(image_id);
        let mut second = hub.subscribe(image_id);
        assert_eq!(hub.subscriber_count(image_id), 2);

        let event = ImageEvent::completed(image_id, IMAGE_PROCESSED_MESSAGE, "http://files/x.jpg");
        assert_eq!(hub.publish(&event), 2);

        assert_eq!(first.next().await, Some(event.clone()));
        assert_eq!(second.next().await, Some(event));
        // Terminal delivery ends both streams.
        assert_eq!(first.next().await, None);
        assert_eq!(second.next().await, None);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = Arc::new(ImageNotifier::new());
        let event = ImageEvent::failed(Uuid::new_v4(), "decode error");
        assert_eq!(hub.publish(&event), 0);
        assert_eq!(hub.total_subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_clears_the_image_registry() {
        let hub = Arc::new(ImageNotifier::new());
        let image_id = Uuid::new_v4();
        let mut subscription = hub.subscribe(image_id);

        hub.publish(&ImageEvent::failed(image_id, "decode error"));
        assert_eq!(hub.subscriber_count(image_id), 0);
        assert!(subscription.next().await.is_some());
        assert!(subscription.next().await.is_none());

        // A subscriber arriving after the terminal event gets no replay.
        let mut late = hub.subscribe(image_id);
        let replay =
            tokio::time::timeout(std::time::Duration::from_millis(50), late.next()).await;
        assert!(replay.is_err(), "late subscriber must not receive a replay");
    }

    #[tokio::test]
    async fn test_drop_deregisters_connection() {
        let hub = Arc::new(ImageNotifier::new());
        let image_id = Uuid::new_v4();
        let first = hub.subscribe(image_id);
        let second = hub.subscribe(image_id);
        assert_eq!(hub.total_subscriber_count(), 2);

        drop(first);
        assert_eq!(hub.subscriber_count(image_id), 1);
        drop(second);
        assert_eq!(hub.subscriber_count(image_id), 0);
        assert_eq!(hub.total_subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_events_are_scoped_per_image() {
        let hub = Arc::new(ImageNotifier::new());
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut subscription = hub.subscribe(watched);

        assert_eq!(hub.publish(&ImageEvent::failed(other, "unrelated")), 0);
        assert_eq!(hub.subscriber_count(watched), 1);

        let event = ImageEvent::completed(watched, IMAGE_PROCESSED_MESSAGE, "http://files/y.jpg");
        assert_eq!(hub.publish(&event), 1);
        assert_eq!(subscription.next().await, Some(event));
    }
}
