//! In-process message bus.
//!
//! Topic-based pub/sub with pattern subscriptions and request/response
//! correlation. Topics are `:`-separated segments; `*` matches exactly one
//! segment and `#` matches any remainder. Subscribers to a topic observe
//! publishes in subscription order; a failing subscriber is logged and does
//! not suppress delivery to the rest.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::{oneshot, Mutex, RwLock};
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{BusMessage, MessageType};

/// Default reply timeout for `request`.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

type HandlerFuture = Pin<Box<dyn Future<Output = DomainResult<()>> + Send>>;
type Handler = Arc<dyn Fn(BusMessage) -> HandlerFuture + Send + Sync>;

struct Subscription {
    id: Uuid,
    pattern: String,
    handler: Handler,
}

/// Match a topic against a subscription pattern.
///
/// `*` matches a single segment, `#` matches zero or more trailing
/// segments.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_segments = pattern.split(':');
    let mut topic_segments = topic.split(':');

    loop {
        match (pattern_segments.next(), topic_segments.next()) {
            (Some("#"), _) => return true,
            (Some("*"), Some(_)) => {}
            (Some(p), Some(t)) if p == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Topic pub/sub fabric underneath the agent runtime.
pub struct MessageBus {
    subscriptions: RwLock<Vec<Subscription>>,
    pending: Mutex<HashMap<Uuid, oneshot::Sender<BusMessage>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe a handler to a topic or pattern. Returns the subscription
    /// id for `unsubscribe`.
    pub async fn subscribe<F, Fut>(&self, pattern: impl Into<String>, handler: F) -> Uuid
    where
        F: Fn(BusMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DomainResult<()>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let subscription = Subscription {
            id,
            pattern: pattern.into(),
            handler: Arc::new(move |msg| Box::pin(handler(msg))),
        };
        self.subscriptions.write().await.push(subscription);
        id
    }

    pub async fn unsubscribe(&self, subscription_id: Uuid) -> bool {
        let mut subs = self.subscriptions.write().await;
        let before = subs.len();
        subs.retain(|s| s.id != subscription_id);
        subs.len() < before
    }

    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Deliver a message to every matching subscriber in subscription
    /// order. Completes a pending request when the topic is its reply
    /// topic.
    pub async fn publish(&self, topic: &str, mut message: BusMessage) {
        message.topic = Some(topic.to_string());

        // Snapshot matching handlers so delivery happens without the lock.
        let handlers: Vec<Handler> = {
            let subs = self.subscriptions.read().await;
            subs.iter()
                .filter(|s| topic_matches(&s.pattern, topic))
                .map(|s| Arc::clone(&s.handler))
                .collect()
        };

        for handler in handlers {
            if let Err(e) = handler(message.clone()).await {
                tracing::warn!(topic, error = %e, "subscriber failed; continuing delivery");
            }
        }

        // Reply-topic convention: the first reply matching a pending
        // correlation satisfies it.
        if let Some(correlation_id) = topic
            .strip_prefix("reply:")
            .and_then(|s| Uuid::parse_str(s).ok())
        {
            if let Some(sender) = self.pending.lock().await.remove(&correlation_id) {
                let _ = sender.send(message);
            }
        }
    }

    /// Publish a query and wait for the correlated reply.
    ///
    /// The correlation entry is removed on timeout so a late reply is
    /// discarded.
    pub async fn request(
        &self,
        topic: &str,
        mut message: BusMessage,
        timeout_ms: u64,
    ) -> DomainResult<BusMessage> {
        let correlation_id = message.correlation_id.unwrap_or_else(Uuid::new_v4);
        message.correlation_id = Some(correlation_id);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id, tx);

        self.publish(topic, message).await;

        match tokio::time::timeout(Duration::from_millis(timeout_ms), rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => {
                self.pending.lock().await.remove(&correlation_id);
                Err(DomainError::Operational(
                    "reply channel dropped".to_string(),
                ))
            }
            Err(_) => {
                self.pending.lock().await.remove(&correlation_id);
                Err(DomainError::Timeout(timeout_ms))
            }
        }
    }

    /// Publish the reply to a query, following the `reply:{correlationId}`
    /// convention.
    pub async fn reply(&self, correlation_id: Uuid, sender: &str, payload: Value) {
        let message = BusMessage::new(MessageType::Response, sender, payload)
            .with_correlation(correlation_id);
        self.publish(&format!("reply:{correlation_id}"), message)
            .await;
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Measure how long a request round-trip takes, for send outcomes.
pub fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
