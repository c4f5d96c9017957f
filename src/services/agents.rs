//! Agent runtime on top of the message bus.
//!
//! Owns the agent directory, routes inbox messages to handlers, answers
//! queries over the reply convention, and runs the heartbeat sweep that
//! marks silent agents offline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::bus::{elapsed_ms, MessageBus, DEFAULT_REQUEST_TIMEOUT_MS};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{AgentInfo, AgentStatus, BusMessage, MessageType, SendOutcome};
use crate::domain::ports::AgentHandler;

/// Default heartbeat interval; agents silent for 3 intervals go offline.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Filters accepted by `discover_agents`.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryFilter {
    pub capability: Option<String>,
    pub status: Option<AgentStatus>,
}

struct Registered {
    handler: Arc<dyn AgentHandler>,
    subscription_ids: Vec<Uuid>,
}

/// Hosts registered agents and their bus plumbing.
pub struct AgentRuntime {
    bus: Arc<MessageBus>,
    directory: Arc<RwLock<HashMap<String, AgentInfo>>>,
    /// Registration order, for reverse-order shutdown
    registered: RwLock<Vec<(String, Registered)>>,
    heartbeat_interval: Duration,
    running: AtomicBool,
}

impl AgentRuntime {
    pub fn new(bus: Arc<MessageBus>, heartbeat_interval: Duration) -> Self {
        Self {
            bus,
            directory: Arc::new(RwLock::new(HashMap::new())),
            registered: RwLock::new(Vec::new()),
            heartbeat_interval,
            running: AtomicBool::new(true),
        }
    }

    /// Inbox topic for an agent id.
    pub fn inbox_topic(agent_id: &str) -> String {
        format!("agent:{agent_id}:inbox")
    }

    /// Register an agent: subscribe its inbox and any extra topics, then
    /// initialize it. A failed initialize unwinds the subscriptions.
    pub async fn register_agent(
        &self,
        handler: Arc<dyn AgentHandler>,
        extra_topics: &[String],
    ) -> DomainResult<()> {
        let agent_id = handler.id().to_string();

        {
            let registered = self.registered.read().await;
            if registered.iter().any(|(id, _)| *id == agent_id) {
                return Err(DomainError::conflict(format!(
                    "agent '{agent_id}' is already registered"
                )));
            }
        }

        let mut topics = vec![Self::inbox_topic(&agent_id)];
        topics.extend(extra_topics.iter().cloned());

        let mut subscription_ids = Vec::with_capacity(topics.len());
        for topic in &topics {
            let handler = Arc::clone(&handler);
            let bus = Arc::clone(&self.bus);
            let directory = Arc::clone(&self.directory);
            let agent_id = agent_id.clone();
            let id = self
                .bus
                .subscribe(topic.clone(), move |msg| {
                    let handler = Arc::clone(&handler);
                    let bus = Arc::clone(&bus);
                    let directory = Arc::clone(&directory);
                    let agent_id = agent_id.clone();
                    async move {
                        route_message(handler, bus, directory, agent_id, msg).await
                    }
                })
                .await;
            subscription_ids.push(id);
        }

        if let Err(e) = handler.initialize().await {
            for id in subscription_ids {
                self.bus.unsubscribe(id).await;
            }
            return Err(e);
        }

        let mut info = AgentInfo::new(&agent_id, handler.name());
        info.description = handler.description().map(str::to_string);
        info.capabilities = handler.capabilities();
        info.subscriptions = topics;
        info.last_heartbeat_at = Some(Utc::now());

        self.directory.write().await.insert(agent_id.clone(), info);
        self.registered.write().await.push((
            agent_id,
            Registered {
                handler,
                subscription_ids,
            },
        ));
        Ok(())
    }

    /// Remove an agent: shut it down and drop its subscriptions.
    pub async fn unregister_agent(&self, agent_id: &str) -> DomainResult<()> {
        let entry = {
            let mut registered = self.registered.write().await;
            let index = registered.iter().position(|(id, _)| id == agent_id);
            index.map(|i| registered.remove(i))
        };

        let Some((_, registered)) = entry else {
            return Err(DomainError::not_found(format!("agent '{agent_id}'")));
        };

        for id in registered.subscription_ids {
            self.bus.unsubscribe(id).await;
        }
        if let Err(e) = registered.handler.shutdown().await {
            tracing::warn!(agent_id, error = %e, "agent shutdown failed");
        }
        self.directory.write().await.remove(agent_id);
        Ok(())
    }

    /// Send a payload to an agent's inbox.
    ///
    /// Notifications are fire-and-forget (`Ok(None)`); queries wait for the
    /// correlated reply and report the outcome. An unknown target yields a
    /// failed outcome rather than an error.
    pub async fn send_message(
        &self,
        target_id: &str,
        payload: Value,
        sender: &str,
        message_type: MessageType,
    ) -> DomainResult<Option<SendOutcome>> {
        let known = self.directory.read().await.contains_key(target_id);
        if !known {
            return Ok(Some(SendOutcome {
                success: false,
                data: None,
                error: Some(format!("agent '{target_id}' not found")),
                response_time_ms: 0,
            }));
        }

        let topic = Self::inbox_topic(target_id);
        let message = BusMessage::new(message_type, sender, payload)
            .with_receiver(target_id.to_string());

        match message_type {
            MessageType::Query => {
                let start = Instant::now();
                match self
                    .bus
                    .request(&topic, message, DEFAULT_REQUEST_TIMEOUT_MS)
                    .await
                {
                    Ok(reply) => Ok(Some(SendOutcome {
                        success: true,
                        data: Some(reply.payload),
                        error: None,
                        response_time_ms: elapsed_ms(start),
                    })),
                    Err(e) => Ok(Some(SendOutcome {
                        success: false,
                        data: None,
                        error: Some(e.to_string()),
                        response_time_ms: elapsed_ms(start),
                    })),
                }
            }
            _ => {
                self.bus.publish(&topic, message).await;
                Ok(None)
            }
        }
    }

    /// Fire-and-forget publish to a shared topic.
    pub async fn broadcast(&self, topic: &str, payload: Value, sender: &str) {
        let message = BusMessage::new(MessageType::Notification, sender, payload);
        self.bus.publish(topic, message).await;
    }

    /// Filter the in-memory directory.
    pub async fn discover_agents(&self, filter: DiscoveryFilter) -> Vec<AgentInfo> {
        let directory = self.directory.read().await;
        let mut agents: Vec<AgentInfo> = directory
            .values()
            .filter(|info| {
                filter
                    .capability
                    .as_deref()
                    .map_or(true, |c| info.has_capability(c))
                    && filter.status.map_or(true, |s| info.status == s)
            })
            .cloned()
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    /// Record a heartbeat for an agent, reviving it if it was offline.
    pub async fn heartbeat(&self, agent_id: &str) -> DomainResult<()> {
        let mut directory = self.directory.write().await;
        let info = directory
            .get_mut(agent_id)
            .ok_or_else(|| DomainError::not_found(format!("agent '{agent_id}'")))?;
        info.last_heartbeat_at = Some(Utc::now());
        if info.status == AgentStatus::Offline {
            info.status = AgentStatus::Idle;
        }
        Ok(())
    }

    /// Spawn the heartbeat sweep: any agent whose last heartbeat is older
    /// than 3 intervals is marked offline.
    pub fn start_heartbeat_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(runtime.heartbeat_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !runtime.running.load(Ordering::SeqCst) {
                    return;
                }
                runtime.sweep_heartbeats().await;
            }
        })
    }

    async fn sweep_heartbeats(&self) {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.heartbeat_interval * 3)
                .unwrap_or_else(|_| chrono::Duration::seconds(90));
        let mut directory = self.directory.write().await;
        for info in directory.values_mut() {
            let last_seen = info.last_heartbeat_at.unwrap_or(info.registered_at);
            if last_seen < cutoff && info.status != AgentStatus::Offline {
                tracing::info!(agent_id = %info.id, "agent missed heartbeats, marking offline");
                info.status = AgentStatus::Offline;
            }
        }
    }

    /// Shut down every agent in reverse registration order, drop all
    /// subscriptions, and clear the directory. Idempotent.
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let entries: Vec<(String, Registered)> = {
            let mut registered = self.registered.write().await;
            registered.drain(..).collect()
        };

        for (agent_id, registered) in entries.into_iter().rev() {
            for id in registered.subscription_ids {
                self.bus.unsubscribe(id).await;
            }
            if let Err(e) = registered.handler.shutdown().await {
                tracing::warn!(agent_id = %agent_id, error = %e, "agent shutdown failed");
            }
        }

        self.directory.write().await.clear();
    }
}

/// Route one inbound message to an agent handler, answering queries on the
/// reply topic. Handler errors mark the agent `error` in the directory.
async fn route_message(
    handler: Arc<dyn AgentHandler>,
    bus: Arc<MessageBus>,
    directory: Arc<RwLock<HashMap<String, AgentInfo>>>,
    agent_id: String,
    message: BusMessage,
) -> DomainResult<()> {
    let correlation_id = message.correlation_id;
    let is_query = message.message_type == MessageType::Query;

    match handler.handle_message(message).await {
        Ok(result) => {
            if is_query {
                if let Some(correlation_id) = correlation_id {
                    bus.reply(correlation_id, &agent_id, result.unwrap_or(Value::Null))
                        .await;
                }
            }
            Ok(())
        }
        Err(e) => {
            if let Some(info) = directory.write().await.get_mut(&agent_id) {
                info.status = AgentStatus::Error;
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct EchoAgent {
        id: String,
        fail_init: bool,
        handled: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    impl EchoAgent {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                fail_init: false,
                handled: AtomicUsize::new(0),
                shutdowns: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AgentHandler for EchoAgent {
        fn id(&self) -> &str {
            &self.id
        }
        fn name(&self) -> &str {
            "echo"
        }
        fn capabilities(&self) -> Vec<String> {
            vec!["echo".to_string()]
        }
        async fn initialize(&self) -> DomainResult<()> {
            if self.fail_init {
                return Err(DomainError::Operational("init failed".into()));
            }
            Ok(())
        }
        async fn handle_message(&self, message: BusMessage) -> DomainResult<Option<Value>> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(Some(message.payload))
        }
        async fn shutdown(&self) -> DomainResult<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn runtime() -> Arc<AgentRuntime> {
        Arc::new(AgentRuntime::new(
            Arc::new(MessageBus::new()),
            Duration::from_millis(50),
        ))
    }

    #[tokio::test]
    async fn test_register_and_query() {
        let rt = runtime();
        let agent = EchoAgent::new("a1");
        rt.register_agent(agent.clone(), &[]).await.unwrap();

        let outcome = rt
            .send_message("a1", serde_json::json!({"ping": true}), "tester", MessageType::Query)
            .await
            .unwrap()
            .expect("queries return an outcome");
        assert!(outcome.success);
        assert_eq!(outcome.data.unwrap()["ping"], true);
        assert_eq!(agent.handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let rt = runtime();
        rt.register_agent(EchoAgent::new("dup"), &[]).await.unwrap();
        let err = rt.register_agent(EchoAgent::new("dup"), &[]).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_failed_initialize_unwinds_subscriptions() {
        let rt = runtime();
        let agent = Arc::new(EchoAgent {
            id: "broken".to_string(),
            fail_init: true,
            handled: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        });
        assert!(rt.register_agent(agent, &[]).await.is_err());
        assert_eq!(rt.bus.subscription_count().await, 0);
        assert!(rt.discover_agents(DiscoveryFilter::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target_reports_not_found() {
        let rt = runtime();
        let outcome = rt
            .send_message("ghost", Value::Null, "tester", MessageType::Query)
            .await
            .unwrap()
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_notification_is_fire_and_forget() {
        let rt = runtime();
        let agent = EchoAgent::new("a1");
        rt.register_agent(agent.clone(), &[]).await.unwrap();

        let outcome = rt
            .send_message("a1", Value::Null, "tester", MessageType::Notification)
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(agent.handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_extra_topic_subscribers() {
        let rt = runtime();
        let a = EchoAgent::new("a");
        let b = EchoAgent::new("b");
        rt.register_agent(a.clone(), &["announcements".to_string()])
            .await
            .unwrap();
        rt.register_agent(b.clone(), &["announcements".to_string()])
            .await
            .unwrap();

        rt.broadcast("announcements", serde_json::json!("hello"), "tester")
            .await;
        assert_eq!(a.handled.load(Ordering::SeqCst), 1);
        assert_eq!(b.handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_discover_filters_by_capability_and_status() {
        let rt = runtime();
        rt.register_agent(EchoAgent::new("a1"), &[]).await.unwrap();

        let all = rt.discover_agents(DiscoveryFilter::default()).await;
        assert_eq!(all.len(), 1);

        let none = rt
            .discover_agents(DiscoveryFilter {
                capability: Some("compile".to_string()),
                status: None,
            })
            .await;
        assert!(none.is_empty());

        let idle = rt
            .discover_agents(DiscoveryFilter {
                capability: Some("echo".to_string()),
                status: Some(AgentStatus::Idle),
            })
            .await;
        assert_eq!(idle.len(), 1);
    }

    #[tokio::test]
    async fn test_heartbeat_sweep_marks_offline() {
        let rt = runtime();
        rt.register_agent(EchoAgent::new("sleepy"), &[]).await.unwrap();

        // Age the heartbeat past 3 intervals.
        {
            let mut directory = rt.directory.write().await;
            let info = directory.get_mut("sleepy").unwrap();
            info.last_heartbeat_at = Some(Utc::now() - chrono::Duration::seconds(10));
        }
        rt.sweep_heartbeats().await;

        let agents = rt.discover_agents(DiscoveryFilter::default()).await;
        assert_eq!(agents[0].status, AgentStatus::Offline);

        // A fresh heartbeat revives it.
        rt.heartbeat("sleepy").await.unwrap();
        let agents = rt.discover_agents(DiscoveryFilter::default()).await;
        assert_eq!(agents[0].status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_shutdown_reverse_order_and_idempotent() {
        let rt = runtime();
        let a = EchoAgent::new("a");
        let b = EchoAgent::new("b");
        rt.register_agent(a.clone(), &[]).await.unwrap();
        rt.register_agent(b.clone(), &[]).await.unwrap();

        rt.shutdown().await;
        rt.shutdown().await; // idempotent

        assert_eq!(a.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(b.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(rt.bus.subscription_count().await, 0);

        // After shutdown, sends fail with not-found outcomes.
        let outcome = rt
            .send_message("a", Value::Null, "tester", MessageType::Query)
            .await
            .unwrap()
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("not found"));
    }
}
