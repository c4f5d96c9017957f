//! Agent port for the runtime.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::error::DomainResult;
use crate::domain::models::BusMessage;

/// A cooperating agent hosted by the runtime.
///
/// The runtime subscribes the agent's inbox topic, routes matching
/// messages to `handle_message`, and calls `shutdown` in reverse
/// registration order when the runtime stops.
#[async_trait]
pub trait AgentHandler: Send + Sync {
    /// Stable identifier; duplicate registration is rejected.
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    /// Capability tags used by discovery filters.
    fn capabilities(&self) -> Vec<String>;

    /// Called once on registration. A failure unwinds the registration
    /// (subscriptions are removed and the agent is not listed).
    async fn initialize(&self) -> DomainResult<()>;

    /// Handle one inbound message. A returned value answers query-type
    /// messages; `None` acknowledges without data.
    async fn handle_message(&self, message: BusMessage) -> DomainResult<Option<Value>>;

    /// Called once on runtime shutdown.
    async fn shutdown(&self) -> DomainResult<()>;
}
