//! Webhook notification fan-out.
//!
//! Delivery is an HTTP POST with a per-attempt timeout and linear back-off
//! retries on transport errors, HTTP 5xx, and 429. Other 4xx short-circuit.
//! Payload adapters shape the body for the configured platform.

use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};

use crate::domain::error::DomainResult;
use crate::domain::models::{NotificationEvent, NotifyPlatform, Project};

/// Per-attempt request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum delivery attempts.
pub const MAX_ATTEMPTS: u32 = 3;
/// Back-off base; attempt `n` sleeps `base * n` before retrying.
pub const BACKOFF_BASE_MS: u64 = 1_000;
/// Shrunk back-off base used when `TEST_MODE` is set.
pub const TEST_BACKOFF_BASE_MS: u64 = 10;

/// How a notification call ended. Every outcome is explicit so callers
/// handle skipped configuration distinctly from failed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered { attempts: u32 },
    Skipped { reason: String },
    Failed { attempts: u32, reason: String },
}

impl DeliveryResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Formats and retry-delivers webhook messages.
pub struct Notifier {
    client: reqwest::Client,
    backoff_base: Duration,
}

impl Notifier {
    pub fn new() -> Self {
        let base_ms = if std::env::var("TEST_MODE").is_ok() {
            TEST_BACKOFF_BASE_MS
        } else {
            BACKOFF_BASE_MS
        };
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client construction cannot fail with static config"),
            backoff_base: Duration::from_millis(base_ms),
        }
    }

    /// Notify a project's webhook about an event.
    ///
    /// Skips without dispatch when no webhook is configured or the event's
    /// level is below the project's threshold.
    pub async fn notify(
        &self,
        project: &Project,
        event: NotificationEvent,
    ) -> DomainResult<DeliveryResult> {
        let Some(webhook) = project.notification_webhook.as_deref() else {
            return Ok(DeliveryResult::Skipped {
                reason: "no webhook configured".to_string(),
            });
        };
        if event.level() < project.min_level() {
            return Ok(DeliveryResult::Skipped {
                reason: format!(
                    "level {} below threshold {}",
                    event.level().as_str(),
                    project.min_level().as_str()
                ),
            });
        }

        let platform = project.notification_platform.unwrap_or(NotifyPlatform::Custom);
        let (payload, headers) = build_payload(platform, &event);
        Ok(self.deliver(webhook, payload, &headers).await)
    }

    /// POST with retries. At most [`MAX_ATTEMPTS`] requests are made.
    pub async fn deliver(
        &self,
        url: &str,
        payload: Value,
        headers: &[(&'static str, String)],
    ) -> DeliveryResult {
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            let mut request = self.client.post(url).json(&payload);
            for (name, value) in headers {
                request = request.header(*name, value);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return DeliveryResult::Delivered { attempts: attempt };
                    }
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    last_error = format!("HTTP {status}");
                    if !retryable {
                        return DeliveryResult::Failed {
                            attempts: attempt,
                            reason: last_error,
                        };
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(self.backoff_base * attempt).await;
            }
        }

        DeliveryResult::Failed {
            attempts: MAX_ATTEMPTS,
            reason: last_error,
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an event onto a platform-specific body and header set.
pub fn build_payload(
    platform: NotifyPlatform,
    event: &NotificationEvent,
) -> (Value, Vec<(&'static str, String)>) {
    let title = event.title();
    let body = event.body();

    match platform {
        NotifyPlatform::Feishu => (
            json!({
                "msg_type": "interactive",
                "card": {
                    "header": {
                        "title": {"tag": "plain_text", "content": title},
                        "template": match event.level().as_str() {
                            "error" => "red",
                            "warning" => "orange",
                            _ => "blue",
                        },
                    },
                    "elements": [
                        {"tag": "div", "text": {"tag": "lark_md", "content": body}}
                    ],
                }
            }),
            vec![],
        ),
        NotifyPlatform::Wechat => (
            json!({
                "msgtype": "markdown",
                "markdown": {"content": format!("**{title}**\n{body}")},
            }),
            vec![],
        ),
        NotifyPlatform::Slack => (
            json!({
                "attachments": [{
                    "title": title,
                    "text": body,
                    "color": match event.level().as_str() {
                        "error" => "danger",
                        "warning" => "warning",
                        _ => "good",
                    },
                }]
            }),
            vec![],
        ),
        NotifyPlatform::Custom => (
            json!({
                "title": title,
                "body": body,
                "level": event.level().as_str(),
                "timestamp": Utc::now().to_rfc3339(),
            }),
            vec![("X-MaxClaw-Notification", "1".to_string())],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::NotifyLevel;

    fn project_with_webhook(url: &str, min_level: Option<NotifyLevel>) -> Project {
        let mut p = Project::new("demo", "/tmp/demo");
        p.notification_webhook = Some(url.to_string());
        p.notification_platform = Some(NotifyPlatform::Custom);
        p.notification_min_level = min_level;
        p
    }

    fn info_event() -> NotificationEvent {
        NotificationEvent::Generic {
            title: "hello".into(),
            body: "world".into(),
        }
    }

    #[tokio::test]
    async fn test_skip_without_webhook() {
        let notifier = Notifier::new();
        let p = Project::new("demo", "/tmp/demo");
        let result = notifier.notify(&p, info_event()).await.unwrap();
        assert!(matches!(result, DeliveryResult::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_level_filter_drops_low_events() {
        let notifier = Notifier::new();
        let p = project_with_webhook("http://127.0.0.1:1/hook", Some(NotifyLevel::Error));
        // Info event against an error threshold never dispatches, so the
        // unreachable webhook URL is never contacted.
        let result = notifier.notify(&p, info_event()).await.unwrap();
        assert!(matches!(result, DeliveryResult::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_delivery_success_first_attempt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let notifier = Notifier::new();
        let p = project_with_webhook(&format!("{}/hook", server.url()), None);
        let result = notifier.notify(&p, info_event()).await.unwrap();

        assert_eq!(result, DeliveryResult::Delivered { attempts: 1 });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_4xx_short_circuits() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let notifier = Notifier::new();
        let result = notifier
            .deliver(&format!("{}/hook", server.url()), json!({}), &[])
            .await;

        assert_eq!(
            result,
            DeliveryResult::Failed {
                attempts: 1,
                reason: "HTTP 404 Not Found".to_string()
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_persistent_5xx_exhausts_attempts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        // Shrink the back-off regardless of the environment.
        let notifier = Notifier {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap(),
            backoff_base: Duration::from_millis(1),
        };
        let result = notifier
            .deliver(&format!("{}/hook", server.url()), json!({}), &[])
            .await;

        assert!(matches!(result, DeliveryResult::Failed { attempts: 3, .. }));
        mock.assert_async().await;
    }

    #[test]
    fn test_payload_shapes() {
        let event = NotificationEvent::ErrorAlert {
            title: "boom".into(),
            message: "it broke".into(),
            context: None,
            stack: None,
        };

        let (feishu, _) = build_payload(NotifyPlatform::Feishu, &event);
        assert_eq!(feishu["msg_type"], "interactive");
        assert_eq!(feishu["card"]["header"]["template"], "red");

        let (wechat, _) = build_payload(NotifyPlatform::Wechat, &event);
        assert_eq!(wechat["msgtype"], "markdown");
        assert!(wechat["markdown"]["content"].as_str().unwrap().contains("boom"));

        let (slack, _) = build_payload(NotifyPlatform::Slack, &event);
        assert_eq!(slack["attachments"][0]["color"], "danger");

        let (custom, headers) = build_payload(NotifyPlatform::Custom, &event);
        assert_eq!(custom["level"], "error");
        assert_eq!(headers[0].0, "X-MaxClaw-Notification");
    }
}
