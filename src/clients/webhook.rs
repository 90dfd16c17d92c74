use crate::clients::traits::Notifier;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

/// Fire-and-forget JSON webhook notifier. Delivery failures are logged
/// and dropped; nothing upstream waits on a notification.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    #[must_use]
    pub fn new(url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &str, message: &str, media_ref: Option<&str>) {
        let payload = json!({
            "event": event,
            "message": message,
            "media": media_ref,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) => {
                debug!(event = %event, status = %response.status(), "Webhook delivered");
            }
            Err(e) => {
                debug!(event = %event, error = %e, "Webhook delivery failed");
            }
        }
    }
}

/// Notifier used when no webhook is configured.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, event: &str, message: &str, _media_ref: Option<&str>) {
        debug!(event = %event, message = %message, "Notification (no transport configured)");
    }
}
