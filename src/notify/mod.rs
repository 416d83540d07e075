//! Outcome notifications.
//!
//! Publishing is fire-and-forget: a failed delivery is logged and the run
//! carries on.

use anyhow::Result;

/// Publish-only notification channel
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn publish(&self, subject: &str, message: &str);
}

/// Posts `{"subject", "message"}` JSON to a webhook (SNS HTTP endpoint,
/// Slack/Discord relay, ntfy topic...). Without a URL it only logs.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.filter(|u| !u.trim().is_empty()),
        }
    }

    async fn post(&self, url: &str, subject: &str, message: &str) -> Result<()> {
        let body = serde_json::json!({
            "subject": subject,
            "message": message,
        });

        self.http
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl Notifier for WebhookNotifier {
    async fn publish(&self, subject: &str, message: &str) {
        tracing::info!("NOTIFY: {}", subject);

        let Some(url) = &self.url else {
            tracing::debug!("No notification channel configured");
            return;
        };

        if let Err(e) = self.post(url, subject, message).await {
            tracing::error!("Notification delivery failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_publish_posts_subject_and_message() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/hook")
            .match_body(Matcher::Json(serde_json::json!({
                "subject": "Bought the dip!",
                "message": "{}"
            })))
            .with_status(200)
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(Some(format!("{}/hook", server.url())));
        notifier.publish("Bought the dip!", "{}").await;

        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/hook")
            .with_status(500)
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(Some(format!("{}/hook", server.url())));
        notifier.publish("ERROR:", "boom").await;

        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_unconfigured_channel_only_logs() {
        let notifier = WebhookNotifier::new(Some("  ".to_string()));
        assert!(notifier.url.is_none());
        notifier.publish("subject", "message").await;
    }
}
