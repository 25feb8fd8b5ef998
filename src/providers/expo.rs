use super::util::with_retry;
use crate::core::{Notification, NotificationSender, ReminderPayload};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Expo accepts at most this many messages per request.
pub const MAX_MESSAGES_PER_REQUEST: usize = 100;

#[derive(Serialize, Debug)]
struct PushMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    data: &'a ReminderPayload,
    sound: &'static str,
}

#[derive(Deserialize, Debug)]
struct PushResponse {
    #[serde(default)]
    data: Vec<PushTicket>,
}

#[derive(Deserialize, Debug)]
struct PushTicket {
    status: String,
    message: Option<String>,
}

/// Sends reminders through the Expo push service.
pub struct ExpoPushSender {
    client: reqwest::Client,
    push_url: String,
    access_token: Option<String>,
}

impl ExpoPushSender {
    pub fn new(push_url: &str, access_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ledger-jobs/1.0")
            .timeout(timeout)
            .build()
            .context("Failed to build push HTTP client")?;
        Ok(ExpoPushSender {
            client,
            push_url: push_url.to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
        })
    }

    /// Posts one request and returns how many tickets came back `ok`.
    async fn post_chunk(&self, tokens: &[String], notification: &Notification) -> Result<usize> {
        let messages: Vec<PushMessage> = tokens
            .iter()
            .map(|to| PushMessage {
                to,
                title: &notification.title,
                body: &notification.body,
                data: &notification.data,
                sound: "default",
            })
            .collect();

        let response = with_retry(
            || {
                let mut request = self.client.post(&self.push_url).json(&messages);
                if let Some(token) = &self.access_token {
                    request = request.bearer_auth(token);
                }
                request.send()
            },
            2,
            Duration::from_millis(500),
            // A timed out request may already have been accepted
            reqwest::Error::is_connect,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} URL: {}", e, self.push_url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} URL: {}",
                response.status(),
                self.push_url
            ));
        }

        let body: PushResponse = response
            .json()
            .await
            .context("Failed to parse push response")?;

        let mut delivered = 0;
        for ticket in &body.data {
            if ticket.status == "ok" {
                delivered += 1;
            } else {
                debug!(status = %ticket.status, message = ?ticket.message, "Push ticket rejected");
            }
        }
        Ok(delivered)
    }
}

#[async_trait]
impl NotificationSender for ExpoPushSender {
    async fn send(&self, token: &str, notification: &Notification) -> bool {
        self.send_many(&[token.to_string()], notification).await == 1
    }

    #[instrument(name = "ExpoPush", skip(self, tokens, notification), fields(count = tokens.len()))]
    async fn send_many(&self, tokens: &[String], notification: &Notification) -> usize {
        let mut delivered = 0;
        for chunk in tokens.chunks(MAX_MESSAGES_PER_REQUEST) {
            match self.post_chunk(chunk, notification).await {
                Ok(count) => delivered += count,
                Err(e) => warn!(error = %e, size = chunk.len(), "Push request failed"),
            }
        }
        delivered
    }
}
