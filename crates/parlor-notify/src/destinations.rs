// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shipped notification destinations.

use async_trait::async_trait;
use tracing::info;

use parlor_core::{Destination, NotifyRequest, ParlorError};

/// Writes one structured log line per notification. Useful as a default and
/// in tests.
pub struct LogDestination;

#[async_trait]
impl Destination for LogDestination {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, request: &NotifyRequest) -> Result<(), ParlorError> {
        info!(
            site = %request.comment.locator.site,
            url = %request.comment.locator.url,
            comment = %request.comment.id,
            reply_to = request.parent.as_ref().map(|p| p.id.as_str()).unwrap_or(""),
            "new comment"
        );
        Ok(())
    }
}

/// POSTs the notification as JSON to a configured endpoint.
pub struct WebhookDestination {
    client: reqwest::Client,
    url: String,
}

impl WebhookDestination {
    pub fn new(url: String) -> Result<Self, ParlorError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| ParlorError::Http {
                message: "webhook client".into(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Destination for WebhookDestination {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, request: &NotifyRequest) -> Result<(), ParlorError> {
        let resp = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| ParlorError::Http {
                message: format!("webhook post to {}", self.url),
                source: Some(Box::new(e)),
            })?;
        if !resp.status().is_success() {
            return Err(ParlorError::Http {
                message: format!("webhook returned {}", resp.status()),
                source: None,
            });
        }
        Ok(())
    }
}
