// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out of inbound events to tenant-configured webhook subscribers.
//!
//! Deliveries run concurrently and independently: each call has its own
//! timeout, one subscriber's failure never affects another, and no
//! delivery order is guaranteed across subscribers. Errors are logged,
//! never propagated.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Concurrent webhook fan-out client.
pub struct Forwarder {
    http: reqwest::Client,
    timeout: Duration,
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Forwarder {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// Deliver one payload to every subscriber URL.
    ///
    /// Returns once every attempt settled. Never fails.
    pub async fn fan_out(&self, urls: &[String], payload: &serde_json::Value) {
        if urls.is_empty() {
            return;
        }

        let deliveries = urls.iter().map(|url| {
            let http = self.http.clone();
            let payload = payload.clone();
            let timeout = self.timeout;
            async move {
                let result = http
                    .post(url)
                    .timeout(timeout)
                    .header("X-Webhook-Source", "kirim-gateway")
                    .json(&payload)
                    .send()
                    .await;
                match result {
                    Ok(response) if response.status().is_success() => {
                        debug!(url = %url, "webhook forwarded");
                    }
                    Ok(response) => {
                        warn!(url = %url, status = %response.status(), "webhook subscriber rejected event");
                    }
                    Err(e) => {
                        warn!(url = %url, error = %e, "webhook forward failed");
                    }
                }
            }
        });

        join_all(deliveries).await;
    }
}
