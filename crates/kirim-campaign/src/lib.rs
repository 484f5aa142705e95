// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign batch processor.
//!
//! Each tick atomically claims a bounded batch of pending bulk-send jobs
//! (the claim transaction is the exclusion mechanism, see
//! `Store::claim_due_jobs`), then dispatches them one by one through the
//! tenant's provider at a global throughput ceiling. Job state machine:
//! pending → processing → {sent, failed}. There is no automatic retry;
//! failed jobs carry truncated error text for operator review and manual
//! resubmission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kirim_config::model::CampaignConfig;
use kirim_core::jid::{normalize_phone, to_socket_destination};
use kirim_core::types::{ClaimedJob, DestinationFormat};
use kirim_core::Store;
use kirim_provider::ProviderResolver;
use tracing::{debug, info, warn};

/// The recurring batch processor.
pub struct CampaignProcessor {
    store: Arc<dyn Store>,
    resolver: Arc<dyn ProviderResolver>,
    config: CampaignConfig,
    country_prefix: String,
    in_flight: AtomicBool,
}

impl CampaignProcessor {
    pub fn new(
        store: Arc<dyn Store>,
        resolver: Arc<dyn ProviderResolver>,
        config: CampaignConfig,
        country_prefix: String,
    ) -> Self {
        Self {
            store,
            resolver,
            config,
            country_prefix,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Delay between sends that keeps throughput under
    /// `window_limit` sends per `window_secs`.
    fn throttle(&self) -> Duration {
        let limit = self.config.window_limit.max(1);
        Duration::from_millis(self.config.window_secs.saturating_mul(1000).div_ceil(limit))
    }

    /// One processor tick: claim a batch and dispatch it.
    ///
    /// Re-entrant calls while a previous tick is still running are no-ops
    /// (single in-flight invariant, global rather than per-session).
    /// Returns the number of jobs processed.
    pub async fn tick(&self) -> usize {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("campaign tick skipped: previous batch still running");
            return 0;
        }
        let processed = self.process_batch().await;
        self.in_flight.store(false, Ordering::SeqCst);
        processed
    }

    async fn process_batch(&self) -> usize {
        let jobs = match self.store.claim_due_jobs(self.config.batch_size).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(error = %e, "failed to claim campaign batch");
                return 0;
            }
        };
        if jobs.is_empty() {
            return 0;
        }
        info!(count = jobs.len(), "processing campaign batch");

        let throttle = self.throttle();
        let total = jobs.len();
        for job in jobs {
            self.process_job(job).await;
            tokio::time::sleep(throttle).await;
        }
        total
    }

    /// Dispatch one claimed job and record its outcome. Never propagates:
    /// one job's failure must not abort its siblings.
    async fn process_job(&self, job: ClaimedJob) {
        let digits = normalize_phone(&job.phone_number, &self.country_prefix);
        if digits.is_empty() {
            self.record_failure(&job, "empty or invalid phone number").await;
            return;
        }

        let provider = match self.resolver.resolve(&job.tenant) {
            Ok(provider) => provider,
            Err(e) => {
                self.record_failure(&job, &e.to_string()).await;
                return;
            }
        };

        let destination = match provider.destination_format() {
            DestinationFormat::BareDigits => digits,
            DestinationFormat::CanonicalJid => to_socket_destination(&digits),
        };

        match provider.send_text(&destination, &job.message_template).await {
            Ok(receipt) => {
                if let Err(e) = self
                    .store
                    .mark_job_sent(job.id, job.campaign_id, receipt.message_id.as_deref())
                    .await
                {
                    warn!(job = job.id, error = %e, "failed to record sent job");
                }
                debug!(job = job.id, campaign = %job.campaign_name, "campaign send ok");
            }
            Err(e) => self.record_failure(&job, &e.to_string()).await,
        }
    }

    async fn record_failure(&self, job: &ClaimedJob, error: &str) {
        warn!(job = job.id, campaign = %job.campaign_name, error, "campaign send failed");
        if let Err(e) = self.store.mark_job_failed(job.id, job.campaign_id, error).await {
            warn!(job = job.id, error = %e, "failed to record failed job");
        }
    }
}
