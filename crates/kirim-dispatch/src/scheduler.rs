// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session send serialization.
//!
//! Invariants:
//! - FIFO: operations run in submission order, never reordered.
//! - Single drainer: at most one loop per session pops and runs jobs; a
//!   concurrent submitter that finds the drainer active only enqueues.
//! - Fixed inter-send delay between jobs (provider abuse limits).
//! - Per-job isolation: a failing operation rejects its own caller and
//!   never stalls sibling jobs in the same queue.
//!
//! There is no automatic retry here; retry policy belongs to callers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use kirim_core::types::SendReceipt;
use kirim_core::KirimError;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

type SendFuture = BoxFuture<'static, Result<SendReceipt, KirimError>>;
type SendOp = Box<dyn FnOnce() -> SendFuture + Send>;

struct Job {
    op: SendOp,
    reply: oneshot::Sender<Result<SendReceipt, KirimError>>,
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    draining: bool,
    closed: bool,
}

/// One ordered, throttled outbound queue per session.
pub struct DispatchScheduler {
    queues: DashMap<String, Arc<Mutex<QueueState>>>,
    send_delay: Duration,
}

impl DispatchScheduler {
    /// Create a scheduler with the given inter-send delay.
    pub fn new(send_delay: Duration) -> Self {
        Self {
            queues: DashMap::new(),
            send_delay,
        }
    }

    /// Enqueue a deferred send on a session's queue and await its outcome.
    ///
    /// The operation is not invoked until every previously submitted job on
    /// the same session has completed and the inter-send delay has elapsed.
    /// The returned result is exactly the operation's own outcome; an error
    /// affects only this caller.
    pub async fn schedule<F, Fut>(
        &self,
        session_id: &str,
        op: F,
    ) -> Result<SendReceipt, KirimError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<SendReceipt, KirimError>> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            op: Box::new(move || op().boxed()),
            reply: reply_tx,
        };

        let state = {
            let entry = self.queues.entry(session_id.to_string()).or_default();
            Arc::clone(entry.value())
        };

        {
            let mut queue = state.lock().await;
            if queue.closed {
                return Err(KirimError::SessionClosed(session_id.to_string()));
            }
            queue.jobs.push_back(job);
            if !queue.draining {
                queue.draining = true;
                tokio::spawn(drain(
                    session_id.to_string(),
                    Arc::clone(&state),
                    self.send_delay,
                ));
            }
        }

        reply_rx
            .await
            .unwrap_or_else(|_| Err(KirimError::SessionClosed(session_id.to_string())))
    }

    /// Start draining a session's queue if jobs are pending.
    ///
    /// A no-op for empty or unknown sessions, and when a drainer is already
    /// active.
    pub fn drain_now(&self, session_id: &str) {
        let Some(state) = self.queues.get(session_id).map(|s| Arc::clone(s.value())) else {
            return;
        };
        let session_id = session_id.to_string();
        let delay = self.send_delay;
        tokio::spawn(async move {
            let mut queue = state.lock().await;
            if queue.jobs.is_empty() || queue.draining || queue.closed {
                return;
            }
            queue.draining = true;
            drop(queue);
            drain(session_id, state, delay).await;
        });
    }

    /// Close a session's queue: pending jobs fail with `SessionClosed` and
    /// future submissions are rejected. An already in-flight provider call
    /// cannot be recalled.
    pub async fn close_session(&self, session_id: &str) {
        let Some((_, state)) = self.queues.remove(session_id) else {
            return;
        };
        let mut queue = state.lock().await;
        queue.closed = true;
        let abandoned = queue.jobs.len();
        while let Some(job) = queue.jobs.pop_front() {
            let _ = job
                .reply
                .send(Err(KirimError::SessionClosed(session_id.to_string())));
        }
        if abandoned > 0 {
            warn!(session = session_id, abandoned, "session closed with queued sends");
        }
    }

    /// Number of jobs currently queued for a session (in-flight job not
    /// included).
    pub async fn queued_len(&self, session_id: &str) -> usize {
        match self.queues.get(session_id).map(|s| Arc::clone(s.value())) {
            Some(state) => state.lock().await.jobs.len(),
            None => 0,
        }
    }
}

/// The single drain loop for one session queue.
///
/// Runs until the queue empties; the `draining` flag is cleared under the
/// same lock that observes emptiness, so a concurrent submitter either sees
/// the flag set or starts the next drainer itself.
async fn drain(session_id: String, state: Arc<Mutex<QueueState>>, delay: Duration) {
    loop {
        let job = {
            let mut queue = state.lock().await;
            match queue.jobs.pop_front() {
                Some(job) => job,
                None => {
                    queue.draining = false;
                    debug!(session = %session_id, "dispatch queue drained");
                    return;
                }
            }
        };

        let result = (job.op)().await;
        if let Err(e) = &result {
            debug!(session = %session_id, error = %e, "queued send failed");
        }
        // Caller may have given up; that is their business.
        let _ = job.reply.send(result);

        tokio::time::sleep(delay).await;
    }
}
