//! Fire-and-forget delivery of verification messages.
//!
//! The request path only ever enqueues; delivery runs on its own tasks
//! with bounded retries and never reports back to the request, which has
//! already completed by the time anything is sent.

use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::services::EmailProvider;

/// A unit of delivery work, detached from the request that produced it.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub recipient: String,
    pub user_id: Uuid,
    pub code: String,
}

pub struct DispatchQueue {
    job_tx: mpsc::Sender<DeliveryJob>,
    shutdown_token: CancellationToken,
}

impl DispatchQueue {
    /// Start the distributor task and return the queue handle.
    pub fn start(config: DispatchConfig, email: Arc<dyn EmailProvider>) -> Self {
        let (job_tx, mut job_rx) = mpsc::channel::<DeliveryJob>(config.queue_size);
        let shutdown_token = CancellationToken::new();
        let shutdown = shutdown_token.clone();

        let max_attempts = config.max_attempts;
        let initial_backoff = Duration::from_millis(config.initial_backoff_ms);
        let max_backoff = Duration::from_millis(config.max_backoff_ms);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Delivery dispatcher shutting down");
                        break;
                    }
                    job = job_rx.recv() => {
                        match job {
                            Some(job) => {
                                let email = email.clone();
                                // One task per job: deliveries for different
                                // users proceed independently, unordered.
                                tokio::spawn(deliver_with_retry(
                                    email,
                                    job,
                                    max_attempts,
                                    initial_backoff,
                                    max_backoff,
                                ));
                            }
                            None => {
                                tracing::info!("Delivery channel closed, dispatcher exiting");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self {
            job_tx,
            shutdown_token,
        }
    }

    /// Schedule delivery without waiting on it. Queue pressure is logged,
    /// never surfaced to the caller.
    pub fn enqueue(&self, job: DeliveryJob) {
        if let Err(e) = self.job_tx.try_send(job) {
            tracing::error!(error = %e, "Delivery queue rejected job");
        }
    }

    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }
}

async fn deliver_with_retry(
    email: Arc<dyn EmailProvider>,
    job: DeliveryJob,
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
) {
    let attempts = AtomicU32::new(0);

    let policy = ExponentialBackoff {
        initial_interval: initial_backoff,
        max_interval: max_backoff,
        max_elapsed_time: None,
        ..Default::default()
    };

    let result = retry(policy, || {
        let email = email.clone();
        let job = job.clone();
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            email
                .send_verification_code(&job.recipient, job.user_id, &job.code)
                .await
                .map_err(|e| {
                    if attempt >= max_attempts {
                        backoff::Error::permanent(e)
                    } else {
                        tracing::warn!(
                            recipient = %job.recipient,
                            attempt,
                            error = %e,
                            "Delivery attempt failed, will retry"
                        );
                        backoff::Error::transient(e)
                    }
                })
        }
    })
    .await;

    match result {
        Ok(()) => {
            tracing::info!(recipient = %job.recipient, "Verification code delivered");
        }
        Err(e) => {
            tracing::error!(
                recipient = %job.recipient,
                attempts = attempts.load(Ordering::SeqCst),
                error = %e,
                "Delivery dropped after exhausting retries"
            );
        }
    }
}
