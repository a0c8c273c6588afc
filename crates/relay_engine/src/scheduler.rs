use std::sync::Arc;
use std::time::Duration;

use relay_core::{Generation, JobId, RemoteStatus};
use relay_logging::{relay_debug, relay_info, relay_warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{Clock, PolicyError, PollPolicy, StatusChannel};

/// How a polling run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The remote side reported `Complete` or `Failed`.
    Finished(RemoteStatus),
    /// The attempt or time budget ran out first.
    Exhausted { attempts: u32 },
    /// The cancellation token fired.
    Cancelled,
}

/// Polls a [`StatusChannel`] until the job is terminal or the budget is spent.
///
/// At most one request is outstanding at a time; transient errors are logged
/// and retried on the next tick. `max_elapsed` is a hard deadline: it cuts
/// short both the wait between polls and a request that never answers.
pub struct PollScheduler {
    status: Arc<dyn StatusChannel>,
    clock: Arc<dyn Clock>,
    policy: PollPolicy,
}

impl PollScheduler {
    pub fn new(
        status: Arc<dyn StatusChannel>,
        clock: Arc<dyn Clock>,
        policy: PollPolicy,
    ) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self {
            status,
            clock,
            policy,
        })
    }

    pub async fn run(
        &self,
        generation: Generation,
        job_id: &JobId,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let started = self.clock.now();
        let deadline = self.policy.max_elapsed.map(|budget| started + budget);
        let mut attempts = 0u32;

        if !self.pause(self.policy.initial_delay, deadline, cancel).await {
            return PollOutcome::Cancelled;
        }

        loop {
            if self.budget_spent(attempts, started) {
                relay_warn!(
                    "Polling job {} (gen={}) gave up after {} attempts",
                    job_id,
                    generation,
                    attempts
                );
                return PollOutcome::Exhausted { attempts };
            }

            attempts += 1;
            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    relay_info!(
                        "Polling job {} (gen={}) cancelled during attempt {}",
                        job_id,
                        generation,
                        attempts
                    );
                    return PollOutcome::Cancelled;
                }
                reply = self.status.poll(job_id) => reply,
                _ = self.until(deadline) => {
                    relay_warn!(
                        "Status check {} for job {} (gen={}) outlived the time budget",
                        attempts,
                        job_id,
                        generation
                    );
                    return PollOutcome::Exhausted { attempts };
                }
            };

            match reply {
                Ok(status) if status.is_terminal() => {
                    relay_debug!(
                        "Job {} (gen={}) reached {:?} after {} attempts",
                        job_id,
                        generation,
                        status,
                        attempts
                    );
                    return PollOutcome::Finished(status);
                }
                Ok(_) => relay_debug!(
                    "Job {} (gen={}) still processing (attempt {})",
                    job_id,
                    generation,
                    attempts
                ),
                Err(err) => relay_warn!(
                    "Status check {} for job {} (gen={}) failed, retrying: {}",
                    attempts,
                    job_id,
                    generation,
                    err
                ),
            }

            if self.budget_spent(attempts, started) {
                continue;
            }
            if !self
                .pause(self.policy.delay_after(attempts), deadline, cancel)
                .await
            {
                return PollOutcome::Cancelled;
            }
        }
    }

    fn budget_spent(&self, attempts: u32, started: Instant) -> bool {
        self.policy.attempts_spent(attempts)
            || self
                .policy
                .time_spent(self.clock.now().saturating_duration_since(started))
    }

    /// Sleep for `delay`, but never past `deadline`.
    async fn pause(
        &self,
        delay: Duration,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> bool {
        let delay = match deadline {
            Some(deadline) => delay.min(deadline.saturating_duration_since(self.clock.now())),
            None => delay,
        };
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = self.clock.sleep(delay) => true,
        }
    }

    async fn until(&self, deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(self.clock.now());
                self.clock.sleep(left).await;
            }
            None => std::future::pending().await,
        }
    }
}
