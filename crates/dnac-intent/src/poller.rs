//! Execution status polling.
//!
//! Drives an [`ExecutionHandle`] to a terminal status. Polling is bounded by
//! an attempt count and a wall-clock deadline, waits with exponential backoff
//! between attempts and stops early when the cancellation token fires.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use dnac_connector::resilience::Backoff;
use dnac_connector::traits::ExecutionStatusOp;

use crate::error::{IntentError, IntentResult};
use crate::executor::{ExecutionHandle, PollPhase};

/// Bounds and pacing for execution polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Maximum number of status checks (default: 60).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the second check, in milliseconds (default: 1000).
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    /// Upper bound for a single wait, in milliseconds (default: 10000).
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Growth factor between waits (default: 1.5).
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Whether to add jitter to waits (default: true).
    #[serde(default = "default_jitter")]
    pub jitter: bool,

    /// Wall-clock limit for the whole poll loop, in milliseconds (default: 600000).
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

fn default_max_attempts() -> u32 {
    60
}

fn default_initial_interval_ms() -> u64 {
    1000
}

fn default_max_interval_ms() -> u64 {
    10_000
}

fn default_multiplier() -> f64 {
    1.5
}

fn default_jitter() -> bool {
    true
}

fn default_deadline_ms() -> u64 {
    600_000
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

impl PollPolicy {
    /// Set the maximum number of status checks.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the initial and maximum wait between checks.
    #[must_use]
    pub fn with_intervals(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_interval_ms = u64::try_from(initial.as_millis()).unwrap_or(u64::MAX);
        self.max_interval_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the wall-clock deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// The wait schedule between checks.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff {
            initial_ms: self.initial_interval_ms,
            max_ms: self.max_interval_ms,
            multiplier: self.multiplier,
            jitter: self.jitter,
        }
    }
}

/// Polls execution status until the controller reports an outcome.
#[derive(Debug, Clone, Default)]
pub struct TaskPoller {
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl TaskPoller {
    #[must_use]
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a caller-owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll until the handle succeeds or fails.
    ///
    /// Returns the full execution-detail payload on success. A reported
    /// failure becomes [`IntentError::RemoteExecution`] carrying the
    /// controller's message unchanged. Transient client errors count as a
    /// non-terminal poll.
    #[instrument(skip(self, client, handle), fields(execution_id = %handle.execution_id))]
    pub async fn await_completion<C>(
        &self,
        client: &C,
        handle: &mut ExecutionHandle,
    ) -> IntentResult<Value>
    where
        C: ExecutionStatusOp + ?Sized,
    {
        let started = Instant::now();
        let backoff = self.policy.backoff();
        let deadline = self.policy.deadline();
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 0..max_attempts {
            if self.cancel.is_cancelled() {
                return Err(cancelled(handle));
            }

            match client
                .execution_status(handle.kind, &handle.execution_id)
                .await
            {
                Ok(details) => match handle.observe(&details) {
                    PollPhase::Succeeded => {
                        debug!(attempt = attempt + 1, "Execution succeeded");
                        return Ok(details.raw);
                    }
                    PollPhase::Failed => {
                        let message = handle.error_detail.clone().unwrap_or_else(|| {
                            format!("execution {} failed", handle.execution_id)
                        });
                        warn!(attempt = attempt + 1, error = %message, "Execution failed");
                        return Err(IntentError::RemoteExecution { message });
                    }
                    PollPhase::Submitted | PollPhase::Polling => {
                        debug!(
                            attempt = attempt + 1,
                            status = %details.status,
                            "Execution still in progress"
                        );
                    }
                },
                Err(e) if e.is_transient() => {
                    warn!(attempt = attempt + 1, error = %e, "Status check failed, will retry");
                    handle.mark_polling();
                }
                Err(e) => return Err(e.into()),
            }

            if attempt + 1 == max_attempts {
                break;
            }

            let wait = backoff.delay(attempt);
            if started.elapsed() + wait > deadline {
                return Err(IntentError::PollTimeout {
                    execution_id: handle.execution_id.clone(),
                    attempts: attempt + 1,
                    elapsed: started.elapsed(),
                });
            }

            tokio::select! {
                () = self.cancel.cancelled() => return Err(cancelled(handle)),
                () = tokio::time::sleep(wait) => {}
            }
        }

        Err(IntentError::PollTimeout {
            execution_id: handle.execution_id.clone(),
            attempts: max_attempts,
            elapsed: started.elapsed(),
        })
    }
}

fn cancelled(handle: &ExecutionHandle) -> IntentError {
    warn!(execution_id = %handle.execution_id, "Polling cancelled");
    IntentError::Cancelled {
        execution_id: handle.execution_id.clone(),
    }
}
