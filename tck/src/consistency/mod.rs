//! Bounded polling until two data sources agree.
//!
//! The consensus source reflects a write as soon as it is finalized; the
//! mirror source indexes it later. Every assertion that reads the mirror
//! goes through [`ConsistencyVerifier::retry_until`] instead of sleeping.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use log::{debug, error, warn};
use tck_common::TestContext;
use thiserror::Error;
use tokio::time::Duration;

use crate::orchestrator::{Clock, SystemClock};

/// Default number of probes per check
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default delay between two probes
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// A budget of zero probes could never observe convergence
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("A retry budget needs at least one attempt")]
pub struct ZeroAttempts;

/// How many times to probe and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: u32,
    interval: Duration,
}

impl RetryBudget {
    /// Budget of exactly `max_attempts` probes spaced by `interval`
    pub fn new(max_attempts: u32, interval: Duration) -> Result<Self, ZeroAttempts> {
        if max_attempts == 0 {
            return Err(ZeroAttempts);
        }
        Ok(Self {
            max_attempts,
            interval,
        })
    }

    /// Upper bound on probes
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between probes
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Longest total wait this budget allows
    pub fn total_wait(&self) -> Duration {
        self.interval * (self.max_attempts - 1)
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// One convergence condition.
///
/// `probe` reads both sources and returns `(consensus, mirror)`;
/// `equals` decides whether they agree.
pub struct ConsistencyCheck<P, E> {
    label: String,
    probe: P,
    equals: E,
    budget: Option<RetryBudget>,
}

impl<P, E> ConsistencyCheck<P, E> {
    /// Check using the verifier's default budget
    pub fn new(label: impl Into<String>, probe: P, equals: E) -> Self {
        Self {
            label: label.into(),
            probe,
            equals,
            budget: None,
        }
    }

    /// Override the verifier's budget for this check
    pub fn with_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Human-readable description used in logs and errors
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Why a check did not converge
#[derive(Debug, Error)]
pub enum ConsistencyError {
    /// Every probe in the budget disagreed
    #[error("'{label}' did not converge after {attempts} attempt(s): consensus={consensus}, mirror={mirror}")]
    Timeout {
        /// Check label
        label: String,
        /// Probes performed
        attempts: u32,
        /// Debug rendering of the last consensus value
        consensus: String,
        /// Debug rendering of the last mirror value
        mirror: String,
    },
    /// A probe failed outright
    #[error("'{label}' probe failed on attempt {attempt}")]
    Probe {
        /// Check label
        label: String,
        /// Attempt that failed, starting at 1
        attempt: u32,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckState {
    Pending,
    Satisfied,
    Exhausted,
}

fn next_state(matched: bool, attempt: u32, max_attempts: u32) -> CheckState {
    if matched {
        CheckState::Satisfied
    } else if attempt >= max_attempts {
        CheckState::Exhausted
    } else {
        CheckState::Pending
    }
}

/// Runs [`ConsistencyCheck`]s against an injected [`Clock`]
pub struct ConsistencyVerifier {
    clock: Arc<dyn Clock>,
    budget: RetryBudget,
}

impl ConsistencyVerifier {
    /// Verifier sleeping on `clock` with `budget` as the default
    pub fn new(clock: Arc<dyn Clock>, budget: RetryBudget) -> Self {
        Self { clock, budget }
    }

    /// Verifier on the tokio timer with the default budget
    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock), RetryBudget::default())
    }

    /// Budget used by checks that do not set their own
    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// Probe until `check` holds or its budget runs out.
    ///
    /// Sleeps only between probes, never after the last one.
    pub async fn retry_until<P, Fut, E, A, B>(
        &self,
        ctx: &TestContext,
        check: ConsistencyCheck<P, E>,
    ) -> Result<(), ConsistencyError>
    where
        P: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<(A, B)>>,
        E: Fn(&A, &B) -> bool,
        A: Debug,
        B: Debug,
    {
        let ConsistencyCheck {
            label,
            mut probe,
            equals,
            budget,
        } = check;
        let budget = budget.unwrap_or(self.budget);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let (consensus, mirror) = match probe().await {
                Ok(values) => values,
                Err(source) => {
                    error!(
                        "[{}] '{}' probe failed on attempt {}: {:#}",
                        ctx.scenario(),
                        label,
                        attempt,
                        source
                    );
                    return Err(ConsistencyError::Probe {
                        label,
                        attempt,
                        source,
                    });
                }
            };

            match next_state(equals(&consensus, &mirror), attempt, budget.max_attempts) {
                CheckState::Satisfied => {
                    debug!(
                        "[{}] '{}' converged on attempt {}",
                        ctx.scenario(),
                        label,
                        attempt
                    );
                    return Ok(());
                }
                CheckState::Exhausted => {
                    error!(
                        "[{}] '{}' did not converge after {} attempt(s)",
                        ctx.scenario(),
                        label,
                        attempt
                    );
                    return Err(ConsistencyError::Timeout {
                        label,
                        attempts: attempt,
                        consensus: format!("{:?}", consensus),
                        mirror: format!("{:?}", mirror),
                    });
                }
                CheckState::Pending => {
                    warn!(
                        "[{}] '{}' not converged (attempt {}/{}), retrying in {:?}",
                        ctx.scenario(),
                        label,
                        attempt,
                        budget.max_attempts,
                        budget.interval
                    );
                    self.clock.sleep(budget.interval).await;
                }
            }
        }
    }
}

impl Default for ConsistencyVerifier {
    fn default() -> Self {
        Self::with_system_clock()
    }
}
