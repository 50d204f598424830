//! Deletion convergence.
//!
//! After a delete call the remote store may keep reporting the group for a
//! while. [`DeletionPoller`] re-queries until the store affirmatively reports
//! absence, the poll budget runs out, the caller's deadline passes, or a
//! non-retryable error comes back.
//!
//! ```text
//! Deleting ─▶ Polling{1} ─▶ Polling{2} ─▶ … ─┬─▶ Confirmed   (not found)
//!                                              ├─▶ TimedOut    (budget spent)
//!                                              ├─▶ Cancelled   (deadline hit)
//!                                              └─▶ Failed      (fatal error)
//! ```
//!
//! Nothing is persisted: after a restart the poller is re-entered from
//! `Deleting` with just the identity.

use crate::client::{ApiError, CloudApi, ErrorClass};
use crate::config::PollSettings;
use crate::error::{DgroupError, Result};
use crate::types::GroupIdentity;
use crate::wire::WireGroup;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// One existence check, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    StillExists,
    Gone,
    Transient(ApiError),
    Fatal(ApiError),
}

impl From<std::result::Result<WireGroup, ApiError>> for Observation {
    fn from(result: std::result::Result<WireGroup, ApiError>) -> Self {
        match result {
            Ok(_) => Observation::StillExists,
            Err(e) => match e.classify() {
                ErrorClass::NotFound => Observation::Gone,
                ErrorClass::Transient => Observation::Transient(e),
                ErrorClass::Fatal => Observation::Fatal(e),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// PollState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PollState {
    /// Delete issued, no check made yet.
    Deleting,
    /// About to make check number `attempt` (1-indexed).
    Polling { attempt: u32 },
    Confirmed,
    TimedOut,
    Cancelled,
    Failed { error: ApiError },
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Deleting | PollState::Polling { .. })
    }

    /// Pure transition function. `elapsed` is measured from the delete call
    /// on a monotonic clock.
    pub fn advance(&self, observation: &Observation, elapsed: Duration, budget: Duration) -> PollState {
        let attempt = match self {
            PollState::Deleting => return PollState::Polling { attempt: 1 },
            PollState::Polling { attempt } => *attempt,
            terminal => return terminal.clone(),
        };
        match observation {
            Observation::Gone => PollState::Confirmed,
            Observation::Fatal(e) => PollState::Failed { error: e.clone() },
            Observation::StillExists | Observation::Transient(_) => {
                if elapsed < budget {
                    PollState::Polling {
                        attempt: attempt + 1,
                    }
                } else {
                    PollState::TimedOut
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PollReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    Confirmed,
    /// Budget exhausted while the group was still visible. Not a failure: the
    /// deletion may still complete and the caller can check again later.
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollReport {
    pub identity: GroupIdentity,
    pub outcome: PollOutcome,
    pub checks: u32,
    pub elapsed: Duration,
    pub trace: Vec<PollState>,
}

impl PollReport {
    /// Treat anything short of confirmation as an error.
    pub fn into_result(self) -> Result<PollReport> {
        match self.outcome {
            PollOutcome::Confirmed => Ok(self),
            PollOutcome::TimedOut | PollOutcome::Cancelled => Err(DgroupError::TimedOut {
                identity: self.identity,
                elapsed: self.elapsed,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// DeletionPoller
// ---------------------------------------------------------------------------

pub struct DeletionPoller<'a, C: CloudApi + ?Sized> {
    client: &'a C,
    settings: &'a PollSettings,
}

impl<'a, C: CloudApi + ?Sized> DeletionPoller<'a, C> {
    pub fn new(client: &'a C, settings: &'a PollSettings) -> Self {
        Self { client, settings }
    }

    /// Poll until `identity` is confirmed absent. `started` is when the delete
    /// was issued; `deadline` is an optional outer limit that wins over the
    /// poll budget.
    ///
    /// Fatal errors are returned as `Err` immediately. Budget exhaustion and
    /// deadline cancellation are reported in the `Ok` outcome.
    pub async fn wait(
        &self,
        identity: &GroupIdentity,
        started: Instant,
        deadline: Option<Instant>,
    ) -> Result<PollReport> {
        let budget = self.settings.budget();
        let budget_end = started + budget;
        let mut trace = vec![PollState::Deleting];
        let mut state = PollState::Deleting.advance(&Observation::StillExists, Duration::ZERO, budget);
        trace.push(state.clone());
        let mut checks = 0u32;

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(group = %identity, checks, "deletion wait cancelled by deadline");
                trace.push(PollState::Cancelled);
                return Ok(self.report(identity, PollOutcome::Cancelled, checks, started, trace));
            }

            let observation = Observation::from(self.client.get_group(identity).await);
            checks += 1;
            let next = state.advance(&observation, started.elapsed(), budget);
            debug!(group = %identity, ?observation, ?next, "deletion check");
            trace.push(next.clone());
            state = next;

            match &state {
                PollState::Confirmed => {
                    info!(group = %identity, checks, "deletion confirmed");
                    return Ok(self.report(identity, PollOutcome::Confirmed, checks, started, trace));
                }
                PollState::TimedOut => {
                    warn!(
                        group = %identity,
                        checks,
                        budget_seconds = budget.as_secs(),
                        "deletion still pending after poll budget"
                    );
                    return Ok(self.report(identity, PollOutcome::TimedOut, checks, started, trace));
                }
                PollState::Failed { error } => {
                    warn!(group = %identity, error = %error, "deletion check failed");
                    return Err(DgroupError::Fatal {
                        identity: identity.clone(),
                        source: error.clone(),
                    });
                }
                PollState::Polling { attempt } => {
                    let mut wake = Instant::now() + self.settings.backoff.delay(attempt - 1);
                    wake = wake.min(budget_end);
                    if let Some(d) = deadline {
                        wake = wake.min(d);
                    }
                    tokio::time::sleep_until(wake).await;
                }
                PollState::Deleting | PollState::Cancelled => {
                    unreachable!("poll loop never re-enters {state:?}")
                }
            }
        }
    }

    fn report(
        &self,
        identity: &GroupIdentity,
        outcome: PollOutcome,
        checks: u32,
        started: Instant,
        trace: Vec<PollState>,
    ) -> PollReport {
        PollReport {
            identity: identity.clone(),
            outcome,
            checks,
            elapsed: started.elapsed(),
            trace,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
