use std::time::Duration;

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter};
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use entity::role;

use crate::recovery::RecoveryService;

/// Tuning for the post-registration polling loop.
///
/// `max_attempts` bounds the whole detection process; `store_timeout` bounds
/// each individual count so one slow read cannot consume the budget.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub store_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            poll_interval: Duration::from_secs(2),
            max_attempts: 10,
            store_timeout: Duration::from_secs(3),
        }
    }
}

/// Terminal state of one monitoring run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// All expected roles materialized.
    Complete { roles_found: u64 },
    /// Attempts exhausted with some roles present. A success path: a
    /// degraded account beats blocking the user.
    Partial { roles_found: u64 },
    /// Zero roles after all attempts; emergency recovery repaired the
    /// account.
    Recovered { roles_found: u64 },
    /// Emergency recovery failed too. Surfaced to the user as a
    /// contact-support error.
    Failed(String),
    /// The session ended before the run finished.
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PollDecision {
    Satisfied,
    KeepPolling,
    GiveUpPartial,
    GiveUpEmpty,
}

/// Per-poll decision, kept free of I/O and timers so termination is
/// checkable in isolation.
pub(crate) fn poll_decision(
    attempt: u32,
    max_attempts: u32,
    roles_found: u64,
    expected: u64,
) -> PollDecision {
    if roles_found >= expected {
        return PollDecision::Satisfied;
    }
    if attempt < max_attempts {
        return PollDecision::KeepPolling;
    }
    if roles_found > 0 {
        PollDecision::GiveUpPartial
    } else {
        PollDecision::GiveUpEmpty
    }
}

/// Bounded polling loop started once per successful signup.
///
/// Watches the role store until the expected rows materialize, then
/// escalates to emergency recovery exactly once if nothing appeared.
pub struct RegistrationMonitor {
    db: DatabaseConnection,
    recovery: RecoveryService,
    config: MonitorConfig,
}

impl RegistrationMonitor {
    pub fn new(db: DatabaseConnection, recovery: RecoveryService, config: MonitorConfig) -> Self {
        RegistrationMonitor {
            db,
            recovery,
            config,
        }
    }

    async fn count_roles(&self, user_id: &str) -> Result<u64, DbErr> {
        role::Entity::find()
            .filter(role::Column::UserId.eq(user_id))
            .count(&self.db)
            .await
    }

    /// Poll until the expected role count is reached or the attempt budget
    /// runs out. Counts existence only; verification is a separate concern.
    /// The loop re-reads the store every poll and stops promptly when
    /// `shutdown` fires.
    pub async fn watch(
        &self,
        user_id: &str,
        expected_roles: u64,
        mut shutdown: broadcast::Receiver<()>,
    ) -> MonitorOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_count: u64 = 0;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match timeout(self.config.store_timeout, self.count_roles(user_id)).await {
                Ok(Ok(count)) => last_count = count,
                Ok(Err(e)) => {
                    // Transient store errors consume the attempt, not the run.
                    warn!(user_id, attempt, error = %e, "role count failed");
                }
                Err(_) => {
                    warn!(user_id, attempt, "role count timed out");
                }
            }

            match poll_decision(attempt, max_attempts, last_count, expected_roles) {
                PollDecision::Satisfied => {
                    info!(
                        user_id,
                        attempt,
                        roles_found = last_count,
                        "registration complete"
                    );
                    return MonitorOutcome::Complete {
                        roles_found: last_count,
                    };
                }
                PollDecision::GiveUpPartial => {
                    info!(
                        user_id,
                        roles_found = last_count,
                        expected = expected_roles,
                        "registration partially complete"
                    );
                    return MonitorOutcome::Partial {
                        roles_found: last_count,
                    };
                }
                PollDecision::GiveUpEmpty => {
                    warn!(user_id, "no roles materialized; invoking emergency recovery");
                    return match self.recovery.emergency_recover(user_id).await {
                        Ok(_) => MonitorOutcome::Recovered { roles_found: 1 },
                        Err(e) => MonitorOutcome::Failed(format!("emergency recovery failed: {e}")),
                    };
                }
                PollDecision::KeepPolling => {
                    debug!(
                        user_id,
                        attempt,
                        roles_found = last_count,
                        expected = expected_roles,
                        "waiting for roles"
                    );
                    tokio::select! {
                        _ = sleep(self.config.poll_interval) => {}
                        _ = shutdown.recv() => {
                            debug!(user_id, "monitor cancelled");
                            return MonitorOutcome::Cancelled;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfied_as_soon_as_count_reaches_expected() {
        assert_eq!(poll_decision(1, 10, 2, 2), PollDecision::Satisfied);
        assert_eq!(poll_decision(10, 10, 3, 2), PollDecision::Satisfied);
    }

    #[test]
    fn zero_expected_is_trivially_satisfied() {
        assert_eq!(poll_decision(1, 10, 0, 0), PollDecision::Satisfied);
    }

    #[test]
    fn keeps_polling_until_the_attempt_budget_is_spent() {
        for attempt in 1..10 {
            assert_eq!(poll_decision(attempt, 10, 0, 2), PollDecision::KeepPolling);
        }
    }

    #[test]
    fn exhausted_with_some_roles_is_partial_success() {
        assert_eq!(poll_decision(10, 10, 1, 2), PollDecision::GiveUpPartial);
    }

    #[test]
    fn exhausted_with_no_roles_escalates() {
        assert_eq!(poll_decision(10, 10, 0, 2), PollDecision::GiveUpEmpty);
    }
}
