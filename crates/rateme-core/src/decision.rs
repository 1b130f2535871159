//! Rate-prompt decision.
//!
//! Either threshold alone triggers the prompt, whichever is reached first:
//!
//! 1. opted out -> never show, nothing changes
//! 2. `launch_count >= min_launch_times` -> show
//! 3. time since install `>= min_install_days` -> show
//! 4. otherwise wait
//!
//! Showing clears the launch data so counting restarts from the next launch.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::StoreError;
use crate::state::{LaunchSnapshot, PersistedState};
use crate::storage::KeyValueStore;

/// Caller-supplied trigger thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min_install_days: u32,
    pub min_launch_times: u32,
}

impl Thresholds {
    pub const fn new(min_install_days: u32, min_launch_times: u32) -> Self {
        Self {
            min_install_days,
            min_launch_times,
        }
    }

    pub fn min_install_age(&self) -> Duration {
        Duration::days(i64::from(self.min_install_days))
    }
}

/// Which threshold fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    LaunchCount,
    InstallAge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The user opted out.
    Suppressed,
    Show { reason: TriggerReason },
    Wait {
        launches_remaining: u32,
        seconds_remaining: i64,
    },
}

impl Decision {
    pub fn should_show(&self) -> bool {
        matches!(self, Decision::Show { .. })
    }
}

/// Stateless decision logic over a [`LaunchSnapshot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RateDecisionEngine;

impl RateDecisionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Pure decision; never touches storage.
    ///
    /// A missing install date, or one later than `now`, counts as zero
    /// elapsed time.
    pub fn decide(
        &self,
        snapshot: &LaunchSnapshot,
        thresholds: Thresholds,
        now: DateTime<Utc>,
    ) -> Decision {
        if snapshot.opted_out {
            return Decision::Suppressed;
        }

        if snapshot.launch_count >= thresholds.min_launch_times {
            return Decision::Show {
                reason: TriggerReason::LaunchCount,
            };
        }

        let elapsed = snapshot
            .install_timestamp
            .map(|installed| now - installed)
            .filter(|elapsed| *elapsed > Duration::zero())
            .unwrap_or_else(Duration::zero);
        let required = thresholds.min_install_age();
        if elapsed >= required {
            return Decision::Show {
                reason: TriggerReason::InstallAge,
            };
        }

        Decision::Wait {
            launches_remaining: thresholds.min_launch_times - snapshot.launch_count,
            seconds_remaining: (required - elapsed).num_seconds(),
        }
    }

    /// Decide against the state's cached snapshot (reading one if none is
    /// cached yet), and clear the launch data when the prompt should show.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the snapshot cannot be read or the
    /// reset cannot be written.
    pub fn evaluate<S: KeyValueStore, C: Clock>(
        &self,
        state: &PersistedState<S, C>,
        thresholds: Thresholds,
    ) -> Result<Decision, StoreError> {
        let snapshot = match state.cached_snapshot() {
            Some(snapshot) => snapshot,
            None => state.snapshot()?,
        };

        let decision = self.decide(&snapshot, thresholds, state.clock().now());
        if let Decision::Show { reason } = decision {
            state.clear_launch_data()?;
            tracing::info!(
                ?reason,
                launch_count = snapshot.launch_count,
                "rate prompt triggered"
            );
        }
        Ok(decision)
    }

    /// # Errors
    /// See [`RateDecisionEngine::evaluate`].
    pub fn should_show_prompt<S: KeyValueStore, C: Clock>(
        &self,
        state: &PersistedState<S, C>,
        thresholds: Thresholds,
    ) -> Result<bool, StoreError> {
        self.evaluate(state, thresholds).map(|d| d.should_show())
    }
}
