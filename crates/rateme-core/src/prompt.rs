//! Caller-facing rate prompt.
//!
//! The host application owns one [`RatePrompt`] for the process lifetime:
//!
//! ```ignore
//! let prompt = RatePrompt::from_config(&Config::load_or_default())?;
//! prompt.on_application_start(!restored_from_saved_session)?;
//! // later, at a point of the host's choosing:
//! if prompt.should_show_or_skip(10, 5) {
//!     show_dialog();
//! }
//! ```
//!
//! De-duplicating launches within one logical session, and not showing the
//! dialog twice per start, are left to the host.

use crate::clock::{Clock, SystemClock};
use crate::decision::{Decision, RateDecisionEngine, Thresholds};
use crate::error::Result;
use crate::state::{LaunchSnapshot, PersistedState};
use crate::storage::{Config, KeyValueStore, SqliteStore};

pub struct RatePrompt<S: KeyValueStore, C: Clock = SystemClock> {
    state: PersistedState<S, C>,
    engine: RateDecisionEngine,
    thresholds: Thresholds,
}

impl RatePrompt<SqliteStore, SystemClock> {
    /// Open the SQLite store named by `config` and use its thresholds.
    ///
    /// # Errors
    /// Returns an error if the store cannot be opened.
    pub fn from_config(config: &Config) -> Result<Self> {
        let namespace = config.store.namespace.clone();
        let store = match &config.store.database {
            Some(path) => SqliteStore::open(path, namespace)?,
            None => SqliteStore::open_default(namespace)?,
        };
        Ok(Self::new(PersistedState::new(store), config.thresholds()))
    }
}

impl<S: KeyValueStore, C: Clock> RatePrompt<S, C> {
    pub fn new(state: PersistedState<S, C>, thresholds: Thresholds) -> Self {
        Self {
            state,
            engine: RateDecisionEngine::new(),
            thresholds,
        }
    }

    pub fn state(&self) -> &PersistedState<S, C> {
        &self.state
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Record a launch if this is a fresh start (not a restored session).
    ///
    /// Returns the updated snapshot, or `None` when the start was not counted.
    ///
    /// # Errors
    /// Returns an error if the store is unavailable.
    pub fn on_application_start(&self, is_fresh_start: bool) -> Result<Option<LaunchSnapshot>> {
        if !is_fresh_start {
            tracing::trace!("resumed session, launch not counted");
            return Ok(None);
        }
        Ok(Some(self.state.record_launch()?))
    }

    /// # Errors
    /// Returns an error if the store is unavailable.
    pub fn should_show_rate_dialog(
        &self,
        min_install_days: u32,
        min_launch_times: u32,
    ) -> Result<bool> {
        Ok(self
            .decide(Thresholds::new(min_install_days, min_launch_times))?
            .should_show())
    }

    /// Same as [`Self::should_show_rate_dialog`] with the configured thresholds.
    ///
    /// # Errors
    /// Returns an error if the store is unavailable.
    pub fn should_show_with_defaults(&self) -> Result<bool> {
        Ok(self.decide(self.thresholds)?.should_show())
    }

    /// Full decision, including why the prompt is or isn't due.
    ///
    /// # Errors
    /// Returns an error if the store is unavailable.
    pub fn decide(&self, thresholds: Thresholds) -> Result<Decision> {
        Ok(self.engine.evaluate(&self.state, thresholds)?)
    }

    /// Like [`Self::should_show_rate_dialog`], but an unavailable store means
    /// "don't show this time" instead of an error.
    pub fn should_show_or_skip(&self, min_install_days: u32, min_launch_times: u32) -> bool {
        match self.should_show_rate_dialog(min_install_days, min_launch_times) {
            Ok(show) => show,
            Err(e) => {
                tracing::warn!("skipping rate prompt: {e}");
                false
            }
        }
    }

    /// # Errors
    /// Returns an error if the store is unavailable.
    pub fn set_opt_out(&self, opted_out: bool) -> Result<()> {
        Ok(self.state.set_opt_out(opted_out)?)
    }

    /// # Errors
    /// Returns an error if the store is unavailable.
    pub fn was_opted_out(&self) -> Result<bool> {
        Ok(self.state.snapshot()?.opted_out)
    }

    /// The user went to rate the app. Also opts out, so they are never asked again.
    ///
    /// # Errors
    /// Returns an error if the store is unavailable.
    pub fn mark_rated(&self) -> Result<()> {
        self.state.set_rated(true)?;
        self.state.set_opt_out(true)?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the store is unavailable.
    pub fn was_rated(&self) -> Result<bool> {
        Ok(self.state.snapshot()?.rated)
    }

    /// # Errors
    /// Returns an error if the store is unavailable.
    pub fn clear_launch_data(&self) -> Result<()> {
        Ok(self.state.clear_launch_data()?)
    }

    /// # Errors
    /// Returns an error if the store is unavailable.
    pub fn snapshot(&self) -> Result<LaunchSnapshot> {
        Ok(self.state.snapshot()?)
    }
}
