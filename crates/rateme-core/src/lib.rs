//! # rateme Core Library
//!
//! Decides, on each application start, whether to show a "rate this app"
//! prompt, based on days since first install and number of launches, while
//! honouring a permanent user opt-out.
//!
//! ## Architecture
//!
//! - **Storage**: a namespaced key-value capability with SQLite and
//!   in-memory backends, plus TOML-based configuration
//! - **State**: the persisted launch record (install date, launch count,
//!   opt-out and rated flags) with a process-local cache
//! - **Decision**: a pure threshold check over a snapshot of that record
//!
//! ## Key Components
//!
//! - [`RatePrompt`]: the surface a host application calls
//! - [`PersistedState`]: launch record read/write
//! - [`RateDecisionEngine`]: threshold decision
//! - [`Clock`]: injectable wall clock

pub mod clock;
pub mod decision;
pub mod error;
pub mod prompt;
pub mod state;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{Decision, RateDecisionEngine, Thresholds, TriggerReason};
pub use error::{ConfigError, CoreError, StoreError};
pub use prompt::RatePrompt;
pub use state::{LaunchSnapshot, PersistedState, DEFAULT_NAMESPACE};
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore};
