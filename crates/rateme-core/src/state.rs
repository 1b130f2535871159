//! Persisted launch record.
//!
//! One record per application, under a fixed namespace:
//!
//! | key                | kind | absent means          |
//! |--------------------|------|-----------------------|
//! | `rta_install_date` | long | never launched/reset  |
//! | `rta_launch_times` | int  | 0                     |
//! | `rta_opt_out`      | bool | false                 |
//! | `rta_rated`        | bool | false                 |
//!
//! ## State Transitions
//!
//! ```text
//! Fresh -> Active -> (prompt shown, cleared) -> Fresh -> ...
//!   any --set_opt_out(true)--> OptedOut   (left only by a full wipe)
//! ```
//!
//! The install date and the launch count are always written in the same
//! batch and always read in one consistent read, so a non-zero count never
//! appears without an install date.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::storage::kv::{decode_bool, decode_int, decode_long};
use crate::storage::{Edit, KeyValueStore, StoreValue};

pub const DEFAULT_NAMESPACE: &str = "RateThisApp";

pub const KEY_INSTALL_DATE: &str = "rta_install_date";
pub const KEY_LAUNCH_TIMES: &str = "rta_launch_times";
pub const KEY_OPT_OUT: &str = "rta_opt_out";
pub const KEY_RATED: &str = "rta_rated";

/// Every key of the record, in the order [`decode_record`] expects.
const RECORD_KEYS: [&str; 4] = [KEY_INSTALL_DATE, KEY_LAUNCH_TIMES, KEY_OPT_OUT, KEY_RATED];

/// Point-in-time view of the launch record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaunchSnapshot {
    /// First recorded launch since creation or the last clear.
    pub install_timestamp: Option<DateTime<Utc>>,
    pub launch_count: u32,
    pub opted_out: bool,
    pub rated: bool,
}

impl LaunchSnapshot {
    /// No launch recorded since creation or the last clear.
    pub fn is_fresh(&self) -> bool {
        self.install_timestamp.is_none() && self.launch_count == 0
    }

    fn cleared(self) -> Self {
        Self {
            install_timestamp: None,
            launch_count: 0,
            ..self
        }
    }
}

/// Durable launch record plus the process-local cache of its last known value.
///
/// Writes and reads of one instance are serialised by an instance-wide lock,
/// which also keeps the cache in step with the store. Increments made by
/// other instances over the same store are protected by the store's own
/// `update` transaction.
pub struct PersistedState<S: KeyValueStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    write_lock: Mutex<()>,
    cache: Mutex<Option<LaunchSnapshot>>,
}

impl<S: KeyValueStore> PersistedState<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> PersistedState<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
            cache: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Count one application launch.
    ///
    /// Sets the install date on the first launch after creation or a clear.
    /// The read and the write form one store transaction, so launches
    /// recorded through other instances over the same store are not lost.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the record cannot be read or written.
    pub fn record_launch(&self) -> Result<LaunchSnapshot, StoreError> {
        let _guard = self.lock_writes();
        let namespace = self.store.namespace();
        let mut next = LaunchSnapshot::default();
        let mut first_install = None;

        self.store.update(&RECORD_KEYS, &mut |values| {
            let current = decode_record(namespace, values)?;
            let mut edits = Vec::with_capacity(2);
            next = current;
            if current.install_timestamp.is_none() {
                let now = truncate_to_millis(self.clock.now());
                edits.push(Edit::Put(
                    KEY_INSTALL_DATE.to_string(),
                    StoreValue::Long(now.timestamp_millis()),
                ));
                next.install_timestamp = Some(now);
                first_install = Some(now);
            }
            next.launch_count = current.launch_count.saturating_add(1).min(i32::MAX as u32);
            edits.push(Edit::Put(
                KEY_LAUNCH_TIMES.to_string(),
                StoreValue::Int(next.launch_count as i32),
            ));
            Ok(edits)
        })?;

        if let Some(now) = first_install {
            tracing::debug!(namespace, "first install: {now}");
        }
        tracing::debug!(namespace, launch_count = next.launch_count, "launch recorded");

        self.set_cache(Some(next));
        Ok(next)
    }

    /// Read the durable record without changing it. Refreshes the cache.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the record cannot be read.
    pub fn snapshot(&self) -> Result<LaunchSnapshot, StoreError> {
        let _guard = self.lock_writes();
        let snapshot = self.read()?;
        self.set_cache(Some(snapshot));
        Ok(snapshot)
    }

    /// Last value read or written by this instance, without touching the store.
    pub fn cached_snapshot(&self) -> Option<LaunchSnapshot> {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drop the install date and launch count. Both flags are kept.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the record cannot be written.
    pub fn clear_launch_data(&self) -> Result<(), StoreError> {
        let _guard = self.lock_writes();
        self.store
            .edit()
            .remove(KEY_INSTALL_DATE)
            .remove(KEY_LAUNCH_TIMES)
            .commit()?;
        self.update_cache(LaunchSnapshot::cleared);
        tracing::debug!(namespace = self.store.namespace(), "launch data cleared");
        Ok(())
    }

    /// Set the sticky opt-out flag.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the record cannot be written.
    pub fn set_opt_out(&self, opted_out: bool) -> Result<(), StoreError> {
        let _guard = self.lock_writes();
        self.store.edit().put_bool(KEY_OPT_OUT, opted_out).commit()?;
        self.update_cache(|s| LaunchSnapshot { opted_out, ..s });
        tracing::info!(namespace = self.store.namespace(), opted_out, "opt-out updated");
        Ok(())
    }

    /// Set the sticky "has rated" flag.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the record cannot be written.
    pub fn set_rated(&self, rated: bool) -> Result<(), StoreError> {
        let _guard = self.lock_writes();
        self.store.edit().put_bool(KEY_RATED, rated).commit()?;
        self.update_cache(|s| LaunchSnapshot { rated, ..s });
        Ok(())
    }

    fn read(&self) -> Result<LaunchSnapshot, StoreError> {
        let values = self.store.get_many(&RECORD_KEYS)?;
        decode_record(self.store.namespace(), &values)
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_cache(&self, snapshot: Option<LaunchSnapshot>) {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }

    // Only patches an existing cache entry; an empty cache is filled on the next read.
    fn update_cache(&self, f: impl FnOnce(LaunchSnapshot) -> LaunchSnapshot) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(snapshot) = cache.take() {
            *cache = Some(f(snapshot));
        }
    }
}

/// Decode the values of [`RECORD_KEYS`], in that order.
fn decode_record(
    namespace: &str,
    values: &[Option<StoreValue>],
) -> Result<LaunchSnapshot, StoreError> {
    let value = |i: usize| values.get(i).copied().flatten();

    let install_timestamp = match decode_long(namespace, KEY_INSTALL_DATE, value(0))? {
        None => None,
        Some(ms) => Some(DateTime::from_timestamp_millis(ms).ok_or_else(|| {
            StoreError::unavailable(namespace, format!("install date {ms} is out of range"))
        })?),
    };
    let launch_count = decode_int(namespace, KEY_LAUNCH_TIMES, value(1))?
        .map(|n| u32::try_from(n).unwrap_or(0))
        .unwrap_or(0);

    Ok(LaunchSnapshot {
        install_timestamp,
        launch_count,
        opted_out: decode_bool(namespace, KEY_OPT_OUT, value(2))?.unwrap_or(false),
        rated: decode_bool(namespace, KEY_RATED, value(3))?.unwrap_or(false),
    })
}

fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}
