//! Key-value capability the persisted launch record is written through.
//!
//! Backends provide a namespaced point read, an atomic batch apply and an
//! atomic read-modify-write; the typed getters, multi-key reads and the
//! [`Editor`] builder are layered on top of those.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Value held under a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum StoreValue {
    Int(i32),
    Long(i64),
    Bool(bool),
}

impl StoreValue {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreValue::Int(_) => "int",
            StoreValue::Long(_) => "long",
            StoreValue::Bool(_) => "bool",
        }
    }
}

/// One pending change inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Put(String, StoreValue),
    Remove(String),
}

/// Edits derived from the values read by [`KeyValueStore::update`].
pub type UpdateFn<'f> = dyn FnMut(&[Option<StoreValue>]) -> Result<Vec<Edit>, StoreError> + 'f;

/// Namespaced key-value store.
///
/// `apply` must be all-or-nothing: after an error no edit of the batch is
/// visible. `update` must additionally exclude every other writer of the
/// namespace, in this process or another one, between its read and its write.
pub trait KeyValueStore: Send + Sync {
    /// Namespace every key of this store lives under.
    fn namespace(&self) -> &str;

    fn get(&self, key: &str) -> Result<Option<StoreValue>, StoreError>;

    fn apply(&self, edits: &[Edit]) -> Result<(), StoreError>;

    /// Read `keys`, hand the values to `f` and commit the edits it returns,
    /// as one atomic step.
    fn update(&self, keys: &[&str], f: &mut UpdateFn<'_>) -> Result<(), StoreError>;

    /// Read several keys as of a single point in time.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<StoreValue>>, StoreError> {
        let mut values = Vec::new();
        self.update(keys, &mut |read| {
            values = read.to_vec();
            Ok(Vec::new())
        })?;
        Ok(values)
    }

    fn get_int(&self, key: &str) -> Result<Option<i32>, StoreError> {
        decode_int(self.namespace(), key, self.get(key)?)
    }

    fn get_long(&self, key: &str) -> Result<Option<i64>, StoreError> {
        decode_long(self.namespace(), key, self.get(key)?)
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>, StoreError> {
        decode_bool(self.namespace(), key, self.get(key)?)
    }

    /// Start a batch of edits, committed atomically.
    fn edit(&self) -> Editor<'_, Self>
    where
        Self: Sized,
    {
        Editor::new(self)
    }
}

pub fn decode_int(
    namespace: &str,
    key: &str,
    value: Option<StoreValue>,
) -> Result<Option<i32>, StoreError> {
    match value {
        None => Ok(None),
        Some(StoreValue::Int(v)) => Ok(Some(v)),
        Some(other) => Err(type_mismatch(namespace, key, "int", other)),
    }
}

pub fn decode_long(
    namespace: &str,
    key: &str,
    value: Option<StoreValue>,
) -> Result<Option<i64>, StoreError> {
    match value {
        None => Ok(None),
        Some(StoreValue::Long(v)) => Ok(Some(v)),
        Some(other) => Err(type_mismatch(namespace, key, "long", other)),
    }
}

pub fn decode_bool(
    namespace: &str,
    key: &str,
    value: Option<StoreValue>,
) -> Result<Option<bool>, StoreError> {
    match value {
        None => Ok(None),
        Some(StoreValue::Bool(v)) => Ok(Some(v)),
        Some(other) => Err(type_mismatch(namespace, key, "bool", other)),
    }
}

fn type_mismatch(namespace: &str, key: &str, expected: &str, found: StoreValue) -> StoreError {
    StoreError::unavailable(
        namespace,
        format!(
            "key '{key}' holds a {} value, expected {expected}",
            found.kind()
        ),
    )
}

/// Batch builder returned by [`KeyValueStore::edit`].
#[must_use = "edits are discarded unless committed"]
pub struct Editor<'a, S: KeyValueStore> {
    store: &'a S,
    edits: Vec<Edit>,
}

impl<'a, S: KeyValueStore> Editor<'a, S> {
    fn new(store: &'a S) -> Self {
        Self {
            store,
            edits: Vec::new(),
        }
    }

    pub fn put_int(mut self, key: &str, value: i32) -> Self {
        self.edits.push(Edit::Put(key.to_string(), StoreValue::Int(value)));
        self
    }

    pub fn put_long(mut self, key: &str, value: i64) -> Self {
        self.edits.push(Edit::Put(key.to_string(), StoreValue::Long(value)));
        self
    }

    pub fn put_bool(mut self, key: &str, value: bool) -> Self {
        self.edits.push(Edit::Put(key.to_string(), StoreValue::Bool(value)));
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        self.edits.push(Edit::Remove(key.to_string()));
        self
    }

    pub fn commit(self) -> Result<(), StoreError> {
        if self.edits.is_empty() {
            return Ok(());
        }
        self.store.apply(&self.edits)
    }
}
