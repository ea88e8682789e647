// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ordered, append-only key/value context.
//!
//! Storage is an `Arc<[Field]>` that is never written after publication.
//! Appending allocates a fresh slice; projecting to a map copies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// A single key/value annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name. Empty keys are stored but dropped by [`Context::to_map`].
    pub key: String,
    /// Field value.
    pub value: Value,
}

impl Field {
    /// Create a field.
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

static EMPTY: LazyLock<Arc<[Field]>> = LazyLock::new(|| Arc::from(Vec::new()));

/// Serialize `value` into a context value, falling back to `null`.
pub fn value_of<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Build a flat key/value list for [`Fault::add_context`](crate::Fault::add_context).
///
/// Every argument may be any `Serialize` value; pairs are read positionally.
///
/// ```
/// use fl_error::kv;
///
/// let kv = kv!("table", "users", "elapsed_ms", 12.7);
/// assert_eq!(kv.len(), 4);
/// ```
#[macro_export]
macro_rules! kv {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($x:expr),+ $(,)?) => {
        ::std::vec![$($crate::value_of(&$x)),+]
    };
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Insertion-ordered, immutable list of [`Field`]s.
#[derive(Clone)]
pub struct Context {
    fields: Arc<[Field]>,
}

impl Context {
    /// The canonical empty context. Does not allocate.
    pub fn empty() -> Self {
        Self {
            fields: Arc::clone(&EMPTY),
        }
    }

    /// Parse a flat key/value list.
    ///
    /// Keys must be strings. A non-string key drops the whole pair (the key
    /// and the value after it) so later pairs stay aligned. A trailing key
    /// with no value is stored as `null`.
    pub fn from_kv<I>(kv: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut iter = kv.into_iter();
        let mut out = Vec::new();
        while let Some(key) = iter.next() {
            let value = iter.next().unwrap_or(Value::Null);
            if let Value::String(key) = key {
                out.push(Field { key, value });
            }
        }
        Self::from_vec(out)
    }

    fn from_vec(fields: Vec<Field>) -> Self {
        if fields.is_empty() {
            return Self::empty();
        }
        Self {
            fields: Arc::from(fields),
        }
    }

    /// Return a context with `add` after the existing fields.
    ///
    /// Adding nothing returns a handle to the same storage.
    pub fn append<I>(&self, add: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        let mut add = add.into_iter().peekable();
        if add.peek().is_none() {
            return self.clone();
        }
        let mut out = Vec::with_capacity(self.fields.len() + add.size_hint().0);
        out.extend(self.fields.iter().cloned());
        out.extend(add);
        Self::from_vec(out)
    }

    /// Keep only the newest `max` fields. `max == 0` means unbounded.
    pub fn keep_newest(&self, max: usize) -> Self {
        if max == 0 || self.fields.len() <= max {
            return self.clone();
        }
        let start = self.fields.len() - max;
        Self::from_vec(self.fields[start..].to_vec())
    }

    /// Project to a map: last write wins per key, empty keys are dropped.
    ///
    /// The map is a copy; changing it never touches this context.
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        for f in self.fields.iter().filter(|f| !f.key.is_empty()) {
            map.insert(f.key.clone(), f.value.clone());
        }
        map
    }

    /// Latest value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .rev()
            .find(|f| !f.key.is_empty() && f.key == key)
            .map(|f| &f.value)
    }

    /// Fields in insertion order.
    pub fn as_slice(&self) -> &[Field] {
        &self.fields
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Number of stored fields, duplicates and empty keys included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` when no fields are stored.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `true` when both handles point at the same storage.
    pub fn shares_storage_with(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.fields.iter().map(|fl| (&fl.key, &fl.value)))
            .finish()
    }
}

impl<'a> IntoIterator for &'a Context {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
