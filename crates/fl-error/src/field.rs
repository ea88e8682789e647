// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed views over context keys.

use crate::error::{Error, Fault};
use crate::wrap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;

/// Why a [`TypedField`] read failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// There was no error to read from.
    #[error("typed field {key:?}: error is absent")]
    MissingError {
        /// Field key.
        key: &'static str,
    },
    /// The error has no field under this key.
    #[error("typed field {key:?}: field missing")]
    MissingField {
        /// Field key.
        key: &'static str,
    },
    /// The stored value does not deserialize into the requested type.
    #[error("typed field {key:?}: wrong type: {reason}")]
    WrongType {
        /// Field key.
        key: &'static str,
        /// Deserializer message.
        reason: String,
    },
}

/// A context key bound to a value type.
///
/// ```
/// use fl_error::{not_found, TypedField};
///
/// const ATTEMPT: TypedField<u32> = TypedField::new("attempt");
///
/// let err = ATTEMPT.set(Some(&not_found("job", 7)), 3);
/// assert_eq!(ATTEMPT.get(Some(&err)), Some(3));
/// ```
pub struct TypedField<T> {
    key: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> TypedField<T> {
    /// Bind `key` to `T`.
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _type: PhantomData,
        }
    }

    /// The context key.
    pub fn key(&self) -> &'static str {
        self.key
    }
}

impl<T> Clone for TypedField<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedField<T> {}

impl<T> fmt::Debug for TypedField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedField")
            .field("key", &self.key)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Serialize + DeserializeOwned> TypedField<T> {
    /// Attach `value`. With no error, creates a new `internal` failure.
    pub fn set(&self, err: Option<&Error>, value: T) -> Error {
        wrap::with(err.cloned(), self.key, value)
    }

    /// The latest value under this key, if present and of type `T`.
    pub fn get(&self, err: Option<&Error>) -> Option<T> {
        self.try_get(err).ok()
    }

    /// Like [`get`](TypedField::get), reporting why the read failed.
    pub fn try_get(&self, err: Option<&Error>) -> Result<T, FieldError> {
        let key = self.key;
        let err = err.ok_or(FieldError::MissingError { key })?;
        let value = err
            .fields()
            .get(key)
            .ok_or(FieldError::MissingField { key })?;
        serde_json::from_value(value.clone()).map_err(|e| FieldError::WrongType {
            key,
            reason: e.to_string(),
        })
    }

    /// Like [`get`](TypedField::get), but panics when the error is absent,
    /// the field is missing, or the value has the wrong type.
    pub fn must_get(&self, err: Option<&Error>) -> T {
        match self.try_get(err) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }
}
