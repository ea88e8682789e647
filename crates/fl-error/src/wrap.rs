// SPDX-License-Identifier: MIT OR Apache-2.0
//! Adapters that apply the fluent API to arbitrary errors.
//!
//! Every adapter takes `Option<E>`:
//!
//! * a faultline [`Error`] (directly, or inside a [`SharedError`]) gets the
//!   fluent operation;
//! * any other error becomes the cause of a new `internal` failure;
//! * `None` produces a fresh `internal` failure, except in [`convert`],
//!   which is a pure conversion and maps `None` to `None`.

use crate::code::Code;
use crate::context::Context;
use crate::error::{Error, Failure, Fault, SharedError};
use crate::unwrap::native;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

/// Share `err` without double-wrapping a value that is already shared.
///
/// A faultline [`Error`] held in an `Arc` or `Box` is unwrapped first, so the
/// value itself, not its forwarding container, becomes the cause.
pub(crate) fn into_shared<E>(err: E) -> SharedError
where
    E: StdError + Send + Sync + 'static,
{
    let any = &err as &dyn Any;
    if let Some(shared) = any.downcast_ref::<SharedError>() {
        return Arc::clone(shared);
    }
    if let Some(native) = any
        .downcast_ref::<Arc<Error>>()
        .map(|e| &**e)
        .or_else(|| any.downcast_ref::<Box<Error>>().map(|e| &**e))
    {
        return native.shared();
    }
    Arc::new(err)
}

/// The faultline value behind `err`, if there is one.
pub(crate) fn as_native<E>(err: &E) -> Option<Error>
where
    E: StdError + 'static,
{
    let any = err as &dyn Any;
    if let Some(shared) = any.downcast_ref::<SharedError>() {
        return native(&**shared).cloned();
    }
    native(err).cloned()
}

fn internal_wrapper<E>(err: E, message: &str, context: Context) -> Failure
where
    E: StdError + Send + Sync + 'static,
{
    Failure::new(Code::INTERNAL, message)
        .with_context(context)
        .with_cause(into_shared(err))
}

/// Pure conversion.
///
/// `None` stays `None`, a faultline error is returned unchanged, and anything
/// else becomes an `internal` failure (`"internal error"`, no stack) with the
/// original as its cause.
pub fn convert<E>(err: Option<E>) -> Option<Error>
where
    E: StdError + Send + Sync + 'static,
{
    let err = err?;
    Some(match as_native(&err) {
        Some(native) => native,
        None => internal_wrapper(err, "internal error", Context::empty()).into(),
    })
}

/// Attach a message and context.
///
/// Unlike [`convert`], `None` yields a new `internal` failure carrying the
/// message and context: the caller is asserting that something went wrong.
pub fn wrap<E, I>(err: Option<E>, message: &str, kv: I) -> Error
where
    E: StdError + Send + Sync + 'static,
    I: IntoIterator<Item = Value>,
{
    let Some(err) = err else {
        return Failure::new(Code::INTERNAL, message)
            .with_context(Context::from_kv(kv))
            .into();
    };
    match as_native(&err) {
        Some(native) => native.add_context(message, kv),
        None => internal_wrapper(err, message, Context::from_kv(kv)).into(),
    }
}

/// Attach one field.
pub fn with<E, V>(err: Option<E>, key: impl Into<String>, value: V) -> Error
where
    E: StdError + Send + Sync + 'static,
    V: Serialize,
{
    let base: Error = match err {
        None => Failure::new(Code::INTERNAL, "error").into(),
        Some(err) => match as_native(&err) {
            Some(native) => native,
            None => internal_wrapper(err, "internal error", Context::empty()).into(),
        },
    };
    base.with_field(key, value)
}

/// Set the code. Defects and interrupts keep theirs.
pub fn recode<E>(err: Option<E>, code: Code) -> Error
where
    E: StdError + Send + Sync + 'static,
{
    match err {
        None => Failure::new(code, "error").into(),
        Some(err) => match as_native(&err) {
            Some(native) => native.reclassify(code),
            None => Failure {
                code,
                ..internal_wrapper(err, "internal error", Context::empty())
            }
            .into(),
        },
    }
}

/// Capture a stack starting at the caller.
#[inline(never)]
pub fn with_stack<E>(err: Option<E>) -> Error
where
    E: StdError + Send + Sync + 'static,
{
    with_stack_skipping(err, 1)
}

/// Capture a stack, hiding `skip` caller frames beyond this call.
#[inline(never)]
pub fn with_stack_skipping<E>(err: Option<E>, skip: usize) -> Error
where
    E: StdError + Send + Sync + 'static,
{
    let failure = match err {
        None => Failure::new(Code::INTERNAL, "error"),
        Some(err) => match as_native(&err) {
            Some(native) => return native.capture_stack_skipping(skip + 1),
            None => internal_wrapper(err, "internal error", Context::empty()),
        },
    };
    failure.capture_stack_skipping(skip + 1)
}

// ---------------------------------------------------------------------------
// ResultExt
// ---------------------------------------------------------------------------

/// Adapters on `Result` for use with `?`.
///
/// ```
/// use fl_error::{kv, Fault, ResultExt};
///
/// fn load() -> Result<String, fl_error::Error> {
///     std::fs::read_to_string("/definitely/missing")
///         .wrap_err("load config", kv!("path", "/definitely/missing"))
/// }
///
/// let err = load().unwrap_err();
/// assert_eq!(err.message(), "load config");
/// ```
pub trait ResultExt<T> {
    /// [`wrap`] the error, if any.
    fn wrap_err<I>(self, message: &str, kv: I) -> Result<T, Error>
    where
        I: IntoIterator<Item = Value>;

    /// Attach one field to the error, if any.
    fn with_err_field<V: Serialize>(self, key: &str, value: V) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn wrap_err<I>(self, message: &str, kv: I) -> Result<T, Error>
    where
        I: IntoIterator<Item = Value>,
    {
        self.map_err(|err| wrap(Some(err), message, kv))
    }

    fn with_err_field<V: Serialize>(self, key: &str, value: V) -> Result<T, Error> {
        self.map_err(|err| with(Some(err), key, value))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::{interrupt, not_found};
    use crate::kv;
    use serde_json::json;
    use std::io;

    const NONE: Option<Error> = None;

    fn foreign() -> io::Error {
        io::Error::other("socket closed")
    }

    #[test]
    fn convert_none_is_none() {
        assert!(convert(NONE).is_none());
    }

    #[test]
    fn convert_native_returns_same_value() {
        let e = not_found("user", 1);
        let back = convert(Some(e.clone())).unwrap();
        assert!(back.same_value(&e));
    }

    #[test]
    fn convert_native_inside_shared() {
        let e = not_found("user", 1);
        let back = convert(Some(e.shared())).unwrap();
        assert!(back.same_value(&e));
    }

    #[test]
    fn convert_native_inside_arc_or_box() {
        let e = not_found("user", 1);
        assert!(convert(Some(Arc::new(e.clone()))).unwrap().same_value(&e));
        assert!(convert(Some(Box::new(e.clone()))).unwrap().same_value(&e));
        let tagged = wrap(Some(Arc::new(e.clone())), "", kv!("k", 1));
        assert_eq!(tagged.code(), Code::NOT_FOUND);
    }

    #[test]
    fn arced_native_cause_stays_visible() {
        use crate::construct::internal;
        use crate::predicates::has_code;
        use crate::unwrap::{has, root};

        let inner = not_found("user", 1);
        for outer in [
            internal(Some(Arc::new(inner.clone()))),
            internal(Some(Box::new(inner.clone()))),
        ] {
            assert!(has_code(Some(&outer), &Code::NOT_FOUND));
            assert!(has(Some(&outer), Some(&inner)));
            let leaf = root(Some(&outer)).unwrap();
            assert!(leaf.downcast_ref::<Error>().unwrap().same_value(&inner));
        }
    }

    #[test]
    fn convert_foreign_wraps_without_stack() {
        let e = convert(Some(foreign())).unwrap();
        assert_eq!(e.code(), Code::INTERNAL);
        assert_eq!(e.message(), "internal error");
        assert!(e.stack().is_none());
        assert_eq!(StdError::source(&e).unwrap().to_string(), "socket closed");
    }

    #[test]
    fn shared_foreign_is_not_rewrapped() {
        let shared: SharedError = Arc::new(foreign());
        let again = into_shared(Arc::clone(&shared));
        assert!(Arc::ptr_eq(&shared, &again));
    }

    #[test]
    fn wrap_none_creates_failure() {
        let e = wrap(NONE, "loading", kv!("k", 1));
        assert_eq!(e.code(), Code::INTERNAL);
        assert_eq!(e.message(), "loading");
        assert_eq!(e.context()["k"], json!(1));
    }

    #[test]
    fn wrap_native_sets_message_once() {
        let e = wrap(Some(not_found("user", 1)), "ignored", kv!("op", "get"));
        assert_eq!(e.message(), "user not found");
        assert_eq!(e.code(), Code::NOT_FOUND);
        assert_eq!(e.context()["op"], json!("get"));
    }

    #[test]
    fn wrap_foreign_keeps_cause() {
        let e = wrap(Some(foreign()), "reading", kv!());
        assert_eq!(e.message(), "reading");
        assert_eq!(Fault::cause(&e).unwrap().to_string(), "socket closed");
    }

    #[test]
    fn with_variants() {
        let e = with(NONE, "k", "v");
        assert_eq!(e.message(), "error");
        assert_eq!(e.context()["k"], json!("v"));

        let e = with(Some(foreign()), "k", 2);
        assert_eq!(e.message(), "internal error");
        assert!(Fault::cause(&e).is_some());

        let e = with(Some(interrupt("stop")), "k", true);
        assert_eq!(e.code(), Code::INTERRUPT);
        assert_eq!(e.context()["k"], json!(true));
    }

    #[test]
    fn recode_variants() {
        assert_eq!(recode(NONE, Code::CONFLICT).to_string(), "conflict: error");
        let e = recode(Some(foreign()), Code::UNAVAILABLE);
        assert_eq!(e.code(), Code::UNAVAILABLE);
        assert_eq!(e.message(), "internal error");
        assert_eq!(recode(Some(interrupt("x")), Code::TIMEOUT).code(), Code::INTERRUPT);
    }

    #[test]
    fn with_stack_variants() {
        let e = with_stack(NONE);
        assert_eq!(e.message(), "error");
        assert!(e.stack().is_some());

        let e = with_stack(Some(foreign()));
        assert_eq!(e.message(), "internal error");
        assert!(e.stack().is_some());

        let e = with_stack(Some(interrupt("x")));
        assert!(e.stack().is_none());
    }

    #[test]
    fn result_ext() {
        let r: Result<(), io::Error> = Err(foreign());
        let e = r.wrap_err("op", kv!("attempt", 3)).unwrap_err();
        assert_eq!(e.message(), "op");
        assert_eq!(e.context()["attempt"], json!(3));

        let r: Result<u8, Error> = Err(not_found("doc", "a"));
        let e = r.with_err_field("tenant", "t1").unwrap_err();
        assert_eq!(e.code(), Code::NOT_FOUND);
        assert_eq!(e.context()["tenant"], json!("t1"));

        let ok: Result<u8, io::Error> = Ok(7);
        assert_eq!(ok.wrap_err("unused", kv!()).unwrap(), 7);
    }
}
