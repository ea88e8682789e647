// SPDX-License-Identifier: MIT OR Apache-2.0
//! Semantic constructors.
//!
//! Prefer these over [`new`] so that codes and context keys stay uniform
//! across a code base. None of them can fail.

use crate::code::Code;
use crate::context::Context;
use crate::error::{Defect, Error, Failure, Interrupt, InterruptKind};
use crate::kv;
use crate::stack::Stack;
use crate::wrap::into_shared;
use serde::Serialize;
use serde_json::Value;
use std::error::Error as StdError;
use std::time::Duration;

fn failure(code: Code, message: impl Into<String>, context: Context) -> Error {
    Failure::new(code, message).with_context(context).into()
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// `"<entity> not found"` with `entity` and `id` fields.
pub fn not_found(entity: &str, id: impl Serialize) -> Error {
    failure(
        Code::NOT_FOUND,
        format!("{entity} not found"),
        Context::from_kv(kv!("entity", entity, "id", id)),
    )
}

/// `"invalid <field>"` with `field` and `reason` fields.
pub fn invalid(field: &str, reason: &str) -> Error {
    failure(
        Code::INVALID,
        format!("invalid {field}"),
        Context::from_kv(kv!("field", field, "reason", reason)),
    )
}

/// `"unprocessable <field>"` with `field` and `reason` fields.
pub fn unprocessable(field: &str, reason: &str) -> Error {
    failure(
        Code::UNPROCESSABLE,
        format!("unprocessable {field}"),
        Context::from_kv(kv!("field", field, "reason", reason)),
    )
}

/// Malformed request.
pub fn bad_request(message: impl Into<String>) -> Error {
    failure(Code::BAD_REQUEST, message, Context::empty())
}

/// Missing or invalid credentials.
pub fn unauthorized(message: impl Into<String>) -> Error {
    failure(Code::UNAUTHORIZED, message, Context::empty())
}

/// Access to `resource` denied.
pub fn forbidden(resource: &str) -> Error {
    failure(
        Code::FORBIDDEN,
        "forbidden",
        Context::from_kv(kv!("resource", resource)),
    )
}

/// State conflict.
pub fn conflict(message: impl Into<String>) -> Error {
    failure(Code::CONFLICT, message, Context::empty())
}

/// Rate limit hit on `resource`.
pub fn too_many_requests(resource: &str) -> Error {
    failure(
        Code::TOO_MANY_REQUESTS,
        "too many requests",
        Context::from_kv(kv!("resource", resource)),
    )
}

// ---------------------------------------------------------------------------
// Infrastructure
// ---------------------------------------------------------------------------

/// Internal failure at a boundary. Always captures a stack starting at the
/// caller, with or without a cause.
///
/// ```
/// use fl_error::{internal, Code, Fault};
///
/// let io = std::io::Error::other("disk full");
/// let err = internal(Some(io));
/// assert_eq!(err.code(), Code::INTERNAL);
/// assert!(err.stack().is_some());
/// ```
#[inline(never)]
pub fn internal<E>(cause: Option<E>) -> Error
where
    E: StdError + Send + Sync + 'static,
{
    let mut f = Failure::new(Code::INTERNAL, "internal error");
    if let Some(cause) = cause {
        f = f.with_cause(into_shared(cause));
    }
    f.with_stack(Stack::capture(1)).into()
}

/// Operation exceeded `elapsed`. Records `timeout_ms` as a whole number of
/// milliseconds.
pub fn timeout(elapsed: Duration) -> Error {
    let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    failure(
        Code::TIMEOUT,
        "timeout",
        Context::from_kv(kv!("timeout_ms", ms)),
    )
}

/// Dependency `service` is temporarily unavailable.
pub fn unavailable(service: &str) -> Error {
    failure(
        Code::UNAVAILABLE,
        "unavailable",
        Context::from_kv(kv!("service", service)),
    )
}

/// Ad-hoc internal failure. No stack.
pub fn new<I>(message: impl Into<String>, kv: I) -> Error
where
    I: IntoIterator<Item = Value>,
{
    failure(Code::INTERNAL, message, Context::from_kv(kv))
}

// ---------------------------------------------------------------------------
// Defects and interrupts
// ---------------------------------------------------------------------------

/// Programming bug. Captures a stack starting at the caller; a missing cause
/// is replaced with a `"nil defect"` error.
#[inline(never)]
pub fn defect<E>(cause: Option<E>) -> Error
where
    E: StdError + Send + Sync + 'static,
{
    Defect::new(cause.map(into_shared), Stack::capture(1)).into()
}

/// Cooperative cancellation. Unwraps to [`Canceled`](crate::Canceled).
pub fn interrupt(reason: impl Into<String>) -> Error {
    Interrupt::new(InterruptKind::Canceled, reason.into()).into()
}

/// Deadline expiry. Unwraps to [`DeadlineExceeded`](crate::DeadlineExceeded).
pub fn interrupt_deadline(reason: impl Into<String>) -> Error {
    Interrupt::new(InterruptKind::DeadlineExceeded, reason.into()).into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
