// SPDX-License-Identifier: MIT OR Apache-2.0
//! Classified, immutable error values with ordered context, optional stack
//! capture, and cycle-safe cause traversal.
//!
//! An [`Error`] is one of three variants:
//!
//! * [`Failure`]: expected outcomes (`not_found`, `conflict`, `timeout`, ...);
//! * [`Defect`]: programming bugs, always with a stack;
//! * [`Interrupt`]: cooperative cancellation, unwrapping to [`Canceled`] or
//!   [`DeadlineExceeded`].
//!
//! Values never change after construction. Every method on [`Fault`] returns
//! a new value, so errors can be shared across threads and annotated
//! independently.
//!
//! ```
//! use fl_error::{internal, kv, not_found, classification_of, has_code, Code, Fault};
//!
//! let missing = not_found("user", 42).add_context("", kv!("tenant", "acme"));
//! let boundary = internal(Some(missing.clone()));
//!
//! assert_eq!(boundary.to_string(), "internal: internal error");
//! assert!(has_code(Some(&boundary), &Code::NOT_FOUND));
//! assert_eq!(classification_of(Some(&missing)), Some(Code::NOT_FOUND));
//! assert!(format!("{missing:#}").starts_with("code=not_found msg=\"user not found\""));
//! ```
//!
//! `{}` renders the concise one-line form and `{:#}` the verbose form with
//! context, causes and stack frames.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod code;
mod construct;
mod context;
mod error;
mod field;
mod format;
mod join;
mod limits;
mod predicates;
mod stack;
mod unwrap;
mod wrap;

pub use code::{Code, CodeGroup, builtin_codes};
pub use construct::{
    bad_request, conflict, defect, forbidden, internal, interrupt, interrupt_deadline, invalid,
    new, not_found, timeout, too_many_requests, unauthorized, unavailable, unprocessable,
};
pub use context::{Context, Field, value_of};
pub use error::{
    CANCELED, Canceled, DEADLINE_EXCEEDED, DeadlineExceeded, Defect, Error, Failure, Fault,
    Interrupt, InterruptKind, SharedError,
};
pub use field::{FieldError, TypedField};
pub use join::{Joined, append, join};
pub use limits::{DEFAULT_STACK_DEPTH, Limits, MAX_DEPTH};
pub use predicates::{
    classification_of, has_code, is_canceled, is_deadline, is_defect, is_interrupt, is_retryable,
};
pub use stack::{Frame, Stack};
pub use unwrap::{
    Causes, Expansion, Inspector, Node, Traversal, find, flatten, has, has_type, root, walk,
};
pub use wrap::{ResultExt, convert, recode, with, with_stack, with_stack_skipping, wrap};

/// JSON value type used for context values.
pub use serde_json::Value;
