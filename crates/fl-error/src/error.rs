// SPDX-License-Identifier: MIT OR Apache-2.0
//! The three error variants and their shared capability trait.
//!
//! * [`Failure`]: an expected, recoverable outcome with a replaceable code.
//! * [`Defect`]: a programming bug. Code fixed to `defect`; the stack is
//!   captured once, at construction.
//! * [`Interrupt`]: cooperative cancellation. Code fixed to `interrupt`;
//!   never carries a stack.
//!
//! Every fluent method on [`Fault`] returns a new [`Error`]. Receivers are
//! never modified, so any value may be shared across threads freely.

use crate::code::Code;
use crate::context::{Context, Field};
use crate::stack::Stack;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::debug;

/// A shareable, type-erased error. Used for causes and joined children.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// Sentinels
// ---------------------------------------------------------------------------

/// Canonical cause of [`interrupt`](crate::interrupt) errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, thiserror::Error)]
#[error("context canceled")]
pub struct Canceled;

/// Canonical cause of [`interrupt_deadline`](crate::interrupt_deadline) errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, thiserror::Error)]
#[error("context deadline exceeded")]
pub struct DeadlineExceeded;

/// Stand-in cause for a defect constructed without one.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("nil defect")]
pub(crate) struct NilDefect;

/// The shared [`Canceled`] instance every interrupt points at.
pub static CANCELED: Canceled = Canceled;

/// The shared [`DeadlineExceeded`] instance every deadline interrupt points at.
pub static DEADLINE_EXCEEDED: DeadlineExceeded = DeadlineExceeded;

// ---------------------------------------------------------------------------
// Fault
// ---------------------------------------------------------------------------

mod sealed {
    pub trait Sealed {}
}

/// Capability set shared by every error variant.
///
/// The trait is sealed: the variant set is closed. Match on [`Error`] to
/// branch by variant.
pub trait Fault: sealed::Sealed + StdError + Send + Sync + 'static {
    /// Raw message, possibly empty. `Display` renders the concise form.
    fn message(&self) -> &str;

    /// Current classification.
    fn code(&self) -> Code;

    /// Context fields in insertion order.
    fn fields(&self) -> &Context;

    /// Immediate cause, if any.
    fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)>;

    /// Captured stack, if any.
    fn stack(&self) -> Option<&Stack>;

    /// Same variant, code, cause and stack with a new message and fields.
    fn rebuild(&self, message: String, fields: Context) -> Error;

    /// Replace the code. `Defect` and `Interrupt` ignore this and return an
    /// equivalent clone.
    fn reclassify(&self, code: Code) -> Error;

    /// Capture a fresh stack, hiding `skip` caller frames beyond this call.
    /// `Defect` and `Interrupt` return an equivalent clone.
    fn capture_stack_skipping(&self, skip: usize) -> Error;

    /// Capture a fresh stack starting at the caller.
    #[inline(never)]
    fn capture_stack(&self) -> Error {
        self.capture_stack_skipping(1)
    }

    /// Copy-on-read map of the context: last write wins, empty keys dropped.
    fn context(&self) -> BTreeMap<String, Value> {
        self.fields().to_map()
    }

    /// Set the message if it is currently empty, and append `kv` pairs.
    ///
    /// Never concatenates messages; use [`append_message`](Fault::append_message)
    /// for that. See [`Context::from_kv`] for how `kv` is read.
    fn add_context<I>(&self, message: &str, kv: I) -> Error
    where
        I: IntoIterator<Item = Value>,
    {
        let added = Context::from_kv(kv);
        self.rebuild(
            set_once(self.message(), message),
            self.fields().append(added.iter().cloned()),
        )
    }

    /// Like [`add_context`](Fault::add_context), then keep only the newest
    /// `max_fields` entries. `0` means unbounded.
    fn add_context_bounded<I>(&self, message: &str, max_fields: usize, kv: I) -> Error
    where
        I: IntoIterator<Item = Value>,
    {
        let added = Context::from_kv(kv);
        let fields = self
            .fields()
            .append(added.iter().cloned())
            .keep_newest(max_fields);
        self.rebuild(set_once(self.message(), message), fields)
    }

    /// Append exactly one field. Values that fail to serialize become `null`.
    fn with_field<V: Serialize>(&self, key: impl Into<String>, value: V) -> Error {
        let key = key.into();
        let value = match serde_json::to_value(&value) {
            Ok(v) => v,
            Err(err) => {
                debug!(target: "fl.error", key = %key, error = %err, "context value failed to serialize; storing null");
                Value::Null
            }
        };
        self.rebuild(
            self.message().to_owned(),
            self.fields().append([Field::new(key, value)]),
        )
    }

    /// Replace the message.
    fn with_message(&self, message: impl Into<String>) -> Error {
        self.rebuild(message.into(), self.fields().clone())
    }

    /// Extend the message as `"<current>: <message>"`. An empty current
    /// message is replaced; an empty `message` changes nothing.
    fn append_message(&self, message: &str) -> Error {
        let current = self.message();
        let next = match (current.is_empty(), message.is_empty()) {
            (_, true) => current.to_owned(),
            (true, false) => message.to_owned(),
            (false, false) => format!("{current}: {message}"),
        };
        self.rebuild(next, self.fields().clone())
    }
}

fn set_once(current: &str, candidate: &str) -> String {
    if current.is_empty() {
        candidate.to_owned()
    } else {
        current.to_owned()
    }
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// An expected, recoverable domain or infrastructure failure.
#[derive(Debug, Clone)]
pub struct Failure {
    pub(crate) message: String,
    pub(crate) code: Code,
    pub(crate) context: Context,
    pub(crate) cause: Option<SharedError>,
    pub(crate) stack: Option<Stack>,
}

impl Failure {
    /// A failure with the given code and message and nothing else.
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            context: Context::empty(),
            cause: None,
            stack: None,
        }
    }

    /// Set the initial context.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Set the cause.
    pub fn with_cause(mut self, cause: SharedError) -> Self {
        self.cause = Some(cause);
        self
    }

    pub(crate) fn with_stack(mut self, stack: Stack) -> Self {
        self.stack = Some(stack);
        self
    }
}

impl sealed::Sealed for Failure {}

impl Fault for Failure {
    fn message(&self) -> &str {
        &self.message
    }

    fn code(&self) -> Code {
        self.code.clone()
    }

    fn fields(&self) -> &Context {
        &self.context
    }

    fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    fn stack(&self) -> Option<&Stack> {
        self.stack.as_ref()
    }

    fn rebuild(&self, message: String, fields: Context) -> Error {
        Failure {
            message,
            context: fields,
            ..self.clone()
        }
        .into()
    }

    fn reclassify(&self, code: Code) -> Error {
        Failure {
            code,
            ..self.clone()
        }
        .into()
    }

    #[inline(never)]
    fn capture_stack_skipping(&self, skip: usize) -> Error {
        let stack = Stack::capture(skip + 1);
        self.clone().with_stack(stack).into()
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn StdError + 'static))
    }
}

// ---------------------------------------------------------------------------
// Defect
// ---------------------------------------------------------------------------

/// An unexpected programming error. Always carries the stack captured when
/// it was created.
#[derive(Debug, Clone)]
pub struct Defect {
    pub(crate) message: String,
    pub(crate) context: Context,
    pub(crate) cause: SharedError,
    pub(crate) stack: Stack,
}

impl Defect {
    pub(crate) fn new(cause: Option<SharedError>, stack: Stack) -> Self {
        Self {
            message: String::new(),
            context: Context::empty(),
            cause: cause.unwrap_or_else(|| Arc::new(NilDefect)),
            stack,
        }
    }
}

impl sealed::Sealed for Defect {}

impl Fault for Defect {
    fn message(&self) -> &str {
        &self.message
    }

    fn code(&self) -> Code {
        Code::DEFECT
    }

    fn fields(&self) -> &Context {
        &self.context
    }

    fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        Some(self.cause.as_ref())
    }

    fn stack(&self) -> Option<&Stack> {
        Some(&self.stack)
    }

    fn rebuild(&self, message: String, fields: Context) -> Error {
        Defect {
            message,
            context: fields,
            ..self.clone()
        }
        .into()
    }

    /// Defects are always `defect`; the code is ignored.
    fn reclassify(&self, _code: Code) -> Error {
        self.clone().into()
    }

    /// The stack captured at construction is kept.
    fn capture_stack_skipping(&self, _skip: usize) -> Error {
        self.clone().into()
    }
}

impl StdError for Defect {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref() as &(dyn StdError + 'static))
    }
}

// ---------------------------------------------------------------------------
// Interrupt
// ---------------------------------------------------------------------------

/// Which sentinel an [`Interrupt`] unwraps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptKind {
    /// Unwraps to [`Canceled`].
    Canceled,
    /// Unwraps to [`DeadlineExceeded`].
    DeadlineExceeded,
}

impl InterruptKind {
    fn sentinel(self) -> &'static (dyn StdError + Send + Sync + 'static) {
        match self {
            Self::Canceled => &CANCELED,
            Self::DeadlineExceeded => &DEADLINE_EXCEEDED,
        }
    }
}

/// Cooperative cancellation or deadline expiry.
#[derive(Debug, Clone)]
pub struct Interrupt {
    pub(crate) message: String,
    pub(crate) context: Context,
    pub(crate) kind: InterruptKind,
}

impl Interrupt {
    pub(crate) fn new(kind: InterruptKind, message: String) -> Self {
        Self {
            message,
            context: Context::empty(),
            kind,
        }
    }

    /// Which sentinel this interrupt unwraps to.
    pub fn kind(&self) -> InterruptKind {
        self.kind
    }
}

impl sealed::Sealed for Interrupt {}

impl Fault for Interrupt {
    fn message(&self) -> &str {
        &self.message
    }

    fn code(&self) -> Code {
        Code::INTERRUPT
    }

    fn fields(&self) -> &Context {
        &self.context
    }

    fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        Some(self.kind.sentinel())
    }

    fn stack(&self) -> Option<&Stack> {
        None
    }

    fn rebuild(&self, message: String, fields: Context) -> Error {
        Interrupt {
            message,
            context: fields,
            kind: self.kind,
        }
        .into()
    }

    /// Interrupts are always `interrupt`; the code is ignored.
    fn reclassify(&self, _code: Code) -> Error {
        self.clone().into()
    }

    /// Interrupts never carry stacks.
    fn capture_stack_skipping(&self, _skip: usize) -> Error {
        self.clone().into()
    }
}

impl StdError for Interrupt {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.kind.sentinel() as &(dyn StdError + 'static))
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// An immutable, cheaply clonable error value.
///
/// Clones share storage; every fluent method allocates a new value.
#[derive(Debug, Clone)]
pub enum Error {
    /// Expected, recoverable failure.
    Failure(Arc<Failure>),
    /// Programming bug.
    Defect(Arc<Defect>),
    /// Cancellation or deadline expiry.
    Interrupt(Arc<Interrupt>),
}

macro_rules! dispatch {
    ($self:ident, $v:ident => $e:expr) => {
        match $self {
            Error::Failure($v) => $e,
            Error::Defect($v) => $e,
            Error::Interrupt($v) => $e,
        }
    };
}

impl Error {
    /// Wrap this value for use as a cause or joined child.
    pub fn shared(&self) -> SharedError {
        Arc::new(self.clone())
    }

    /// `true` when both handles refer to the same stored value.
    pub fn same_value(&self, other: &Error) -> bool {
        self.storage() == other.storage()
    }

    /// Address of the shared storage; equal for clones of one value.
    pub(crate) fn storage(&self) -> *const () {
        dispatch!(self, v => Arc::as_ptr(v).cast::<()>())
    }

    /// The failure variant, if this is one.
    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            Error::Failure(f) => Some(f),
            _ => None,
        }
    }

    /// The defect variant, if this is one.
    pub fn as_defect(&self) -> Option<&Defect> {
        match self {
            Error::Defect(d) => Some(d),
            _ => None,
        }
    }

    /// The interrupt variant, if this is one.
    pub fn as_interrupt(&self) -> Option<&Interrupt> {
        match self {
            Error::Interrupt(i) => Some(i),
            _ => None,
        }
    }
}

impl sealed::Sealed for Error {}

impl Fault for Error {
    fn message(&self) -> &str {
        dispatch!(self, v => v.message())
    }

    fn code(&self) -> Code {
        dispatch!(self, v => v.code())
    }

    fn fields(&self) -> &Context {
        dispatch!(self, v => v.fields())
    }

    fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        dispatch!(self, v => Fault::cause(&**v))
    }

    fn stack(&self) -> Option<&Stack> {
        dispatch!(self, v => v.stack())
    }

    fn rebuild(&self, message: String, fields: Context) -> Error {
        dispatch!(self, v => v.rebuild(message, fields))
    }

    fn reclassify(&self, code: Code) -> Error {
        dispatch!(self, v => v.reclassify(code))
    }

    #[inline(never)]
    fn capture_stack_skipping(&self, skip: usize) -> Error {
        dispatch!(self, v => v.capture_stack_skipping(skip + 1))
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        dispatch!(self, v => v.source())
    }
}

impl From<Failure> for Error {
    fn from(f: Failure) -> Self {
        Error::Failure(Arc::new(f))
    }
}

impl From<Defect> for Error {
    fn from(d: Defect) -> Self {
        Error::Defect(Arc::new(d))
    }
}

impl From<Interrupt> for Error {
    fn from(i: Interrupt) -> Self {
        Error::Interrupt(Arc::new(i))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
