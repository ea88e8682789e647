// SPDX-License-Identifier: MIT OR Apache-2.0
//! Concise (`{}`) and verbose (`{:#}`) rendering.
//!
//! The verbose form looks like:
//!
//! ```text
//! code=not_found msg="user not found"
//! ctx: entity=user id=42
//! cause: <cause rendered with {:#}>
//! stack:
//!   app::handler src/handler.rs:17
//! ```

use crate::code::Code;
use crate::context::Context;
use crate::error::{Defect, Error, Failure, Fault, Interrupt};
use crate::stack::Stack;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;

fn write_verbose(
    f: &mut fmt::Formatter<'_>,
    code: &Code,
    message: &str,
    context: &Context,
    cause: Option<&(dyn StdError + Send + Sync + 'static)>,
    stack: Option<&Stack>,
) -> fmt::Result {
    if !code.is_empty() {
        write!(f, "code={code} ")?;
    }
    write!(f, "msg={message:?}")?;

    let mut printable = context.iter().filter(|fl| !fl.key.is_empty()).peekable();
    if printable.peek().is_some() {
        f.write_str("\nctx:")?;
        for field in printable {
            match &field.value {
                Value::String(s) => write!(f, " {}={s}", field.key)?,
                other => write!(f, " {}={other}", field.key)?,
            }
        }
    }

    if let Some(cause) = cause {
        write!(f, "\ncause: {cause:#}")?;
    }

    if let Some(stack) = stack.filter(|s| !s.is_empty()) {
        f.write_str("\nstack:")?;
        for frame in stack.iter() {
            write!(f, "\n  {frame}")?;
        }
    }
    Ok(())
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return write_verbose(
                f,
                &self.code,
                &self.message,
                &self.context,
                Fault::cause(self),
                self.stack.as_ref(),
            );
        }
        match (self.code.is_empty(), self.message.is_empty()) {
            (true, true) => f.write_str("error"),
            (false, true) => write!(f, "{}", self.code),
            (true, false) => f.write_str(&self.message),
            (false, false) => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl Defect {
    fn headline(&self) -> String {
        if !self.message.is_empty() {
            return format!("defect: {}", self.message);
        }
        let cause = self.cause.to_string();
        if cause.is_empty() {
            "defect".to_owned()
        } else {
            format!("defect: {cause}")
        }
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return write_verbose(
                f,
                &Code::DEFECT,
                &self.headline(),
                &self.context,
                Some(self.cause.as_ref()),
                Some(&self.stack),
            );
        }
        f.write_str(&self.headline())
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return write_verbose(
                f,
                &Code::INTERRUPT,
                &self.message,
                &self.context,
                Fault::cause(self),
                None,
            );
        }
        if self.message.is_empty() {
            f.write_str("interrupt")
        } else {
            write!(f, "interrupt: {}", self.message)
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Delegating the formatter keeps the alternate flag.
        match self {
            Error::Failure(v) => fmt::Display::fmt(&**v, f),
            Error::Defect(v) => fmt::Display::fmt(&**v, f),
            Error::Interrupt(v) => fmt::Display::fmt(&**v, f),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
