// SPDX-License-Identifier: MIT OR Apache-2.0
//! Multi-cause aggregation.

use crate::error::SharedError;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Two or more errors reported together.
///
/// `source()` is always `None`; traversal reaches the children through
/// [`errors`](Joined::errors).
#[derive(Debug, Clone)]
pub struct Joined {
    errs: Arc<[SharedError]>,
}

impl Joined {
    /// Children in join order.
    pub fn errors(&self) -> &[SharedError] {
        &self.errs
    }

    pub(crate) fn storage(&self) -> *const () {
        Arc::as_ptr(&self.errs).cast::<()>()
    }
}

impl fmt::Display for Joined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verbose = f.alternate();
        for (i, err) in self.errs.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            if verbose {
                write!(f, "{err:#}")?;
            } else {
                write!(f, "{err}")?;
            }
        }
        Ok(())
    }
}

impl StdError for Joined {}

/// Combine errors, dropping `None`s.
///
/// No errors gives `None`; exactly one is returned as the same `Arc`;
/// two or more become a [`Joined`].
pub fn join<I>(errs: I) -> Option<SharedError>
where
    I: IntoIterator<Item = Option<SharedError>>,
{
    let mut errs: Vec<SharedError> = errs.into_iter().flatten().collect();
    match errs.len() {
        0 => None,
        1 => errs.pop(),
        _ => Some(Arc::new(Joined {
            errs: Arc::from(errs),
        })),
    }
}

/// `join(head, more...)`, returning early when there is nothing to add.
pub fn append<I>(head: Option<SharedError>, more: I) -> Option<SharedError>
where
    I: IntoIterator<Item = Option<SharedError>>,
{
    let Some(head) = head else {
        return join(more);
    };
    let mut more = more.into_iter().flatten().peekable();
    if more.peek().is_none() {
        return Some(head);
    }
    join(std::iter::once(Some(head)).chain(more.map(Some)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
