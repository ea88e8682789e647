// SPDX-License-Identifier: MIT OR Apache-2.0
//! Classification queries over whole cause graphs.
//!
//! All predicates are `None`-safe and inherit the traversal's cycle guard and
//! depth cap.

use crate::code::Code;
use crate::error::{Canceled, DeadlineExceeded, Defect, Failure, Fault, Interrupt};
use crate::unwrap::{has_type, native, walk, Causes, Expansion, Inspector, Node, Traversal};

/// Code carried by `node`, if it is a faultline value.
fn code_of(node: &Node) -> Option<Code> {
    if let Some(err) = native(node) {
        return Some(err.code());
    }
    if let Some(f) = node.downcast_ref::<Failure>() {
        return Some(f.code());
    }
    if node.is::<Defect>() {
        return Some(Code::DEFECT);
    }
    if node.is::<Interrupt>() {
        return Some(Code::INTERRUPT);
    }
    None
}

fn any_code(err: Option<&Node>, mut pred: impl FnMut(&Code) -> bool) -> bool {
    let mut found = false;
    walk(err, |node| {
        found = code_of(node).is_some_and(|c| pred(&c));
        !found
    });
    found
}

/// Follows single causes and the first child of each multi-cause node.
struct PrimaryPath;

impl Inspector for PrimaryPath {
    fn expand<'a>(&self, node: &'a Node) -> Expansion<'a> {
        match Causes.expand(node) {
            Expansion::Multi(children) => match children.first() {
                Some(&first) => Expansion::Single(first),
                None => Expansion::Leaf,
            },
            other => other,
        }
    }
}

/// `true` if any reachable node is classified as `code`.
pub fn has_code(err: Option<&Node>, code: &Code) -> bool {
    any_code(err, |c| c == code)
}

/// First non-empty code on the primary path: single causes are followed and
/// multi-cause nodes contribute only their first child.
///
/// Use [`has_code`] to search every branch.
pub fn classification_of(err: Option<&Node>) -> Option<Code> {
    let mut found = None;
    Traversal::with_inspector(PrimaryPath).walk(err, |node| {
        found = code_of(node).filter(|c| !c.is_empty());
        found.is_none()
    });
    found
}

/// `true` if any node is `unavailable`, `timeout` or `too_many_requests`.
pub fn is_retryable(err: Option<&Node>) -> bool {
    any_code(err, |c| {
        *c == Code::UNAVAILABLE || *c == Code::TIMEOUT || *c == Code::TOO_MANY_REQUESTS
    })
}

/// `true` if any node is a defect or carries the `defect` code.
pub fn is_defect(err: Option<&Node>) -> bool {
    any_code(err, |c| *c == Code::DEFECT)
}

/// `true` if any node is an interrupt, carries the `interrupt` code, or is
/// one of the [`Canceled`] / [`DeadlineExceeded`] sentinels.
pub fn is_interrupt(err: Option<&Node>) -> bool {
    let mut found = false;
    walk(err, |node| {
        found = node.is::<Canceled>()
            || node.is::<DeadlineExceeded>()
            || code_of(node).is_some_and(|c| c == Code::INTERRUPT);
        !found
    });
    found
}

/// `true` if the graph contains [`Canceled`].
pub fn is_canceled(err: Option<&Node>) -> bool {
    has_type::<Canceled>(err)
}

/// `true` if the graph contains [`DeadlineExceeded`].
pub fn is_deadline(err: Option<&Node>) -> bool {
    has_type::<DeadlineExceeded>(err)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
