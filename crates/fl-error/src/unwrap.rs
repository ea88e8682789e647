// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cycle-safe traversal of cause graphs.
//!
//! A graph is any `dyn Error` reachable through `source()` plus the children
//! of multi-cause nodes such as [`Joined`]. Graphs built from borrowed or
//! leaked errors can contain cycles; every traversal here terminates:
//!
//! * faultline values ([`Error`], also inside an `Arc` or `Box`, and
//!   [`Joined`]) are keyed by their shared storage, so clones of one value
//!   count as one node;
//! * other sized nodes are keyed by address and size;
//! * zero-sized nodes have no usable address and are never recorded. Chains
//!   of them end at the depth cap ([`Limits::max_traversal_depth`]).
//!
//! Hitting the cap ends the traversal with whatever was collected so far and
//! logs a warning on the `fl.unwrap` target.

use crate::error::{Canceled, DeadlineExceeded, Error};
use crate::join::Joined;
use crate::limits::Limits;
use std::any::TypeId;
use std::collections::HashSet;
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::warn;

/// A node in a cause graph.
pub type Node = dyn StdError + 'static;

// ---------------------------------------------------------------------------
// Inspector
// ---------------------------------------------------------------------------

/// How a node continues.
#[derive(Debug)]
pub enum Expansion<'a> {
    /// No further causes.
    Leaf,
    /// Exactly one cause.
    Single(&'a Node),
    /// Several causes, left to right.
    Multi(Vec<&'a Node>),
}

/// Decides how each node expands.
///
/// Implement this to expose multi-cause error types other than [`Joined`].
pub trait Inspector {
    /// Expansion of `node`.
    fn expand<'a>(&self, node: &'a Node) -> Expansion<'a>;
}

/// Default inspector: [`Joined`] is multi-cause, everything else follows
/// `source()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Causes;

impl Inspector for Causes {
    fn expand<'a>(&self, node: &'a Node) -> Expansion<'a> {
        if let Some(joined) = node.downcast_ref::<Joined>() {
            return Expansion::Multi(joined.errors().iter().map(|e| &**e as &Node).collect());
        }
        match node.source() {
            Some(cause) => Expansion::Single(cause),
            None => Expansion::Leaf,
        }
    }
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

/// The faultline value behind `node`, including one held in an `Arc` or
/// `Box`. Those wrappers forward `source()` to the inner value, so without
/// this their code and identity would be skipped.
pub(crate) fn native(node: &Node) -> Option<&Error> {
    node.downcast_ref::<Error>()
        .or_else(|| node.downcast_ref::<Arc<Error>>().map(|e| &**e))
        .or_else(|| node.downcast_ref::<Box<Error>>().map(|e| &**e))
}

fn value_key(node: &Node) -> Option<*const ()> {
    if let Some(err) = native(node) {
        return Some(err.storage());
    }
    node.downcast_ref::<Joined>().map(Joined::storage)
}

/// Thin address plus size. Vtable pointers are not unique per type, so they
/// are left out; the size keeps a struct apart from its first field.
fn identity_key(node: &Node) -> (*const (), usize) {
    ((node as *const Node).cast::<()>(), std::mem::size_of_val(node))
}

/// Zero-sized types known to the crate. All values of such a type are equal.
fn sentinel_type(node: &Node) -> Option<TypeId> {
    if node.is::<Canceled>() {
        Some(TypeId::of::<Canceled>())
    } else if node.is::<DeadlineExceeded>() {
        Some(TypeId::of::<DeadlineExceeded>())
    } else {
        None
    }
}

/// `true` when `a` is `target` under the guard's rules.
///
/// The crate's zero-sized sentinels match any value of their type. Other
/// zero-sized targets have no identity and never match.
fn same_node(a: &Node, target: &Node) -> bool {
    match (value_key(a), value_key(target)) {
        (Some(x), Some(y)) => x == y,
        (None, None) if std::mem::size_of_val(target) == 0 => {
            sentinel_type(target).is_some_and(|t| sentinel_type(a) == Some(t))
        }
        (None, None) => identity_key(a) == identity_key(target),
        _ => false,
    }
}

#[derive(Default)]
struct Seen {
    values: HashSet<*const ()>,
    identities: HashSet<(*const (), usize)>,
}

impl Seen {
    /// Record `node`; `false` if it was already recorded.
    fn insert(&mut self, node: &Node) -> bool {
        if let Some(key) = value_key(node) {
            return self.values.insert(key);
        }
        if std::mem::size_of_val(node) == 0 {
            return true;
        }
        self.identities.insert(identity_key(node))
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Configurable traversal over a cause graph.
///
/// ```
/// use fl_error::{join, not_found, conflict, Limits, Traversal};
///
/// let joined = join([Some(not_found("user", 1).shared()), Some(conflict("dup").shared())]);
/// let traversal = Traversal::new().with_limits(Limits { max_traversal_depth: 16, ..Limits::default() });
/// let leaves = traversal.flatten(joined.as_deref().map(|e| e as _));
/// assert_eq!(leaves.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Traversal<X = Causes> {
    inspector: X,
    limits: Limits,
}

impl Traversal<Causes> {
    /// Traversal with the default inspector and limits.
    pub fn new() -> Self {
        Self::default()
    }
}

struct Frame<'a> {
    node: &'a Node,
    expansion: Expansion<'a>,
    next: usize,
    depth: usize,
}

enum Step<'a> {
    Push(&'a Node),
    Descend(&'a Node),
    Emit,
    Pop,
}

impl<X: Inspector> Traversal<X> {
    /// Traversal with a custom inspector.
    pub fn with_inspector(inspector: X) -> Self {
        Self {
            inspector,
            limits: Limits::default(),
        }
    }

    /// Replace the limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    fn frame<'a>(&self, node: &'a Node, depth: usize) -> Frame<'a> {
        Frame {
            node,
            expansion: self.inspector.expand(node),
            next: 0,
            depth,
        }
    }

    fn cap_reached(&self, cap: usize) {
        warn!(target: "fl.unwrap", max_depth = cap, "traversal depth cap reached; returning partial result");
    }

    /// Leaves in first-discovered depth-first order.
    ///
    /// Single causes are followed in place, so chain links are never
    /// reported. A node reached a second time is neither expanded nor
    /// reported again.
    ///
    /// The first branch that reaches the depth cap ends the whole traversal:
    /// leaves already found are returned, and sibling branches not yet
    /// entered are skipped, even shallow ones.
    pub fn flatten<'a>(&self, err: Option<&'a Node>) -> Vec<&'a Node> {
        let Some(root) = err else {
            return Vec::new();
        };
        let cap = self.limits.traversal_depth();
        let mut seen = Seen::default();
        seen.insert(root);

        let mut out = Vec::new();
        let mut stack = vec![self.frame(root, 0)];
        while let Some(top) = stack.last_mut() {
            let step = match &top.expansion {
                Expansion::Multi(children) => match children.get(top.next) {
                    Some(&child) => {
                        top.next += 1;
                        if seen.insert(child) {
                            Step::Push(child)
                        } else {
                            continue;
                        }
                    }
                    None => Step::Pop,
                },
                Expansion::Single(child) => {
                    let child = *child;
                    if seen.insert(child) {
                        Step::Descend(child)
                    } else {
                        Step::Pop
                    }
                }
                Expansion::Leaf => Step::Emit,
            };

            let depth = top.depth + 1;
            match step {
                Step::Push(_) | Step::Descend(_) if depth >= cap => {
                    self.cap_reached(cap);
                    break;
                }
                Step::Push(child) => stack.push(self.frame(child, depth)),
                Step::Descend(child) => *top = self.frame(child, depth),
                Step::Emit => {
                    out.push(top.node);
                    stack.pop();
                }
                Step::Pop => {
                    stack.pop();
                }
            }
        }
        out
    }

    /// Pre-order visit. Returning `false` from `visit` stops immediately.
    ///
    /// The first node whose children would pass the depth cap ends the whole
    /// walk; siblings still waiting on the stack are not visited.
    pub fn walk<'a, F>(&self, err: Option<&'a Node>, mut visit: F)
    where
        F: FnMut(&'a Node) -> bool,
    {
        let Some(root) = err else {
            return;
        };
        let cap = self.limits.traversal_depth();
        let mut seen = Seen::default();
        seen.insert(root);

        let mut stack = vec![(root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if !visit(node) {
                return;
            }
            let children = match self.inspector.expand(node) {
                Expansion::Leaf => continue,
                Expansion::Single(child) => vec![child],
                Expansion::Multi(children) => children,
            };
            if depth + 1 >= cap {
                self.cap_reached(cap);
                return;
            }
            // Reversed so the leftmost child is popped first.
            for child in children.into_iter().rev() {
                if seen.insert(child) {
                    stack.push((child, depth + 1));
                }
            }
        }
    }

    /// First leaf of [`flatten`](Traversal::flatten).
    pub fn root<'a>(&self, err: Option<&'a Node>) -> Option<&'a Node> {
        self.flatten(err).into_iter().next()
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// [`Traversal::flatten`] with default settings.
pub fn flatten(err: Option<&Node>) -> Vec<&Node> {
    Traversal::new().flatten(err)
}

/// [`Traversal::walk`] with default settings.
pub fn walk<'a, F>(err: Option<&'a Node>, visit: F)
where
    F: FnMut(&'a Node) -> bool,
{
    Traversal::new().walk(err, visit)
}

/// [`Traversal::root`] with default settings.
pub fn root(err: Option<&Node>) -> Option<&Node> {
    Traversal::new().root(err)
}

/// `true` if `target` itself is reachable from `err`.
///
/// Faultline values match any clone of the same value, and other errors
/// match by identity. The sentinels [`Canceled`] and [`DeadlineExceeded`]
/// match any value of their type. Other zero-sized targets have no identity
/// and never match; use [`has_type`] for them.
pub fn has(err: Option<&Node>, target: Option<&Node>) -> bool {
    let Some(target) = target else {
        return false;
    };
    let mut found = false;
    walk(err, |node| {
        found = same_node(node, target);
        !found
    });
    found
}

/// `true` if any reachable node is a `T`.
pub fn has_type<T: StdError + 'static>(err: Option<&Node>) -> bool {
    find::<T>(err).is_some()
}

/// First reachable node of type `T`, in pre-order.
pub fn find<T: StdError + 'static>(err: Option<&Node>) -> Option<&T> {
    let mut found = None;
    walk(err, |node| {
        found = node.downcast_ref::<T>();
        found.is_none()
    });
    found
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
