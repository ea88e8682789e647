// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tunable bounds for stack capture and graph traversal.

use serde::{Deserialize, Serialize};

/// Default number of frames kept by a stack capture.
pub const DEFAULT_STACK_DEPTH: usize = 64;

/// Default traversal depth cap. Reaching it ends a traversal early.
pub const MAX_DEPTH: usize = 1 << 12;

/// Bounds applied by [`Stack::capture_with`](crate::Stack::capture_with) and
/// [`Traversal`](crate::Traversal).
///
/// Missing fields fall back to their defaults, so the struct can be embedded
/// in a host's own configuration file:
///
/// ```
/// use fl_error::Limits;
///
/// let limits: Limits = serde_json::from_str(r#"{ "max_stack_depth": 16 }"#).unwrap();
/// assert_eq!(limits.max_stack_depth, 16);
/// assert_eq!(limits.max_traversal_depth, fl_error::MAX_DEPTH);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Frames kept per captured stack. `0` selects the default.
    pub max_stack_depth: usize,
    /// Edges followed from the root before a traversal gives up. `0` selects
    /// the default.
    pub max_traversal_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_stack_depth: DEFAULT_STACK_DEPTH,
            max_traversal_depth: MAX_DEPTH,
        }
    }
}

impl Limits {
    /// Stack depth with `0` mapped to the default.
    pub fn stack_depth(&self) -> usize {
        if self.max_stack_depth == 0 {
            DEFAULT_STACK_DEPTH
        } else {
            self.max_stack_depth
        }
    }

    /// Traversal depth with `0` mapped to the default.
    pub fn traversal_depth(&self) -> usize {
        if self.max_traversal_depth == 0 {
            MAX_DEPTH
        } else {
            self.max_traversal_depth
        }
    }
}
