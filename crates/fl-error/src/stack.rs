// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bounded call-stack capture.
//!
//! Frames are resolved through the `backtrace` crate. Skip counts are
//! relative to the first frame outside [`Stack::capture`]; callers pass only
//! the extra frames they want hidden (their own helper frames, typically `1`).

use crate::limits::Limits;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Type path of the capture entry points below. Legacy symbols render as
/// `fl_error::stack::Stack::capture`, v0 symbols as `<fl_error::stack::Stack>::capture`.
const MARKER: &str = "fl_error::stack::Stack";

/// Raw frames walked beyond the requested depth to absorb unwinder and
/// capture frames.
const HEADROOM: usize = 32;

/// One resolved call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Instruction pointer of the call.
    pub pc: usize,
    /// Source file, empty when unknown.
    pub file: String,
    /// Line number, `0` when unknown.
    pub line: u32,
    /// Demangled function path, empty when unknown.
    pub function: String,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.function, self.file, self.line)
    }
}

/// Immutable, most-recent-first list of [`Frame`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    frames: Arc<[Frame]>,
}

impl Stack {
    /// Capture the current stack with the default depth, hiding `skip`
    /// frames above the caller of this function.
    #[inline(never)]
    pub fn capture(skip: usize) -> Self {
        Self::capture_with(skip, &Limits::default())
    }

    /// Capture the current stack bounded by `limits.max_stack_depth`.
    #[inline(never)]
    pub fn capture_with(skip: usize, limits: &Limits) -> Self {
        let depth = limits.stack_depth();
        let budget = depth.saturating_add(skip).saturating_add(HEADROOM);
        let mut frames = Vec::with_capacity(budget.min(128));

        backtrace::trace(|raw| {
            let pc = raw.ip() as usize;
            let before = frames.len();
            backtrace::resolve_frame(raw, |symbol| {
                frames.push(Frame {
                    pc,
                    file: symbol
                        .filename()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    line: symbol.lineno().unwrap_or(0),
                    function: symbol
                        .name()
                        .map(|n| format!("{n:#}"))
                        .unwrap_or_default(),
                });
            });
            if frames.len() == before {
                frames.push(Frame {
                    pc,
                    file: String::new(),
                    line: 0,
                    function: String::new(),
                });
            }
            frames.len() < budget
        });

        let start = match first_caller(&frames) {
            Some(i) => i,
            None => {
                trace!(target: "fl.stack", frames = frames.len(), "capture marker not resolved; keeping all frames");
                0
            }
        };
        frames.into_iter().skip(start + skip).take(depth).collect()
    }

    /// Build a stack from already-resolved frames.
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self {
            frames: Arc::from(frames),
        }
    }

    /// Frames, most recent first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Iterate frames, most recent first.
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` when nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FromIterator<Frame> for Stack {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self::from_frames(iter.into_iter().collect())
    }
}

/// Index of the first frame above the innermost capture entry point.
fn first_caller(frames: &[Frame]) -> Option<usize> {
    frames
        .iter()
        .rposition(|f| f.function.contains(MARKER) && f.function.contains("capture"))
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(function: &str) -> Frame {
        Frame {
            pc: 0,
            file: "src/x.rs".into(),
            line: 1,
            function: function.into(),
        }
    }

    #[inline(never)]
    fn level_two(skip: usize) -> Stack {
        Stack::capture(skip)
    }

    #[inline(never)]
    fn level_one(skip: usize) -> Stack {
        level_two(skip)
    }

    fn symbols_available(stack: &Stack) -> bool {
        stack.iter().any(|f| f.function.contains("level_"))
    }

    #[test]
    fn first_caller_skips_unwinder_and_capture_frames() {
        let frames = vec![
            frame("backtrace::backtrace::trace"),
            frame("fl_error::stack::Stack::capture_with::{{closure}}"),
            frame("fl_error::stack::Stack::capture_with"),
            frame("fl_error::stack::Stack::capture"),
            frame("app::handler"),
            frame("app::main"),
        ];
        assert_eq!(first_caller(&frames), Some(4));
    }

    #[test]
    fn first_caller_ignores_unwinder_frames_between_markers() {
        let frames = vec![
            frame("fl_error::stack::Stack::capture_with::{{closure}}"),
            frame("backtrace::backtrace::trace"),
            frame("<fl_error::stack::Stack>::capture_with"),
            frame("<fl_error::stack::Stack>::capture"),
            frame("app::handler"),
        ];
        assert_eq!(first_caller(&frames), Some(4));
    }

    #[test]
    fn first_caller_without_marker_is_none() {
        let frames = vec![frame("a"), frame("b")];
        assert_eq!(first_caller(&frames), None);
    }

    #[test]
    fn capture_starts_at_the_caller() {
        let stack = level_one(0);
        assert!(!stack.is_empty());
        if symbols_available(&stack) {
            assert!(stack.frames()[0].function.contains("level_two"), "{:?}", stack.frames()[0]);
        }
    }

    #[test]
    fn skip_hides_extra_frames() {
        let stack = level_one(1);
        if symbols_available(&stack) {
            assert!(stack.frames()[0].function.contains("level_one"), "{:?}", stack.frames()[0]);
        }
    }

    #[test]
    fn depth_is_bounded() {
        let limits = Limits {
            max_stack_depth: 2,
            ..Limits::default()
        };
        let stack = Stack::capture_with(0, &limits);
        assert!(stack.len() <= 2);
    }

    #[test]
    fn default_depth_is_bounded() {
        fn recurse(n: usize) -> Stack {
            if n == 0 {
                Stack::capture(0)
            } else {
                recurse(n - 1)
            }
        }
        assert!(recurse(100).len() <= crate::limits::DEFAULT_STACK_DEPTH);
    }

    #[test]
    fn frame_display() {
        assert_eq!(frame("app::run").to_string(), "app::run src/x.rs:1");
    }

    #[test]
    fn from_iterator_preserves_order() {
        let stack: Stack = vec![frame("a"), frame("b")].into_iter().collect();
        assert_eq!(stack.frames()[0].function, "a");
        assert_eq!(stack.len(), 2);
    }
}
