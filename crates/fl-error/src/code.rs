// SPDX-License-Identifier: MIT OR Apache-2.0
//! Classification codes.
//!
//! A [`Code`] is an opaque, string-backed tag. The crate ships thirteen
//! built-in codes; anything else is a custom code and needs no registration.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

// ---------------------------------------------------------------------------
// CodeGroup
// ---------------------------------------------------------------------------

/// Broad family that a built-in [`Code`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeGroup {
    /// Domain and validation outcomes.
    Domain,
    /// Availability and time outcomes.
    Availability,
    /// Internal and meta classifications.
    Meta,
}

impl fmt::Display for CodeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Domain => "domain",
            Self::Availability => "availability",
            Self::Meta => "meta",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Code
// ---------------------------------------------------------------------------

/// Machine-readable classification of an error.
///
/// Codes are lowercase `snake_case` by convention. The empty code means
/// "unclassified" and is never a built-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(Cow<'static, str>);

impl Code {
    // -- Domain --
    /// Malformed request.
    pub const BAD_REQUEST: Code = Code::from_static("bad_request");
    /// Caller is not authenticated.
    pub const UNAUTHORIZED: Code = Code::from_static("unauthorized");
    /// Caller is authenticated but not allowed.
    pub const FORBIDDEN: Code = Code::from_static("forbidden");
    /// Requested entity does not exist.
    pub const NOT_FOUND: Code = Code::from_static("not_found");
    /// State conflict (duplicate, version mismatch).
    pub const CONFLICT: Code = Code::from_static("conflict");
    /// Syntactically or semantically invalid input.
    pub const INVALID: Code = Code::from_static("invalid");
    /// Well-formed but unacceptable input.
    pub const UNPROCESSABLE: Code = Code::from_static("unprocessable");
    /// Caller exceeded a rate limit.
    pub const TOO_MANY_REQUESTS: Code = Code::from_static("too_many_requests");

    // -- Availability --
    /// Operation took longer than allowed.
    pub const TIMEOUT: Code = Code::from_static("timeout");
    /// Dependency is temporarily unavailable.
    pub const UNAVAILABLE: Code = Code::from_static("unavailable");

    // -- Meta --
    /// Unexpected internal failure.
    pub const INTERNAL: Code = Code::from_static("internal");
    /// Programming bug or broken invariant.
    pub const DEFECT: Code = Code::from_static("defect");
    /// Cooperative cancellation or deadline expiry.
    pub const INTERRUPT: Code = Code::from_static("interrupt");

    /// Create a code from a string literal.
    pub const fn from_static(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }

    /// Create a code from any string. Custom codes need no registration.
    pub fn new(s: impl Into<String>) -> Self {
        Self(Cow::Owned(s.into()))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for the empty (unclassified) code.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reports whether this is one of the thirteen built-in codes.
    pub fn is_builtin(&self) -> bool {
        self.group().is_some()
    }

    /// The [`CodeGroup`] of a built-in code, or `None` for custom codes.
    pub fn group(&self) -> Option<CodeGroup> {
        match self.as_str() {
            "bad_request" | "unauthorized" | "forbidden" | "not_found" | "conflict"
            | "invalid" | "unprocessable" | "too_many_requests" => Some(CodeGroup::Domain),
            "timeout" | "unavailable" => Some(CodeGroup::Availability),
            "internal" | "defect" | "interrupt" => Some(CodeGroup::Meta),
            _ => None,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&'static str> for Code {
    fn from(s: &'static str) -> Self {
        Self::from_static(s)
    }
}

impl From<String> for Code {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for Code {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Code {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

const BUILTIN: [Code; 13] = [
    Code::BAD_REQUEST,
    Code::UNAUTHORIZED,
    Code::FORBIDDEN,
    Code::NOT_FOUND,
    Code::CONFLICT,
    Code::INVALID,
    Code::UNPROCESSABLE,
    Code::TOO_MANY_REQUESTS,
    Code::TIMEOUT,
    Code::UNAVAILABLE,
    Code::INTERNAL,
    Code::DEFECT,
    Code::INTERRUPT,
];

/// The built-in codes in their stable documentation order.
///
/// Returns a fresh `Vec`; callers may modify it freely.
pub fn builtin_codes() -> Vec<Code> {
    BUILTIN.to_vec()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
