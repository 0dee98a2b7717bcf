// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Text and scope intervals
//!
//! Syntax nodes cover half-open byte ranges `[start, end)` of their script
//! item ([`TextInterval`]). Lexical scopes use [`ScopeInterval`], whose end may
//! be [`ScopeEnd::Unbounded`] while no following clause closes the scope.
//!
//! Boundaries are computed by [`compute_scope_interval`], a pure function of
//! the introducing token end and the next clause start:
//!
//! ```
//! use sqlscope_ir::{compute_scope_interval, ScopeEnd, UNBOUNDED};
//!
//! // UPDATE t SET a=1 WHERE c=3
//! // `SET` ends at 12, `WHERE` starts at 17 and ends at 22
//! let targets = compute_scope_interval(12, ScopeEnd::Bounded(17));
//! assert!(targets.contains(15));
//! assert!(!targets.contains(17));
//!
//! let tail = compute_scope_interval(22, UNBOUNDED);
//! assert!(tail.is_unbounded());
//! assert!(tail.contains(10_000));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open byte range `[start, end)` within one script item
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TextInterval {
    pub start: usize,
    pub end: usize,
}

impl TextInterval {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Check if `other` lies completely inside this interval
    pub fn encloses(&self, other: &TextInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest interval covering both
    pub fn cover(&self, other: &TextInterval) -> TextInterval {
        TextInterval::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Shift by a document offset
    pub fn shifted(&self, by: usize) -> TextInterval {
        TextInterval::new(self.start + by, self.end + by)
    }
}

impl fmt::Display for TextInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// End of a lexical scope
///
/// `Bounded(n) < Unbounded` for every `n`, so the derived ordering compares
/// scope ends directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScopeEnd {
    Bounded(usize),
    Unbounded,
}

/// Sentinel for a scope extending to end of document
pub const UNBOUNDED: ScopeEnd = ScopeEnd::Unbounded;

impl ScopeEnd {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, ScopeEnd::Unbounded)
    }

    /// Bounded offset, if any
    pub fn offset(&self) -> Option<usize> {
        match self {
            ScopeEnd::Bounded(n) => Some(*n),
            ScopeEnd::Unbounded => None,
        }
    }
}

impl From<Option<usize>> for ScopeEnd {
    fn from(value: Option<usize>) -> Self {
        value.map_or(ScopeEnd::Unbounded, ScopeEnd::Bounded)
    }
}

/// Half-open interval of a lexical scope, possibly unbounded on the right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeInterval {
    pub start: usize,
    pub end: ScopeEnd,
}

impl ScopeInterval {
    pub fn contains(&self, offset: usize) -> bool {
        if offset < self.start {
            return false;
        }
        match self.end {
            ScopeEnd::Bounded(end) => offset < end,
            ScopeEnd::Unbounded => true,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.end.is_unbounded()
    }

    pub fn is_empty(&self) -> bool {
        self.end == ScopeEnd::Bounded(self.start)
    }

    /// Check if the two intervals share at least one offset
    pub fn overlaps(&self, other: &ScopeInterval) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let self_before_other = match self.end {
            ScopeEnd::Bounded(end) => end <= other.start,
            ScopeEnd::Unbounded => false,
        };
        let other_before_self = match other.end {
            ScopeEnd::Bounded(end) => end <= self.start,
            ScopeEnd::Unbounded => false,
        };
        !self_before_other && !other_before_self
    }

    /// Close an unbounded interval at `end`; bounded intervals are kept
    pub fn bound_at(&self, end: usize) -> ScopeInterval {
        match self.end {
            ScopeEnd::Unbounded => compute_scope_interval(self.start, ScopeEnd::Bounded(end)),
            ScopeEnd::Bounded(_) => *self,
        }
    }

    /// End offset, with unbounded intervals clamped to `document_end`
    pub fn end_offset(&self, document_end: usize) -> usize {
        self.end.offset().unwrap_or(document_end.max(self.start))
    }

    /// Shift by a document offset
    pub fn shifted(&self, by: usize) -> ScopeInterval {
        ScopeInterval {
            start: self.start + by,
            end: match self.end {
                ScopeEnd::Bounded(end) => ScopeEnd::Bounded(end + by),
                ScopeEnd::Unbounded => ScopeEnd::Unbounded,
            },
        }
    }
}

impl fmt::Display for ScopeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            ScopeEnd::Bounded(end) => write!(f, "[{}, {})", self.start, end),
            ScopeEnd::Unbounded => write!(f, "[{}, ..)", self.start),
        }
    }
}

/// Compute a scope interval from the end of its introducing token and the
/// start of the next recognized clause
///
/// A next-clause start before the introducing token end (possible around
/// parser recovery) yields an empty interval rather than an inverted one.
pub fn compute_scope_interval(introducing_token_end: usize, next_clause_start: ScopeEnd) -> ScopeInterval {
    let end = match next_clause_start {
        ScopeEnd::Bounded(next) => ScopeEnd::Bounded(next.max(introducing_token_end)),
        ScopeEnd::Unbounded => ScopeEnd::Unbounded,
    };
    ScopeInterval {
        start: introducing_token_end,
        end,
    }
}
