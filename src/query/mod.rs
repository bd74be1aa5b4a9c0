//! QueryEngine: curve-window candidate generation followed by exact rerank.
//!
//! A query moves through `Init -> WindowSelect -> Scan -> Rerank -> Done`.
//! `Scan` repeats with a doubled window radius until enough candidates are
//! found, the retry budget runs out, or the caller cancels. Falling short is
//! reported as a [`PartialResultWarning`] on the outcome, never as an error.

mod engine;
mod window;

pub use engine::{QueryEngine, QueryRequest};

use crate::metrics::SearchStatistics;
use crate::types::{LandmarkVersion, VectorId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One ranked result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Matched vector.
    pub id: VectorId,
    /// Exact distance to the query in the original space.
    pub distance: f32,
    /// Position in the result list; 1 is the nearest.
    pub rank: usize,
}

/// Why a query returned fewer guarantees than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartialResultWarning {
    /// The window stopped growing before `target` candidates were found.
    WindowExhausted {
        /// Candidates found.
        found: usize,
        /// `top_k * oversample_factor`.
        target: usize,
    },
    /// The caller cancelled; results come from candidates found so far.
    Cancelled {
        /// Candidates found before cancellation.
        found: usize,
    },
    /// The deadline passed; results come from candidates found so far.
    TimedOut {
        /// Candidates found before the deadline.
        found: usize,
    },
}

impl fmt::Display for PartialResultWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialResultWarning::WindowExhausted { found, target } => write!(
                f,
                "window expansion exhausted with {found} of {target} candidates"
            ),
            PartialResultWarning::Cancelled { found } => {
                write!(f, "cancelled after {found} candidates")
            }
            PartialResultWarning::TimedOut { found } => {
                write!(f, "timed out after {found} candidates")
            }
        }
    }
}

/// Query states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Init,
    WindowSelect,
    Scan,
    Rerank,
    Done,
}

/// Result of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Up to `top_k` results, nearest first, ties broken by ascending id.
    pub results: Vec<QueryResult>,
    /// Set when the result may be incomplete.
    pub warning: Option<PartialResultWarning>,
    /// Landmark version every candidate came from.
    pub version: LandmarkVersion,
    /// Per-query counters.
    pub stats: SearchStatistics,
}

impl QueryOutcome {
    /// Result ids in rank order.
    pub fn ids(&self) -> Vec<VectorId> {
        self.results.iter().map(|r| r.id).collect()
    }

    /// Whether a partial-result warning was raised.
    pub fn is_partial(&self) -> bool {
        self.warning.is_some()
    }
}

/// Shared flag a caller sets to stop a running query.
///
/// Checked before every scan round. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_warning_display() {
        let w = PartialResultWarning::WindowExhausted { found: 4, target: 30 };
        assert_eq!(w.to_string(), "window expansion exhausted with 4 of 30 candidates");
        assert_eq!(
            PartialResultWarning::TimedOut { found: 0 }.to_string(),
            "timed out after 0 candidates"
        );
    }
}
