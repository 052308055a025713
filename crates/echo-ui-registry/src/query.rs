// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Query modes, options, results and errors shared by the traversal entry points.
use thiserror::Error;

use crate::component::Component;
use crate::ident::ComponentId;
use crate::selector::SelectorError;

/// Default bound on descent depth.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Whether a traversal stops at the first hit or collects every hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// Short-circuit on the first matching component.
    #[default]
    FirstMatch,
    /// Visit the whole search space and return every match in traversal order.
    CollectAll,
}

impl QueryMode {
    /// Maps the framework's `returnFirstMatch` flag onto a mode.
    #[must_use]
    pub fn from_first_match(first_match_only: bool) -> Self {
        if first_match_only {
            Self::FirstMatch
        } else {
            Self::CollectAll
        }
    }

    /// Returns `true` for [`QueryMode::FirstMatch`].
    #[must_use]
    pub fn is_first_match(self) -> bool {
        matches!(self, Self::FirstMatch)
    }
}

/// Traversal limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Deepest level (root = 0) a descent may reach before failing with
    /// [`QueryError::DepthLimit`].
    pub max_depth: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Outcome of a query; the variant mirrors the requested [`QueryMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult<'s> {
    /// First-match result: the hit, or `None`.
    First(Option<&'s Component>),
    /// Collect-all result in traversal order (possibly empty).
    All(Vec<&'s Component>),
}

impl<'s> QueryResult<'s> {
    /// The "nothing found" value for `mode`.
    #[must_use]
    pub fn empty(mode: QueryMode) -> Self {
        match mode {
            QueryMode::FirstMatch => Self::First(None),
            QueryMode::CollectAll => Self::All(Vec::new()),
        }
    }

    pub(crate) fn from_hits(mode: QueryMode, hits: Vec<&'s Component>) -> Self {
        match mode {
            QueryMode::FirstMatch => Self::First(hits.into_iter().next()),
            QueryMode::CollectAll => Self::All(hits),
        }
    }

    /// The single hit, or the first element of a collected list.
    #[must_use]
    pub fn first(&self) -> Option<&'s Component> {
        match self {
            Self::First(hit) => *hit,
            Self::All(hits) => hits.first().copied(),
        }
    }

    /// Every hit as a list.
    #[must_use]
    pub fn into_vec(self) -> Vec<&'s Component> {
        match self {
            Self::First(hit) => hit.into_iter().collect(),
            Self::All(hits) => hits,
        }
    }

    /// Ids of every hit, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<ComponentId> {
        match self {
            Self::First(hit) => hit.iter().map(|c| c.id().clone()).collect(),
            Self::All(hits) => hits.iter().map(|c| c.id().clone()).collect(),
        }
    }

    /// Returns `true` if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::First(hit) => hit.is_none(),
            Self::All(hits) => hits.is_empty(),
        }
    }
}

/// Error returned by registry queries.
///
/// Lookup misses and empty results are never errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The selector could not be normalized.
    #[error(transparent)]
    Selector(#[from] SelectorError),
    /// `get_first` was called on a registry without a root.
    #[error("no root component configured")]
    NoRoot,
    /// A descent went deeper than [`QueryOptions::max_depth`].
    #[error("descent reached {id} beyond max depth {max_depth}")]
    DepthLimit {
        /// Component at which the limit was hit.
        id: ComponentId,
        /// Configured limit.
        max_depth: usize,
    },
    /// An ascent visited the same component twice.
    #[error("parent chain loops back to {0}")]
    Cycle(ComponentId),
}
