// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Descending and ascending traversal over the live parent/child relation.
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::component::Component;
use crate::matcher::matches;
use crate::query::{QueryError, QueryMode};
use crate::selector::MatchSpec;
use crate::store::IdentityStore;

/// Borrowed traversal context.
///
/// Children are rediscovered through [`IdentityStore::children_of`] on every
/// visit; nothing is cached between calls.
pub(crate) struct Walker<'s, S: ?Sized> {
    store: &'s S,
    max_depth: usize,
}

impl<'s, S: IdentityStore + ?Sized> Walker<'s, S> {
    pub(crate) fn new(store: &'s S, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    /// Pre-order search of `start` and its subtree.
    pub(crate) fn descend(
        &self,
        start: &'s Component,
        spec: &MatchSpec,
        mode: QueryMode,
    ) -> Result<Vec<&'s Component>, QueryError> {
        let mut hits = Vec::new();
        self.visit(start, spec, mode, 0, &mut hits)?;
        Ok(hits)
    }

    /// Every descendant of `start` (not `start` itself), pre-order.
    pub(crate) fn descendants(&self, start: &'s Component) -> Result<Vec<&'s Component>, QueryError> {
        let any = MatchSpec::any();
        let mut hits = Vec::new();
        for child in self.store.children_of(start.id().as_str()) {
            self.visit(child, &any, QueryMode::CollectAll, 1, &mut hits)?;
        }
        Ok(hits)
    }

    /// Returns `true` once a first-match search has its hit.
    fn visit(
        &self,
        node: &'s Component,
        spec: &MatchSpec,
        mode: QueryMode,
        depth: usize,
        hits: &mut Vec<&'s Component>,
    ) -> Result<bool, QueryError> {
        if depth > self.max_depth {
            return Err(QueryError::DepthLimit {
                id: node.id().clone(),
                max_depth: self.max_depth,
            });
        }
        if matches(node, spec) {
            trace!(id = %node.id(), depth, "descent hit");
            hits.push(node);
            if mode.is_first_match() {
                return Ok(true);
            }
        }
        for child in self.store.children_of(node.id().as_str()) {
            if self.visit(child, spec, mode, depth + 1, hits)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Walks parent links above `start`, nearest first. `start` itself is
    /// never tested.
    pub(crate) fn ascend(
        &self,
        start: &Component,
        spec: &MatchSpec,
        mode: QueryMode,
    ) -> Result<Vec<&'s Component>, QueryError> {
        let mut hits = Vec::new();
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        seen.insert(start.id().as_str());
        let mut parent_id = start.parent_id().map(|id| id.as_str());
        while let Some(parent) = parent_id.and_then(|id| self.store.get_by_id(id)) {
            if !seen.insert(parent.id().as_str()) {
                return Err(QueryError::Cycle(parent.id().clone()));
            }
            if matches(parent, spec) {
                trace!(id = %parent.id(), "ascent hit");
                hits.push(parent);
                if mode.is_first_match() {
                    break;
                }
            }
            parent_id = parent.parent_id().map(|id| id.as_str());
        }
        Ok(hits)
    }
}
