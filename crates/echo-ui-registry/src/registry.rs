// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Query front-end over an [`IdentityStore`].
use rustc_hash::FxHashSet;
use tracing::{debug, instrument, warn};

use crate::component::Component;
use crate::ident::ComponentId;
use crate::query::{QueryError, QueryMode, QueryOptions, QueryResult};
use crate::selector::{IntoSelector, MatchSpec};
use crate::store::IdentityStore;
use crate::walker::Walker;

/// Component directory for one application context.
///
/// Borrows the identity store for its lifetime and never caches results,
/// so consecutive queries see whatever the store holds at the time. The
/// root is the application's top-level component and anchors
/// [`ComponentRegistry::get_first`].
#[derive(Debug)]
pub struct ComponentRegistry<'s, S: ?Sized> {
    store: &'s S,
    root: Option<ComponentId>,
    options: QueryOptions,
}

impl<'s, S: ?Sized> Clone for ComponentRegistry<'s, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            root: self.root.clone(),
            options: self.options,
        }
    }
}

impl<'s, S: IdentityStore + ?Sized> ComponentRegistry<'s, S> {
    /// Creates a registry without a root.
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            root: None,
            options: QueryOptions::default(),
        }
    }

    /// Sets the root component id.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<ComponentId>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Replaces the traversal options.
    #[must_use]
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Changes (or clears) the root component id.
    pub fn set_root(&mut self, root: Option<ComponentId>) {
        self.root = root;
    }

    /// Configured root id.
    pub fn root_id(&self) -> Option<&ComponentId> {
        self.root.as_ref()
    }

    /// Root component, if configured and currently registered.
    pub fn root(&self) -> Option<&'s Component> {
        self.root
            .as_ref()
            .and_then(|id| self.store.get_by_id(id.as_str()))
    }

    /// Traversal options in effect.
    pub fn options(&self) -> QueryOptions {
        self.options
    }

    /// Underlying identity store.
    pub fn store(&self) -> &'s S {
        self.store
    }

    /// Point lookup through the store.
    pub fn get_by_id(&self, id: &str) -> Option<&'s Component> {
        self.store.get_by_id(id)
    }

    /// Existence check through the store.
    pub fn has(&self, id: &str) -> bool {
        self.store.has(id)
    }

    fn walker(&self) -> Walker<'s, S> {
        Walker::new(self.store, self.options.max_depth)
    }

    /// Searches `start` and its subtree, pre-order.
    ///
    /// The selector must normalize to at most one step; an empty selector
    /// matches every component.
    #[instrument(level = "debug", skip_all, fields(start = %start.id(), mode = ?mode))]
    pub fn down(
        &self,
        start: &'s Component,
        selector: impl IntoSelector,
        mode: QueryMode,
    ) -> Result<QueryResult<'s>, QueryError> {
        let spec = selector.into_selector()?.into_single()?;
        let hits = self.walker().descend(start, &spec, mode)?;
        debug!(hits = hits.len(), spec = %spec, "down");
        Ok(QueryResult::from_hits(mode, hits))
    }

    /// [`ComponentRegistry::down`] starting from an id; an unknown id is
    /// an empty result.
    pub fn down_from_id(
        &self,
        start_id: &str,
        selector: impl IntoSelector,
        mode: QueryMode,
    ) -> Result<QueryResult<'s>, QueryError> {
        let selector = selector.into_selector()?;
        match self.store.get_by_id(start_id) {
            Some(start) => self.down(start, selector, mode),
            None => Ok(QueryResult::empty(mode)),
        }
    }

    /// Tests the ancestors of `start_id`, nearest first.
    ///
    /// The start component is never tested. An unknown id is an empty
    /// result.
    #[instrument(level = "debug", skip(self, selector))]
    pub fn up(
        &self,
        start_id: &str,
        selector: impl IntoSelector,
        mode: QueryMode,
    ) -> Result<QueryResult<'s>, QueryError> {
        let spec = selector.into_selector()?.into_single()?;
        let Some(start) = self.store.get_by_id(start_id) else {
            return Ok(QueryResult::empty(mode));
        };
        let hits = self.walker().ascend(start, &spec, mode)?;
        debug!(hits = hits.len(), spec = %spec, "up");
        Ok(QueryResult::from_hits(mode, hits))
    }

    /// Resolves a selector chain from the root.
    ///
    /// Each step searches the subtrees of the previous step's hits (the hit
    /// itself included). The first step with no hits ends the query; later
    /// steps never run. In collect-all mode duplicate hits reached through
    /// nested scopes are dropped. A chain with no steps yields the root.
    #[instrument(level = "debug", skip_all, fields(mode = ?mode))]
    pub fn get_first(
        &self,
        selector: impl IntoSelector,
        mode: QueryMode,
    ) -> Result<QueryResult<'s>, QueryError> {
        let selector = selector.into_selector()?;
        let root_id = self.root.as_ref().ok_or(QueryError::NoRoot)?;
        let Some(root) = self.store.get_by_id(root_id.as_str()) else {
            warn!(root = %root_id, "root component is not registered");
            return Ok(QueryResult::empty(mode));
        };

        let walker = self.walker();
        let mut scope = vec![root];
        for (step, spec) in selector.steps().iter().enumerate() {
            let mut next = Vec::new();
            let mut seen = FxHashSet::default();
            for &node in &scope {
                for hit in walker.descend(node, spec, mode)? {
                    if seen.insert(hit.id()) {
                        next.push(hit);
                    }
                }
                if mode.is_first_match() && !next.is_empty() {
                    break;
                }
            }
            if next.is_empty() {
                debug!(step, spec = %spec, "selector step matched nothing");
                return Ok(QueryResult::empty(mode));
            }
            scope = next;
        }
        Ok(QueryResult::from_hits(mode, scope))
    }

    /// Every descendant of `component`, pre-order, unfiltered.
    pub fn get_child_components(
        &self,
        component: &'s Component,
    ) -> Result<Vec<&'s Component>, QueryError> {
        self.walker().descendants(component)
    }

    /// Ancestors of `component`, nearest first.
    pub fn get_parents(&self, component: &Component) -> Result<Vec<&'s Component>, QueryError> {
        self.walker()
            .ascend(component, &MatchSpec::any(), QueryMode::CollectAll)
    }

    /// Ids of the ancestors of `component`, nearest first.
    pub fn get_parent_ids(&self, component: &Component) -> Result<Vec<ComponentId>, QueryError> {
        Ok(self
            .get_parents(component)?
            .into_iter()
            .map(|c| c.id().clone())
            .collect())
    }

    /// First id in `path` that is currently registered.
    ///
    /// Reconciles an ancestry trace taken from the rendering layer, which
    /// may name components that no longer exist.
    pub fn find_parent_component<I>(&self, path: I) -> Option<ComponentId>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        path.into_iter().find_map(|id| {
            let id: &str = id.as_ref();
            (!id.is_empty() && self.store.has(id)).then(|| ComponentId::from(id))
        })
    }

    /// Every id in `path` that is currently registered, in order.
    pub fn get_parent_path<I>(&self, path: I) -> Vec<ComponentId>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        path.into_iter()
            .filter_map(|id| {
                let id: &str = id.as_ref();
                self.store.has(id).then(|| ComponentId::from(id))
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::component::{TypeDef, TypeLineage};
    use crate::store::MemoryStore;
    use serde_json::json;

    /// `root → form → field1, field2`
    fn form_store() -> MemoryStore {
        let component = TypeLineage::base(TypeDef::new("component"));
        let form = component.derive(TypeDef::new("form"));
        let textfield = component.derive(TypeDef::new("textfield"));
        let mut store = MemoryStore::new();
        store.register(Component::new("root", component.clone())).unwrap();
        store
            .register(Component::new("form", form).with_parent("root"))
            .unwrap();
        store
            .register(
                Component::new("field1", textfield.clone())
                    .with_parent("form")
                    .with_property("name", "email"),
            )
            .unwrap();
        store
            .register(
                Component::new("field2", textfield)
                    .with_parent("form")
                    .with_property("name", "phone"),
            )
            .unwrap();
        store
    }

    #[test]
    fn get_first_requires_a_root() {
        let store = form_store();
        let registry = ComponentRegistry::new(&store);
        assert_eq!(
            registry.get_first("form", QueryMode::FirstMatch),
            Err(QueryError::NoRoot)
        );
    }

    #[test]
    fn unregistered_root_is_an_empty_result() {
        let store = form_store();
        let registry = ComponentRegistry::new(&store).with_root("gone");
        assert_eq!(
            registry.get_first("form", QueryMode::CollectAll),
            Ok(QueryResult::All(Vec::new()))
        );
    }

    #[test]
    fn empty_chain_yields_root() {
        let store = form_store();
        let registry = ComponentRegistry::new(&store).with_root("root");
        let hit = registry
            .get_first(Vec::<MatchSpec>::new(), QueryMode::FirstMatch)
            .unwrap();
        assert_eq!(hit.first().unwrap().id(), "root");
    }

    #[test]
    fn down_rejects_multi_step_text() {
        let store = form_store();
        let registry = ComponentRegistry::new(&store);
        let root = registry.get_by_id("root").unwrap();
        assert!(matches!(
            registry.down(root, "form textfield", QueryMode::FirstMatch),
            Err(QueryError::Selector(_))
        ));
    }

    #[test]
    fn down_from_unknown_id_is_empty() {
        let store = form_store();
        let registry = ComponentRegistry::new(&store);
        assert_eq!(
            registry.down_from_id("nope", "form", QueryMode::FirstMatch),
            Ok(QueryResult::First(None))
        );
        let hits = registry
            .down_from_id("form", json!({"ntype": "textfield"}), QueryMode::CollectAll)
            .unwrap();
        assert_eq!(hits.ids(), ["field1", "field2"].map(ComponentId::from));
    }

    #[test]
    fn parent_path_helpers_filter_stale_ids() {
        let store = form_store();
        let registry = ComponentRegistry::new(&store);
        assert_eq!(
            registry.find_parent_component(["", "stale", "form", "root"]),
            Some(ComponentId::from("form"))
        );
        assert_eq!(registry.find_parent_component(["stale"]), None);
        assert_eq!(
            registry.get_parent_path(vec!["stale", "form", "x", "root"]),
            vec![ComponentId::from("form"), ComponentId::from("root")]
        );
    }

    #[test]
    fn parents_and_children() {
        let store = form_store();
        let registry = ComponentRegistry::new(&store);
        let field = registry.get_by_id("field2").unwrap();
        assert_eq!(
            registry.get_parent_ids(field).unwrap(),
            vec![ComponentId::from("form"), ComponentId::from("root")]
        );
        let root = registry.get_by_id("root").unwrap();
        let ids: Vec<_> = registry
            .get_child_components(root)
            .unwrap()
            .into_iter()
            .map(|c| c.id().as_str())
            .collect();
        assert_eq!(ids, ["form", "field1", "field2"]);
    }
}
