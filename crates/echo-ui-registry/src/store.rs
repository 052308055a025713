// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identity store port plus the in-memory adapter used by tools and tests.
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::component::Component;
use crate::ident::ComponentId;

/// Lookup surface the registry needs from whoever owns the live components.
///
/// The registry never caches anything it reads through this trait, so
/// every query observes the store as it is at the moment of each call.
pub trait IdentityStore {
    /// Point lookup.
    fn get_by_id(&self, id: &str) -> Option<&Component>;

    /// Existence check.
    fn has(&self, id: &str) -> bool {
        self.get_by_id(id).is_some()
    }

    /// Every component accepted by `predicate`, in store order.
    fn find(&self, predicate: &mut dyn FnMut(&Component) -> bool) -> Vec<&Component>;

    /// Direct children of `parent`, in store order.
    fn children_of(&self, parent: &str) -> Vec<&Component> {
        self.find(&mut |c: &Component| c.parent_id().is_some_and(|p| p == parent))
    }
}

/// Error returned by [`MemoryStore`] mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A component with this id is already registered.
    #[error("component already registered: {0}")]
    DuplicateId(ComponentId),
    /// No component with this id is registered.
    #[error("unknown component: {0}")]
    UnknownId(ComponentId),
    /// Linking `id` under `parent` would close a loop in the parent chain.
    #[error("parent link {id} -> {parent} would create a cycle")]
    Cycle {
        /// Component being linked.
        id: ComponentId,
        /// Requested parent.
        parent: ComponentId,
    },
}

/// Insertion-ordered in-memory identity store.
///
/// Parent ids may point at components that are not registered yet; such
/// links are simply unresolved until the parent shows up. Links that would
/// make the parent relation cyclic are rejected.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    order: Vec<ComponentId>,
    components: FxHashMap<ComponentId, Component>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates components in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.order.iter().filter_map(|id| self.components.get(id))
    }

    /// Registers a constructed component.
    pub fn register(&mut self, component: Component) -> Result<(), StoreError> {
        let id = component.id().clone();
        if self.components.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        if let Some(parent) = component.parent_id() {
            self.ensure_acyclic(&id, parent)?;
        }
        debug!(id = %id, parent = ?component.parent_id(), "register component");
        self.order.push(id.clone());
        self.components.insert(id, component);
        Ok(())
    }

    /// Removes a destroyed component.
    ///
    /// Children keep their `parent_id` and become unreachable from above
    /// until the parent is registered again or they are reparented.
    pub fn unregister(&mut self, id: &str) -> Option<Component> {
        let removed = self.components.remove(id)?;
        self.order.retain(|other| other.as_str() != id);
        debug!(id, "unregister component");
        Some(removed)
    }

    /// Moves `id` under `parent` (or detaches it when `parent` is `None`).
    pub fn reparent(&mut self, id: &str, parent: Option<ComponentId>) -> Result<(), StoreError> {
        if !self.components.contains_key(id) {
            return Err(StoreError::UnknownId(id.into()));
        }
        if let Some(parent) = &parent {
            self.ensure_acyclic(&ComponentId::from(id), parent)?;
        }
        debug!(id, parent = ?parent, "reparent component");
        if let Some(component) = self.components.get_mut(id) {
            component.set_parent(parent);
        }
        Ok(())
    }

    /// Sets an instance property on a registered component.
    pub fn set_property(
        &mut self,
        id: &str,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, StoreError> {
        let component = self
            .components
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownId(id.into()))?;
        Ok(component.set_property(key, value))
    }

    /// Walks up from `parent` and fails if the chain reaches `id`.
    fn ensure_acyclic(&self, id: &ComponentId, parent: &ComponentId) -> Result<(), StoreError> {
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == id {
                return Err(StoreError::Cycle {
                    id: id.clone(),
                    parent: parent.clone(),
                });
            }
            cursor = self
                .components
                .get(current.as_str())
                .and_then(Component::parent_id);
        }
        Ok(())
    }
}

impl IdentityStore for MemoryStore {
    fn get_by_id(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    fn has(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    fn find(&self, predicate: &mut dyn FnMut(&Component) -> bool) -> Vec<&Component> {
        self.iter().filter(|&c| predicate(c)).collect()
    }
}
