// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Component records and their precomputed type lineage.
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ident::ComponentId;

/// Property key that resolves to the component id.
pub const ID_KEY: &str = "id";
/// Property key that resolves to the parent component id.
pub const PARENT_ID_KEY: &str = "parentId";
/// Property key that names a component type.
pub const NTYPE_KEY: &str = "ntype";

/// Static description of one component type.
///
/// `defaults` models values declared on the type rather than on the
/// instance; they are visible to property matching unless the instance
/// overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Short type tag (the `ntype`), e.g. `"textfield"`.
    pub name: String,
    /// Property defaults declared by this type.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, Value>,
}

impl TypeDef {
    /// Creates a type with no defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defaults: BTreeMap::new(),
        }
    }

    /// Adds a default property value.
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }
}

/// Full type classification of a component, most-derived type first.
///
/// Lineages are built once and shared between every component of the same
/// type; they never change after construction.
#[derive(Debug, Clone, Default)]
pub struct TypeLineage(Arc<[Arc<TypeDef>]>);

impl TypeLineage {
    /// Lineage consisting of a single base type.
    pub fn base(def: TypeDef) -> Self {
        Self(Arc::from(vec![Arc::new(def)]))
    }

    /// Returns a new lineage with `def` as the most-derived type on top of `self`.
    #[must_use]
    pub fn derive(&self, def: TypeDef) -> Self {
        let mut chain = Vec::with_capacity(self.0.len() + 1);
        chain.push(Arc::new(def));
        chain.extend(self.0.iter().cloned());
        Self(Arc::from(chain))
    }

    /// Iterates types from most-derived to least-derived.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDef> {
        self.0.iter().map(|def| &**def)
    }

    /// Iterates type names from most-derived to least-derived.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|def| def.name.as_str())
    }

    /// Returns the most-derived type, if any.
    #[must_use]
    pub fn most_derived(&self) -> Option<&TypeDef> {
        self.0.first().map(|def| &**def)
    }

    /// Returns `true` if `name` appears anywhere in the lineage.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    /// Looks up a type-declared default, nearest type first.
    #[must_use]
    pub fn default_value(&self, key: &str) -> Option<&Value> {
        self.iter().find_map(|def| def.defaults.get(key))
    }

    /// Number of types in the lineage.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for an untyped component.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for TypeLineage {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

/// A live component as seen by the registry.
///
/// Only the id, the parent link, the lineage and the property bag are
/// visible here; everything else about a component belongs to the
/// rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    id: ComponentId,
    parent_id: Option<ComponentId>,
    lineage: TypeLineage,
    properties: BTreeMap<String, Value>,
}

impl Component {
    /// Creates a parentless component.
    pub fn new(id: impl Into<ComponentId>, lineage: TypeLineage) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            lineage,
            properties: BTreeMap::new(),
        }
    }

    /// Sets the parent link.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<ComponentId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets an instance property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Component id.
    #[must_use]
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Parent id, if the component is attached.
    #[must_use]
    pub fn parent_id(&self) -> Option<&ComponentId> {
        self.parent_id.as_ref()
    }

    /// Type lineage.
    #[must_use]
    pub fn lineage(&self) -> &TypeLineage {
        &self.lineage
    }

    /// Most-derived type name.
    #[must_use]
    pub fn ntype(&self) -> Option<&str> {
        self.lineage.most_derived().map(|def| def.name.as_str())
    }

    /// Instance properties (excluding type defaults).
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Resolves a property the way selectors see it.
    ///
    /// Order: `id` / `parentId`, then instance properties, then the
    /// most-derived type name for `ntype`, then type defaults.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<Cow<'_, Value>> {
        match key {
            ID_KEY => return Some(Cow::Owned(Value::String(self.id.to_string()))),
            PARENT_ID_KEY => {
                return self
                    .parent_id
                    .as_ref()
                    .map(|p| Cow::Owned(Value::String(p.to_string())));
            }
            _ => {}
        }
        if let Some(value) = self.properties.get(key) {
            return Some(Cow::Borrowed(value));
        }
        if key == NTYPE_KEY {
            if let Some(name) = self.ntype() {
                return Some(Cow::Owned(Value::String(name.to_owned())));
            }
        }
        self.lineage.default_value(key).map(Cow::Borrowed)
    }

    pub(crate) fn set_parent(&mut self, parent_id: Option<ComponentId>) {
        self.parent_id = parent_id;
    }

    /// Sets or replaces an instance property, returning the previous value.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(key.into(), value.into())
    }
}
