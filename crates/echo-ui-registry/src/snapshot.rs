// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serializable tree documents for tooling and fixtures.
//!
//! A snapshot lists a type catalog (each type optionally extending another)
//! and the components in registration order. Loading resolves every type
//! into a shared [`TypeLineage`] once, then registers the components.
use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::component::{Component, TypeDef, TypeLineage};
use crate::ident::ComponentId;
use crate::store::{MemoryStore, StoreError};

/// One type in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEntry {
    /// Type name (`ntype`).
    pub name: String,
    /// Name of the direct base type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Defaults declared by this type.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, Value>,
}

/// One component in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEntry {
    /// Component id.
    pub id: ComponentId,
    /// Parent id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ComponentId>,
    /// Most-derived type name; untyped when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntype: Option<String>,
    /// Instance properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
}

/// Whole-tree document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Root component of the application, if the document names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<ComponentId>,
    /// Type catalog.
    #[serde(default)]
    pub types: Vec<TypeEntry>,
    /// Components in registration order.
    #[serde(default)]
    pub components: Vec<ComponentEntry>,
}

/// Error raised while loading a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The catalog declares a type twice.
    #[error("type declared twice: {0}")]
    DuplicateType(String),
    /// A type extends a type missing from the catalog.
    #[error("type {name} extends unknown type {extends}")]
    UnknownBaseType {
        /// Declaring type.
        name: String,
        /// Missing base.
        extends: String,
    },
    /// Type inheritance loops.
    #[error("type inheritance loops through {0}")]
    TypeCycle(String),
    /// A component names a type missing from the catalog.
    #[error("component {id} has unknown type {ntype}")]
    UnknownType {
        /// Component id.
        id: ComponentId,
        /// Missing type.
        ntype: String,
    },
    /// Registration failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TreeSnapshot {
    /// Resolves the catalog and registers every component into a new store.
    pub fn into_store(self) -> Result<MemoryStore, SnapshotError> {
        let lineages = LineageBuilder::new(&self.types)?.build_all()?;
        let mut store = MemoryStore::new();
        for entry in self.components {
            let lineage = match &entry.ntype {
                None => TypeLineage::default(),
                Some(ntype) => lineages
                    .get(ntype.as_str())
                    .cloned()
                    .ok_or_else(|| SnapshotError::UnknownType {
                        id: entry.id.clone(),
                        ntype: ntype.clone(),
                    })?,
            };
            let mut component = Component::new(entry.id, lineage);
            if let Some(parent) = entry.parent_id {
                component = component.with_parent(parent);
            }
            for (key, value) in entry.properties {
                component.set_property(key, value);
            }
            store.register(component)?;
        }
        Ok(store)
    }

    /// Captures the current contents of `store`.
    #[must_use]
    pub fn from_store(store: &MemoryStore, root: Option<ComponentId>) -> Self {
        let mut types = Vec::new();
        let mut seen = FxHashSet::default();
        let mut components = Vec::with_capacity(store.len());
        for component in store.iter() {
            let chain: Vec<&TypeDef> = component.lineage().iter().collect();
            for (i, def) in chain.iter().enumerate() {
                if seen.insert(def.name.clone()) {
                    types.push(TypeEntry {
                        name: def.name.clone(),
                        extends: chain.get(i + 1).map(|base| base.name.clone()),
                        defaults: def.defaults.clone(),
                    });
                }
            }
            components.push(ComponentEntry {
                id: component.id().clone(),
                parent_id: component.parent_id().cloned(),
                ntype: component.ntype().map(str::to_owned),
                properties: component.properties().clone(),
            });
        }
        Self {
            root,
            types,
            components,
        }
    }
}

struct LineageBuilder<'a> {
    entries: FxHashMap<&'a str, &'a TypeEntry>,
    built: FxHashMap<&'a str, TypeLineage>,
    visiting: Vec<&'a str>,
}

impl<'a> LineageBuilder<'a> {
    fn new(types: &'a [TypeEntry]) -> Result<Self, SnapshotError> {
        let mut entries = FxHashMap::default();
        for entry in types {
            if entries.insert(entry.name.as_str(), entry).is_some() {
                return Err(SnapshotError::DuplicateType(entry.name.clone()));
            }
        }
        Ok(Self {
            entries,
            built: FxHashMap::default(),
            visiting: Vec::new(),
        })
    }

    fn build_all(mut self) -> Result<FxHashMap<&'a str, TypeLineage>, SnapshotError> {
        let names: Vec<&'a str> = self.entries.keys().copied().collect();
        for name in names {
            self.resolve(name)?;
        }
        Ok(self.built)
    }

    fn resolve(&mut self, name: &'a str) -> Result<TypeLineage, SnapshotError> {
        if let Some(lineage) = self.built.get(name) {
            return Ok(lineage.clone());
        }
        if self.visiting.contains(&name) {
            return Err(SnapshotError::TypeCycle(name.to_owned()));
        }
        let entry = self.entries[name];
        let def = TypeDef {
            name: entry.name.clone(),
            defaults: entry.defaults.clone(),
        };
        self.visiting.push(name);
        let lineage = match entry.extends.as_deref() {
            None => TypeLineage::base(def),
            Some(base) => {
                if !self.entries.contains_key(base) {
                    return Err(SnapshotError::UnknownBaseType {
                        name: entry.name.clone(),
                        extends: base.to_owned(),
                    });
                }
                self.resolve(base)?.derive(def)
            }
        };
        self.visiting.pop();
        self.built.insert(name, lineage.clone());
        Ok(lineage)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::IdentityStore;
    use serde_json::json;

    fn doc() -> TreeSnapshot {
        serde_json::from_value(json!({
            "root": "viewport",
            "types": [
                {"name": "textfield", "extends": "field"},
                {"name": "component", "defaults": {"hidden": false}},
                {"name": "field", "extends": "component"},
                {"name": "container", "extends": "component"}
            ],
            "components": [
                {"id": "viewport", "ntype": "container"},
                {"id": "name", "parentId": "viewport", "ntype": "textfield",
                 "properties": {"name": "name"}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn catalog_order_does_not_matter() {
        let store = doc().into_store().unwrap();
        let field = store.get_by_id("name").unwrap();
        let names: Vec<_> = field.lineage().names().collect();
        assert_eq!(names, ["textfield", "field", "component"]);
        assert_eq!(field.property("hidden").as_deref(), Some(&json!(false)));
        assert_eq!(field.parent_id().unwrap(), "viewport");
    }

    #[test]
    fn store_round_trips_through_a_snapshot() {
        let store = doc().into_store().unwrap();
        let snapshot = TreeSnapshot::from_store(&store, Some("viewport".into()));
        let again = snapshot.clone().into_store().unwrap();
        assert_eq!(TreeSnapshot::from_store(&again, Some("viewport".into())), snapshot);
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn broken_catalogs_are_rejected() {
        let mut dup = doc();
        dup.types.push(TypeEntry {
            name: "field".into(),
            extends: None,
            defaults: BTreeMap::new(),
        });
        assert_eq!(
            dup.into_store().unwrap_err(),
            SnapshotError::DuplicateType("field".into())
        );

        let mut looped = doc();
        looped.types[1].extends = Some("textfield".into());
        assert!(matches!(
            looped.into_store(),
            Err(SnapshotError::TypeCycle(_))
        ));

        let mut missing = doc();
        missing.types[0].extends = Some("nope".into());
        assert_eq!(
            missing.into_store().unwrap_err(),
            SnapshotError::UnknownBaseType {
                name: "textfield".into(),
                extends: "nope".into()
            }
        );

        let mut untyped = doc();
        untyped.components[1].ntype = Some("button".into());
        assert!(matches!(
            untyped.into_store(),
            Err(SnapshotError::UnknownType { .. })
        ));
    }
}
