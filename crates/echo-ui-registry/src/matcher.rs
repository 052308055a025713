// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Single-component match evaluation.
use serde_json::Value;

use crate::component::{Component, NTYPE_KEY};
use crate::selector::MatchSpec;

/// Returns `true` if `component` satisfies every part of `spec`.
///
/// The type name may appear anywhere in the lineage. A string `ntype`
/// constraint is checked against the whole lineage too, unless the instance
/// carries its own `ntype` property. Every other constraint must resolve
/// through [`Component::property`] to a strictly equal JSON value; `"1"` and
/// `1` are different values.
#[must_use]
pub fn matches(component: &Component, spec: &MatchSpec) -> bool {
    if let Some(name) = &spec.type_name {
        if !component.lineage().contains(name) {
            return false;
        }
    }
    spec.constraints
        .iter()
        .all(|(key, expected)| match (key.as_str(), expected) {
            (NTYPE_KEY, Value::String(name))
                if !component.properties().contains_key(NTYPE_KEY) =>
            {
                component.lineage().contains(name)
            }
            _ => component
                .property(key)
                .is_some_and(|actual| *actual == *expected),
        })
}
