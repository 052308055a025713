// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted registry preferences (query limits, default mode, root id).

use echo_ui_registry::{ComponentId, QueryMode, QueryOptions, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};

/// Config key under which [`RegistryPrefs`] are stored.
pub const REGISTRY_PREFS_KEY: &str = "registry";

/// Saved preferences for registry tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RegistryPrefs {
    /// Query defaults.
    pub query: QueryPrefs,
    /// Root component used when a document does not name one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_id: Option<ComponentId>,
}

/// Query defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryPrefs {
    /// Deepest level a descent may reach.
    pub max_depth: usize,
    /// Collect every match instead of stopping at the first.
    pub collect_all: bool,
}

impl Default for QueryPrefs {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            collect_all: false,
        }
    }
}

impl QueryPrefs {
    /// Mode selected by these prefs.
    #[must_use]
    pub fn mode(&self) -> QueryMode {
        QueryMode::from_first_match(!self.collect_all)
    }
}

impl From<QueryPrefs> for QueryOptions {
    fn from(prefs: QueryPrefs) -> Self {
        Self {
            // zero would reject even the start node's children
            max_depth: prefs.max_depth.max(1),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_documents_fill_defaults() {
        let prefs: RegistryPrefs = serde_json::from_value(json!({"query": {"collect_all": true}})).unwrap();
        assert_eq!(prefs.query.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(prefs.query.mode(), QueryMode::CollectAll);
        assert_eq!(prefs.root_id, None);

        let empty: RegistryPrefs = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, RegistryPrefs::default());
        assert_eq!(empty.query.mode(), QueryMode::FirstMatch);
    }

    #[test]
    fn options_clamp_zero_depth() {
        let opts = QueryOptions::from(QueryPrefs {
            max_depth: 0,
            collect_all: false,
        });
        assert_eq!(opts.max_depth, 1);
        assert_eq!(QueryOptions::from(QueryPrefs::default()), QueryOptions::default());
    }
}
