// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! echo-ui-registry: live component directory with a selector query engine.
//!
//! Components form a tree through their `parent_id` links. The registry
//! reads that tree through an [`IdentityStore`] and answers structural
//! queries written in a compact selector language:
//!
//! ```text
//! toolbar button[text="Try me", icon=people]
//! ```
//!
//! Each whitespace-separated step is a [`MatchSpec`]: an optional type name
//! (matched against the component's whole [`TypeLineage`]) plus property
//! equalities. A multi-step selector means nested containment, not direct
//! adjacency.
//!
//! Entry points live on [`ComponentRegistry`]: `down` (pre-order subtree
//! search), `up` (ancestor search), `get_first` (chain resolution from the
//! application root) and the ancillary parent/child helpers. Every query
//! runs in [`QueryMode::FirstMatch`] or [`QueryMode::CollectAll`].
#![forbid(unsafe_code)]

mod component;
mod ident;
mod matcher;
mod query;
mod registry;
mod selector;
mod snapshot;
mod store;
mod walker;

pub use component::{Component, TypeDef, TypeLineage, ID_KEY, NTYPE_KEY, PARENT_ID_KEY};
pub use ident::ComponentId;
pub use matcher::matches;
pub use query::{QueryError, QueryMode, QueryOptions, QueryResult, DEFAULT_MAX_DEPTH};
pub use registry::ComponentRegistry;
pub use selector::{IntoSelector, MatchSpec, Selector, SelectorError};
pub use snapshot::{ComponentEntry, SnapshotError, TreeSnapshot, TypeEntry};
pub use store::{IdentityStore, MemoryStore, StoreError};
