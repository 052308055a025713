// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Echo UI tools: a config service over a
//! storage port, and the persisted preferences that shape registry queries.
//! Keeps CLI and host adapters thin.

pub mod config;
pub mod prefs;
