// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! echo-query
//!
//! Loads a component tree snapshot and runs one registry query against it,
//! printing the matched component ids as a JSON array.
#![allow(clippy::print_stdout)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use echo_app_core::config::ConfigService;
use echo_app_core::prefs::{RegistryPrefs, REGISTRY_PREFS_KEY};
use echo_config_fs::FsConfigStore;
use echo_ui_registry::{
    Component, ComponentId, ComponentRegistry, MemoryStore, QueryMode, QueryOptions, Selector,
    TreeSnapshot,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run registry selectors against a component tree snapshot")]
struct Args {
    /// Tree snapshot (JSON) to query
    #[arg(short, long, global = true)]
    tree: Option<PathBuf>,

    /// Root component id (overrides the snapshot and saved prefs)
    #[arg(long, global = true)]
    root: Option<String>,

    /// Collect every match instead of stopping at the first
    #[arg(long, global = true)]
    all: bool,

    /// Deepest level a descent may reach (overrides saved prefs)
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Read selectors as JSON (an object or a list of objects)
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding saved prefs (defaults to the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a selector chain from the root
    First {
        /// Selector text, e.g. `form textfield[name=email]`
        selector: String,
    },
    /// Search a component and its subtree (single-step selector)
    Down {
        /// Start component id
        id: String,
        /// Selector; empty matches everything
        #[arg(default_value = "")]
        selector: String,
    },
    /// Search the ancestors of a component, nearest first
    Up {
        /// Start component id (never tested itself)
        id: String,
        /// Selector; empty matches everything
        #[arg(default_value = "")]
        selector: String,
    },
    /// List every ancestor id, nearest first
    Parents {
        /// Component id
        id: String,
    },
    /// List every descendant id, pre-order
    Children {
        /// Component id
        id: String,
    },
    /// Print the first id in an ancestry path that is still registered
    FindParent {
        /// Candidate ids, nearest first
        ids: Vec<String>,
    },
    /// Print the effective prefs (saved prefs plus flags)
    Prefs {
        /// Persist the effective prefs
        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match config_service(args.config_dir.as_deref()) {
        Ok(config) => Some(config),
        Err(err) => {
            warn!(error = %err, "config store unavailable, using default prefs");
            None
        }
    };
    let mut prefs: RegistryPrefs = config
        .as_ref()
        .map(|c| c.load_or_default(REGISTRY_PREFS_KEY))
        .unwrap_or_default();
    if let Some(max_depth) = args.max_depth {
        prefs.query.max_depth = max_depth;
    }
    if args.all {
        prefs.query.collect_all = true;
    }

    if let Command::Prefs { save } = args.cmd {
        if let Some(root) = args.root {
            prefs.root_id = Some(root.into());
        }
        if save {
            let config = config.context("no config store to save prefs into")?;
            config.save(REGISTRY_PREFS_KEY, &prefs)?;
            debug!(base = %config.store().base().display(), "prefs saved");
        }
        println!("{}", serde_json::to_string_pretty(&prefs)?);
        return Ok(());
    }

    let path = args
        .tree
        .as_deref()
        .context("--tree <FILE> is required for queries")?;
    let snapshot = read_snapshot(path)?;
    let root = args
        .root
        .map(ComponentId::from)
        .or_else(|| snapshot.root.clone())
        .or_else(|| prefs.root_id.clone());
    let store = snapshot
        .into_store()
        .with_context(|| format!("loading {}", path.display()))?;
    debug!(components = store.len(), root = ?root, "tree loaded");

    let mut registry =
        ComponentRegistry::new(&store).with_options(QueryOptions::from(prefs.query));
    registry.set_root(root);

    let ids = run(&registry, args.cmd, prefs.query.mode(), args.json)?;
    println!("{}", serde_json::to_string(&ids)?);
    Ok(())
}

fn config_service(dir: Option<&Path>) -> Result<ConfigService<FsConfigStore>> {
    let store = match dir {
        Some(dir) => FsConfigStore::with_base(dir)?,
        None => FsConfigStore::new()?,
    };
    Ok(ConfigService::new(store))
}

fn read_snapshot(path: &Path) -> Result<TreeSnapshot> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn selector_arg(src: &str, json: bool) -> Result<Selector> {
    if json {
        // blank means "match everything" in both forms
        let value: serde_json::Value = if src.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(src).with_context(|| format!("selector is not JSON: {src}"))?
        };
        Ok(Selector::from_value(&value)?)
    } else {
        Ok(Selector::parse(src)?)
    }
}

fn lookup<'s>(registry: &ComponentRegistry<'s, MemoryStore>, id: &str) -> Result<&'s Component> {
    match registry.get_by_id(id) {
        Some(component) => Ok(component),
        None => bail!("unknown component: {id}"),
    }
}

fn run(
    registry: &ComponentRegistry<'_, MemoryStore>,
    cmd: Command,
    mode: QueryMode,
    json: bool,
) -> Result<Vec<ComponentId>> {
    let ids = match cmd {
        Command::First { selector } => registry
            .get_first(selector_arg(&selector, json)?, mode)?
            .ids(),
        Command::Down { id, selector } => registry
            .down_from_id(&id, selector_arg(&selector, json)?, mode)?
            .ids(),
        Command::Up { id, selector } => registry
            .up(&id, selector_arg(&selector, json)?, mode)?
            .ids(),
        Command::Parents { id } => registry.get_parent_ids(lookup(registry, &id)?)?,
        Command::Children { id } => registry
            .get_child_components(lookup(registry, &id)?)?
            .into_iter()
            .map(|c| c.id().clone())
            .collect(),
        Command::FindParent { ids } => registry.find_parent_component(&ids).into_iter().collect(),
        Command::Prefs { .. } => bail!("prefs is not a query"),
    };
    Ok(ids)
}
