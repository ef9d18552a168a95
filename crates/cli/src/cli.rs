use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symbridge_core::{
    CallDirection, CancelFlag, ElementKind, HierarchyDirection, LanguageTag, MemoryIndex,
    TextRange,
};
use symbridge_engine::{BridgeConfig, BridgeContext, BridgeResponse, SearchQuery, Target};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "symbridge")]
#[command(about = "Navigate and refactor code through a semantic index snapshot")]
#[command(version)]
pub struct Cli {
    /// Index snapshot (JSON)
    #[arg(short = 's', long = "snapshot", global = true, default_value = "symbridge-index.json")]
    pub snapshot: PathBuf,

    /// Configuration file (JSON)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Write the snapshot back after a successful refactoring
    #[arg(short = 'w', long = "write", global = true)]
    pub write: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show supertypes and subtypes [aliases: types, t]
    #[command(visible_alias = "types", visible_alias = "t")]
    TypeHierarchy {
        /// Location (file:line:column) or qualified name
        #[arg(value_name = "TARGET")]
        target: String,

        /// Only supertypes
        #[arg(long = "supertypes", conflicts_with = "subtypes")]
        supertypes: bool,

        /// Only subtypes
        #[arg(long = "subtypes", conflicts_with = "supertypes")]
        subtypes: bool,

        /// Maximum depth
        #[arg(short = 'l', long = "level")]
        max_depth: Option<usize>,
    },

    /// Concrete implementations or overriders [aliases: impl, i]
    #[command(visible_alias = "impl", visible_alias = "i")]
    Implementations {
        #[arg(value_name = "TARGET")]
        target: String,
    },

    /// Show call hierarchy [aliases: calls, c]
    #[command(visible_alias = "calls", visible_alias = "c")]
    CallHierarchy {
        #[arg(value_name = "TARGET")]
        target: String,

        /// Show incoming calls (who calls this)
        #[arg(short = 'i', long = "incoming", conflicts_with = "outgoing")]
        incoming: bool,

        /// Show outgoing calls (what this calls)
        #[arg(short = 'o', long = "outgoing", conflicts_with = "incoming")]
        outgoing: bool,

        /// Maximum depth
        #[arg(short = 'l', long = "level")]
        max_depth: Option<usize>,
    },

    /// Methods this one overrides, nearest first [aliases: supers]
    #[command(visible_alias = "supers")]
    SuperMethods {
        #[arg(value_name = "TARGET")]
        target: String,
    },

    /// Search symbols across languages [aliases: s, find]
    #[command(visible_alias = "s", visible_alias = "find")]
    Search {
        /// Search pattern
        query: String,

        /// Restrict to languages (repeatable)
        #[arg(short = 'L', long = "language")]
        languages: Vec<String>,

        /// Restrict to element kinds (repeatable)
        #[arg(short = 'k', long = "kind", value_parser = parse_kind)]
        kinds: Vec<ElementKind>,

        /// Include library symbols
        #[arg(long = "libraries")]
        include_libraries: bool,

        /// Maximum results
        #[arg(short = 'm', long = "max")]
        limit: Option<usize>,
    },

    /// Rename a declaration and every reference to it
    Rename {
        #[arg(value_name = "TARGET")]
        target: String,

        #[arg(value_name = "NEW_NAME")]
        new_name: String,
    },

    /// Delete a declaration when nothing uses it
    SafeDelete {
        #[arg(value_name = "TARGET")]
        target: String,

        /// Delete even when usages remain
        #[arg(short = 'f', long = "force")]
        force: bool,
    },

    /// Extract an expression into a local variable
    ExtractVariable {
        #[arg(value_name = "FILE")]
        file: String,

        /// Selection start (line:column)
        #[arg(long = "from")]
        from: String,

        /// Selection end (line:column, exclusive)
        #[arg(long = "to")]
        to: String,

        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Extract whole statements into a new method
    ExtractMethod {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(long = "from")]
        from: String,

        #[arg(long = "to")]
        to: String,

        #[arg(value_name = "NAME")]
        name: String,
    },

    /// List capabilities offered for a language
    Capabilities {
        #[arg(value_name = "LANGUAGE")]
        language: String,
    },
}

impl Commands {
    fn is_mutation(&self) -> bool {
        matches!(
            self,
            Commands::Rename { .. }
                | Commands::SafeDelete { .. }
                | Commands::ExtractVariable { .. }
                | Commands::ExtractMethod { .. }
        )
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = match &self.config {
            Some(path) => BridgeConfig::from_file(path)?,
            None => BridgeConfig::default(),
        };
        let index = Arc::new(load_snapshot(&self.snapshot)?);
        let context = BridgeContext::new(index.clone(), config);
        info!(
            snapshot = %self.snapshot.display(),
            languages = ?context.registry().languages(),
            "context ready"
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start runtime")?;
        let response = runtime.block_on(execute(&context, &self.command, &CancelFlag::new()))?;

        println!("{}", response.to_json_pretty()?);

        if self.write && self.command.is_mutation() && response.is_ok() {
            let json = index.to_json()?;
            std::fs::write(&self.snapshot, json)
                .with_context(|| format!("failed to write {}", self.snapshot.display()))?;
            debug!(snapshot = %self.snapshot.display(), "snapshot written");
        }

        Ok(())
    }
}

/// Runs one command against a context and wraps the outcome.
///
/// Request failures land in the response; only malformed arguments are
/// returned as errors.
pub async fn execute(
    context: &BridgeContext,
    command: &Commands,
    cancel: &CancelFlag,
) -> Result<BridgeResponse> {
    let response = match command {
        Commands::TypeHierarchy {
            target,
            supertypes,
            subtypes,
            max_depth,
        } => {
            let direction = match (supertypes, subtypes) {
                (true, _) => HierarchyDirection::Supertypes,
                (_, true) => HierarchyDirection::Subtypes,
                _ => HierarchyDirection::Both,
            };
            BridgeResponse::from_result(context.type_hierarchy(
                &parse_target(target),
                direction,
                *max_depth,
                cancel,
            ))
        }
        Commands::Implementations { target } => {
            BridgeResponse::from_result(context.implementations(&parse_target(target), cancel))
        }
        Commands::CallHierarchy {
            target,
            incoming,
            outgoing,
            max_depth,
        } => {
            let direction = match (incoming, outgoing) {
                (true, _) => CallDirection::Callers,
                (_, true) => CallDirection::Callees,
                _ => CallDirection::Both,
            };
            BridgeResponse::from_result(context.call_hierarchy(
                &parse_target(target),
                direction,
                *max_depth,
                cancel,
            ))
        }
        Commands::SuperMethods { target } => {
            BridgeResponse::from_result(context.super_methods(&parse_target(target), cancel))
        }
        Commands::Search {
            query,
            languages,
            kinds,
            include_libraries,
            limit,
        } => {
            let mut search = SearchQuery::new(query.as_str())
                .with_libraries(*include_libraries)
                .with_languages(languages.iter().map(LanguageTag::new).collect())
                .with_kinds(kinds.clone());
            if let Some(limit) = limit {
                search = search.with_limit(*limit);
            }
            BridgeResponse::from_result(context.search(&search, cancel))
        }
        Commands::Rename { target, new_name } => BridgeResponse::from_result(
            context
                .rename(&parse_target(target), new_name, cancel)
                .await,
        ),
        Commands::SafeDelete { target, force } => BridgeResponse::from_safe_delete(
            context
                .safe_delete(&parse_target(target), *force, cancel)
                .await,
        ),
        Commands::ExtractVariable {
            file,
            from,
            to,
            name,
        } => {
            let range = parse_range(from, to)?;
            BridgeResponse::from_result(context.extract_variable(file, range, name, cancel).await)
        }
        Commands::ExtractMethod {
            file,
            from,
            to,
            name,
        } => {
            let range = parse_range(from, to)?;
            BridgeResponse::from_result(context.extract_method(file, range, name, cancel).await)
        }
        Commands::Capabilities { language } => {
            BridgeResponse::ok(&context.capabilities(&LanguageTag::new(language)))
        }
    };
    Ok(response)
}

pub fn load_snapshot(path: &Path) -> Result<MemoryIndex> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    MemoryIndex::from_json(&json)
        .with_context(|| format!("invalid snapshot {}", path.display()))
}

/// `file:line:column` becomes a position; anything else is a qualified name.
pub fn parse_target(target: &str) -> Target {
    let mut parts = target.rsplitn(3, ':');
    if let (Some(column), Some(line), Some(file)) = (parts.next(), parts.next(), parts.next()) {
        if let (Ok(line), Ok(column)) = (line.parse(), column.parse()) {
            if !file.is_empty() {
                return Target::position(file, line, column);
            }
        }
    }
    Target::qualified(target)
}

fn parse_point(point: &str) -> Result<(u32, u32)> {
    let Some((line, column)) = point.split_once(':') else {
        bail!("expected line:column, got '{point}'");
    };
    let line = line
        .parse()
        .with_context(|| format!("invalid line in '{point}'"))?;
    let column = column
        .parse()
        .with_context(|| format!("invalid column in '{point}'"))?;
    Ok((line, column))
}

fn parse_range(from: &str, to: &str) -> Result<TextRange> {
    let (start_line, start_column) = parse_point(from)?;
    let (end_line, end_column) = parse_point(to)?;
    Ok(TextRange::new(start_line, start_column, end_line, end_column))
}

fn parse_kind(kind: &str) -> Result<ElementKind, String> {
    serde_json::from_value(Value::String(kind.replace('-', "_").to_lowercase()))
        .map_err(|_| format!("unknown element kind '{kind}'"))
}
