//! Application context
//!
//! Owns the index handle, the handler registry and the configuration.
//! Navigation runs on the caller's thread. Each refactoring phase runs on its
//! own blocking task, and only Phase 2 takes the index's writer side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use symbridge_core::{
    CallDirection, CallHierarchy, CancelFlag, HierarchyDirection, HierarchyNode, LanguageTag,
    MutationCoordinator, MutationOutcome, MutationResult, RefactoringConventions,
    SafeDeleteOutcome, SemanticElement, SemanticIndex, TextRange, TypeHierarchy,
};
use tracing::debug;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::handlers::{Capability, IndexLanguages, RequestContext};
use crate::registry::HandlerRegistry;
use crate::search::{SearchQuery, SymbolMatch, SymbolSearchEngine};

/// What a request points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Target {
    Position { file: String, line: u32, column: u32 },
    QualifiedName { name: String },
}

impl Target {
    pub fn position(file: impl Into<String>, line: u32, column: u32) -> Self {
        Target::Position {
            file: file.into(),
            line,
            column,
        }
    }

    pub fn qualified(name: impl Into<String>) -> Self {
        Target::QualifiedName { name: name.into() }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Position { file, line, column } => write!(f, "{file}:{line}:{column}"),
            Target::QualifiedName { name } => f.write_str(name),
        }
    }
}

pub struct BridgeContext {
    index: Arc<dyn SemanticIndex>,
    registry: Arc<HandlerRegistry>,
    config: BridgeConfig,
}

impl BridgeContext {
    /// Context with the default handlers for every language the index supports
    pub fn new(index: Arc<dyn SemanticIndex>, config: BridgeConfig) -> Self {
        let registry =
            HandlerRegistry::with_default_handlers(&IndexLanguages::new(index.as_ref()), &config);
        Self::with_registry(index, registry, config)
    }

    pub fn with_registry(
        index: Arc<dyn SemanticIndex>,
        registry: HandlerRegistry,
        config: BridgeConfig,
    ) -> Self {
        Self {
            index,
            registry: Arc::new(registry),
            config,
        }
    }

    pub fn index(&self) -> &Arc<dyn SemanticIndex> {
        &self.index
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn request(&self, cancel: &CancelFlag) -> RequestContext<'_> {
        RequestContext::new(self.index.as_ref())
            .with_limits(self.config.traversal)
            .with_search_limits(self.config.search)
            .with_cancel(cancel.clone())
    }

    fn ensure_ready(&self) -> BridgeResult<()> {
        if self.index.is_index_ready() {
            Ok(())
        } else {
            Err(BridgeError::IndexNotReady)
        }
    }

    /// Element a target points at; a usage element when it points at an occurrence.
    pub fn resolve(&self, target: &Target) -> BridgeResult<SemanticElement> {
        self.ensure_ready()?;
        match target {
            Target::Position { file, line, column } => self
                .index
                .resolve_at(file, *line, *column)?
                .ok_or_else(|| BridgeError::NoElementAtPosition {
                    file: file.clone(),
                    line: *line,
                    column: *column,
                }),
            Target::QualifiedName { name } => self
                .index
                .find_by_qualified_name(name)?
                .ok_or_else(|| BridgeError::SymbolNotFound(name.clone())),
        }
    }

    pub fn type_hierarchy(
        &self,
        target: &Target,
        direction: HierarchyDirection,
        max_depth: Option<usize>,
        cancel: &CancelFlag,
    ) -> BridgeResult<Option<TypeHierarchy>> {
        let element = self.resolve(target)?;
        let handler = self.registry.type_hierarchy_handler(&element)?;
        handler.type_hierarchy(&self.request(cancel), &element, direction, max_depth)
    }

    pub fn implementations(
        &self,
        target: &Target,
        cancel: &CancelFlag,
    ) -> BridgeResult<Option<Vec<HierarchyNode>>> {
        let element = self.resolve(target)?;
        let handler = self.registry.implementations_handler(&element)?;
        handler.implementations(&self.request(cancel), &element)
    }

    pub fn call_hierarchy(
        &self,
        target: &Target,
        direction: CallDirection,
        max_depth: Option<usize>,
        cancel: &CancelFlag,
    ) -> BridgeResult<Option<CallHierarchy>> {
        let element = self.resolve(target)?;
        let handler = self.registry.call_hierarchy_handler(&element)?;
        handler.call_hierarchy(&self.request(cancel), &element, direction, max_depth)
    }

    pub fn super_methods(
        &self,
        target: &Target,
        cancel: &CancelFlag,
    ) -> BridgeResult<Option<Vec<HierarchyNode>>> {
        let element = self.resolve(target)?;
        let handler = self.registry.super_methods_handler(&element)?;
        handler.super_methods(&self.request(cancel), &element)
    }

    /// Matches merged across every available search handler, ranked together.
    pub fn search(&self, query: &SearchQuery, cancel: &CancelFlag) -> BridgeResult<Vec<SymbolMatch>> {
        self.ensure_ready()?;
        let ctx = self.request(cancel);
        let mut matches = Vec::new();
        for handler in self.registry.symbol_search_handlers() {
            if !query.accepts_language(handler.language()) {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(BridgeError::Cancelled);
            }
            matches.extend(handler.search_symbols(&ctx, query)?);
        }
        Ok(SymbolSearchEngine::new(self.config.search).rank(matches, query.limit))
    }

    /// Capabilities offered for a language; empty when its support is absent.
    pub fn capabilities(&self, language: &LanguageTag) -> Vec<Capability> {
        self.registry.capabilities_for(language)
    }

    pub async fn rename(
        &self,
        target: &Target,
        new_name: &str,
        cancel: &CancelFlag,
    ) -> BridgeResult<MutationOutcome> {
        let element = self.resolve_declaration(target, cancel)?;
        let conventions = self.registry.require_conventions(&element.language)?;
        let new_name = new_name.to_string();

        let change_set = self
            .on_blocking_task(conventions.clone(), cancel, move |coordinator| {
                coordinator.prepare_rename(&element, &new_name)
            })
            .await?;
        debug!(
            targets = change_set.target_elements().len(),
            references = change_set.reference_count(),
            "rename prepared"
        );
        self.on_blocking_task(conventions, cancel, move |coordinator| {
            coordinator.apply_rename(change_set)
        })
        .await
    }

    /// Deletes the element when it is unused or `force` is set; reports its usages otherwise.
    pub async fn safe_delete(
        &self,
        target: &Target,
        force: bool,
        cancel: &CancelFlag,
    ) -> BridgeResult<SafeDeleteOutcome> {
        let element = self.resolve_declaration(target, cancel)?;
        let conventions = self.registry.require_conventions(&element.language)?;

        let plan = self
            .on_blocking_task(conventions.clone(), cancel, move |coordinator| {
                coordinator.prepare_safe_delete(&element)
            })
            .await?;
        if !plan.usages.is_empty() && !force {
            return Ok(SafeDeleteOutcome::Blocked(plan.usage_report()));
        }
        self.on_blocking_task(conventions, cancel, move |coordinator| {
            coordinator.safe_delete(plan, force)
        })
        .await
    }

    pub async fn extract_variable(
        &self,
        file: &str,
        range: TextRange,
        name: &str,
        cancel: &CancelFlag,
    ) -> BridgeResult<MutationOutcome> {
        let conventions = self.conventions_at(file, range.start_line)?;
        let (file, name) = (file.to_string(), name.to_string());

        let plan = self
            .on_blocking_task(conventions.clone(), cancel, move |coordinator| {
                coordinator.prepare_extract_variable(&file, range, &name)
            })
            .await?;
        self.on_blocking_task(conventions, cancel, move |coordinator| {
            coordinator.apply_extract(plan)
        })
        .await
    }

    pub async fn extract_method(
        &self,
        file: &str,
        range: TextRange,
        name: &str,
        cancel: &CancelFlag,
    ) -> BridgeResult<MutationOutcome> {
        let conventions = self.conventions_at(file, range.start_line)?;
        let (file, name) = (file.to_string(), name.to_string());

        let plan = self
            .on_blocking_task(conventions.clone(), cancel, move |coordinator| {
                coordinator.prepare_extract_method(&file, range, &name)
            })
            .await?;
        self.on_blocking_task(conventions, cancel, move |coordinator| {
            coordinator.apply_extract(plan)
        })
        .await
    }

    fn resolve_declaration(
        &self,
        target: &Target,
        cancel: &CancelFlag,
    ) -> BridgeResult<SemanticElement> {
        let element = self.resolve(target)?;
        self.request(cancel).resolve_declaration(&element)
    }

    /// Conventions of the language of the innermost declaration around a line.
    fn conventions_at(
        &self,
        file: &str,
        line: u32,
    ) -> BridgeResult<Arc<dyn RefactoringConventions>> {
        self.ensure_ready()?;
        let element = self
            .index
            .enclosing_element(file, line, &[])?
            .ok_or_else(|| {
                BridgeError::InvalidRange(format!("{file}:{line} is outside any declaration"))
            })?;
        Ok(self.registry.require_conventions(&element.language)?)
    }

    /// Runs one mutation phase on a blocking task with its own coordinator.
    async fn on_blocking_task<T, F>(
        &self,
        conventions: Arc<dyn RefactoringConventions>,
        cancel: &CancelFlag,
        phase: F,
    ) -> BridgeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&MutationCoordinator<'_>) -> MutationResult<T> + Send + 'static,
    {
        let index = Arc::clone(&self.index);
        let limits = self.config.traversal;
        let cancel = cancel.clone();
        let result = tokio::task::spawn_blocking(move || {
            let coordinator = MutationCoordinator::new(index.as_ref(), conventions.as_ref())
                .with_cancel(cancel)
                .with_limits(limits);
            phase(&coordinator)
        })
        .await?;
        Ok(result?)
    }
}
