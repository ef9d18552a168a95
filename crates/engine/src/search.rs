//! Symbol search over the index's name index
//!
//! A name matches when it contains the pattern case-insensitively, or when
//! every pattern character appears in order (`USvc` finds `UserService`).

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use symbridge_core::{ElementKind, LanguageTag, SearchScope, SemanticElement, SemanticIndex};
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};

pub const DEFAULT_SEARCH_LIMIT: usize = 25;
pub const MAX_SEARCH_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_SEARCH_LIMIT,
            max_limit: MAX_SEARCH_LIMIT,
        }
    }
}

impl SearchLimits {
    /// Requested limit, defaulted when absent or zero and capped at the maximum.
    pub fn effective(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|limit| *limit > 0)
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
    }
}

/// Search options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub pattern: String,
    /// Also search library dependencies
    pub include_libraries: bool,
    /// Restrict to these languages (empty = all)
    pub languages: Vec<LanguageTag>,
    /// Restrict to these kinds (empty = all)
    pub kinds: Vec<ElementKind>,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    pub fn with_libraries(mut self, include_libraries: bool) -> Self {
        self.include_libraries = include_libraries;
        self
    }

    pub fn with_languages(mut self, languages: Vec<LanguageTag>) -> Self {
        self.languages = languages;
        self
    }

    pub fn with_kinds(mut self, kinds: Vec<ElementKind>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn scope(&self) -> SearchScope {
        SearchScope::from_include_libraries(self.include_libraries)
    }

    pub fn accepts_language(&self, language: &LanguageTag) -> bool {
        self.languages.is_empty() || self.languages.contains(language)
    }

    fn accepts(&self, element: &SemanticElement) -> bool {
        self.accepts_language(&element.language)
            && (self.kinds.is_empty() || self.kinds.contains(&element.kind))
    }
}

/// Type of match found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Case-insensitive equality
    Exact,
    /// Contiguous, case-insensitive
    Substring,
    /// Every pattern character in order
    CamelCase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    pub kind: ElementKind,
    pub language: LanguageTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub match_type: MatchType,
    /// Character positions in `name` that matched the pattern
    pub matched_indices: Vec<usize>,
    /// Edit distance between the lower-cased name and pattern
    pub distance: usize,
}

impl SymbolMatch {
    fn rank_order(&self, other: &Self) -> Ordering {
        let exact = |m: &Self| m.match_type != MatchType::Exact;
        exact(self)
            .cmp(&exact(other))
            .then(self.distance.cmp(&other.distance))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.file.cmp(&other.file))
            .then_with(|| self.line.cmp(&other.line))
    }
}

pub struct SymbolSearchEngine {
    matcher: SkimMatcherV2,
    limits: SearchLimits,
}

impl Default for SymbolSearchEngine {
    fn default() -> Self {
        Self::new(SearchLimits::default())
    }
}

impl SymbolSearchEngine {
    pub fn new(limits: SearchLimits) -> Self {
        Self {
            matcher: SkimMatcherV2::default().ignore_case(),
            limits,
        }
    }

    /// Ranked matches across every language the query accepts.
    pub fn search(
        &self,
        index: &dyn SemanticIndex,
        query: &SearchQuery,
    ) -> BridgeResult<Vec<SymbolMatch>> {
        self.search_in(index, query, None)
    }

    /// Ranked matches, optionally restricted to one language.
    pub fn search_in(
        &self,
        index: &dyn SemanticIndex,
        query: &SearchQuery,
        language: Option<&LanguageTag>,
    ) -> BridgeResult<Vec<SymbolMatch>> {
        if !index.is_index_ready() {
            return Err(BridgeError::IndexNotReady);
        }
        let pattern = query.pattern.trim();
        if pattern.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = index.symbol_candidates(query.scope())?;
        let total = candidates.len();
        let matches: Vec<SymbolMatch> = candidates
            .iter()
            .filter(|candidate| language.map_or(true, |tag| candidate.language == *tag))
            .filter(|candidate| query.accepts(candidate))
            .filter_map(|candidate| self.match_element(candidate, pattern))
            .collect();
        debug!(pattern, candidates = total, matched = matches.len(), "symbol search");

        Ok(self.rank(matches, query.limit))
    }

    /// Classify how `name` matches `pattern`, with the matched character positions.
    pub fn match_name(&self, name: &str, pattern: &str) -> Option<(MatchType, Vec<usize>)> {
        let name_lower = name.to_lowercase();
        let pattern_lower = pattern.to_lowercase();

        if name_lower == pattern_lower {
            return Some((MatchType::Exact, (0..name.chars().count()).collect()));
        }
        if let Some(position) = name_lower.find(&pattern_lower) {
            let start = name_lower[..position].chars().count();
            let length = pattern_lower.chars().count();
            return Some((MatchType::Substring, (start..start + length).collect()));
        }
        self.matcher
            .fuzzy_indices(name, pattern)
            .map(|(_, indices)| (MatchType::CamelCase, indices))
    }

    /// Sort, drop duplicate `(file, line, name)` entries and truncate to the limit.
    pub fn rank(&self, mut matches: Vec<SymbolMatch>, limit: Option<usize>) -> Vec<SymbolMatch> {
        matches.sort_by(SymbolMatch::rank_order);
        let mut seen = HashSet::new();
        matches.retain(|m| seen.insert((m.file.clone(), m.line, m.name.clone())));
        matches.truncate(self.limits.effective(limit));
        matches
    }

    fn match_element(&self, element: &SemanticElement, pattern: &str) -> Option<SymbolMatch> {
        let (match_type, matched_indices) = self.match_name(&element.name, pattern)?;
        Some(SymbolMatch {
            name: element.name.clone(),
            qualified_name: element.qualified_name.clone(),
            kind: element.kind,
            language: element.language.clone(),
            file: element.file().map(str::to_string),
            line: element.line(),
            match_type,
            matched_indices,
            distance: levenshtein_distance(&element.name.to_lowercase(), &pattern.to_lowercase()),
        })
    }
}

/// Calculate Levenshtein distance between two strings
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1: Vec<char> = s1.chars().collect();
    let s2: Vec<char> = s2.chars().collect();

    let mut previous: Vec<usize> = (0..=s2.len()).collect();
    let mut current = vec![0; s2.len() + 1];

    for (i, c1) in s1.iter().enumerate() {
        current[0] = i + 1;
        for (j, c2) in s2.iter().enumerate() {
            let cost = usize::from(c1 != c2);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[s2.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::shapes_index;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("user", "user"), 0);
    }

    #[test]
    fn test_match_types() {
        let engine = SymbolSearchEngine::default();
        assert_eq!(
            engine.match_name("User", "user"),
            Some((MatchType::Exact, vec![0, 1, 2, 3]))
        );
        assert_eq!(
            engine.match_name("AbstractUser", "user"),
            Some((MatchType::Substring, vec![8, 9, 10, 11]))
        );
        let (match_type, indices) = engine.match_name("UserService", "USvc").unwrap();
        assert_eq!(match_type, MatchType::CamelCase);
        assert_eq!(indices.len(), 4);
        assert_eq!(indices[0], 0);
        assert!(engine.match_name("UserService", "xyz").is_none());
    }

    fn candidate(name: &str, line: u32) -> SymbolMatch {
        SymbolMatch {
            name: name.to_string(),
            qualified_name: None,
            kind: ElementKind::Class,
            language: LanguageTag::new("java"),
            file: Some("A.java".to_string()),
            line: Some(line),
            match_type: if name.eq_ignore_ascii_case("user") {
                MatchType::Exact
            } else {
                MatchType::Substring
            },
            matched_indices: Vec::new(),
            distance: levenshtein_distance(&name.to_lowercase(), "user"),
        }
    }

    #[test]
    fn test_ranking_puts_exact_first_then_distance() {
        let engine = SymbolSearchEngine::default();
        let ranked = engine.rank(
            vec![
                candidate("AbstractUser", 3),
                candidate("UserService", 2),
                candidate("Users", 4),
                candidate("User", 1),
            ],
            None,
        );
        let names: Vec<&str> = ranked.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Users", "UserService", "AbstractUser"]);
    }

    #[test]
    fn test_dedup_before_truncation() {
        let engine = SymbolSearchEngine::default();
        let ranked = engine.rank(
            vec![candidate("User", 1), candidate("User", 1), candidate("Users", 2)],
            Some(2),
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[1].name, "Users");
    }

    #[test]
    fn test_limits() {
        let limits = SearchLimits::default();
        assert_eq!(limits.effective(None), 25);
        assert_eq!(limits.effective(Some(0)), 25);
        assert_eq!(limits.effective(Some(500)), 100);
    }

    #[test]
    fn test_search_filters_by_kind_and_language() {
        let index = shapes_index();
        let engine = SymbolSearchEngine::default();

        let query = SearchQuery::new("square").with_kinds(vec![ElementKind::Class]);
        let matches = engine.search(&index, &query).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].language.as_str(), "java");

        let go = SearchQuery::new("square").with_languages(vec![LanguageTag::new("go")]);
        let matches = engine.search(&index, &go).unwrap();
        assert_eq!(matches[0].name, "Square");
        assert_eq!(matches[0].kind, ElementKind::Struct);
    }

    #[test]
    fn test_search_not_ready() {
        let index = shapes_index();
        index.set_ready(false);
        let result = SymbolSearchEngine::default().search(&index, &SearchQuery::new("a"));
        assert_eq!(result, Err(BridgeError::IndexNotReady));
    }
}
