use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

use super::conventions::{indentation_of, is_balanced};
use super::{MutationCoordinator, MutationOutcome};
use crate::error::{MutationError, MutationResult};
use crate::index::MutationTransaction;
use crate::model::SemanticElement;
use crate::traversal::CALLABLE_KINDS;

/// Selection in a file: 1-based lines, 1-based columns, end column exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl TextRange {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Whole lines `start..=end`.
    pub fn lines(start_line: u32, end_line: u32) -> Self {
        Self::new(start_line, 1, end_line, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractKind {
    Variable,
    Method,
}

/// A text edit expressed in the coordinates Phase 1 observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedEdit {
    ReplaceText {
        line: u32,
        start_column: u32,
        end_column: u32,
        text: String,
    },
    ReplaceLines {
        start_line: u32,
        end_line: u32,
        lines: Vec<String>,
    },
    InsertLines {
        after_line: u32,
        lines: Vec<String>,
    },
}

impl PlannedEdit {
    fn apply(&self, file: &str, tx: &mut dyn MutationTransaction) -> crate::error::IndexResult<()> {
        match self {
            PlannedEdit::ReplaceText {
                line,
                start_column,
                end_column,
                text,
            } => tx.replace_text(file, *line, *start_column, *end_column, text),
            PlannedEdit::ReplaceLines {
                start_line,
                end_line,
                lines,
            } => tx.replace_lines(file, *start_line, *end_line, lines),
            PlannedEdit::InsertLines { after_line, lines } => {
                tx.insert_lines(file, *after_line, lines)
            }
        }
    }
}

/// Validated extraction, ready for Phase 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractPlan {
    pub kind: ExtractKind,
    pub name: String,
    pub file: String,
    pub edits: Vec<PlannedEdit>,
    stamp: u64,
}

impl ExtractPlan {
    pub fn stamp(&self) -> u64 {
        self.stamp
    }
}

fn invalid_range(reason: impl Into<String>) -> MutationError {
    MutationError::InvalidRange(reason.into())
}

impl MutationCoordinator<'_> {
    /// Phase 1 of extract-variable: a single-line expression inside a statement.
    pub fn prepare_extract_variable(
        &self,
        file: &str,
        range: TextRange,
        name: &str,
    ) -> MutationResult<ExtractPlan> {
        self.ensure_ready()?;
        self.validate_fresh_name(name)?;
        if range.start_line != range.end_line {
            return Err(invalid_range("the expression must be on a single line"));
        }
        if range.start_column == 0 || range.start_column >= range.end_column {
            return Err(invalid_range("the selection is empty"));
        }

        let lines = self.file_lines(file)?;
        let line_text = line_at(&lines, range.start_line)?;
        let chars: Vec<char> = line_text.chars().collect();
        let (start, end) = (
            (range.start_column - 1) as usize,
            (range.end_column - 1) as usize,
        );
        if end > chars.len() {
            return Err(invalid_range(format!(
                "column {} is past the end of line {}",
                range.end_column, range.start_line
            )));
        }

        let selected: String = chars[start..end].iter().collect();
        let expression = selected.trim();
        if !is_complete_expression(expression) {
            return Err(invalid_range(format!(
                "'{selected}' is not a complete expression"
            )));
        }
        let leading = selected.len() - selected.trim_start().len();
        let trailing = selected.len() - selected.trim_end().len();
        let start_column = range.start_column + selected[..leading].chars().count() as u32;
        let end_column =
            range.end_column - selected[selected.len() - trailing..].chars().count() as u32;

        let statement = line_text.trim();
        if !self.conventions.is_statement_line(statement) {
            return Err(invalid_range("no containing statement found"));
        }
        let preceding = lines[..range.start_line.saturating_sub(1) as usize]
            .iter()
            .rev()
            .map(|text| text.trim())
            .find(|text| !text.is_empty());
        if preceding.is_some_and(|text| !self.conventions.is_statement_line(text)) {
            return Err(invalid_range(format!(
                "line {} continues the statement above it",
                range.start_line
            )));
        }
        let callable = self.enclosing_callable(file, range.start_line)?;
        if callable.line() == Some(range.start_line) {
            return Err(invalid_range("no containing statement found"));
        }
        if let Some(body) = callable.body {
            let scope = (body.start..=body.end)
                .filter_map(|n| n.checked_sub(1).and_then(|index| lines.get(index as usize)))
                .any(|text| contains_word(text, name));
            if scope {
                return Err(MutationError::InvalidName {
                    name: name.to_string(),
                    reason: format!("'{name}' is already used in {}", callable.name),
                });
            }
        }

        let declaration = format!(
            "{}{}",
            indentation_of(line_text),
            self.conventions.variable_declaration(name, expression)
        );
        Ok(ExtractPlan {
            kind: ExtractKind::Variable,
            name: name.to_string(),
            file: file.to_string(),
            edits: vec![
                PlannedEdit::InsertLines {
                    after_line: range.start_line - 1,
                    lines: vec![declaration],
                },
                PlannedEdit::ReplaceText {
                    line: range.start_line,
                    start_column,
                    end_column,
                    text: name.to_string(),
                },
            ],
            stamp: self.index.modification_stamp(),
        })
    }

    /// Phase 1 of extract-method: a contiguous run of whole statement lines inside a callable.
    pub fn prepare_extract_method(
        &self,
        file: &str,
        range: TextRange,
        name: &str,
    ) -> MutationResult<ExtractPlan> {
        self.ensure_ready()?;
        self.validate_fresh_name(name)?;
        if range.start_line == 0 || range.start_line > range.end_line {
            return Err(invalid_range("the line range is empty"));
        }

        let lines = self.file_lines(file)?;
        let block: Vec<&str> = (range.start_line..=range.end_line)
            .map(|n| line_at(&lines, n))
            .collect::<MutationResult<_>>()?;
        if block.iter().all(|line| line.trim().is_empty()) {
            return Err(invalid_range("the selection contains no statements"));
        }
        let incomplete = block
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .any(|line| !self.conventions.is_statement_line(line));
        if incomplete || !is_balanced(&block.join("\n")) {
            return Err(invalid_range(
                "the selection is not a sequence of complete statements",
            ));
        }

        let callable = self.enclosing_callable(file, range.start_line)?;
        let body = callable
            .body
            .filter(|body| body.contains(range.end_line))
            .ok_or_else(|| invalid_range("the selection spans more than one callable"))?;
        let declaration_line = callable.line().unwrap_or(body.start);
        if range.start_line <= declaration_line {
            return Err(invalid_range("no containing statement found"));
        }
        self.ensure_member_name_free(&callable, name)?;

        let member_indent = line_at(&lines, declaration_line)
            .map(indentation_of)
            .unwrap_or_default()
            .to_string();
        let body_indent = format!("{member_indent}{}", self.conventions.indent_unit());
        let reindented = reindent(&block, &body_indent);

        let mut method = vec![String::new()];
        method.extend(
            self.conventions
                .method_declaration(name, &reindented, &member_indent),
        );
        let call = format!(
            "{}{}",
            indentation_of(block.iter().find(|l| !l.trim().is_empty()).unwrap_or(&"")),
            self.conventions.method_call(name)
        );

        Ok(ExtractPlan {
            kind: ExtractKind::Method,
            name: name.to_string(),
            file: file.to_string(),
            edits: vec![
                PlannedEdit::ReplaceLines {
                    start_line: range.start_line,
                    end_line: range.end_line,
                    lines: vec![call],
                },
                PlannedEdit::InsertLines {
                    after_line: body.end,
                    lines: method,
                },
            ],
            stamp: self.index.modification_stamp(),
        })
    }

    /// Phase 2 of both extractions: every planned edit in one transaction.
    pub fn apply_extract(&self, plan: ExtractPlan) -> MutationResult<MutationOutcome> {
        self.commit(plan.stamp, |tx| {
            for edit in &plan.edits {
                edit.apply(&plan.file, tx)?;
            }
            Ok(())
        })?;

        let what = match plan.kind {
            ExtractKind::Variable => "variable",
            ExtractKind::Method => "method",
        };
        let message = format!("Extracted {what} '{}' in {}", plan.name, plan.file);
        info!("{message}");
        let files = BTreeSet::from([plan.file.clone()]);
        Ok(MutationOutcome::committed(&files, plan.edits.len(), message))
    }

    fn validate_fresh_name(&self, name: &str) -> MutationResult<()> {
        self.conventions
            .validate_identifier(name)
            .map_err(|reason| MutationError::InvalidName {
                name: name.to_string(),
                reason,
            })
    }

    fn file_lines(&self, file: &str) -> MutationResult<Vec<String>> {
        let text = self
            .index
            .file_text(file)?
            .ok_or_else(|| invalid_range(format!("unknown file {file}")))?;
        Ok(text.split('\n').map(str::to_string).collect())
    }

    fn enclosing_callable(&self, file: &str, line: u32) -> MutationResult<SemanticElement> {
        self.index
            .enclosing_element(file, line, CALLABLE_KINDS)?
            .ok_or_else(|| invalid_range("no containing statement found"))
    }

    fn ensure_member_name_free(
        &self,
        callable: &SemanticElement,
        name: &str,
    ) -> MutationResult<()> {
        let Some(owner_id) = &callable.container else {
            return Ok(());
        };
        let Some(owner) = self.index.element(owner_id)? else {
            return Ok(());
        };
        if self
            .index
            .members(&owner)?
            .iter()
            .any(|member| member.name == name)
        {
            return Err(MutationError::InvalidName {
                name: name.to_string(),
                reason: format!("{} already declares '{name}'", owner.name),
            });
        }
        Ok(())
    }
}

fn line_at(lines: &[String], line: u32) -> MutationResult<&str> {
    line.checked_sub(1)
        .and_then(|index| lines.get(index as usize))
        .map(String::as_str)
        .ok_or_else(|| invalid_range(format!("line {line} is outside the file")))
}

/// Balanced, and neither starting nor ending in the middle of a binary operation.
fn is_complete_expression(expression: &str) -> bool {
    const DANGLING_END: &[char] = &['+', '-', '*', '/', '%', '=', '&', '|', '^', '<', '>', ',', '.', '?', ':', ';'];
    const DANGLING_START: &[char] = &['*', '/', '%', '=', '&', '|', '^', '<', '>', ',', '.', '?', ':', ')', ';'];
    !expression.is_empty()
        && is_balanced(expression)
        && !expression.ends_with(DANGLING_END)
        && !expression.starts_with(DANGLING_START)
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|token| token == word)
}

/// Shifts a block so its least-indented line starts at `indent`.
fn reindent(block: &[&str], indent: &str) -> Vec<String> {
    let common = block
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indentation_of(line).chars().count())
        .min()
        .unwrap_or(0);
    block
        .iter()
        .map(|line| match line.char_indices().nth(common) {
            Some((offset, _)) if !line.trim().is_empty() => format!("{indent}{}", &line[offset..]),
            _ => String::new(),
        })
        .collect()
}
