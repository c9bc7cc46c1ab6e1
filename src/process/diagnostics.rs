use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::schema::ColumnType;

/// Something the normalizer absorbed instead of failing on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Issue {
    #[error("column `{column}` left as-is: row {row} value {value} is not a valid {target}: {reason}")]
    ColumnCoercion {
        column: String,
        target: ColumnType,
        row: usize,
        value: String,
        reason: String,
    },
    #[error("nested field `{field}` not present; nothing flattened")]
    NestedFieldMissing { field: String },
    #[error("nested field `{field}` holds {found} at row {row}, expected an object; nothing flattened")]
    NestedFieldNotObject {
        field: String,
        row: usize,
        found: &'static str,
    },
    #[error("selector `{selector}` is malformed: {reason}")]
    SelectorSyntax { selector: String, reason: String },
    #[error("selector `{selector}`: nothing at `{at}`")]
    SelectorMissing { selector: String, at: String },
    #[error("selector `{selector}`: expected {expected} at `{at}`, found {found}")]
    SelectorMismatch {
        selector: String,
        at: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("sort column `{column}` not present; rows left in source order")]
    SortColumnMissing { column: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Output table the issue belongs to, when known.
    pub table: Option<String>,
    pub issue: Issue,
}

impl Diagnostic {
    pub fn new(issue: Issue) -> Self {
        Self { table: None, issue }
    }

    pub fn in_table(mut self, table: &str) -> Self {
        self.table.get_or_insert_with(|| table.to_string());
        self
    }

    /// Send to the tracing side channel.
    pub fn log(&self) {
        match &self.table {
            Some(table) => warn!(table = %table, "{}", self.issue),
            None => warn!("{}", self.issue),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "[{}] {}", table, self.issue),
            None => write!(f, "{}", self.issue),
        }
    }
}

impl From<Issue> for Diagnostic {
    fn from(issue: Issue) -> Self {
        Diagnostic::new(issue)
    }
}

/// A result plus everything that was degraded on the way to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub output: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Normalized<T> {
    pub fn clean(output: T) -> Self {
        Self {
            output,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostics(output: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            output,
            diagnostics,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Normalized<U> {
        Normalized {
            output: f(self.output),
            diagnostics: self.diagnostics,
        }
    }

    /// Take the output, moving its diagnostics into `sink`.
    pub fn drain_into(self, sink: &mut Vec<Diagnostic>) -> T {
        sink.extend(self.diagnostics);
        self.output
    }
}
