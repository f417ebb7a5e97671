//! Structured error taxonomy for the parse/map/index pipeline.
//!
//! Every error in the system carries a `kind`, a human message, and a
//! `retryable` flag so that callers (the indexer's retry loop, the CLI
//! summary table, the HTTP layer) can treat errors uniformly without
//! matching on concrete types.

use crate::types::{FileId, SymbolId};
use std::fmt;
use thiserror::Error;

/// The design-level error kind (spec.md §7). Distinct from `std::error::Error`
/// impls — this is the classification used for retry/reporting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Filesystem,
    Parse,
    Mapping,
    Validation,
    Database,
    Graph,
    Embedding,
    Transaction,
    NotFound,
    Conflict,
    Timeout,
    Connection,
    Output,
}

impl ErrorKind {
    /// Default retryability for this kind, absent more specific information
    /// (e.g. a SQLSTATE class). The indexer may override this for database
    /// errors based on the actual SQLSTATE.
    pub fn default_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Database | ErrorKind::Graph | ErrorKind::Embedding | ErrorKind::Timeout | ErrorKind::Connection
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Filesystem => "filesystem",
            Self::Parse => "parse",
            Self::Mapping => "mapping",
            Self::Validation => "validation",
            Self::Database => "database",
            Self::Graph => "graph",
            Self::Embedding => "embedding",
            Self::Transaction => "transaction",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::Output => "output",
        };
        write!(f, "{s}")
    }
}

/// A single structured error, as recorded in `IndexResult.errors` and in a
/// parse envelope's `metadata.errors`.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("{kind}: {message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub retryable: bool,
    /// Line number, for parser errors localized to a position (spec.md §8).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl CoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let retryable = kind.default_retryable();
        Self {
            kind,
            message: message.into(),
            entity_id: None,
            file_path: None,
            retryable,
            line: None,
        }
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn symbol(kind: ErrorKind, message: impl Into<String>, id: SymbolId) -> Self {
        Self::new(kind, message).with_entity_id(id.to_string())
    }

    pub fn file(kind: ErrorKind, message: impl Into<String>, id: FileId) -> Self {
        Self::new(kind, message).with_entity_id(id.to_string())
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Transaction, "index run was cancelled").retryable(false)
    }
}

/// SQLSTATE-class classification used by the indexer's retry policy
/// (spec.md §4.5: classes `40` serialization/deadlock and `08` connection
/// are retryable database errors).
pub fn sqlstate_is_retryable(sqlstate: &str) -> bool {
    sqlstate.starts_with("40") || sqlstate.starts_with("08")
}

/// Collects errors across a single pipeline/index call and derives the
/// summary used to compute `IndexResult.status` and the CLI's grouped
/// error table.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorCollector {
    errors: Vec<CoreError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: CoreError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = CoreError>) {
        self.errors.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn count(&self) -> usize {
        self.errors.len()
    }

    pub fn count_retryable(&self) -> usize {
        self.errors.iter().filter(|e| e.retryable).count()
    }

    pub fn count_non_retryable(&self) -> usize {
        self.errors.iter().filter(|e| !e.retryable).count()
    }

    /// Group-by-kind summary, ordered for deterministic display.
    pub fn by_kind(&self) -> std::collections::BTreeMap<String, usize> {
        let mut map = std::collections::BTreeMap::new();
        for e in &self.errors {
            *map.entry(e.kind.to_string()).or_insert(0) += 1;
        }
        map
    }

    pub fn errors(&self) -> &[CoreError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<CoreError> {
        self.errors
    }

    pub fn first_n(&self, n: usize) -> &[CoreError] {
        &self.errors[..n.min(self.errors.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retryable_matches_spec_taxonomy() {
        assert!(ErrorKind::Database.default_retryable());
        assert!(ErrorKind::Graph.default_retryable());
        assert!(ErrorKind::Embedding.default_retryable());
        assert!(!ErrorKind::Validation.default_retryable());
        assert!(!ErrorKind::Transaction.default_retryable());
        assert!(!ErrorKind::NotFound.default_retryable());
        assert!(!ErrorKind::Conflict.default_retryable());
    }

    #[test]
    fn sqlstate_classes() {
        assert!(sqlstate_is_retryable("40001"));
        assert!(sqlstate_is_retryable("08006"));
        assert!(!sqlstate_is_retryable("23505"));
    }

    #[test]
    fn collector_summary() {
        let mut c = ErrorCollector::new();
        c.push(CoreError::new(ErrorKind::Parse, "bad token").with_line(42));
        c.push(CoreError::new(ErrorKind::Database, "deadlock"));
        c.push(CoreError::new(ErrorKind::Parse, "bad token 2"));

        assert_eq!(c.count(), 3);
        assert_eq!(c.count_retryable(), 1);
        assert_eq!(c.count_non_retryable(), 2);
        assert_eq!(c.by_kind().get("parse"), Some(&2));
    }
}
