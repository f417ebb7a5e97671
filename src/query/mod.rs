//! QueryLayer: read-only operations over committed store state (spec.md §4.6).
//!
//! Every operation here runs against the pool directly (no transaction) —
//! callers observe only committed rows and may run concurrently with an
//! in-flight `Index` call.

use crate::error::{CoreError, ErrorKind};
use crate::store::Pool;
use crate::types::{EdgeKind, FileId, SymbolId};
use serde::Serialize;
use sqlx::Row;

#[derive(Debug, Clone, Serialize)]
pub struct SymbolSummary {
    pub symbol_id: SymbolId,
    pub name: String,
    pub kind: String,
    pub signature: String,
    pub file_path: String,
    pub docstring: Option<String>,
    /// Generated semantic summary from the `summaries` table, distinct
    /// from `docstring` (spec.md §3).
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub symbol: SymbolSummary,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyResult {
    #[serde(flatten)]
    pub symbol: SymbolSummary,
    pub edge_kind: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub repo_id: Option<uuid::Uuid>,
    pub language: Option<String>,
    pub kinds: Vec<String>,
    pub limit: i64,
}

impl SearchFilters {
    pub fn with_limit(limit: i64) -> Self {
        Self {
            limit: limit.max(1),
            ..Default::default()
        }
    }
}

pub struct QueryLayer {
    pool: Pool,
}

fn row_to_summary(row: &sqlx::postgres::PgRow) -> Result<SymbolSummary, CoreError> {
    let symbol_id: uuid::Uuid = row.try_get("symbol_id").map_err(row_err)?;
    Ok(SymbolSummary {
        symbol_id: SymbolId::from(symbol_id),
        name: row.try_get("name").map_err(row_err)?,
        kind: row.try_get("kind").map_err(row_err)?,
        signature: row.try_get("signature").map_err(row_err)?,
        file_path: row.try_get("path").map_err(row_err)?,
        docstring: row.try_get("docstring").map_err(row_err)?,
        summary: row.try_get("summary").map_err(row_err)?,
    })
}

/// Joined onto every symbol-row query so `row_to_summary` can read a
/// `summary` column without each call site repeating the join.
const SUMMARY_JOIN: &str = "LEFT JOIN summaries sm ON sm.entity_id = s.symbol_id AND sm.entity_type = 'symbol'";

fn row_err(e: sqlx::Error) -> CoreError {
    CoreError::new(ErrorKind::Database, format!("malformed query row: {e}"))
}

fn db_err(e: sqlx::Error) -> CoreError {
    CoreError::new(ErrorKind::Database, e.to_string())
}

impl QueryLayer {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Top-`limit` symbols by cosine similarity to `query_vector`, subject
    /// to filters. Similarity is `1 - cosine_distance`; ties break by
    /// `symbol_id` lexicographic order (spec.md §4.6).
    pub async fn semantic_search(
        &self,
        query_vector: &pgvector::Vector,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, CoreError> {
        let limit = if filters.limit > 0 { filters.limit } else { 10 };

        let rows = sqlx::query(sqlx::AssertSqlSafe(format!(
            "SELECT s.symbol_id, s.name, s.kind, s.signature, s.docstring, sm.body AS summary, f.path, \
             1 - (v.embedding <=> $1) AS similarity \
             FROM vectors v \
             JOIN symbols s ON s.symbol_id = v.entity_id AND v.entity_type = 'symbol' \
             JOIN files f ON f.file_id = s.file_id \
             {SUMMARY_JOIN} \
             WHERE ($2::uuid IS NULL OR f.repo_id = $2) \
               AND ($3::text IS NULL OR f.language = $3) \
               AND ($4::text[] IS NULL OR s.kind = ANY($4)) \
             ORDER BY similarity DESC, s.symbol_id ASC \
             LIMIT $5"
        )))
        .bind(query_vector)
        .bind(filters.repo_id)
        .bind(&filters.language)
        .bind(if filters.kinds.is_empty() { None } else { Some(filters.kinds.clone()) })
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let similarity: f64 = row.try_get("similarity").map_err(row_err)?;
                Ok(SearchResult {
                    symbol: row_to_summary(row)?,
                    similarity,
                })
            })
            .collect()
    }

    /// Symbols `s` with a `CALLS` edge from `s` to `symbol_id`.
    pub async fn callers(&self, symbol_id: SymbolId) -> Result<Vec<SymbolSummary>, CoreError> {
        self.edge_neighbors(symbol_id, EdgeKind::Call, Direction::Incoming).await
    }

    /// Symbols `t` with a `CALLS` edge from `symbol_id` to `t`.
    pub async fn callees(&self, symbol_id: SymbolId) -> Result<Vec<SymbolSummary>, CoreError> {
        self.edge_neighbors(symbol_id, EdgeKind::Call, Direction::Outgoing).await
    }

    /// Symbols `t` reachable from `symbol_id` via an `IMPORTS`, `EXTENDS`,
    /// or `IMPLEMENTS` edge, each tagged with the edge kind that reached it.
    pub async fn dependencies(&self, symbol_id: SymbolId) -> Result<Vec<DependencyResult>, CoreError> {
        let rows = sqlx::query(sqlx::AssertSqlSafe(format!(
            "SELECT s.symbol_id, s.name, s.kind, s.signature, s.docstring, sm.body AS summary, f.path, e.kind AS edge_kind \
             FROM edges e \
             JOIN symbols s ON s.symbol_id = e.target_id \
             JOIN files f ON f.file_id = s.file_id \
             {SUMMARY_JOIN} \
             WHERE e.source_id = $1 AND e.kind IN ('import', 'extends', 'implements')"
        )))
        .bind(symbol_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let edge_kind: String = row.try_get("edge_kind").map_err(row_err)?;
                Ok(DependencyResult {
                    symbol: row_to_summary(row)?,
                    edge_kind,
                })
            })
            .collect()
    }

    /// All symbols in `file_id`, ordered by `start_line` ascending.
    pub async fn symbols_of(&self, file_id: FileId) -> Result<Vec<SymbolSummary>, CoreError> {
        let rows = sqlx::query(sqlx::AssertSqlSafe(format!(
            "SELECT s.symbol_id, s.name, s.kind, s.signature, s.docstring, sm.body AS summary, f.path \
             FROM symbols s JOIN files f ON f.file_id = s.file_id \
             {SUMMARY_JOIN} \
             WHERE s.file_id = $1 ORDER BY s.start_line ASC"
        )))
        .bind(file_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_summary).collect()
    }

    async fn edge_neighbors(&self, symbol_id: SymbolId, kind: EdgeKind, direction: Direction) -> Result<Vec<SymbolSummary>, CoreError> {
        let kind_str = kind.to_string();
        let query = match direction {
            Direction::Incoming => {
                format!(
                    "SELECT s.symbol_id, s.name, s.kind, s.signature, s.docstring, sm.body AS summary, f.path \
                     FROM edges e JOIN symbols s ON s.symbol_id = e.source_id \
                     JOIN files f ON f.file_id = s.file_id \
                     {SUMMARY_JOIN} \
                     WHERE e.target_id = $1 AND e.kind = $2"
                )
            }
            Direction::Outgoing => {
                format!(
                    "SELECT s.symbol_id, s.name, s.kind, s.signature, s.docstring, sm.body AS summary, f.path \
                     FROM edges e JOIN symbols s ON s.symbol_id = e.target_id \
                     JOIN files f ON f.file_id = s.file_id \
                     {SUMMARY_JOIN} \
                     WHERE e.source_id = $1 AND e.kind = $2"
                )
            }
        };
        let rows = sqlx::query(sqlx::AssertSqlSafe(query))
            .bind(symbol_id.as_uuid())
            .bind(kind_str)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_summary).collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Incoming,
    Outgoing,
}
