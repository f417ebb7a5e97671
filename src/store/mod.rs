//! PostgreSQL + pgvector store (spec.md §4.6).
//!
//! Writes are batched with `UNNEST`-based multi-row `INSERT ... ON
//! CONFLICT` statements so a whole batch upserts in one round trip. The
//! property-graph overlay (`graph_vertices`/`graph_edges`) is written in
//! the same transaction as the relational rows it projects.

use crate::config::DbConfig;
use crate::error::{CoreError, ErrorKind};
use crate::mapper::{MappedAstNode, MappedEdge, MappedFile, MappedSymbol};
use crate::types::{EdgeId, FileId, NodeId, RepoId, SymbolId, EXTERNAL_FILE_ID, EXTERNAL_FILE_PATH};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::collections::HashSet;
use uuid::Uuid;

pub type Pool = PgPool;

pub async fn connect(db: &DbConfig) -> Result<Pool, CoreError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(&db.connection_string())
        .await
        .map_err(|e| CoreError::new(ErrorKind::Connection, format!("failed to connect to postgres: {e}")))
}

fn db_err(e: sqlx::Error) -> CoreError {
    let sqlstate = e.as_database_error().and_then(|d| d.code()).map(|c| c.to_string());
    let retryable = sqlstate.as_deref().map(crate::error::sqlstate_is_retryable).unwrap_or(false);
    CoreError::new(ErrorKind::Database, e.to_string()).retryable(retryable)
}

/// A vector row pending write, produced by the indexer's embedding step.
pub struct VectorRow {
    pub vector_id: Uuid,
    pub entity_id: Uuid,
    pub entity_type: String,
    pub chunk_index: i32,
    pub embedding: pgvector::Vector,
    pub model: String,
}

#[derive(Clone)]
pub struct Store {
    pool: Pool,
}

impl Store {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::new(ErrorKind::Database, format!("migration failed: {e}")))
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, CoreError> {
        self.pool.begin().await.map_err(db_err)
    }

    /// Upserts the repository row, locking it `FOR UPDATE` so concurrent
    /// `Index` calls for the same name serialize (spec.md §5).
    pub async fn upsert_repository(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
        url: Option<&str>,
        branch: Option<&str>,
        commit_hash: Option<&str>,
    ) -> Result<RepoId, CoreError> {
        let existing: Option<Uuid> = sqlx::query_scalar("SELECT repo_id FROM repositories WHERE name = $1 FOR UPDATE")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?;

        let repo_id = match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE repositories SET url = COALESCE($2, url), branch = COALESCE($3, branch), \
                     commit_hash = COALESCE($4, commit_hash), updated_at = now() WHERE repo_id = $1",
                )
                .bind(id)
                .bind(url)
                .bind(branch)
                .bind(commit_hash)
                .execute(&mut **tx)
                .await
                .map_err(db_err)?;
                id
            }
            None => {
                let id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO repositories (repo_id, name, url, branch, commit_hash) VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(id)
                .bind(name)
                .bind(url)
                .bind(branch)
                .bind(commit_hash)
                .execute(&mut **tx)
                .await
                .map_err(db_err)?;
                id
            }
        };
        Ok(RepoId::from(repo_id))
    }

    /// Idempotently ensures the reserved external-module sentinel file
    /// exists for this repository (spec.md §4.5 step 3). A concurrent
    /// creator racing on the same id is treated as success.
    pub async fn ensure_external_sentinel_file(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        repo_id: RepoId,
    ) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO files (file_id, repo_id, path, language, size, checksum) \
             VALUES ($1, $2, $3, 'external', 0, 'external') \
             ON CONFLICT (repo_id, path) DO NOTHING",
        )
        .bind(EXTERNAL_FILE_ID.as_uuid())
        .bind(repo_id.as_uuid())
        .bind(EXTERNAL_FILE_PATH)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn write_external_symbols(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        symbols: &[MappedSymbol],
    ) -> Result<u64, CoreError> {
        self.insert_symbols_batch(tx, symbols).await
    }

    /// Returns the stored checksum for `(repo_id, path)`, if the file has
    /// been indexed before.
    pub async fn existing_checksum(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        repo_id: RepoId,
        path: &str,
    ) -> Result<Option<String>, CoreError> {
        sqlx::query_scalar("SELECT checksum FROM files WHERE repo_id = $1 AND path = $2")
            .bind(repo_id.as_uuid())
            .bind(path)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)
    }

    pub async fn upsert_file(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        repo_id: RepoId,
        file: &MappedFile,
    ) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO files (file_id, repo_id, path, language, size, checksum, indexed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now()) \
             ON CONFLICT (repo_id, path) DO UPDATE SET \
             file_id = EXCLUDED.file_id, language = EXCLUDED.language, size = EXCLUDED.size, \
             checksum = EXCLUDED.checksum, indexed_at = now()",
        )
        .bind(file.id.as_uuid())
        .bind(repo_id.as_uuid())
        .bind(&file.path)
        .bind(file.language.as_str())
        .bind(file.size as i64)
        .bind(&file.checksum)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Deletes existing symbols (cascading to AST nodes and edges) for a
    /// file being re-indexed (spec.md §4.5 step 6).
    pub async fn delete_symbols_for_file(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        file_id: FileId,
    ) -> Result<(), CoreError> {
        sqlx::query(
            "DELETE FROM summaries WHERE entity_type = 'symbol' \
             AND entity_id IN (SELECT symbol_id FROM symbols WHERE file_id = $1)",
        )
        .bind(file_id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        sqlx::query("DELETE FROM symbols WHERE file_id = $1")
            .bind(file_id.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM ast_nodes WHERE file_id = $1")
            .bind(file_id.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn insert_symbols_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        symbols: &[MappedSymbol],
    ) -> Result<u64, CoreError> {
        if symbols.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = symbols.iter().map(|s| s.id.as_uuid()).collect();
        let file_ids: Vec<Uuid> = symbols.iter().map(|s| s.file_id.as_uuid()).collect();
        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        let kinds: Vec<String> = symbols.iter().map(|s| s.kind.to_string()).collect();
        let signatures: Vec<&str> = symbols.iter().map(|s| s.signature.as_str()).collect();
        let start_lines: Vec<i32> = symbols.iter().map(|s| s.start_line as i32).collect();
        let end_lines: Vec<i32> = symbols.iter().map(|s| s.end_line as i32).collect();
        let start_bytes: Vec<i32> = symbols.iter().map(|s| s.start_byte as i32).collect();
        let end_bytes: Vec<i32> = symbols.iter().map(|s| s.end_byte as i32).collect();
        let docstrings: Vec<Option<&str>> = symbols.iter().map(|s| s.docstring.as_deref()).collect();

        let result = sqlx::query(
            "INSERT INTO symbols (symbol_id, file_id, name, kind, signature, start_line, end_line, start_byte, end_byte, docstring) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::text[], $4::text[], $5::text[], $6::int[], $7::int[], $8::int[], $9::int[], $10::text[]) \
             ON CONFLICT (file_id, name, start_line, start_byte) DO UPDATE SET \
             symbol_id = EXCLUDED.symbol_id, kind = EXCLUDED.kind, signature = EXCLUDED.signature, \
             end_line = EXCLUDED.end_line, end_byte = EXCLUDED.end_byte, docstring = EXCLUDED.docstring",
        )
        .bind(ids)
        .bind(file_ids)
        .bind(names)
        .bind(kinds)
        .bind(signatures)
        .bind(start_lines)
        .bind(end_lines)
        .bind(start_bytes)
        .bind(end_bytes)
        .bind(docstrings)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

        self.insert_summaries_batch(tx, symbols).await?;

        Ok(result.rows_affected())
    }

    /// Upserts the `summaries` table row for each symbol carrying a
    /// generated semantic summary (spec.md §3, §4.6) — distinct from the
    /// `docstring` column written above.
    async fn insert_summaries_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        symbols: &[MappedSymbol],
    ) -> Result<(), CoreError> {
        let with_summary: Vec<&MappedSymbol> = symbols.iter().filter(|s| s.summary.is_some()).collect();
        if with_summary.is_empty() {
            return Ok(());
        }
        let summary_ids: Vec<Uuid> = with_summary.iter().map(|_| Uuid::new_v4()).collect();
        let entity_ids: Vec<Uuid> = with_summary.iter().map(|s| s.id.as_uuid()).collect();
        let entity_types: Vec<&str> = with_summary.iter().map(|_| "symbol").collect();
        let bodies: Vec<&str> = with_summary.iter().map(|s| s.summary.as_deref().unwrap_or_default()).collect();

        sqlx::query(
            "INSERT INTO summaries (summary_id, entity_id, entity_type, body) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::text[], $4::text[])",
        )
        .bind(summary_ids)
        .bind(entity_ids)
        .bind(entity_types)
        .bind(bodies)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    pub async fn insert_ast_nodes_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        nodes: &[MappedAstNode],
    ) -> Result<u64, CoreError> {
        if nodes.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = nodes.iter().map(|n| n.id.as_uuid()).collect();
        let parent_ids: Vec<Option<Uuid>> = nodes.iter().map(|n| n.parent_id.map(|p| p.as_uuid())).collect();
        let file_ids: Vec<Uuid> = nodes.iter().map(|n| n.file_id.as_uuid()).collect();
        let node_types: Vec<&str> = nodes.iter().map(|n| n.node_type.as_str()).collect();
        let start_lines: Vec<i32> = nodes.iter().map(|n| n.start_line as i32).collect();
        let end_lines: Vec<i32> = nodes.iter().map(|n| n.end_line as i32).collect();
        let start_bytes: Vec<i32> = nodes.iter().map(|n| n.start_byte as i32).collect();
        let end_bytes: Vec<i32> = nodes.iter().map(|n| n.end_byte as i32).collect();
        let texts: Vec<Option<&str>> = nodes.iter().map(|n| n.text.as_deref()).collect();

        let result = sqlx::query(
            "INSERT INTO ast_nodes (node_id, parent_id, file_id, node_type, start_line, end_line, start_byte, end_byte, text) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[], $4::text[], $5::int[], $6::int[], $7::int[], $8::int[], $9::text[])",
        )
        .bind(ids)
        .bind(parent_ids)
        .bind(file_ids)
        .bind(node_types)
        .bind(start_lines)
        .bind(end_lines)
        .bind(start_bytes)
        .bind(end_bytes)
        .bind(texts)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected())
    }

    /// Returns the subset of `ids` that exist as symbol rows, used to
    /// decide which edges can be written (spec.md §4.5 step 7).
    pub async fn existing_symbol_ids(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ids: &[SymbolId],
    ) -> Result<HashSet<SymbolId>, CoreError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|i| i.as_uuid()).collect();
        let rows: Vec<Uuid> = sqlx::query_scalar("SELECT symbol_id FROM symbols WHERE symbol_id = ANY($1)")
            .bind(uuids)
            .fetch_all(&mut **tx)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(SymbolId::from).collect())
    }

    /// Writes resolvable edges plus the derived property-graph overlay in
    /// the same transaction. Returns the number of edges actually written.
    pub async fn insert_edges_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        edges: &[MappedEdge],
    ) -> Result<u64, CoreError> {
        if edges.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = edges.iter().map(|e| e.id.as_uuid()).collect();
        let source_ids: Vec<Uuid> = edges.iter().map(|e| e.source_id.as_uuid()).collect();
        let target_ids: Vec<Uuid> = edges.iter().map(|e| e.target_id.as_uuid()).collect();
        let kinds: Vec<String> = edges.iter().map(|e| e.kind.to_string()).collect();
        let source_files: Vec<Uuid> = edges.iter().map(|e| e.source_file.as_uuid()).collect();
        let target_modules: Vec<Option<&str>> = edges.iter().map(|e| e.target_module.as_deref()).collect();

        let result = sqlx::query(
            "INSERT INTO edges (edge_id, source_id, target_id, kind, source_file, target_module) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[], $4::text[], $5::uuid[], $6::text[]) \
             ON CONFLICT (edge_id) DO NOTHING",
        )
        .bind(ids)
        .bind(source_ids)
        .bind(target_ids)
        .bind(kinds)
        .bind(source_files)
        .bind(target_modules)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

        self.sync_graph_overlay(tx, edges).await?;
        Ok(result.rows_affected())
    }

    /// Projects symbols referenced by `edges` as graph vertices and the
    /// edges themselves as graph edges (spec.md §9, property-graph overlay).
    async fn sync_graph_overlay(&self, tx: &mut Transaction<'_, Postgres>, edges: &[MappedEdge]) -> Result<(), CoreError> {
        let mut vertex_ids = Vec::with_capacity(edges.len() * 2);
        for e in edges {
            vertex_ids.push(e.source_id.as_uuid());
            vertex_ids.push(e.target_id.as_uuid());
        }
        sqlx::query(
            "INSERT INTO graph_vertices (vertex_id, label) \
             SELECT s.symbol_id, \
                CASE s.kind \
                    WHEN 'function' THEN 'Function' WHEN 'class' THEN 'Class' \
                    WHEN 'interface' THEN 'Interface' WHEN 'variable' THEN 'Variable' \
                    WHEN 'external_module' THEN 'ExternalModule' ELSE 'Module' END \
             FROM symbols s WHERE s.symbol_id = ANY($1) \
             ON CONFLICT (vertex_id) DO NOTHING",
        )
        .bind(vertex_ids)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

        let edge_ids: Vec<Uuid> = edges.iter().map(|e| e.id.as_uuid()).collect();
        let source_ids: Vec<Uuid> = edges.iter().map(|e| e.source_id.as_uuid()).collect();
        let target_ids: Vec<Uuid> = edges.iter().map(|e| e.target_id.as_uuid()).collect();
        let labels: Vec<&str> = edges.iter().map(|e| e.kind.graph_label()).collect();

        sqlx::query(
            "INSERT INTO graph_edges (edge_id, source_id, target_id, label) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[], $4::text[]) \
             ON CONFLICT (edge_id) DO NOTHING",
        )
        .bind(edge_ids)
        .bind(source_ids)
        .bind(target_ids)
        .bind(labels)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    pub async fn insert_vectors_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: &[VectorRow],
    ) -> Result<u64, CoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut affected = 0u64;
        for row in rows {
            sqlx::query(
                "INSERT INTO vectors (vector_id, entity_id, entity_type, chunk_index, embedding, model) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (entity_id, entity_type, chunk_index) DO UPDATE SET \
                 vector_id = EXCLUDED.vector_id, embedding = EXCLUDED.embedding, model = EXCLUDED.model",
            )
            .bind(row.vector_id)
            .bind(row.entity_id)
            .bind(&row.entity_type)
            .bind(row.chunk_index)
            .bind(&row.embedding)
            .bind(&row.model)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
            affected += 1;
        }
        Ok(affected)
    }
}

/// Lightweight handle to a symbol's AST-node-less identity, used when
/// reporting query results (see `query::SymbolSummary`).
pub fn node_id(u: Uuid) -> NodeId {
    NodeId::from(u)
}

pub fn edge_id(u: Uuid) -> EdgeId {
    EdgeId::from(u)
}
