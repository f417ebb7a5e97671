//! Indexer: orchestrates the repository-scoped write transaction that
//! turns mapper output into committed store state (spec.md §4.5).

use crate::embedding::Embedder;
use crate::error::{CoreError, ErrorCollector, ErrorKind};
use crate::mapper::{MapOutput, MappedSymbol};
use crate::store::{Store, VectorRow};
use crate::types::{FileId, SymbolId};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Fraction of requested embeddings that must succeed for the run to be
/// reported as `success_with_warnings` rather than `partial_success`
/// (spec.md §9 Open Questions: left under-specified in the original).
pub const EMBEDDING_SUCCESS_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct Options {
    pub incremental: bool,
    pub skip_vectors: bool,
    pub batch_size: usize,
    pub worker_count: usize,
    pub embedding_model: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            incremental: true,
            skip_vectors: false,
            batch_size: 100,
            worker_count: num_cpus::get().max(1),
            embedding_model: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Success,
    SuccessWithWarnings,
    PartialSuccess,
    Failed,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexResult {
    pub status: IndexStatus,
    pub files_processed: usize,
    pub symbols_created: usize,
    pub edges_created: usize,
    pub vectors_created: usize,
    pub errors: Vec<CoreError>,
    pub duration_ms: u64,
}

pub struct RepositoryRef<'a> {
    pub name: &'a str,
    pub url: Option<&'a str>,
    pub branch: Option<&'a str>,
    pub commit_hash: Option<&'a str>,
}

pub struct Indexer {
    store: Store,
    embedder: Option<Embedder>,
    retry: RetryPolicy,
}

/// Retry/backoff policy for the per-repository write transaction
/// (spec.md §4.5: SQLSTATE class `40`/`08` errors retry with exponential
/// backoff), mirroring [`crate::embedding::Embedder`]'s retry loop.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64;
        let capped = (base * 2f64.powi(attempt as i32 - 1)).min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 200,
            max_delay_ms: 30_000,
        }
    }
}

impl From<&crate::config::DbConfig> for RetryPolicy {
    fn from(db: &crate::config::DbConfig) -> Self {
        Self {
            max_retries: db.max_retries,
            base_delay_ms: db.base_retry_delay_ms,
            max_delay_ms: db.max_retry_delay_ms,
        }
    }
}

impl Indexer {
    pub fn new(store: Store, embedder: Option<Embedder>) -> Self {
        Self {
            store,
            embedder,
            retry: RetryPolicy::default(),
        }
    }

    /// Builds an `Indexer` whose transaction retry/backoff follows `db`'s
    /// configured limits rather than the built-in defaults.
    pub fn with_db_config(store: Store, embedder: Option<Embedder>, db: &crate::config::DbConfig) -> Self {
        Self {
            store,
            embedder,
            retry: RetryPolicy::from(db),
        }
    }

    pub async fn index(
        &self,
        repo: RepositoryRef<'_>,
        mapped: MapOutput,
        options: Options,
        cancel: CancellationToken,
    ) -> IndexResult {
        let start = Instant::now();
        let mut errors = ErrorCollector::new();

        let valid_files: Vec<_> = mapped
            .files
            .iter()
            .filter(|f| {
                let ok = f.symbols.iter().all(|s| valid_span(s));
                if !ok {
                    errors.push(CoreError::new(ErrorKind::Validation, "file dropped: symbol span violates invariant I5").with_file_path(f.path.clone()));
                }
                ok
            })
            .collect();

        if valid_files.is_empty() && !mapped.files.is_empty() {
            return IndexResult {
                status: IndexStatus::Failed,
                files_processed: 0,
                symbols_created: 0,
                edges_created: 0,
                vectors_created: 0,
                errors: errors.into_errors(),
                duration_ms: start.elapsed().as_millis() as u64,
            };
        }

        for unresolved in &mapped.unresolved {
            errors.push(
                CoreError::new(
                    ErrorKind::NotFound,
                    format!("edge target '{}' could not be resolved, dropped", unresolved.target_name),
                )
                .retryable(false)
                .with_file_path(unresolved.source_file.to_string()),
            );
        }

        let result = self.run_transaction_with_retry(&repo, &valid_files, &mapped, &options, cancel.clone(), &mut errors).await;

        let (files_processed, files_skipped, symbols_created, edges_created, vectors_created, embedding_ok) = match result {
            Ok(counts) => counts,
            Err(err) => {
                errors.push(err);
                return IndexResult {
                    status: IndexStatus::Failed,
                    files_processed: 0,
                    symbols_created: 0,
                    edges_created: 0,
                    vectors_created: 0,
                    errors: errors.into_errors(),
                    duration_ms: start.elapsed().as_millis() as u64,
                };
            }
        };

        if cancel.is_cancelled() {
            errors.push(CoreError::cancelled());
            return IndexResult {
                status: IndexStatus::Failed,
                files_processed,
                symbols_created,
                edges_created,
                vectors_created,
                errors: errors.into_errors(),
                duration_ms: start.elapsed().as_millis() as u64,
            };
        }

        let status = determine_status(files_processed, files_skipped, mapped.files.len(), &errors, embedding_ok);
        IndexResult {
            status,
            files_processed,
            symbols_created,
            edges_created,
            vectors_created,
            errors: errors.into_errors(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Retries [`Self::run_transaction`] on a retryable `CoreError`
    /// (SQLSTATE class `40` serialization/deadlock, class `08` connection;
    /// spec.md §4.5), with exponential backoff. The transaction never
    /// committed on a failed attempt, so each retry starts from a clean
    /// slate: errors collected mid-attempt are discarded unless the attempt
    /// that collected them is the one that ultimately succeeds or exhausts
    /// its retries.
    #[allow(clippy::too_many_arguments)]
    async fn run_transaction_with_retry(
        &self,
        repo: &RepositoryRef<'_>,
        valid_files: &[&crate::mapper::MappedFile],
        mapped: &MapOutput,
        options: &Options,
        cancel: CancellationToken,
        errors: &mut ErrorCollector,
    ) -> Result<(usize, usize, usize, usize, usize, bool), CoreError> {
        let mut attempt: u32 = 0;
        loop {
            let mut attempt_errors = ErrorCollector::new();
            let result = self
                .run_transaction(repo, valid_files, mapped, options, cancel.clone(), &mut attempt_errors)
                .await;
            match result {
                Ok(counts) => {
                    errors.extend(attempt_errors.into_errors());
                    return Ok(counts);
                }
                Err(err) if err.retryable && attempt < self.retry.max_retries && !cancel.is_cancelled() => {
                    attempt += 1;
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                }
                Err(err) => {
                    errors.extend(attempt_errors.into_errors());
                    return Err(err);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_transaction(
        &self,
        repo: &RepositoryRef<'_>,
        valid_files: &[&crate::mapper::MappedFile],
        mapped: &MapOutput,
        options: &Options,
        cancel: CancellationToken,
        errors: &mut ErrorCollector,
    ) -> Result<(usize, usize, usize, usize, usize, bool), CoreError> {
        let mut tx = self.store.begin().await?;

        let repo_id = self
            .store
            .upsert_repository(&mut tx, repo.name, repo.url, repo.branch, repo.commit_hash)
            .await?;

        self.store.ensure_external_sentinel_file(&mut tx, repo_id).await?;

        let mut external: Vec<MappedSymbol> = Vec::new();
        let mut seen_external: HashSet<SymbolId> = HashSet::new();
        for sym in &mapped.external_symbols {
            if seen_external.insert(sym.id) {
                external.push(sym.clone());
            }
        }
        self.store.write_external_symbols(&mut tx, &external).await?;

        let mut files_processed = 0usize;
        let mut files_skipped = 0usize;
        let mut symbols_created = 0usize;
        let mut written_symbol_ids: HashSet<SymbolId> = seen_external;

        for file in valid_files {
            if cancel.is_cancelled() {
                break;
            }

            if options.incremental {
                if let Some(existing) = self.store.existing_checksum(&mut tx, repo_id, &file.path).await? {
                    if existing == file.checksum {
                        files_skipped += 1;
                        continue;
                    }
                    self.store.delete_symbols_for_file(&mut tx, file.id).await?;
                }
            } else {
                self.store.delete_symbols_for_file(&mut tx, file.id).await?;
            }

            self.store.upsert_file(&mut tx, repo_id, file).await?;

            for chunk in file.symbols.chunks(options.batch_size.max(1)) {
                let written = self.store.insert_symbols_batch(&mut tx, chunk).await?;
                symbols_created += written as usize;
                for s in chunk {
                    written_symbol_ids.insert(s.id);
                }
            }
            for chunk in file.ast_nodes.chunks(options.batch_size.max(1)) {
                self.store.insert_ast_nodes_batch(&mut tx, chunk).await?;
            }

            files_processed += 1;
        }

        let mut edges_created = 0usize;
        let mut need_check: Vec<SymbolId> = Vec::new();
        for e in &mapped.edges {
            if !written_symbol_ids.contains(&e.source_id) {
                need_check.push(e.source_id);
            }
            if !written_symbol_ids.contains(&e.target_id) {
                need_check.push(e.target_id);
            }
        }
        let known = if need_check.is_empty() {
            HashSet::new()
        } else {
            self.store.existing_symbol_ids(&mut tx, &need_check).await?
        };

        let mut resolvable = Vec::with_capacity(mapped.edges.len());
        for e in &mapped.edges {
            let source_ok = written_symbol_ids.contains(&e.source_id) || known.contains(&e.source_id);
            let target_ok = written_symbol_ids.contains(&e.target_id) || known.contains(&e.target_id);
            if source_ok && target_ok {
                resolvable.push(e.clone());
            } else {
                errors.push(
                    CoreError::new(ErrorKind::NotFound, "edge endpoint missing after write, dropped")
                        .with_entity_id(e.id.to_string())
                        .retryable(false),
                );
            }
        }
        for chunk in resolvable.chunks(options.batch_size.max(1)) {
            edges_created += self.store.insert_edges_batch(&mut tx, chunk).await? as usize;
        }

        let mut vectors_created = 0usize;
        let mut embedding_ok = true;
        if !options.skip_vectors {
            if let Some(ref embedder) = self.embedder {
                let documented: Vec<&MappedSymbol> = valid_files
                    .iter()
                    .flat_map(|f| f.symbols.iter())
                    .filter(|s| s.docstring.as_deref().is_some_and(|d| !d.is_empty()))
                    .collect();

                let mut requested = 0usize;
                let mut succeeded = 0usize;
                for chunk in documented.chunks(options.batch_size.max(1)) {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let texts: Vec<String> = chunk
                        .iter()
                        .map(|s| format!("{}\n{}", s.signature, s.docstring.clone().unwrap_or_default()))
                        .collect();
                    requested += texts.len();
                    match embedder.embed(&texts).await {
                        Ok(vectors) => {
                            let rows: Vec<VectorRow> = chunk
                                .iter()
                                .zip(vectors)
                                .map(|(sym, v)| VectorRow {
                                    vector_id: Uuid::new_v4(),
                                    entity_id: sym.id.as_uuid(),
                                    entity_type: "symbol".to_string(),
                                    chunk_index: 0,
                                    embedding: pgvector::Vector::from(v),
                                    model: options.embedding_model.clone().unwrap_or_else(|| "default".to_string()),
                                })
                                .collect();
                            succeeded += rows.len();
                            vectors_created += self.store.insert_vectors_batch(&mut tx, &rows).await? as usize;
                        }
                        Err(err) => errors.push(err),
                    }
                }
                if requested > 0 && succeeded < requested {
                    embedding_ok = embedding_status(succeeded, requested);
                    errors.push(
                        CoreError::new(
                            ErrorKind::Embedding,
                            format!("{succeeded}/{requested} requested embeddings succeeded"),
                        )
                        .retryable(false),
                    );
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| CoreError::new(ErrorKind::Transaction, format!("commit failed: {e}")))?;

        Ok((files_processed, files_skipped, symbols_created, edges_created, vectors_created, embedding_ok))
    }
}

fn valid_span(sym: &MappedSymbol) -> bool {
    sym.start_line >= 1 && sym.end_line >= sym.start_line && sym.start_byte <= sym.end_byte
}

/// `files_skipped` counts files left untouched by the incremental checksum
/// check (spec.md §8 scenario 5): a fully idempotent re-index processes zero
/// files but skips every one of them, which must not be mistaken for the
/// zero-files-touched failure case.
fn determine_status(
    files_processed: usize,
    files_skipped: usize,
    files_total: usize,
    errors: &ErrorCollector,
    embedding_ok: bool,
) -> IndexStatus {
    if files_total == 0 {
        return IndexStatus::Success;
    }
    if files_processed == 0 && files_skipped == 0 {
        return IndexStatus::Failed;
    }
    if errors.is_empty() {
        return IndexStatus::Success;
    }
    let touched = files_processed + files_skipped;
    if touched < files_total {
        let embedding_only = errors.errors().iter().all(|e| e.kind == ErrorKind::Embedding || e.kind == ErrorKind::NotFound);
        if !embedding_only {
            return IndexStatus::PartialSuccess;
        }
    }
    if !embedding_ok {
        return IndexStatus::PartialSuccess;
    }
    IndexStatus::SuccessWithWarnings
}

/// Helper used by the HTTP surface and CLI to map `Options.batch_size`
/// against requested texts count for the embedding-success threshold.
pub fn embedding_status(succeeded: usize, requested: usize) -> bool {
    if requested == 0 {
        return true;
    }
    (succeeded as f64 / requested as f64) >= EMBEDDING_SUCCESS_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{Span, SymbolKind};

    fn sym(start_line: u32, end_line: u32, start_byte: u32, end_byte: u32) -> MappedSymbol {
        MappedSymbol {
            id: SymbolId::new_random(),
            file_id: FileId::new_random(),
            name: "f".to_string(),
            kind: SymbolKind::Function,
            signature: "fn f()".to_string(),
            start_line,
            end_line,
            start_byte,
            end_byte,
            docstring: None,
            summary: None,
        }
    }

    #[test]
    fn valid_span_rejects_inverted_lines() {
        let _ = Span::new(1, 1, 0, 1);
        assert!(valid_span(&sym(1, 5, 0, 10)));
        assert!(!valid_span(&sym(5, 1, 0, 10)));
        assert!(!valid_span(&sym(0, 1, 0, 10)));
        assert!(!valid_span(&sym(1, 1, 10, 0)));
    }

    #[test]
    fn empty_repository_is_success() {
        let errors = ErrorCollector::new();
        assert_eq!(determine_status(0, 0, 0, &errors, true), IndexStatus::Success);
    }

    #[test]
    fn zero_files_processed_with_inputs_is_failed() {
        let errors = ErrorCollector::new();
        assert_eq!(determine_status(0, 0, 3, &errors, true), IndexStatus::Failed);
    }

    #[test]
    fn all_files_unchanged_is_not_failed() {
        let errors = ErrorCollector::new();
        assert_eq!(determine_status(0, 3, 3, &errors, true), IndexStatus::Success);
    }

    #[test]
    fn partial_files_with_structural_errors_is_partial_success() {
        let mut errors = ErrorCollector::new();
        errors.push(CoreError::new(ErrorKind::Database, "conflict"));
        assert_eq!(determine_status(2, 0, 3, &errors, true), IndexStatus::PartialSuccess);
    }

    #[test]
    fn all_files_processed_with_warnings_only_is_success_with_warnings() {
        let mut errors = ErrorCollector::new();
        errors.push(CoreError::new(ErrorKind::NotFound, "dropped edge").retryable(false));
        assert_eq!(determine_status(3, 0, 3, &errors, true), IndexStatus::SuccessWithWarnings);
    }

    #[test]
    fn embedding_below_threshold_forces_partial_success() {
        let mut errors = ErrorCollector::new();
        errors.push(CoreError::new(ErrorKind::Embedding, "2/10 requested embeddings succeeded").retryable(false));
        assert_eq!(determine_status(3, 0, 3, &errors, false), IndexStatus::PartialSuccess);
    }

    #[test]
    fn embedding_threshold_matches_spec_decision() {
        assert!(embedding_status(5, 10));
        assert!(!embedding_status(4, 10));
        assert!(embedding_status(0, 0));
    }
}
