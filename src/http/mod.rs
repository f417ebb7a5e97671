//! HTTP surface: a thin collaborator over the indexer and query layer
//! (spec.md §6). Feature-gated behind `http-server`.

use crate::indexing::{IndexStatus, Indexer, Options, RepositoryRef};
use crate::mapper::MapOutput;
use crate::query::{QueryLayer, SearchFilters};
use crate::types::{FileId, SymbolId};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub struct AppState {
    pub indexer: Indexer,
    pub query: QueryLayer,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/index", post(index))
        .route("/api/v1/search", post(search))
        .route("/api/v1/symbols/{id}/callers", get(callers))
        .route("/api/v1/symbols/{id}/callees", get(callees))
        .route("/api/v1/symbols/{id}/dependencies", get(dependencies))
        .route("/api/v1/files/{id}/symbols", get(symbols_of))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct IndexRequest {
    repo_name: String,
    repo_url: Option<String>,
    branch: Option<String>,
    commit_hash: Option<String>,
    #[serde(flatten)]
    parsed: MapOutput,
    #[serde(default)]
    options: IndexOptionsRequest,
}

#[derive(Debug, Default, Deserialize)]
struct IndexOptionsRequest {
    incremental: Option<bool>,
    skip_vectors: Option<bool>,
    batch_size: Option<usize>,
}

async fn index(State(state): State<Arc<AppState>>, Json(body): Json<IndexRequest>) -> (StatusCode, Json<serde_json::Value>) {
    let mut options = Options::default();
    if let Some(v) = body.options.incremental {
        options.incremental = v;
    }
    if let Some(v) = body.options.skip_vectors {
        options.skip_vectors = v;
    }
    if let Some(v) = body.options.batch_size {
        options.batch_size = v;
    }

    let repo = RepositoryRef {
        name: &body.repo_name,
        url: body.repo_url.as_deref(),
        branch: body.branch.as_deref(),
        commit_hash: body.commit_hash.as_deref(),
    };

    let result = state.indexer.index(repo, body.parsed, options, CancellationToken::new()).await;
    let status = match result.status {
        IndexStatus::Success | IndexStatus::SuccessWithWarnings => StatusCode::OK,
        IndexStatus::PartialSuccess => StatusCode::MULTI_STATUS,
        IndexStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::to_value(result).unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[allow(dead_code)]
    query: Option<String>,
    embedding: Vec<f32>,
    repo_id: Option<Uuid>,
    language: Option<String>,
    #[serde(default)]
    kind: Vec<String>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    results: Vec<crate::query::SearchResult>,
    total: usize,
}

async fn search(State(state): State<Arc<AppState>>, Json(body): Json<SearchRequest>) -> (StatusCode, Json<serde_json::Value>) {
    let filters = SearchFilters {
        repo_id: body.repo_id,
        language: body.language,
        kinds: body.kind,
        limit: body.limit.unwrap_or(10),
    };
    let vector = pgvector::Vector::from(body.embedding);
    match state.query.semantic_search(&vector, &filters).await {
        Ok(results) => {
            let total = results.len();
            (StatusCode::OK, Json(serde_json::to_value(SearchResponse { results, total }).unwrap_or_default()))
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::to_value(err).unwrap_or_default())),
    }
}

async fn callers(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> (StatusCode, Json<serde_json::Value>) {
    respond_symbols(state.query.callers(SymbolId::from(id)).await)
}

async fn callees(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> (StatusCode, Json<serde_json::Value>) {
    respond_symbols(state.query.callees(SymbolId::from(id)).await)
}

async fn dependencies(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> (StatusCode, Json<serde_json::Value>) {
    match state.query.dependencies(SymbolId::from(id)).await {
        Ok(results) => (StatusCode::OK, Json(serde_json::to_value(results).unwrap_or_default())),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::to_value(err).unwrap_or_default())),
    }
}

async fn symbols_of(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> (StatusCode, Json<serde_json::Value>) {
    respond_symbols(state.query.symbols_of(FileId::from(id)).await)
}

fn respond_symbols(result: Result<Vec<crate::query::SymbolSummary>, crate::error::CoreError>) -> (StatusCode, Json<serde_json::Value>) {
    match result {
        Ok(results) => (StatusCode::OK, Json(serde_json::to_value(results).unwrap_or_default())),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::to_value(err).unwrap_or_default())),
    }
}
