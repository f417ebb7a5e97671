//! Exercises the store and query layers against a real Postgres +
//! pgvector instance. Ignored by default — run with:
//!
//!   DATABASE_URL=postgres://... cargo test --test pgvector_integration_test -- --ignored

use codeatlas::mapper::{map_all, MappedEdge};
use codeatlas::parsing::common::{ParsedDependency, ParsedFile, ParsedSymbol};
use codeatlas::parsing::Language;
use codeatlas::query::{QueryLayer, SearchFilters};
use codeatlas::store::{Pool, Store, VectorRow};
use codeatlas::types::Span;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn connect() -> Pool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this test");
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to postgres")
}

fn go_file() -> ParsedFile {
    let mut file = ParsedFile::empty("greet.go", Language::Go, b"package main\n".to_vec());
    file.symbols.push(ParsedSymbol::new(
        "Greet",
        codeatlas::types::SymbolKind::Function,
        "func Greet()",
        Span::new(3, 5, 10, 40),
    ));
    file.dependencies.push(ParsedDependency::import(None, "fmt", true));
    file
}

#[tokio::test]
#[ignore]
async fn index_then_search_round_trips_through_postgres() {
    let pool = connect().await;
    let store = Store::new(pool.clone());
    store.migrate().await.expect("migration should succeed");

    let mapped = map_all(&[go_file()]);
    let repo_name = format!("pgvector-test-{}", Uuid::new_v4());

    let mut tx = store.begin().await.unwrap();
    let repo_id = store
        .upsert_repository(&mut tx, &repo_name, None, None, None)
        .await
        .unwrap();
    store.ensure_external_sentinel_file(&mut tx, repo_id).await.unwrap();
    store.write_external_symbols(&mut tx, &mapped.external_symbols).await.unwrap();

    let file = &mapped.files[0];
    store.upsert_file(&mut tx, repo_id, file).await.unwrap();
    store.insert_symbols_batch(&mut tx, &file.symbols).await.unwrap();
    store.insert_ast_nodes_batch(&mut tx, &file.ast_nodes).await.unwrap();

    let existing = store
        .existing_symbol_ids(&mut tx, &mapped.edges.iter().map(|e| e.source_id).collect::<Vec<_>>())
        .await
        .unwrap();
    let resolvable: Vec<MappedEdge> = mapped
        .edges
        .into_iter()
        .filter(|e| existing.contains(&e.source_id))
        .collect();
    store.insert_edges_batch(&mut tx, &resolvable).await.unwrap();

    let symbol_id = file.symbols[0].id;
    let vector = VectorRow {
        vector_id: Uuid::new_v4(),
        entity_id: symbol_id.as_uuid(),
        entity_type: "symbol".to_string(),
        chunk_index: 0,
        embedding: pgvector::Vector::from(vec![0.1_f32; 1536]),
        model: "text-embedding-3-small".to_string(),
    };
    store.insert_vectors_batch(&mut tx, &[vector]).await.unwrap();
    tx.commit().await.unwrap();

    let query = QueryLayer::new(pool);
    let results = query
        .semantic_search(&pgvector::Vector::from(vec![0.1_f32; 1536]), &SearchFilters::with_limit(5))
        .await
        .unwrap();
    assert!(results.iter().any(|r| r.symbol.symbol_id == symbol_id));

    let callers = query.callers(symbol_id).await.unwrap();
    assert!(callers.is_empty());
}

/// Reindexing the same unchanged file twice must not duplicate rows
/// (spec.md §3 I2, idempotent re-index — spec.md §8 scenario 5).
#[tokio::test]
#[ignore]
async fn reindexing_same_file_is_idempotent_in_storage() {
    let pool = connect().await;
    let store = Store::new(pool);
    store.migrate().await.expect("migration should succeed");

    let mapped = map_all(&[go_file()]);
    let repo_name = format!("pgvector-idempotence-{}", Uuid::new_v4());
    let file = &mapped.files[0];

    for _ in 0..2 {
        let mut tx = store.begin().await.unwrap();
        let repo_id = store
            .upsert_repository(&mut tx, &repo_name, None, None, None)
            .await
            .unwrap();
        store.upsert_file(&mut tx, repo_id, file).await.unwrap();
        store.insert_symbols_batch(&mut tx, &file.symbols).await.unwrap();
        tx.commit().await.unwrap();
    }

    let mut tx = store.begin().await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM symbols WHERE symbol_id = $1")
        .bind(file.symbols[0].id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
