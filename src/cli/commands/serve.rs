//! `codeatlas serve` — run the HTTP surface over the store (spec.md §6).

use crate::cli::args::Commands;
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::indexing::Indexer;
use crate::query::QueryLayer;
use crate::store::{self, Store};
use std::sync::Arc;

#[cfg(feature = "http-server")]
pub async fn run(settings: &Settings, command: Commands) -> i32 {
    let Commands::Serve { port } = command else {
        unreachable!("serve::run called with a non-Serve command");
    };

    let pool = match store::connect(&settings.db).await {
        Ok(p) => p,
        Err(err) => {
            eprintln!("failed to connect to database: {err}");
            return 6;
        }
    };
    let db_store = Store::new(pool.clone());
    if let Err(err) = db_store.migrate().await {
        eprintln!("failed to run migrations: {err}");
        return 6;
    }

    let embedder = Embedder::new(settings.embedding.clone()).ok();
    let indexer = Indexer::with_db_config(db_store, embedder, &settings.db);
    let query = QueryLayer::new(pool);

    let state = Arc::new(crate::http::AppState { indexer, query });
    let app = crate::http::router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(err) => {
            eprintln!("failed to bind {addr}: {err}");
            return 6;
        }
    };

    tracing::info!("codeatlas serving on {addr}");
    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("server error: {err}");
        return 1;
    }
    0
}

#[cfg(not(feature = "http-server"))]
pub async fn run(_settings: &Settings, _command: Commands) -> i32 {
    eprintln!("codeatlas was built without the http-server feature");
    8
}
