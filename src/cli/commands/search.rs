//! `codeatlas search <query>` — semantic search over an indexed repository.
//!
//! Embeds the query text through the same [`Embedder`] used at index time,
//! then runs [`QueryLayer::semantic_search`] against the store.

use crate::cli::args::Commands;
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::io::envelope::{Envelope, EntityType};
use crate::query::{QueryLayer, SearchFilters};
use crate::store;
use comfy_table::{presets::UTF8_FULL, Table};

pub async fn run(settings: &Settings, json: bool, command: Commands) -> i32 {
    let Commands::Search {
        query,
        repo,
        language,
        kinds,
        limit,
    } = command
    else {
        unreachable!("search::run called with a non-Search command");
    };

    let embedder = match Embedder::new(settings.embedding.clone()) {
        Ok(e) => e,
        Err(err) => {
            eprintln!("embedder unavailable: {err}");
            return 6;
        }
    };
    let vectors = match embedder.embed(std::slice::from_ref(&query)).await {
        Ok(v) => v,
        Err(err) => {
            eprintln!("failed to embed query: {err}");
            return 1;
        }
    };
    let Some(query_vector) = vectors.into_iter().next() else {
        eprintln!("embedder returned no vector for the query");
        return 1;
    };

    let pool = match store::connect(&settings.db).await {
        Ok(p) => p,
        Err(err) => {
            eprintln!("failed to connect to database: {err}");
            return 6;
        }
    };
    let query_layer = QueryLayer::new(pool);

    let repo_id = repo.and_then(|r| uuid::Uuid::parse_str(&r).ok());
    let filters = SearchFilters {
        repo_id,
        language,
        kinds,
        limit,
    };

    let results = match query_layer.semantic_search(&pgvector::Vector::from(query_vector), &filters).await {
        Ok(r) => r,
        Err(err) => {
            eprintln!("search failed: {err}");
            return 1;
        }
    };

    if json {
        let count = results.len();
        let envelope = Envelope::success(results)
            .with_entity_type(EntityType::SearchResult)
            .with_count(count)
            .with_query(query);
        println!("{}", envelope.to_json().unwrap_or_default());
    } else {
        print_results(&results);
    }

    0
}

fn print_results(results: &[crate::query::SearchResult]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["similarity", "kind", "name", "file", "signature"]);
    for r in results {
        table.add_row(vec![
            format!("{:.3}", r.similarity),
            r.symbol.kind.clone(),
            r.symbol.name.clone(),
            r.symbol.file_path.clone(),
            r.symbol.signature.clone(),
        ]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    // `run` requires a live embedder endpoint and database, so it is
    // exercised by the integration tests under `tests/` rather than here.
}
