//! `codeatlas index <path>` — scan, parse, map, and index a repository.

use crate::cli::args::Commands;
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::indexing::{Indexer, IndexStatus, Options, RepositoryRef};
use crate::io::envelope::{Envelope, ResultCode};
use crate::io::status_line::{ProgressBar, ProgressBarOptions, ProgressBarStyle, StatusLine};
use crate::mapper;
use crate::parsing::pool::ParserPool;
use crate::scan::{ScanOptions, Scanner};
use crate::store::{self, Store};
use comfy_table::{presets::UTF8_FULL, Table};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(settings: &Settings, json: bool, command: Commands) -> i32 {
    let Commands::Index {
        path,
        name,
        url,
        branch,
        commit,
        incremental,
        skip_vectors,
        no_ignore,
    } = command
    else {
        unreachable!("index::run called with a non-Index command");
    };

    let repo_name = name.unwrap_or_else(|| default_repo_name(&path));

    let scan_options = ScanOptions {
        no_ignore,
        ..Default::default()
    };
    let scanned = Scanner::new(&path, scan_options).scan();

    let pool = ParserPool::new(settings.indexer.worker_count);
    let outcomes = if json {
        pool.run(scanned, None)
    } else {
        let bar = Arc::new(ProgressBar::with_options(
            scanned.len() as u64,
            "files",
            "",
            "",
            ProgressBarOptions::default().with_style(ProgressBarStyle::FullBlock).with_label("PARSE"),
        ));
        let status = StatusLine::new(bar.clone());
        let hook_bar = bar.clone();
        let outcomes = pool.run(
            scanned,
            Some(Arc::new(move |done, _total, _path: &str| hook_bar.set_progress(done as u64))),
        );
        status.set_visible(false);
        outcomes
    };

    let parsed: Vec<_> = outcomes.iter().map(|o| o.file.clone()).collect();
    let mapped = mapper::map_all(&parsed);

    let pool = match store::connect(&settings.db).await {
        Ok(p) => p,
        Err(err) => {
            eprintln!("failed to connect to database: {err}");
            return 6;
        }
    };
    let db_store = Store::new(pool);
    if let Err(err) = db_store.migrate().await {
        eprintln!("failed to run migrations: {err}");
        return 6;
    }

    let embedder = if skip_vectors {
        None
    } else {
        match Embedder::new(settings.embedding.clone()) {
            Ok(e) => Some(e),
            Err(err) => {
                eprintln!("embedder unavailable, continuing without vectors: {err}");
                None
            }
        }
    };

    let indexer = Indexer::with_db_config(db_store, embedder, &settings.db);
    let mut options = Options {
        incremental,
        skip_vectors,
        batch_size: settings.indexer.batch_size,
        worker_count: settings.indexer.worker_count,
        embedding_model: Some(settings.embedding.model.clone()),
    };
    if options.batch_size == 0 {
        options.batch_size = 100;
    }

    let repo = RepositoryRef {
        name: &repo_name,
        url: url.as_deref(),
        branch: branch.as_deref(),
        commit_hash: commit.as_deref(),
    };

    let result = indexer.index(repo, mapped, options, CancellationToken::new()).await;
    let exit = match result.status {
        IndexStatus::Success | IndexStatus::SuccessWithWarnings | IndexStatus::PartialSuccess => 0,
        IndexStatus::Failed => 1,
    };

    if json {
        let mut envelope = if matches!(result.status, IndexStatus::Failed) {
            Envelope::error(ResultCode::IndexError, "indexing failed")
        } else {
            Envelope::success(serde_json::to_value(&result).unwrap_or_default())
                .with_message(format!("indexed {} as {:?}", repo_name, result.status))
        };
        envelope.meta.duration_ms = Some(result.duration_ms);
        println!("{}", envelope.to_json().unwrap_or_default());
    } else {
        print_summary(&repo_name, &result);
    }

    exit
}

fn print_summary(repo_name: &str, result: &crate::indexing::IndexResult) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["repository", "status", "files", "symbols", "edges", "vectors", "errors", "duration"]);
    table.add_row(vec![
        repo_name.to_string(),
        format!("{:?}", result.status),
        result.files_processed.to_string(),
        result.symbols_created.to_string(),
        result.edges_created.to_string(),
        result.vectors_created.to_string(),
        result.errors.len().to_string(),
        format!("{}ms", result.duration_ms),
    ]);
    println!("{table}");

    if !result.errors.is_empty() {
        println!("\nerrors by kind:");
        let collector = {
            let mut c = crate::error::ErrorCollector::new();
            c.extend(result.errors.iter().cloned());
            c
        };
        for (kind, count) in collector.by_kind() {
            println!("  {kind}: {count}");
        }
        println!("\nfirst errors:");
        for err in collector.first_n(10) {
            println!("  [{}] {}", err.kind, err.message);
        }
    }
}

fn default_repo_name(path: &PathBuf) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "repository".to_string())
}
