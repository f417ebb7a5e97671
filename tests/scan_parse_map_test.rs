//! End-to-end pipeline test: scan a temp repository, parse every file,
//! map the results, and check the invariants spec.md §8 calls out.
//!
//! No database is required — this exercises the pure in-memory stages
//! (`scan`, `parsing::pool`, `mapper`) only.

use codeatlas::mapper::map_all;
use codeatlas::parsing::ParserPool;
use codeatlas::scan::{ScanOptions, Scanner};
use std::fs;
use std::path::Path;

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Go "hello world" with one external import — spec.md §8 scenario 1.
#[test]
fn go_hello_world_produces_one_symbol_and_one_external_edge() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "main.go",
        "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n",
    );

    let scanner = Scanner::new(dir.path(), ScanOptions::default());
    let scanned = scanner.scan();
    assert_eq!(scanned.len(), 1);

    let pool = ParserPool::new(1);
    let outcomes = pool.run(scanned, None);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].errors.is_empty());

    let parsed: Vec<_> = outcomes.into_iter().map(|o| o.file).collect();
    let mapped = map_all(&parsed);

    assert_eq!(mapped.files.len(), 1);
    assert!(mapped.files[0].symbols.iter().any(|s| s.name == "main"));
    assert_eq!(mapped.external_symbols.len(), 1);
    assert_eq!(mapped.external_symbols[0].name, "fmt");
}

/// Re-running scan+parse+map against unchanged content must yield
/// byte-identical symbol and file ids (spec.md §3 I2, idempotence).
#[test]
fn reindexing_unchanged_content_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "lib.py",
        "def greet(name):\n    \"\"\"Say hello.\"\"\"\n    return f\"hi {name}\"\n",
    );

    let run_once = || {
        let scanner = Scanner::new(dir.path(), ScanOptions::default());
        let pool = ParserPool::new(1);
        let outcomes = pool.run(scanner.scan(), None);
        let parsed: Vec<_> = outcomes.into_iter().map(|o| o.file).collect();
        map_all(&parsed)
    };

    let first = run_once();
    let second = run_once();
    assert_eq!(first.files[0].id, second.files[0].id);
    assert_eq!(first.files[0].symbols[0].id, second.files[0].symbols[0].id);
    assert_eq!(first.files[0].checksum, second.files[0].checksum);
}

/// A file with a syntax error still yields the symbols recovered above
/// the error point rather than discarding the whole file (spec.md §8,
/// partial-parse scenario).
#[test]
fn partial_parse_keeps_recovered_symbols() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "broken.go",
        "package main\n\nfunc Valid() {}\n\nfunc Broken( {\n",
    );

    let scanner = Scanner::new(dir.path(), ScanOptions::default());
    let pool = ParserPool::new(1);
    let outcomes = pool.run(scanner.scan(), None);
    assert_eq!(outcomes.len(), 1);

    let parsed = &outcomes[0].file;
    assert!(parsed.symbols.iter().any(|s| s.name == "Valid"));
}

/// The default ignore set excludes `node_modules` and friends even when
/// language-matching files live inside them (spec.md §6).
#[test]
fn default_ignore_set_excludes_vendor_directories() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "node_modules/dep/index.js", "module.exports = {};\n");
    write(dir.path(), "src/index.js", "module.exports = {};\n");

    let scanner = Scanner::new(dir.path(), ScanOptions::default());
    let scanned = scanner.scan();
    assert_eq!(scanned.len(), 1);
    assert_eq!(scanned[0].relative_path, Path::new("src/index.js"));
}
