//! Bounded worker pool driving per-file parsing (spec.md §4.4).
//!
//! A fixed number of OS threads pull scanned files off a shared queue and
//! report `(ParsedFile, Vec<ParserError>)` back on a results channel. Each
//! file is parsed inside `catch_unwind` so a panicking grammar (stack
//! overflow aside) degrades to a single `Parse`-kind error rather than
//! taking down the whole run.

use crate::parsing::common::{ParsedFile, ParserError, ParserErrorKind};
use crate::parsing::factory::ParserFactory;
use crate::scan::ScannedFile;
use crossbeam_channel::{bounded, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

pub type ProgressHook = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

pub struct ParserPool {
    worker_count: usize,
}

pub struct ParseOutcome {
    pub file: ParsedFile,
    pub errors: Vec<ParserError>,
}

impl ParserPool {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    pub fn default_size() -> usize {
        num_cpus::get().max(1)
    }

    /// Parses every file, preserving no particular output order: callers
    /// needing deterministic output should sort by `file.path` afterward.
    pub fn run(&self, files: Vec<ScannedFile>, progress: Option<ProgressHook>) -> Vec<ParseOutcome> {
        let total = files.len();
        let (work_tx, work_rx) = bounded::<(usize, ScannedFile)>(total.max(1));
        let (result_tx, result_rx) = bounded::<ParseOutcome>(total.max(1));

        for (idx, file) in files.into_iter().enumerate() {
            work_tx
                .send((idx, file))
                .expect("work channel has capacity for every scanned file");
        }
        drop(work_tx);
        let completed = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..self.worker_count {
                let work_rx = work_rx.clone();
                let result_tx: Sender<ParseOutcome> = result_tx.clone();
                let progress = progress.clone();
                let completed = &completed;
                scope.spawn(move || {
                    while let Ok((_idx, scanned)) = work_rx.recv() {
                        let path = scanned.relative_path.display().to_string();
                        let outcome = parse_one(&scanned);
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        if let Some(ref hook) = progress {
                            hook(done, total, &path);
                        }
                        if result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            result_rx.iter().collect()
        })
    }
}

fn parse_one(scanned: &ScannedFile) -> ParseOutcome {
    let path_str = scanned.relative_path.display().to_string();
    let content = match std::fs::read(&scanned.absolute_path) {
        Ok(bytes) => bytes,
        Err(err) => {
            return ParseOutcome {
                file: ParsedFile::empty(&path_str, scanned.language, Vec::new()),
                errors: vec![ParserError::filesystem(&path_str, err.to_string())],
            };
        }
    };

    let language = scanned.language;
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut parser = ParserFactory::create(language)?;
        Ok::<_, String>(parser.parse(&path_str, &content))
    }));

    match result {
        Ok(Ok((file, errors))) => ParseOutcome { file, errors },
        Ok(Err(factory_err)) => ParseOutcome {
            file: ParsedFile::empty(&path_str, language, content),
            errors: vec![ParserError {
                file: path_str,
                line: None,
                column: None,
                message: factory_err,
                kind: ParserErrorKind::Parse,
            }],
        },
        Err(panic) => {
            let message = panic_message(&panic);
            ParseOutcome {
                file: ParsedFile::empty(&path_str, language, content),
                errors: vec![ParserError {
                    file: path_str,
                    line: None,
                    column: None,
                    message: format!("parser panicked: {message}"),
                    kind: ParserErrorKind::Parse,
                }],
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Language;
    use std::path::PathBuf;

    fn scanned(dir: &std::path::Path, name: &str, content: &str, language: Language) -> ScannedFile {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        ScannedFile {
            relative_path: PathBuf::from(name),
            absolute_path: path,
            language,
            byte_size: content.len() as u64,
        }
    }

    #[test]
    fn parses_every_file_in_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            scanned(dir.path(), "a.go", "package main\nfunc A() {}\n", Language::Go),
            scanned(dir.path(), "b.go", "package main\nfunc B() {}\n", Language::Go),
        ];
        let pool = ParserPool::new(2);
        let outcomes = pool.run(files, None);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.errors.is_empty()));
    }

    #[test]
    fn missing_file_becomes_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ScannedFile {
            relative_path: PathBuf::from("missing.go"),
            absolute_path: dir.path().join("missing.go"),
            language: Language::Go,
            byte_size: 0,
        };
        let pool = ParserPool::new(1);
        let outcomes = pool.run(vec![missing], None);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].errors[0].kind, ParserErrorKind::Filesystem);
    }

    #[test]
    fn progress_hook_is_invoked_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![scanned(dir.path(), "a.go", "package main\n", Language::Go)];
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter2 = counter.clone();
        let hook: ProgressHook = Arc::new(move |_, _, _| {
            counter2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        let pool = ParserPool::new(1);
        pool.run(files, Some(hook));
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
