//! Scanner: walks a repository, applies ignore rules, classifies files by
//! language, and emits a deterministically-ordered sequence of candidates
//! (spec.md §4.1).

use crate::parsing::Language;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default ignored directories (spec.md §6).
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    "dist",
    "build",
    ".next",
    ".nuxt",
];

/// Extensions treated as binary and always skipped, regardless of `--no-ignore`.
pub const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "a", "lib", "o", "obj", "png", "jpg", "jpeg", "gif", "bmp",
    "ico", "webp", "zip", "tar", "gz", "bz2", "xz", "7z", "rar", "mp3", "mp4", "mov", "avi",
    "pdf", "woff", "woff2", "ttf", "class", "jar", "pyc",
];

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
    pub language: Language,
    pub byte_size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub language_filter: Option<Vec<Language>>,
    /// Caller-supplied ignore file, applied after defaults and discovered `.gitignore`s.
    pub extra_ignore_file: Option<PathBuf>,
    /// Caller-supplied additional glob patterns, applied last (highest precedence).
    pub extra_patterns: Vec<String>,
    /// Disables every ignore source, including built-in defaults.
    pub no_ignore: bool,
}

pub struct Scanner {
    root: PathBuf,
    options: ScanOptions,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, options: ScanOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Walk the repository and return scanned files in deterministic
    /// (sorted-entry) order. Unreadable paths are logged and skipped, never
    /// fatal — the scan always returns whatever it could read.
    pub fn scan(&self) -> Vec<ScannedFile> {
        let mut results = Vec::new();
        let extra_gitignore = self.build_extra_gitignore();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(!self.options.no_ignore)
            .git_ignore(!self.options.no_ignore)
            .git_global(!self.options.no_ignore)
            .git_exclude(!self.options.no_ignore)
            .hidden(false)
            .sort_by_file_path(|a, b| a.cmp(b));

        if !self.options.no_ignore {
            for dir in DEFAULT_IGNORE_DIRS {
                let _ = builder.add_ignore(self.root.join(dir));
            }
        }

        let walker = builder.build();
        let mut entries: Vec<PathBuf> = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                        entries.push(entry.into_path());
                    }
                }
                Err(err) => warn!("scanner: skipping unreadable entry: {err}"),
            }
        }
        entries.sort();

        for absolute_path in entries {
            let relative_path = absolute_path
                .strip_prefix(&self.root)
                .unwrap_or(&absolute_path)
                .to_path_buf();

            if !self.options.no_ignore {
                if let Some(ref gi) = extra_gitignore {
                    if gi.matched(&relative_path, false).is_ignore() {
                        continue;
                    }
                }
                if self.is_binary(&absolute_path) {
                    continue;
                }
            }

            let Some(language) = Language::from_path(&absolute_path) else {
                continue;
            };

            if let Some(ref filter) = self.options.language_filter {
                if !filter.contains(&language) {
                    continue;
                }
            }

            let byte_size = match std::fs::metadata(&absolute_path) {
                Ok(meta) => meta.len(),
                Err(err) => {
                    warn!("scanner: cannot stat '{}': {err}", absolute_path.display());
                    continue;
                }
            };

            results.push(ScannedFile {
                relative_path,
                absolute_path,
                language,
                byte_size,
            });
        }

        results
    }

    fn is_binary(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| BINARY_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn build_extra_gitignore(&self) -> Option<Gitignore> {
        if self.options.extra_ignore_file.is_none() && self.options.extra_patterns.is_empty() {
            return None;
        }
        let mut builder = GitignoreBuilder::new(&self.root);
        if let Some(ref file) = self.options.extra_ignore_file {
            if let Some(err) = builder.add(file) {
                warn!("scanner: failed to read ignore file '{}': {err}", file.display());
            }
        }
        for pattern in &self.options.extra_patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                warn!("scanner: invalid ignore pattern '{pattern}': {err}");
            }
        }
        builder.build().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn classifies_and_skips_unknown_languages() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.go", "package main");
        write(dir.path(), "README.md", "hello");

        let scanner = Scanner::new(dir.path(), ScanOptions::default());
        let files = scanner.scan();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].language, Language::Go);
    }

    #[test]
    fn honors_default_ignore_dirs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/main.go", "package main");
        write(dir.path(), "node_modules/dep/index.js", "module.exports = {}");

        let scanner = Scanner::new(dir.path(), ScanOptions::default());
        let files = scanner.scan();

        assert_eq!(files.len(), 1);
        assert!(files[0].relative_path.ends_with("main.go"));
    }

    #[test]
    fn no_ignore_disables_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "node_modules/dep/index.js", "module.exports = {}");

        let options = ScanOptions {
            no_ignore: true,
            ..Default::default()
        };
        let scanner = Scanner::new(dir.path(), options);
        let files = scanner.scan();

        assert_eq!(files.len(), 1);
    }

    #[test]
    fn language_filter_restricts_results() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.go", "package main");
        write(dir.path(), "app.py", "print('hi')");

        let options = ScanOptions {
            language_filter: Some(vec![Language::Python]),
            ..Default::default()
        };
        let scanner = Scanner::new(dir.path(), options);
        let files = scanner.scan();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].language, Language::Python);
    }

    #[test]
    fn traversal_order_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.go", "package main");
        write(dir.path(), "a.go", "package main");
        write(dir.path(), "c/a.go", "package main");

        let scanner = Scanner::new(dir.path(), ScanOptions::default());
        let files1 = scanner.scan();
        let files2 = scanner.scan();

        let paths1: Vec<_> = files1.iter().map(|f| f.relative_path.clone()).collect();
        let paths2: Vec<_> = files2.iter().map(|f| f.relative_path.clone()).collect();
        assert_eq!(paths1, paths2);
    }
}
