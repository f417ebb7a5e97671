//! Internal-vs-external import classification (spec.md §4.2).
//!
//! An import whose path starts with `./`, `../`, or `/` is always internal.
//! Beyond that literal rule, each language has its own intra-repository
//! convention (a Go module-relative path, a Java/Kotlin package rooted at
//! the project's own root package, a relative Swift/ObjC framework import)
//! which parsers pass in as `local_prefixes` — any import starting with one
//! of those prefixes is also internal.

pub fn is_external(import_path: &str, local_prefixes: &[&str]) -> bool {
    if import_path.starts_with("./") || import_path.starts_with("../") || import_path.starts_with('/') {
        return false;
    }
    if local_prefixes.iter().any(|p| !p.is_empty() && import_path.starts_with(p)) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_are_internal() {
        assert!(!is_external("./util", &[]));
        assert!(!is_external("../pkg/util", &[]));
        assert!(!is_external("/abs/pkg", &[]));
    }

    #[test]
    fn bare_names_are_external() {
        assert!(is_external("lodash", &[]));
        assert!(is_external("java.util.ArrayList", &[]));
    }

    #[test]
    fn local_module_prefix_is_internal() {
        assert!(!is_external(
            "github.com/acme/widget/internal/db",
            &["github.com/acme/widget"]
        ));
        assert!(is_external("github.com/other/thing", &["github.com/acme/widget"]));
    }
}
