//! Language detection and the extension table of spec.md §6.

use serde::{Deserialize, Serialize};

/// The ten languages the core parser pool supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Go,
    JavaScript,
    TypeScript,
    Python,
    Java,
    Kotlin,
    Swift,
    Objc,
    ObjcCpp,
    C,
    Cpp,
}

impl Language {
    /// Classify a file by extension, with content-based disambiguation for
    /// `.h` headers shared between C and Objective-C (spec.md §6): a `.h`
    /// file is treated as `objc` unless a sibling `.cpp` file of the same
    /// stem exists in the same directory, in which case it is `cpp`.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "go" => Some(Self::Go),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "ts" | "tsx" => Some(Self::TypeScript),
            "py" => Some(Self::Python),
            "java" => Some(Self::Java),
            "kt" | "kts" => Some(Self::Kotlin),
            "swift" => Some(Self::Swift),
            "mm" => Some(Self::ObjcCpp),
            "c" => Some(Self::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some(Self::Cpp),
            "m" => Some(Self::Objc),
            "h" => Some(if Self::has_cpp_sibling(path) {
                Self::Cpp
            } else {
                Self::Objc
            }),
            _ => None,
        }
    }

    fn has_cpp_sibling(header: &std::path::Path) -> bool {
        let Some(stem) = header.file_stem() else {
            return false;
        };
        let Some(dir) = header.parent() else {
            return false;
        };
        for cpp_ext in ["cpp", "cc", "cxx"] {
            if dir.join(stem).with_extension(cpp_ext).exists() {
                return true;
            }
        }
        false
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Python => "python",
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::Swift => "swift",
            Self::Objc => "objc",
            Self::ObjcCpp => "objcpp",
            Self::C => "c",
            Self::Cpp => "cpp",
        }
    }

    pub fn supports_header_impl_pairing(&self) -> bool {
        matches!(self, Self::C | Self::Cpp | Self::Objc | Self::ObjcCpp)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn classifies_known_extensions() {
        assert_eq!(Language::from_path(Path::new("main.go")), Some(Language::Go));
        assert_eq!(Language::from_path(Path::new("a.jsx")), Some(Language::JavaScript));
        assert_eq!(Language::from_path(Path::new("a.tsx")), Some(Language::TypeScript));
        assert_eq!(Language::from_path(Path::new("a.py")), Some(Language::Python));
        assert_eq!(Language::from_path(Path::new("A.java")), Some(Language::Java));
        assert_eq!(Language::from_path(Path::new("a.kts")), Some(Language::Kotlin));
        assert_eq!(Language::from_path(Path::new("a.swift")), Some(Language::Swift));
        assert_eq!(Language::from_path(Path::new("a.mm")), Some(Language::ObjcCpp));
        assert_eq!(Language::from_path(Path::new("a.c")), Some(Language::C));
        assert_eq!(Language::from_path(Path::new("a.hpp")), Some(Language::Cpp));
        assert_eq!(Language::from_path(Path::new("a.m")), Some(Language::Objc));
        assert_eq!(Language::from_path(Path::new("readme.md")), None);
    }

    #[test]
    fn header_without_cpp_sibling_is_objc() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("Foo.h");
        std::fs::write(&header, "").unwrap();
        assert_eq!(Language::from_path(&header), Some(Language::Objc));
    }

    #[test]
    fn header_with_cpp_sibling_is_cpp() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Foo.h"), "").unwrap();
        std::fs::write(dir.path().join("Foo.cpp"), "").unwrap();
        assert_eq!(
            Language::from_path(&dir.path().join("Foo.h")),
            Some(Language::Cpp)
        );
    }
}
