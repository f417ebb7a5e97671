//! Core identifier and span types shared across the pipeline.
//!
//! Every persisted entity is addressed by a UUID. Content-addressed
//! entities (files, symbols, external modules) derive their id from a
//! namespaced SHA-1 hash (UUID v5) of their defining fields so that
//! re-parsing identical input yields identical ids (spec invariant I3).
//! Identifiers for relationships (edges) and AST nodes are random (UUID
//! v4) and are not required to be stable across runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Fixed namespace for file ids: `uuid::new_v5(NS_FILE, "file:<path>:<checksum>")`.
pub const NS_FILE: Uuid = Uuid::from_bytes([
    0x1a, 0x8c, 0x9a, 0x3e, 0x4b, 0x6f, 0x4d, 0x1a, 0x9c, 0x2e, 0x7a, 0x5b, 0x3c, 0x8d, 0x0e, 0x11,
]);

/// Fixed namespace for symbol ids.
pub const NS_SYMBOL: Uuid = Uuid::from_bytes([
    0x2b, 0x9d, 0xab, 0x4f, 0x5c, 0x70, 0x5e, 0x2b, 0xad, 0x3f, 0x8b, 0x6c, 0x4d, 0x9e, 0x1f, 0x22,
]);

/// Fixed namespace for external-module symbol ids.
pub const NS_EXTERNAL: Uuid = Uuid::from_bytes([
    0x3c, 0xae, 0xbc, 0x50, 0x6d, 0x81, 0x6f, 0x3c, 0xbe, 0x40, 0x9c, 0x7d, 0x5e, 0xaf, 0x20, 0x33,
]);

/// The reserved all-zero file id that owns every external-module symbol.
pub const EXTERNAL_FILE_ID: FileId = FileId(Uuid::nil());

/// Path of the sentinel external-module file.
pub const EXTERNAL_FILE_PATH: &str = "__external__";

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new_random() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(RepoId);
uuid_id!(FileId);
uuid_id!(SymbolId);
uuid_id!(EdgeId);
uuid_id!(NodeId);
uuid_id!(VectorId);

/// A closed byte/line interval within a file (spec invariant I5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub end_line: u32,
    pub start_byte: u32,
    pub end_byte: u32,
}

impl Span {
    pub fn new(start_line: u32, end_line: u32, start_byte: u32, end_byte: u32) -> Self {
        Self {
            start_line,
            end_line,
            start_byte,
            end_byte,
        }
    }

    /// Check invariant I5: well-formed ordering of line/byte bounds.
    pub fn is_valid(&self) -> bool {
        self.start_line >= 1 && self.end_line >= self.start_line && self.start_byte <= self.end_byte
    }
}

/// Symbol kinds recognized across all supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Variable,
    Package,
    Module,
    ExternalModule,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Variable => "variable",
            Self::Package => "package",
            Self::Module => "module",
            Self::ExternalModule => "external_module",
        };
        write!(f, "{s}")
    }
}

/// Dependency/edge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Import,
    Call,
    Extends,
    Implements,
    Reference,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Import => "import",
            Self::Call => "call",
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::Reference => "reference",
        };
        write!(f, "{s}")
    }
}

impl EdgeKind {
    /// Property-graph overlay label for this edge kind.
    pub fn graph_label(&self) -> &'static str {
        match self {
            Self::Import => "IMPORTS",
            Self::Call => "CALLS",
            Self::Extends => "EXTENDS",
            Self::Implements => "IMPLEMENTS",
            Self::Reference => "REFERENCES",
        }
    }
}

impl SymbolKind {
    /// Property-graph overlay vertex label for this symbol kind.
    pub fn graph_label(&self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::Class => "Class",
            Self::Interface => "Interface",
            Self::Variable => "Variable",
            Self::Package | Self::Module => "Module",
            Self::ExternalModule => "ExternalModule",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_validity() {
        assert!(Span::new(1, 1, 0, 10).is_valid());
        assert!(Span::new(1, 5, 0, 100).is_valid());
        assert!(!Span::new(0, 5, 0, 100).is_valid());
        assert!(!Span::new(5, 1, 0, 100).is_valid());
        assert!(!Span::new(1, 1, 10, 0).is_valid());
    }

    #[test]
    fn external_file_id_is_nil() {
        assert!(EXTERNAL_FILE_ID.is_nil());
    }

    #[test]
    fn ids_roundtrip_through_uuid() {
        let u = Uuid::new_v4();
        let id = FileId::from(u);
        assert_eq!(id.as_uuid(), u);
        assert_eq!(id.to_string(), u.to_string());
    }
}
