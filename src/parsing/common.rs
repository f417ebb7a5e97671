//! Data types produced by language parsers, before schema mapping.
//!
//! These mirror the `ParsedFile`/`ParsedSymbol`/`ParsedDependency` shapes of
//! spec.md §4.2. None of these carry a stable identifier yet — that is the
//! `SchemaMapper`'s job (spec.md §4.3).

use crate::types::{EdgeKind, Span, SymbolKind};

/// A symbol extracted by a language parser, before id assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub signature: String,
    pub span: Span,
    pub docstring: Option<String>,
    /// A generated semantic summary, distinct from the docstring a parser
    /// reads verbatim from source (spec.md §3). No parser produces one
    /// today; this is the attachment point for a future summarization step
    /// writing into the `summaries` table (spec.md §4.6).
    pub summary: Option<String>,
}

impl ParsedSymbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, signature: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            signature: signature.into(),
            span,
            docstring: None,
            summary: None,
        }
    }

    pub fn with_docstring(mut self, doc: impl Into<String>) -> Self {
        self.docstring = Some(doc.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// A dependency relationship extracted by a language parser, before
/// endpoint resolution. `source_symbol_name` is `None` when the dependency
/// belongs to the file/module scope rather than a specific symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDependency {
    pub kind: EdgeKind,
    pub source_symbol_name: Option<String>,
    pub target_name: String,
    pub target_module: Option<String>,
    pub is_external: bool,
}

impl ParsedDependency {
    pub fn import(source_symbol_name: Option<String>, module: impl Into<String>, is_external: bool) -> Self {
        let module = module.into();
        Self {
            kind: EdgeKind::Import,
            source_symbol_name,
            target_name: module.clone(),
            target_module: Some(module),
            is_external,
        }
    }

    pub fn call(source_symbol_name: impl Into<String>, target_name: impl Into<String>, is_external: bool) -> Self {
        Self {
            kind: EdgeKind::Call,
            source_symbol_name: Some(source_symbol_name.into()),
            target_name: target_name.into(),
            target_module: None,
            is_external,
        }
    }

    pub fn extends(source_symbol_name: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self {
            kind: EdgeKind::Extends,
            source_symbol_name: Some(source_symbol_name.into()),
            target_name: target_name.into(),
            target_module: None,
            is_external: false,
        }
    }

    pub fn implements(source_symbol_name: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self {
            kind: EdgeKind::Implements,
            source_symbol_name: Some(source_symbol_name.into()),
            target_name: target_name.into(),
            target_module: None,
            is_external: false,
        }
    }

    pub fn reference(source_symbol_name: impl Into<String>, target_name: impl Into<String>, is_external: bool) -> Self {
        Self {
            kind: EdgeKind::Reference,
            source_symbol_name: Some(source_symbol_name.into()),
            target_name: target_name.into(),
            target_module: None,
            is_external,
        }
    }

    /// Record the object/package identifier a member or selector call went
    /// through (e.g. `lodash` in `lodash.map(...)`, `fmt` in `fmt.Println(...)`),
    /// so the mapper can resolve the call against the external-module table
    /// even though `target_name` only carries the bare property/field name.
    pub fn with_target_module(mut self, module: impl Into<String>) -> Self {
        self.target_module = Some(module.into());
        self
    }
}

/// Minimal AST node handle kept for the mapper's tree walk (spec.md §4.3
/// step 4). Parsers build this tree directly rather than exposing the raw
/// `tree_sitter::Tree`, so the mapper does not need to link against any
/// particular grammar crate.
#[derive(Debug, Clone)]
pub struct ParsedAstNode {
    pub node_type: String,
    pub span: Span,
    /// Present only for nodes smaller than the 100-byte inline-text threshold.
    pub text: Option<String>,
    pub children: Vec<ParsedAstNode>,
}

/// The complete output of parsing one file (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: String,
    pub language: crate::parsing::Language,
    pub content: Vec<u8>,
    pub ast_root: Option<ParsedAstNode>,
    pub symbols: Vec<ParsedSymbol>,
    pub dependencies: Vec<ParsedDependency>,
}

impl ParsedFile {
    pub fn empty(path: impl Into<String>, language: crate::parsing::Language, content: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            language,
            content,
            ast_root: None,
            symbols: Vec::new(),
            dependencies: Vec::new(),
        }
    }
}

/// A single parse-time error, localized where possible (spec.md §7).
#[derive(Debug, Clone)]
pub struct ParserError {
    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message: String,
    pub kind: ParserErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserErrorKind {
    Filesystem,
    Parse,
    Mapping,
    Output,
}

impl ParserError {
    pub fn parse(file: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
            column: None,
            message: message.into(),
            kind: ParserErrorKind::Parse,
        }
    }

    pub fn filesystem(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
            message: message.into(),
            kind: ParserErrorKind::Filesystem,
        }
    }
}
