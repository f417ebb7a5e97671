//! C symbol and dependency extraction (spec.md §4.2, §6, §9).
//!
//! C has no modules, so `#include` targets are classified external unless
//! quoted (`"local.h"`), which is always treated as internal regardless of
//! whether the header resolves inside the scanned tree.

use crate::parsing::common::{ParsedDependency, ParsedFile, ParsedSymbol, ParserError};
use crate::parsing::parser::LanguageParser;
use crate::parsing::ts_support::{doc_comment_above, mirror_ast, node_span, node_text};
use crate::parsing::Language;
use crate::types::SymbolKind;
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: &[&str] = &["comment"];

pub struct CParser {
    parser: Parser,
}

impl CParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c::LANGUAGE.into())
            .map_err(|e| format!("c grammar: {e}"))?;
        Ok(Self { parser })
    }

    pub(crate) fn walk_generic(
        node: Node,
        source: &[u8],
        symbols: &mut Vec<ParsedSymbol>,
        deps: &mut Vec<ParsedDependency>,
    ) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "preproc_include" => collect_include(child, source, deps),
                "function_definition" => {
                    if let Some(sym) = function_symbol(child, source) {
                        collect_calls(child, source, &sym.name, deps);
                        symbols.push(sym);
                    }
                }
                "struct_specifier" | "union_specifier" => {
                    if let Some(sym) = struct_symbol(child, source) {
                        symbols.push(sym);
                    }
                }
                _ => Self::walk_generic(child, source, symbols, deps),
            }
        }
    }
}

fn function_symbol(node: Node, source: &[u8]) -> Option<ParsedSymbol> {
    let declarator = node.child_by_field_name("declarator")?;
    let name_node = find_identifier(declarator)?;
    let name = node_text(name_node, source).to_string();
    let signature = node_text(declarator, source).to_string();
    let mut sym = ParsedSymbol::new(name, SymbolKind::Function, signature, node_span(node));
    if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
        sym = sym.with_docstring(doc);
    }
    Some(sym)
}

fn struct_symbol(node: Node, source: &[u8]) -> Option<ParsedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    let signature = format!("struct {name}");
    let mut sym = ParsedSymbol::new(name, SymbolKind::Class, signature, node_span(node));
    if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
        sym = sym.with_docstring(doc);
    }
    Some(sym)
}

fn find_identifier(node: Node) -> Option<Node> {
    if node.kind() == "identifier" {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if let Some(found) = find_identifier(child) {
            return Some(found);
        }
    }
    None
}

fn collect_include(node: Node, source: &[u8], deps: &mut Vec<ParsedDependency>) {
    let Some(path_node) = node.child_by_field_name("path") else { return };
    let raw = node_text(path_node, source);
    let is_quoted = path_node.kind() == "string_literal";
    let target = raw.trim_matches('"').trim_start_matches('<').trim_end_matches('>').to_string();
    deps.push(ParsedDependency::import(None, target, !is_quoted));
}

fn collect_calls(node: Node, source: &[u8], owner: &str, deps: &mut Vec<ParsedDependency>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "call_expression" {
            if let Some(func) = child.child_by_field_name("function") {
                if func.kind() == "identifier" {
                    deps.push(ParsedDependency::call(owner, node_text(func, source), false));
                }
            }
        }
        collect_calls(child, source, owner, deps);
    }
}

impl LanguageParser for CParser {
    fn parse(&mut self, path: &str, content: &[u8]) -> (ParsedFile, Vec<ParserError>) {
        let mut errors = Vec::new();
        let Some(tree) = self.parser.parse(content, None) else {
            errors.push(ParserError::parse(path, 1, "c: parser produced no tree"));
            return (ParsedFile::empty(path, Language::C, content.to_vec()), errors);
        };
        let root = tree.root_node();
        if root.has_error() {
            errors.push(ParserError::parse(path, 1, "c: syntax error recovered partially"));
        }

        let mut symbols = Vec::new();
        let mut dependencies = Vec::new();
        Self::walk_generic(root, content, &mut symbols, &mut dependencies);

        let file = ParsedFile {
            path: path.to_string(),
            language: Language::C,
            content: content.to_vec(),
            ast_root: Some(mirror_ast(root, content)),
            symbols,
            dependencies,
        };
        (file, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_function_and_system_include() {
        let src = br#"#include <stdio.h>
#include "local.h"

/* Prints a greeting. */
void greet(const char *name) {
    printf("%s", name);
}
"#;
        let mut parser = CParser::new().unwrap();
        let (file, errors) = parser.parse("greet.c", src);
        assert!(errors.is_empty());
        assert!(file.symbols.iter().any(|s| s.name == "greet"));
        assert!(file.dependencies.iter().any(|d| d.target_name == "stdio.h" && d.is_external));
        assert!(file.dependencies.iter().any(|d| d.target_name == "local.h" && !d.is_external));
        assert!(file.dependencies.iter().any(|d| d.target_name == "printf"));
    }

    #[test]
    fn extracts_struct() {
        let src = b"struct Point {\n    int x;\n    int y;\n};\n";
        let mut parser = CParser::new().unwrap();
        let (file, _) = parser.parse("point.h", src);
        assert!(file.symbols.iter().any(|s| s.name == "Point"));
    }
}
