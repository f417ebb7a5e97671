//! TypeScript symbol and dependency extraction (spec.md §4.2, §6).
//!
//! Shares function/class/call extraction with [`crate::parsing::js_family`];
//! adds handling for TypeScript-only top-level constructs (interfaces, type
//! aliases, enums).

use crate::parsing::common::{ParsedDependency, ParsedFile, ParsedSymbol, ParserError};
use crate::parsing::js_family;
use crate::parsing::parser::LanguageParser;
use crate::parsing::ts_support::{doc_comment_above, mirror_ast, node_span, node_text};
use crate::parsing::Language;
use crate::types::SymbolKind;
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: &[&str] = &["comment"];

pub struct TypeScriptParser {
    parser: Parser,
}

impl TypeScriptParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .map_err(|e| format!("typescript grammar: {e}"))?;
        Ok(Self { parser })
    }

    fn walk_ts(&self, node: Node, source: &[u8], symbols: &mut Vec<ParsedSymbol>, deps: &mut Vec<ParsedDependency>) {
        js_family::walk_with_extra(node, source, symbols, deps, None, &mut |child, source, symbols, deps| {
            match child.kind() {
                "interface_declaration" => {
                    self.interface_symbol(child, source, symbols, deps);
                    true
                }
                "type_alias_declaration" => {
                    self.type_alias_symbol(child, source, symbols);
                    true
                }
                "enum_declaration" => {
                    self.enum_symbol(child, source, symbols);
                    true
                }
                _ => false,
            }
        });
    }

    fn interface_symbol(&self, node: Node, source: &[u8], symbols: &mut Vec<ParsedSymbol>, deps: &mut Vec<ParsedDependency>) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let name = node_text(name_node, source).to_string();
        let signature = format!("interface {name}");
        let mut sym = ParsedSymbol::new(name.clone(), SymbolKind::Interface, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        if let Some(extends) = node.child_by_field_name("extends_clause") {
            let mut cursor = extends.walk();
            for target in extends.named_children(&mut cursor) {
                deps.push(ParsedDependency::extends(&name, node_text(target, source)));
            }
        } else if let Some(heritage) = child_of_kind(node, "extends_type_clause") {
            let mut cursor = heritage.walk();
            for target in heritage.named_children(&mut cursor) {
                deps.push(ParsedDependency::extends(&name, node_text(target, source)));
            }
        }
        symbols.push(sym);
    }

    fn type_alias_symbol(&self, node: Node, source: &[u8], symbols: &mut Vec<ParsedSymbol>) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let name = node_text(name_node, source).to_string();
        let signature = format!("type {name}");
        let mut sym = ParsedSymbol::new(name, SymbolKind::Class, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        symbols.push(sym);
    }

    fn enum_symbol(&self, node: Node, source: &[u8], symbols: &mut Vec<ParsedSymbol>) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let name = node_text(name_node, source).to_string();
        let signature = format!("enum {name}");
        let mut sym = ParsedSymbol::new(name, SymbolKind::Variable, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        symbols.push(sym);
    }
}

fn child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).find(|c| c.kind() == kind)
}

impl LanguageParser for TypeScriptParser {
    fn parse(&mut self, path: &str, content: &[u8]) -> (ParsedFile, Vec<ParserError>) {
        let mut errors = Vec::new();
        let Some(tree) = self.parser.parse(content, None) else {
            errors.push(ParserError::parse(path, 1, "typescript: parser produced no tree"));
            return (ParsedFile::empty(path, Language::TypeScript, content.to_vec()), errors);
        };
        let root = tree.root_node();
        if root.has_error() {
            errors.push(ParserError::parse(path, 1, "typescript: syntax error recovered partially"));
        }

        let mut symbols = Vec::new();
        let mut dependencies = Vec::new();
        self.walk_ts(root, content, &mut symbols, &mut dependencies);

        let file = ParsedFile {
            path: path.to_string(),
            language: Language::TypeScript,
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
    fn extracts_interface_and_extends() {
        let src = b"interface Base {\n  id: string;\n}\n\ninterface Widget extends Base {\n  render(): void;\n}\n";
        let mut parser = TypeScriptParser::new().unwrap();
        let (file, errors) = parser.parse("app.ts", src);
        assert!(errors.is_empty());
        assert!(file.symbols.iter().any(|s| s.name == "Widget" && s.kind == SymbolKind::Interface));
        assert!(file
            .dependencies
            .iter()
            .any(|d| d.kind == crate::types::EdgeKind::Extends && d.target_name == "Base"));
    }

    #[test]
    fn extracts_type_alias_and_enum() {
        let src = b"type Id = string;\nenum Status { Active, Inactive }\n";
        let mut parser = TypeScriptParser::new().unwrap();
        let (file, _) = parser.parse("app.ts", src);
        assert!(file.symbols.iter().any(|s| s.name == "Id"));
        assert!(file.symbols.iter().any(|s| s.name == "Status"));
    }

    #[test]
    fn still_extracts_function_declarations() {
        let src = b"function add(a: number, b: number): number {\n  return a + b;\n}\n";
        let mut parser = TypeScriptParser::new().unwrap();
        let (file, _) = parser.parse("app.ts", src);
        assert!(file.symbols.iter().any(|s| s.name == "add"));
    }
}
