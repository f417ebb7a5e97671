//! Go symbol and dependency extraction (spec.md §4.2, §6).

use crate::parsing::common::{ParsedDependency, ParsedFile, ParsedSymbol, ParserError};
use crate::parsing::import_classifier::is_external;
use crate::parsing::parser::LanguageParser;
use crate::parsing::ts_support::{doc_comment_above, mirror_ast, node_span, node_text};
use crate::parsing::Language;
use crate::types::SymbolKind;
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: &[&str] = &["comment"];

pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| format!("go grammar: {e}"))?;
        Ok(Self { parser })
    }

    fn module_path(source: &[u8], root: Node) -> Option<String> {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if child.kind() == "package_clause" {
                let mut inner = child.walk();
                if let Some(name) = child.named_children(&mut inner).next() {
                    return Some(node_text(name, source).to_string());
                }
            }
        }
        None
    }

    fn walk_symbols(
        &self,
        node: Node,
        source: &[u8],
        symbols: &mut Vec<ParsedSymbol>,
        deps: &mut Vec<ParsedDependency>,
        local_prefixes: &[&str],
    ) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_declaration" => self.collect_imports(child, source, deps, local_prefixes),
                "function_declaration" => {
                    if let Some(sym) = self.function_symbol(child, source, SymbolKind::Function) {
                        self.collect_calls(child, source, &sym.name, deps);
                        symbols.push(sym);
                    }
                }
                "method_declaration" => {
                    if let Some(sym) = self.function_symbol(child, source, SymbolKind::Function) {
                        self.collect_calls(child, source, &sym.name, deps);
                        symbols.push(sym);
                    }
                }
                "type_declaration" => self.collect_type(child, source, symbols, deps),
                _ => self.walk_symbols(child, source, symbols, deps, local_prefixes),
            }
        }
    }

    fn function_symbol(&self, node: Node, source: &[u8], kind: SymbolKind) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let name = node_text(name_node, source).to_string();
        let signature = signature_line(node, source);
        let doc = doc_comment_above(node, source, COMMENT_KINDS);
        let mut sym = ParsedSymbol::new(name, kind, signature, node_span(node));
        if let Some(doc) = doc {
            sym = sym.with_docstring(doc);
        }
        Some(sym)
    }

    fn collect_type(
        &self,
        node: Node,
        source: &[u8],
        symbols: &mut Vec<ParsedSymbol>,
        deps: &mut Vec<ParsedDependency>,
    ) {
        let doc = doc_comment_above(node, source, COMMENT_KINDS);
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let Some(name_node) = spec.child_by_field_name("name") else { continue };
            let name = node_text(name_node, source).to_string();
            let type_node = spec.child_by_field_name("type");
            let kind = match type_node.map(|t| t.kind()) {
                Some("interface_type") => SymbolKind::Interface,
                _ => SymbolKind::Class,
            };
            let signature = format!("type {}", node_text(spec, source));
            let mut sym = ParsedSymbol::new(name.clone(), kind, signature, node_span(spec));
            if let Some(ref doc) = doc {
                sym = sym.with_docstring(doc.clone());
            }
            if let Some(struct_type) = type_node.filter(|t| t.kind() == "struct_type") {
                self.collect_embedded_fields(struct_type, source, &name, deps);
            }
            symbols.push(sym);
        }
    }

    fn collect_embedded_fields(&self, struct_type: Node, source: &[u8], owner: &str, deps: &mut Vec<ParsedDependency>) {
        let Some(field_list) = struct_type.child_by_field_name("body") else { return };
        let mut cursor = field_list.walk();
        for field in field_list.named_children(&mut cursor) {
            if field.kind() != "field_declaration" {
                continue;
            }
            if field.child_by_field_name("name").is_none() {
                if let Some(type_node) = field.child_by_field_name("type") {
                    let embedded = node_text(type_node, source).trim_start_matches('*').to_string();
                    deps.push(ParsedDependency::extends(owner, embedded));
                }
            }
        }
    }

    fn collect_imports(&self, node: Node, source: &[u8], deps: &mut Vec<ParsedDependency>, local_prefixes: &[&str]) {
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            let spec = if spec.kind() == "import_spec_list" {
                let mut inner = spec.walk();
                for s in spec.named_children(&mut inner) {
                    self.push_import_spec(s, source, deps, local_prefixes);
                }
                continue;
            } else {
                spec
            };
            self.push_import_spec(spec, source, deps, local_prefixes);
        }
    }

    fn push_import_spec(&self, spec: Node, source: &[u8], deps: &mut Vec<ParsedDependency>, local_prefixes: &[&str]) {
        if spec.kind() != "import_spec" {
            return;
        }
        let Some(path_node) = spec.child_by_field_name("path") else { return };
        let raw = node_text(path_node, source).trim_matches('"').to_string();
        let external = is_external(&raw, local_prefixes);
        deps.push(ParsedDependency::import(None, raw, external));
    }

    fn collect_calls(&self, node: Node, source: &[u8], owner: &str, deps: &mut Vec<ParsedDependency>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "call_expression" {
                if let Some(func) = child.child_by_field_name("function") {
                    match func.kind() {
                        "selector_expression" => {
                            if let Some(field) = func.child_by_field_name("field") {
                                let mut dep = ParsedDependency::call(owner, node_text(field, source), false);
                                if let Some(operand) = func.child_by_field_name("operand") {
                                    dep = dep.with_target_module(node_text(operand, source));
                                }
                                deps.push(dep);
                            }
                        }
                        "identifier" => {
                            deps.push(ParsedDependency::call(owner, node_text(func, source), false));
                        }
                        _ => {}
                    }
                }
            }
            self.collect_calls(child, source, owner, deps);
        }
    }
}

fn signature_line(node: Node, source: &[u8]) -> String {
    let text = node_text(node, source);
    text.lines().next().unwrap_or(text).trim().to_string()
}

impl LanguageParser for GoParser {
    fn parse(&mut self, path: &str, content: &[u8]) -> (ParsedFile, Vec<ParserError>) {
        let mut errors = Vec::new();
        let Some(tree) = self.parser.parse(content, None) else {
            errors.push(ParserError::parse(path, 1, "go: parser produced no tree"));
            return (ParsedFile::empty(path, Language::Go, content.to_vec()), errors);
        };
        let root = tree.root_node();
        if root.has_error() {
            errors.push(ParserError::parse(path, 1, "go: syntax error recovered partially"));
        }

        let module = Self::module_path(content, root);
        let local_prefixes: Vec<&str> = module.as_deref().into_iter().collect();

        let mut symbols = Vec::new();
        let mut dependencies = Vec::new();
        self.walk_symbols(root, content, &mut symbols, &mut dependencies, &local_prefixes);

        let ast_root = Some(mirror_ast(root, content));

        let file = ParsedFile {
            path: path.to_string(),
            language: Language::Go,
            content: content.to_vec(),
            ast_root,
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
    fn extracts_function_and_import() {
        let src = br#"package main

import "fmt"

// Greet prints a greeting.
func Greet(name string) {
	fmt.Println(name)
}
"#;
        let mut parser = GoParser::new().unwrap();
        let (file, errors) = parser.parse("main.go", src);
        assert!(errors.is_empty());
        assert_eq!(file.symbols.len(), 1);
        assert_eq!(file.symbols[0].name, "Greet");
        assert_eq!(file.symbols[0].docstring.as_deref(), Some("Greet prints a greeting."));
        assert!(file.dependencies.iter().any(|d| d.target_name == "fmt" && d.is_external));
        assert!(file.dependencies.iter().any(|d| d.target_name == "Println"));
    }

    #[test]
    fn classifies_local_import_as_internal() {
        let src = br#"package main

import "github.com/acme/widget/internal/db"
"#;
        let mut parser = GoParser::new().unwrap();
        let (file, _) = parser.parse("main.go", src);
        let dep = file.dependencies.iter().find(|d| d.kind == crate::types::EdgeKind::Import).unwrap();
        assert!(!dep.is_external);
    }

    #[test]
    fn struct_embedding_becomes_extends_edge() {
        let src = br#"package main

type Base struct {
	ID int
}

type Derived struct {
	Base
	Name string
}
"#;
        let mut parser = GoParser::new().unwrap();
        let (file, _) = parser.parse("main.go", src);
        assert!(file
            .dependencies
            .iter()
            .any(|d| d.kind == crate::types::EdgeKind::Extends && d.target_name == "Base"));
    }
}
