//! Swift symbol and dependency extraction (spec.md §4.2, §6).
//!
//! Swift/Objective-C interop happens through bridging headers; within a
//! single file we can only see the Swift side of an `import Foo` bound to
//! an Objective-C framework, so those imports are always external unless
//! they match a caller-supplied local module prefix.

use crate::parsing::common::{ParsedDependency, ParsedFile, ParsedSymbol, ParserError};
use crate::parsing::import_classifier::is_external;
use crate::parsing::parser::LanguageParser;
use crate::parsing::ts_support::{doc_comment_above, mirror_ast, node_span, node_text};
use crate::parsing::Language;
use crate::types::SymbolKind;
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: &[&str] = &["comment", "multiline_comment"];

pub struct SwiftParser {
    parser: Parser,
}

impl SwiftParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_swift::LANGUAGE.into())
            .map_err(|e| format!("swift grammar: {e}"))?;
        Ok(Self { parser })
    }

    fn walk(
        &self,
        node: Node,
        source: &[u8],
        symbols: &mut Vec<ParsedSymbol>,
        deps: &mut Vec<ParsedDependency>,
        local_prefixes: &[&str],
        owner: Option<&str>,
    ) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_declaration" => self.collect_import(child, source, deps, local_prefixes),
                "class_declaration" => self.class_like(child, source, symbols, deps, local_prefixes, owner),
                "protocol_declaration" => self.protocol_like(child, source, symbols, deps, owner),
                "function_declaration" => {
                    if let Some(sym) = self.function_symbol(child, source, owner) {
                        self.collect_calls(child, source, &sym.name, deps);
                        symbols.push(sym);
                    }
                }
                _ => self.walk(child, source, symbols, deps, local_prefixes, owner),
            }
        }
    }

    fn class_like(
        &self,
        node: Node,
        source: &[u8],
        symbols: &mut Vec<ParsedSymbol>,
        deps: &mut Vec<ParsedDependency>,
        local_prefixes: &[&str],
        owner: Option<&str>,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let raw_name = node_text(name_node, source).to_string();
        let name = match owner {
            Some(o) => format!("{o}.{raw_name}"),
            None => raw_name,
        };
        let signature = format!("class {name}");
        let mut sym = ParsedSymbol::new(name.clone(), SymbolKind::Class, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        if let Some(inherits) = node.child_by_field_name("inheritance") {
            let mut cursor = inherits.walk();
            for t in inherits.named_children(&mut cursor) {
                deps.push(ParsedDependency::extends(&name, node_text(t, source)));
            }
        }
        symbols.push(sym);
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body, source, symbols, deps, local_prefixes, Some(&name));
        }
    }

    fn protocol_like(
        &self,
        node: Node,
        source: &[u8],
        symbols: &mut Vec<ParsedSymbol>,
        deps: &mut Vec<ParsedDependency>,
        owner: Option<&str>,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let name = node_text(name_node, source).to_string();
        let signature = format!("protocol {name}");
        let mut sym = ParsedSymbol::new(name.clone(), SymbolKind::Interface, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        if let Some(inherits) = node.child_by_field_name("inheritance") {
            let mut cursor = inherits.walk();
            for t in inherits.named_children(&mut cursor) {
                deps.push(ParsedDependency::implements(&name, node_text(t, source)));
            }
        }
        symbols.push(sym);
        let _ = owner;
    }

    fn function_symbol(&self, node: Node, source: &[u8], owner: Option<&str>) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let raw_name = node_text(name_node, source).to_string();
        let name = match owner {
            Some(o) => format!("{o}.{raw_name}"),
            None => raw_name,
        };
        let params = node
            .child_by_field_name("parameters")
            .map(|p| node_text(p, source).to_string())
            .unwrap_or_default();
        let signature = format!("func {name}{params}");
        let mut sym = ParsedSymbol::new(name, SymbolKind::Function, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        Some(sym)
    }

    fn collect_import(&self, node: Node, source: &[u8], deps: &mut Vec<ParsedDependency>, local_prefixes: &[&str]) {
        let mut cursor = node.walk();
        let Some(path) = node.named_children(&mut cursor).last() else { return };
        let module = node_text(path, source).to_string();
        let external = is_external(&module, local_prefixes);
        deps.push(ParsedDependency::import(None, module, external));
    }

    fn collect_calls(&self, node: Node, source: &[u8], owner: &str, deps: &mut Vec<ParsedDependency>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "call_expression" {
                if let Some(func) = child.child_by_field_name("function") {
                    let name = match func.kind() {
                        "navigation_expression" => func
                            .child_by_field_name("suffix")
                            .map(|n| node_text(n, source).to_string()),
                        "simple_identifier" => Some(node_text(func, source).to_string()),
                        _ => None,
                    };
                    if let Some(name) = name {
                        deps.push(ParsedDependency::call(owner, name, false));
                    }
                }
            }
            self.collect_calls(child, source, owner, deps);
        }
    }
}

impl LanguageParser for SwiftParser {
    fn parse(&mut self, path: &str, content: &[u8]) -> (ParsedFile, Vec<ParserError>) {
        let mut errors = Vec::new();
        let Some(tree) = self.parser.parse(content, None) else {
            errors.push(ParserError::parse(path, 1, "swift: parser produced no tree"));
            return (ParsedFile::empty(path, Language::Swift, content.to_vec()), errors);
        };
        let root = tree.root_node();
        if root.has_error() {
            errors.push(ParserError::parse(path, 1, "swift: syntax error recovered partially"));
        }

        let mut symbols = Vec::new();
        let mut dependencies = Vec::new();
        self.walk(root, content, &mut symbols, &mut dependencies, &[], None);

        let file = ParsedFile {
            path: path.to_string(),
            language: Language::Swift,
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
    fn extracts_class_and_function() {
        let src = br#"import Foundation

/// Renders widgets.
class Widget {
    func render() {
    }
}
"#;
        let mut parser = SwiftParser::new().unwrap();
        let (file, errors) = parser.parse("Widget.swift", src);
        assert!(errors.is_empty());
        assert!(file.symbols.iter().any(|s| s.name == "Widget"));
        assert!(file.symbols.iter().any(|s| s.name == "Widget.render"));
        assert!(file.dependencies.iter().any(|d| d.target_name == "Foundation" && d.is_external));
    }

    #[test]
    fn protocol_conformance_is_implements() {
        let src = b"protocol Renderable {\n}\n\nclass Widget: Renderable {\n}\n";
        let mut parser = SwiftParser::new().unwrap();
        let (file, _) = parser.parse("Widget.swift", src);
        assert!(file
            .dependencies
            .iter()
            .any(|d| d.kind == crate::types::EdgeKind::Extends && d.target_name == "Renderable"));
    }
}
