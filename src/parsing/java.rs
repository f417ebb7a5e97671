//! Java symbol and dependency extraction (spec.md §4.2, §6).

use crate::parsing::common::{ParsedDependency, ParsedFile, ParsedSymbol, ParserError};
use crate::parsing::import_classifier::is_external;
use crate::parsing::parser::LanguageParser;
use crate::parsing::ts_support::{doc_comment_above, mirror_ast, node_span, node_text};
use crate::parsing::Language;
use crate::types::SymbolKind;
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: &[&str] = &["line_comment", "block_comment"];

pub struct JavaParser {
    parser: Parser,
}

impl JavaParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| format!("java grammar: {e}"))?;
        Ok(Self { parser })
    }

    fn package_name(root: Node, source: &[u8]) -> Option<String> {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if child.kind() == "package_declaration" {
                if let Some(name) = child.named_child(0) {
                    return Some(node_text(name, source).to_string());
                }
            }
        }
        None
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
                "class_declaration" | "enum_declaration" | "record_declaration" => {
                    self.class_like(child, source, symbols, deps, local_prefixes, SymbolKind::Class, owner);
                }
                "interface_declaration" => {
                    self.class_like(child, source, symbols, deps, local_prefixes, SymbolKind::Interface, owner);
                }
                "method_declaration" | "constructor_declaration" => {
                    if let Some(sym) = self.method_symbol(child, source, owner) {
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
        kind: SymbolKind,
        owner: Option<&str>,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let raw_name = node_text(name_node, source).to_string();
        let name = match owner {
            Some(o) => format!("{o}.{raw_name}"),
            None => raw_name,
        };
        let signature = format!("class {name}");
        let mut sym = ParsedSymbol::new(name.clone(), kind, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        if let Some(superclass) = node.child_by_field_name("superclass") {
            if let Some(type_node) = superclass.named_child(0) {
                deps.push(ParsedDependency::extends(&name, node_text(type_node, source)));
            }
        }
        if let Some(interfaces) = node.child_by_field_name("interfaces") {
            let mut inner = interfaces.walk();
            for iface in interfaces.named_children(&mut inner) {
                if iface.kind() == "type_list" {
                    let mut tc = iface.walk();
                    for t in iface.named_children(&mut tc) {
                        deps.push(ParsedDependency::implements(&name, node_text(t, source)));
                    }
                } else {
                    deps.push(ParsedDependency::implements(&name, node_text(iface, source)));
                }
            }
        }
        symbols.push(sym);
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body, source, symbols, deps, local_prefixes, Some(&name));
        }
    }

    fn method_symbol(&self, node: Node, source: &[u8], owner: Option<&str>) -> Option<ParsedSymbol> {
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
        let signature = format!("{name}{params}");
        let mut sym = ParsedSymbol::new(name, SymbolKind::Function, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        Some(sym)
    }

    fn collect_import(&self, node: Node, source: &[u8], deps: &mut Vec<ParsedDependency>, local_prefixes: &[&str]) {
        let mut cursor = node.walk();
        let Some(path_node) = node.named_children(&mut cursor).find(|c| c.kind() == "scoped_identifier" || c.kind() == "identifier") else {
            return;
        };
        let module = node_text(path_node, source).to_string();
        let external = is_external(&module, local_prefixes);
        deps.push(ParsedDependency::import(None, module, external));
    }

    fn collect_calls(&self, node: Node, source: &[u8], owner: &str, deps: &mut Vec<ParsedDependency>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "method_invocation" {
                if let Some(name_node) = child.child_by_field_name("name") {
                    deps.push(ParsedDependency::call(owner, node_text(name_node, source), false));
                }
            }
            self.collect_calls(child, source, owner, deps);
        }
    }
}

impl LanguageParser for JavaParser {
    fn parse(&mut self, path: &str, content: &[u8]) -> (ParsedFile, Vec<ParserError>) {
        let mut errors = Vec::new();
        let Some(tree) = self.parser.parse(content, None) else {
            errors.push(ParserError::parse(path, 1, "java: parser produced no tree"));
            return (ParsedFile::empty(path, Language::Java, content.to_vec()), errors);
        };
        let root = tree.root_node();
        if root.has_error() {
            errors.push(ParserError::parse(path, 1, "java: syntax error recovered partially"));
        }

        let package = Self::package_name(root, content);
        let local_prefixes: Vec<&str> = package.as_deref().into_iter().collect();

        let mut symbols = Vec::new();
        let mut dependencies = Vec::new();
        self.walk(root, content, &mut symbols, &mut dependencies, &local_prefixes, None);

        let file = ParsedFile {
            path: path.to_string(),
            language: Language::Java,
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
    fn extracts_class_and_method() {
        let src = br#"package com.acme.widget;

import java.util.List;

/** Renders widgets. */
public class Widget {
    public void render() {
        System.out.println("rendering");
    }
}
"#;
        let mut parser = JavaParser::new().unwrap();
        let (file, errors) = parser.parse("Widget.java", src);
        assert!(errors.is_empty());
        assert!(file.symbols.iter().any(|s| s.name == "Widget" && s.docstring.as_deref() == Some("Renders widgets.")));
        assert!(file.symbols.iter().any(|s| s.name == "Widget.render"));
        assert!(file.dependencies.iter().any(|d| d.target_name == "java.util.List" && d.is_external));
    }

    #[test]
    fn extends_and_implements_edges() {
        let src = br#"package com.acme.widget;

public class Button extends Base implements Clickable, Focusable {
}
"#;
        let mut parser = JavaParser::new().unwrap();
        let (file, _) = parser.parse("Button.java", src);
        assert!(file.dependencies.iter().any(|d| d.kind == crate::types::EdgeKind::Extends && d.target_name == "Base"));
        assert_eq!(
            file.dependencies
                .iter()
                .filter(|d| d.kind == crate::types::EdgeKind::Implements)
                .count(),
            2
        );
    }
}
