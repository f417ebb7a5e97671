//! Kotlin symbol and dependency extraction (spec.md §4.2, §6).
//!
//! Kotlin packages freely call into Java types (interop is bidirectional in
//! practice, though only Kotlin's side is visible to a single-file parse),
//! so imports are classified against the same package-prefix rule as Java.

use crate::parsing::common::{ParsedDependency, ParsedFile, ParsedSymbol, ParserError};
use crate::parsing::import_classifier::is_external;
use crate::parsing::parser::LanguageParser;
use crate::parsing::ts_support::{doc_comment_above, mirror_ast, node_span, node_text};
use crate::parsing::Language;
use crate::types::SymbolKind;
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: &[&str] = &["line_comment", "multiline_comment"];

pub struct KotlinParser {
    parser: Parser,
}

impl KotlinParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_kotlin_codanna::language())
            .map_err(|e| format!("kotlin grammar: {e}"))?;
        Ok(Self { parser })
    }

    fn package_name(root: Node, source: &[u8]) -> Option<String> {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if child.kind() == "package_header" {
                if let Some(ident) = child.named_child(0) {
                    return Some(node_text(ident, source).to_string());
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
                "import_header" => self.collect_import(child, source, deps, local_prefixes),
                "class_declaration" => self.class_like(child, source, symbols, deps, local_prefixes, owner),
                "object_declaration" => self.class_like(child, source, symbols, deps, local_prefixes, owner),
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
        let is_interface = node
            .children(&mut node.walk())
            .any(|c| c.kind() == "interface");
        let kind = if is_interface { SymbolKind::Interface } else { SymbolKind::Class };
        let signature = format!("class {name}");
        let mut sym = ParsedSymbol::new(name.clone(), kind, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        if let Some(delegation) = node.child_by_field_name("delegation_specifiers") {
            let mut cursor = delegation.walk();
            for spec in delegation.named_children(&mut cursor) {
                let target = node_text(spec, source).split('(').next().unwrap_or("").trim().to_string();
                if target.is_empty() {
                    continue;
                }
                if is_interface {
                    deps.push(ParsedDependency::implements(&name, target));
                } else {
                    deps.push(ParsedDependency::extends(&name, target));
                }
            }
        }
        symbols.push(sym);
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body, source, symbols, deps, local_prefixes, Some(&name));
        }
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
        let signature = format!("fun {name}{params}");
        let mut sym = ParsedSymbol::new(name, SymbolKind::Function, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        Some(sym)
    }

    fn collect_import(&self, node: Node, source: &[u8], deps: &mut Vec<ParsedDependency>, local_prefixes: &[&str]) {
        let Some(path) = node.named_child(0) else { return };
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
                            .named_child(func.named_child_count().saturating_sub(1) as u32)
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

impl LanguageParser for KotlinParser {
    fn parse(&mut self, path: &str, content: &[u8]) -> (ParsedFile, Vec<ParserError>) {
        let mut errors = Vec::new();
        let Some(tree) = self.parser.parse(content, None) else {
            errors.push(ParserError::parse(path, 1, "kotlin: parser produced no tree"));
            return (ParsedFile::empty(path, Language::Kotlin, content.to_vec()), errors);
        };
        let root = tree.root_node();
        if root.has_error() {
            errors.push(ParserError::parse(path, 1, "kotlin: syntax error recovered partially"));
        }

        let package = Self::package_name(root, content);
        let local_prefixes: Vec<&str> = package.as_deref().into_iter().collect();

        let mut symbols = Vec::new();
        let mut dependencies = Vec::new();
        self.walk(root, content, &mut symbols, &mut dependencies, &local_prefixes, None);

        let file = ParsedFile {
            path: path.to_string(),
            language: Language::Kotlin,
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
        let src = br#"package com.acme.widget

import java.util.List

/** Renders widgets. */
class Widget {
    fun render() {
        println("rendering")
    }
}
"#;
        let mut parser = KotlinParser::new().unwrap();
        let (file, errors) = parser.parse("Widget.kt", src);
        assert!(errors.is_empty());
        assert!(file.symbols.iter().any(|s| s.name == "Widget"));
        assert!(file.symbols.iter().any(|s| s.name == "Widget.render"));
        assert!(file.dependencies.iter().any(|d| d.target_name == "java.util.List" && d.is_external));
    }

    #[test]
    fn top_level_function_has_no_owner_prefix() {
        let src = b"package com.acme.widget\n\nfun main() {\n}\n";
        let mut parser = KotlinParser::new().unwrap();
        let (file, _) = parser.parse("Main.kt", src);
        assert!(file.symbols.iter().any(|s| s.name == "main"));
    }
}
