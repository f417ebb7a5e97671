//! C++ symbol and dependency extraction (spec.md §4.2, §6, §9).

use crate::parsing::common::{ParsedDependency, ParsedFile, ParsedSymbol, ParserError};
use crate::parsing::parser::LanguageParser;
use crate::parsing::ts_support::{doc_comment_above, mirror_ast, node_span, node_text};
use crate::parsing::Language;
use crate::types::SymbolKind;
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: &[&str] = &["comment"];

pub struct CppParser {
    parser: Parser,
}

impl CppParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .map_err(|e| format!("cpp grammar: {e}"))?;
        Ok(Self { parser })
    }

    fn walk(
        &self,
        node: Node,
        source: &[u8],
        symbols: &mut Vec<ParsedSymbol>,
        deps: &mut Vec<ParsedDependency>,
        owner: Option<&str>,
    ) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "preproc_include" => collect_include(child, source, deps),
                "namespace_definition" => {
                    let ns_name = child
                        .child_by_field_name("name")
                        .map(|n| node_text(n, source).to_string());
                    if let Some(body) = child.child_by_field_name("body") {
                        self.walk(body, source, symbols, deps, ns_name.as_deref().or(owner));
                    }
                }
                "class_specifier" | "struct_specifier" => {
                    self.class_like(child, source, symbols, deps, owner);
                }
                "function_definition" => {
                    if let Some(sym) = function_symbol(child, source, owner) {
                        collect_calls(child, source, &sym.name, deps);
                        symbols.push(sym);
                    }
                }
                _ => self.walk(child, source, symbols, deps, owner),
            }
        }
    }

    fn class_like(
        &self,
        node: Node,
        source: &[u8],
        symbols: &mut Vec<ParsedSymbol>,
        deps: &mut Vec<ParsedDependency>,
        owner: Option<&str>,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let raw_name = node_text(name_node, source).to_string();
        let name = match owner {
            Some(o) => format!("{o}::{raw_name}"),
            None => raw_name,
        };
        let signature = format!("class {name}");
        let mut sym = ParsedSymbol::new(name.clone(), SymbolKind::Class, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        if let Some(base_clause) = node.child_by_field_name("base_class_clause") {
            let mut cursor = base_clause.walk();
            for base in base_clause.named_children(&mut cursor) {
                let base_name = node_text(base, source)
                    .trim_start_matches("public")
                    .trim_start_matches("private")
                    .trim_start_matches("protected")
                    .trim()
                    .to_string();
                if !base_name.is_empty() {
                    deps.push(ParsedDependency::extends(&name, base_name));
                }
            }
        }
        symbols.push(sym);
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body, source, symbols, deps, Some(&name));
        }
    }
}

fn function_symbol(node: Node, source: &[u8], owner: Option<&str>) -> Option<ParsedSymbol> {
    let declarator = node.child_by_field_name("declarator")?;
    let name_node = find_identifier(declarator)?;
    let raw_name = node_text(name_node, source).to_string();
    let name = match owner {
        Some(o) => format!("{o}::{raw_name}"),
        None => raw_name,
    };
    let signature = node_text(declarator, source).to_string();
    let mut sym = ParsedSymbol::new(name, SymbolKind::Function, signature, node_span(node));
    if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
        sym = sym.with_docstring(doc);
    }
    Some(sym)
}

fn find_identifier(node: Node) -> Option<Node> {
    if matches!(node.kind(), "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name") {
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
                let name = match func.kind() {
                    "field_expression" => func
                        .child_by_field_name("field")
                        .map(|f| node_text(f, source).to_string()),
                    "identifier" | "qualified_identifier" => Some(node_text(func, source).to_string()),
                    _ => None,
                };
                if let Some(name) = name {
                    deps.push(ParsedDependency::call(owner, name, false));
                }
            }
        }
        collect_calls(child, source, owner, deps);
    }
}

impl LanguageParser for CppParser {
    fn parse(&mut self, path: &str, content: &[u8]) -> (ParsedFile, Vec<ParserError>) {
        let mut errors = Vec::new();
        let Some(tree) = self.parser.parse(content, None) else {
            errors.push(ParserError::parse(path, 1, "cpp: parser produced no tree"));
            return (ParsedFile::empty(path, Language::Cpp, content.to_vec()), errors);
        };
        let root = tree.root_node();
        if root.has_error() {
            errors.push(ParserError::parse(path, 1, "cpp: syntax error recovered partially"));
        }

        let mut symbols = Vec::new();
        let mut dependencies = Vec::new();
        self.walk(root, content, &mut symbols, &mut dependencies, None);

        let file = ParsedFile {
            path: path.to_string(),
            language: Language::Cpp,
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
    fn extracts_class_and_method_in_namespace() {
        let src = br#"#include <string>

namespace acme {

/// Renders widgets.
class Widget : public Base {
public:
    void render() {
        helper();
    }
};

}
"#;
        let mut parser = CppParser::new().unwrap();
        let (file, errors) = parser.parse("widget.cpp", src);
        assert!(errors.is_empty());
        assert!(file.symbols.iter().any(|s| s.name == "acme::Widget"));
        assert!(file.symbols.iter().any(|s| s.name == "acme::Widget::render"));
        assert!(file
            .dependencies
            .iter()
            .any(|d| d.kind == crate::types::EdgeKind::Extends && d.target_name == "Base"));
        assert!(file.dependencies.iter().any(|d| d.target_name == "string" && d.is_external));
    }
}
