//! Objective-C and Objective-C++ symbol and dependency extraction
//! (spec.md §4.2, §6, §9).
//!
//! Objective-C++ (`.mm`) is parsed twice: once with the Objective-C grammar
//! (for `@interface`/`@implementation`/message sends) and once with the C++
//! grammar (for embedded classes/namespaces), then merged by `(name,
//! start_line)` so a symbol discovered by both passes is kept once.

use crate::parsing::common::{ParsedDependency, ParsedFile, ParsedSymbol, ParserError};
use crate::parsing::parser::LanguageParser;
use crate::parsing::ts_support::{doc_comment_above, mirror_ast, node_span, node_text};
use crate::parsing::{Language, ParserFactory};
use crate::types::SymbolKind;
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: &[&str] = &["comment"];

pub struct ObjcParser {
    language: Language,
    parser: Parser,
    cpp_fallback: Option<Box<dyn LanguageParser>>,
}

impl ObjcParser {
    pub fn new(language: Language) -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_objc::LANGUAGE.into())
            .map_err(|e| format!("objc grammar: {e}"))?;
        let cpp_fallback = if language == Language::ObjcCpp {
            Some(ParserFactory::create(Language::Cpp)?)
        } else {
            None
        };
        Ok(Self { language, parser, cpp_fallback })
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
                "preproc_import" | "preproc_include" => collect_import(child, source, deps),
                "class_interface" | "class_implementation" => {
                    self.interface_like(child, source, symbols, deps, SymbolKind::Class);
                }
                "protocol_declaration" => {
                    self.interface_like(child, source, symbols, deps, SymbolKind::Interface);
                }
                "method_definition" => {
                    if let Some(sym) = method_symbol(child, source, owner) {
                        symbols.push(sym);
                    }
                }
                _ => self.walk(child, source, symbols, deps, owner),
            }
        }
    }

    fn interface_like(
        &self,
        node: Node,
        source: &[u8],
        symbols: &mut Vec<ParsedSymbol>,
        deps: &mut Vec<ParsedDependency>,
        kind: SymbolKind,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let name = node_text(name_node, source).to_string();
        let signature = format!("@interface {name}");
        let mut sym = ParsedSymbol::new(name.clone(), kind, signature, node_span(node));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        if let Some(superclass) = node.child_by_field_name("superclass") {
            deps.push(ParsedDependency::extends(&name, node_text(superclass, source)));
        }
        if let Some(protocols) = node.child_by_field_name("protocols") {
            let mut cursor = protocols.walk();
            for p in protocols.named_children(&mut cursor) {
                deps.push(ParsedDependency::implements(&name, node_text(p, source)));
            }
        }
        symbols.push(sym);
        self.walk(node, source, symbols, deps, Some(&name));
    }
}

fn method_symbol(node: Node, source: &[u8], owner: Option<&str>) -> Option<ParsedSymbol> {
    let selector = node
        .children(&mut node.walk())
        .find(|c| c.kind() == "method_selector" || c.kind() == "selector")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_else(|| node_text(node, source).lines().next().unwrap_or("").to_string());
    let name = match owner {
        Some(o) => format!("{o}.{selector}"),
        None => selector,
    };
    let mut sym = ParsedSymbol::new(name, SymbolKind::Function, node_text(node, source).lines().next().unwrap_or("").trim().to_string(), node_span(node));
    if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
        sym = sym.with_docstring(doc);
    }
    Some(sym)
}

fn collect_import(node: Node, source: &[u8], deps: &mut Vec<ParsedDependency>) {
    let Some(path_node) = node.child_by_field_name("path") else { return };
    let raw = node_text(path_node, source);
    let is_quoted = path_node.kind() == "string_literal";
    let target = raw.trim_matches('"').trim_start_matches('<').trim_end_matches('>').to_string();
    deps.push(ParsedDependency::import(None, target, !is_quoted));
}

fn merge_symbols(primary: Vec<ParsedSymbol>, secondary: Vec<ParsedSymbol>) -> Vec<ParsedSymbol> {
    let mut merged = primary;
    for candidate in secondary {
        let duplicate = merged
            .iter()
            .any(|s| s.name == candidate.name && s.span.start_line == candidate.span.start_line);
        if !duplicate {
            merged.push(candidate);
        }
    }
    merged
}

fn merge_deps(primary: Vec<ParsedDependency>, secondary: Vec<ParsedDependency>) -> Vec<ParsedDependency> {
    let mut merged = primary;
    for candidate in secondary {
        if !merged.contains(&candidate) {
            merged.push(candidate);
        }
    }
    merged
}

impl LanguageParser for ObjcParser {
    fn parse(&mut self, path: &str, content: &[u8]) -> (ParsedFile, Vec<ParserError>) {
        // Objective-C++ (`.mm`) tries the C++ grammar first (it covers
        // embedded classes/namespaces) and falls back to the Objective-C
        // grammar for `@interface`/`@implementation`/message sends,
        // merging by `(name, start_line)` (spec.md §9).
        if let Some(ref mut cpp_parser) = self.cpp_fallback {
            let (cpp_file, mut errors) = cpp_parser.parse(path, content);
            let Some(tree) = self.parser.parse(content, None) else {
                errors.push(ParserError::parse(path, 1, "objc: parser produced no tree"));
                return (cpp_file, errors);
            };
            let root = tree.root_node();
            if root.has_error() {
                errors.push(ParserError::parse(path, 1, "objc: syntax error recovered partially"));
            }
            let mut objc_symbols = Vec::new();
            let mut objc_dependencies = Vec::new();
            self.walk(root, content, &mut objc_symbols, &mut objc_dependencies, None);

            let file = ParsedFile {
                path: path.to_string(),
                language: self.language,
                content: content.to_vec(),
                ast_root: cpp_file.ast_root,
                symbols: merge_symbols(cpp_file.symbols, objc_symbols),
                dependencies: merge_deps(cpp_file.dependencies, objc_dependencies),
            };
            return (file, errors);
        }

        let mut errors = Vec::new();
        let Some(tree) = self.parser.parse(content, None) else {
            errors.push(ParserError::parse(path, 1, "objc: parser produced no tree"));
            return (ParsedFile::empty(path, self.language, content.to_vec()), errors);
        };
        let root = tree.root_node();
        if root.has_error() {
            errors.push(ParserError::parse(path, 1, "objc: syntax error recovered partially"));
        }

        let mut symbols = Vec::new();
        let mut dependencies = Vec::new();
        self.walk(root, content, &mut symbols, &mut dependencies, None);
        let ast_root = Some(mirror_ast(root, content));

        let file = ParsedFile {
            path: path.to_string(),
            language: self.language,
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
    fn extracts_interface_and_superclass() {
        let src = br#"#import <Foundation/Foundation.h>

/** A widget view. */
@interface Widget : NSObject <NSCopying>
- (void)render;
@end
"#;
        let mut parser = ObjcParser::new(Language::Objc).unwrap();
        let (file, errors) = parser.parse("Widget.m", src);
        assert!(errors.is_empty());
        assert!(file.symbols.iter().any(|s| s.name == "Widget"));
        assert!(file
            .dependencies
            .iter()
            .any(|d| d.kind == crate::types::EdgeKind::Extends && d.target_name == "NSObject"));
        assert!(file.dependencies.iter().any(|d| d.target_name == "Foundation/Foundation.h" && d.is_external));
    }

    #[test]
    fn objc_cpp_merges_both_grammars() {
        let src = br#"#import <Foundation/Foundation.h>

namespace acme {
class Helper {
public:
    void assist() {}
};
}

@interface Widget : NSObject
@end
"#;
        let mut parser = ObjcParser::new(Language::ObjcCpp).unwrap();
        let (file, _) = parser.parse("Widget.mm", src);
        assert!(file.symbols.iter().any(|s| s.name == "Widget"));
        assert!(file.symbols.iter().any(|s| s.name.contains("Helper")));
    }
}
