//! Shared extraction logic for JavaScript and TypeScript, whose grammars
//! agree on the core expression/statement node kinds. TypeScript adds a
//! handful of its own top-level constructs (interfaces, type aliases,
//! enums) handled by the caller before falling back into this module.

use crate::parsing::common::{ParsedDependency, ParsedSymbol};
use crate::parsing::import_classifier::is_external;
use crate::parsing::ts_support::{doc_comment_above, node_span, node_text};
use crate::types::SymbolKind;
use tree_sitter::Node;

const COMMENT_KINDS: &[&str] = &["comment"];

pub fn walk(
    node: Node,
    source: &[u8],
    symbols: &mut Vec<ParsedSymbol>,
    deps: &mut Vec<ParsedDependency>,
    enclosing_class: Option<&str>,
) {
    walk_with_extra(node, source, symbols, deps, enclosing_class, &mut |_, _, _, _| false)
}

/// Like [`walk`], but `extra` gets first look at every child node. Returning
/// `true` means the callback fully handled that node (and its subtree, if
/// it wants to recurse itself); `false` falls back to the default JS/TS
/// extraction below. Lets TypeScript layer interface/type-alias/enum
/// handling into the same single tree traversal instead of walking twice.
pub fn walk_with_extra<'a>(
    node: Node<'a>,
    source: &[u8],
    symbols: &mut Vec<ParsedSymbol>,
    deps: &mut Vec<ParsedDependency>,
    enclosing_class: Option<&str>,
    extra: &mut dyn FnMut(Node<'a>, &[u8], &mut Vec<ParsedSymbol>, &mut Vec<ParsedDependency>) -> bool,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if extra(child, source, symbols, deps) {
            continue;
        }
        match child.kind() {
            "import_statement" => collect_import(child, source, deps),
            "function_declaration" | "generator_function_declaration" => {
                if let Some(sym) = function_symbol(child, source, enclosing_class) {
                    collect_calls_and_refs(child, source, &sym.name, deps);
                    symbols.push(sym);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                collect_arrow_function_bindings(child, source, symbols, deps, enclosing_class);
            }
            "class_declaration" => {
                if let Some((sym, body)) = class_symbol(child, source, deps) {
                    let name = sym.name.clone();
                    symbols.push(sym);
                    if let Some(body) = body {
                        walk_with_extra(body, source, symbols, deps, Some(&name), extra);
                    }
                }
            }
            "method_definition" => {
                if let Some(sym) = method_symbol(child, source, enclosing_class) {
                    collect_calls_and_refs(child, source, &sym.name, deps);
                    symbols.push(sym);
                }
            }
            _ => walk_with_extra(child, source, symbols, deps, enclosing_class, extra),
        }
    }
}

fn qualify(owner: Option<&str>, name: &str) -> String {
    match owner {
        Some(class) => format!("{class}.{name}"),
        None => name.to_string(),
    }
}

fn function_symbol(node: Node, source: &[u8], owner: Option<&str>) -> Option<ParsedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = qualify(owner, node_text(name_node, source));
    let params = node
        .child_by_field_name("parameters")
        .map(|p| node_text(p, source).to_string())
        .unwrap_or_default();
    let signature = format!("function {name}{params}");
    let mut sym = ParsedSymbol::new(name, SymbolKind::Function, signature, node_span(node));
    if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
        sym = sym.with_docstring(doc);
    }
    Some(sym)
}

fn method_symbol(node: Node, source: &[u8], owner: Option<&str>) -> Option<ParsedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = qualify(owner, node_text(name_node, source));
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

fn class_symbol<'a>(node: Node<'a>, source: &[u8], deps: &mut Vec<ParsedDependency>) -> Option<(ParsedSymbol, Option<Node<'a>>)> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    let signature = format!("class {name}");
    let mut sym = ParsedSymbol::new(name.clone(), SymbolKind::Class, signature, node_span(node));
    if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
        sym = sym.with_docstring(doc);
    }
    if let Some(heritage) = node.child_by_field_name("heritage") {
        walk_heritage(heritage, source, &name, deps);
    } else {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "class_heritage" {
                walk_heritage(child, source, &name, deps);
            }
        }
    }
    Some((sym, node.child_by_field_name("body")))
}

fn walk_heritage(heritage: Node, source: &[u8], owner: &str, deps: &mut Vec<ParsedDependency>) {
    let mut cursor = heritage.walk();
    for clause in heritage.named_children(&mut cursor) {
        let is_implements = clause.kind() == "implements_clause";
        let mut inner = clause.walk();
        for target in clause.named_children(&mut inner) {
            let name = node_text(target, source).to_string();
            if is_implements {
                deps.push(ParsedDependency::implements(owner, name));
            } else {
                deps.push(ParsedDependency::extends(owner, name));
            }
        }
    }
}

fn collect_arrow_function_bindings(
    node: Node,
    source: &[u8],
    symbols: &mut Vec<ParsedSymbol>,
    deps: &mut Vec<ParsedDependency>,
    owner: Option<&str>,
) {
    let mut cursor = node.walk();
    for declarator in node.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = declarator.child_by_field_name("name") else { continue };
        let Some(value) = declarator.child_by_field_name("value") else { continue };
        if !matches!(value.kind(), "arrow_function" | "function_expression") {
            continue;
        }
        let name = qualify(owner, node_text(name_node, source));
        let params = value
            .child_by_field_name("parameters")
            .map(|p| node_text(p, source).to_string())
            .unwrap_or_default();
        let signature = format!("const {name} = {params} =>");
        let mut sym = ParsedSymbol::new(name.clone(), SymbolKind::Function, signature, node_span(declarator));
        if let Some(doc) = doc_comment_above(node, source, COMMENT_KINDS) {
            sym = sym.with_docstring(doc);
        }
        collect_calls_and_refs(value, source, &name, deps);
        symbols.push(sym);
    }
}

fn collect_import(node: Node, source: &[u8], deps: &mut Vec<ParsedDependency>) {
    let Some(source_node) = node.child_by_field_name("source") else { return };
    let module = node_text(source_node, source).trim_matches('"').trim_matches('\'').to_string();
    let external = is_external(&module, &[]);
    deps.push(ParsedDependency::import(None, module, external));
}

fn collect_calls_and_refs(node: Node, source: &[u8], owner: &str, deps: &mut Vec<ParsedDependency>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "call_expression" {
            if let Some(func) = child.child_by_field_name("function") {
                match func.kind() {
                    "member_expression" => {
                        if let Some(prop) = func.child_by_field_name("property") {
                            let mut dep = ParsedDependency::call(owner, node_text(prop, source), false);
                            if let Some(object) = func.child_by_field_name("object") {
                                dep = dep.with_target_module(node_text(object, source));
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
        collect_calls_and_refs(child, source, owner, deps);
    }
}
