//! Python symbol and dependency extraction (spec.md §4.2, §6).

use crate::parsing::common::{ParsedDependency, ParsedFile, ParsedSymbol, ParserError};
use crate::parsing::import_classifier::is_external;
use crate::parsing::parser::LanguageParser;
use crate::parsing::ts_support::{leading_string_docstring, mirror_ast, node_span, node_text};
use crate::parsing::Language;
use crate::types::SymbolKind;
use tree_sitter::{Node, Parser};

const STRING_KINDS: &[&str] = &["string"];

pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| format!("python grammar: {e}"))?;
        Ok(Self { parser })
    }

    fn walk(
        &self,
        node: Node,
        source: &[u8],
        symbols: &mut Vec<ParsedSymbol>,
        deps: &mut Vec<ParsedDependency>,
        enclosing_class: Option<&str>,
    ) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_statement" | "import_from_statement" => self.collect_import(child, source, deps),
                "function_definition" => {
                    if let Some(sym) = self.function_symbol(child, source, enclosing_class) {
                        self.collect_calls(child, source, &sym.name, deps);
                        symbols.push(sym);
                    }
                }
                "class_definition" => {
                    if let Some(sym) = self.class_symbol(child, source, deps) {
                        let name = sym.name.clone();
                        symbols.push(sym);
                        if let Some(body) = child.child_by_field_name("body") {
                            self.walk(body, source, symbols, deps, Some(&name));
                        }
                    }
                }
                _ => self.walk(child, source, symbols, deps, enclosing_class),
            }
        }
    }

    fn function_symbol(&self, node: Node, source: &[u8], owner: Option<&str>) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let raw_name = node_text(name_node, source).to_string();
        let name = match owner {
            Some(class) => format!("{class}.{raw_name}"),
            None => raw_name,
        };
        let params = node
            .child_by_field_name("parameters")
            .map(|p| node_text(p, source).to_string())
            .unwrap_or_default();
        let signature = format!("def {name}{params}");
        let mut sym = ParsedSymbol::new(name, SymbolKind::Function, signature, node_span(node));
        if let Some(body) = node.child_by_field_name("body") {
            if let Some(doc) = leading_string_docstring(body, source, STRING_KINDS) {
                sym = sym.with_docstring(doc);
            }
        }
        Some(sym)
    }

    fn class_symbol(&self, node: Node, source: &[u8], deps: &mut Vec<ParsedDependency>) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let name = node_text(name_node, source).to_string();
        let signature = format!("class {name}");
        let mut sym = ParsedSymbol::new(name.clone(), SymbolKind::Class, signature, node_span(node));
        if let Some(body) = node.child_by_field_name("body") {
            if let Some(doc) = leading_string_docstring(body, source, STRING_KINDS) {
                sym = sym.with_docstring(doc);
            }
        }
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for base in superclasses.named_children(&mut cursor) {
                let base_name = node_text(base, source).to_string();
                if !base_name.is_empty() && base_name != "object" {
                    deps.push(ParsedDependency::extends(&name, base_name));
                }
            }
        }
        Some(sym)
    }

    fn collect_import(&self, node: Node, source: &[u8], deps: &mut Vec<ParsedDependency>) {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    let module = match child.kind() {
                        "dotted_name" => node_text(child, source).to_string(),
                        "aliased_import" => child
                            .child_by_field_name("name")
                            .map(|n| node_text(n, source).to_string())
                            .unwrap_or_default(),
                        _ => continue,
                    };
                    if module.is_empty() {
                        continue;
                    }
                    let external = is_external(&module, &[]);
                    deps.push(ParsedDependency::import(None, module, external));
                }
            }
            "import_from_statement" => {
                let Some(module_node) = node.child_by_field_name("module_name") else { return };
                let module = node_text(module_node, source).to_string();
                let is_relative = module_node.kind() == "relative_import" || module.starts_with('.');
                let external = !is_relative && is_external(&module, &[]);
                deps.push(ParsedDependency::import(None, module, external));
            }
            _ => {}
        }
    }

    fn collect_calls(&self, node: Node, source: &[u8], owner: &str, deps: &mut Vec<ParsedDependency>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "call" {
                if let Some(func) = child.child_by_field_name("function") {
                    let name = match func.kind() {
                        "attribute" => func
                            .child_by_field_name("attribute")
                            .map(|a| node_text(a, source).to_string()),
                        "identifier" => Some(node_text(func, source).to_string()),
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

impl LanguageParser for PythonParser {
    fn parse(&mut self, path: &str, content: &[u8]) -> (ParsedFile, Vec<ParserError>) {
        let mut errors = Vec::new();
        let Some(tree) = self.parser.parse(content, None) else {
            errors.push(ParserError::parse(path, 1, "python: parser produced no tree"));
            return (ParsedFile::empty(path, Language::Python, content.to_vec()), errors);
        };
        let root = tree.root_node();
        if root.has_error() {
            errors.push(ParserError::parse(path, 1, "python: syntax error recovered partially"));
        }

        let mut symbols = Vec::new();
        let mut dependencies = Vec::new();
        self.walk(root, content, &mut symbols, &mut dependencies, None);

        let file = ParsedFile {
            path: path.to_string(),
            language: Language::Python,
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
    fn extracts_function_with_docstring() {
        let src = b"def greet(name):\n    \"\"\"Say hello.\"\"\"\n    print(name)\n";
        let mut parser = PythonParser::new().unwrap();
        let (file, errors) = parser.parse("app.py", src);
        assert!(errors.is_empty());
        assert_eq!(file.symbols.len(), 1);
        assert_eq!(file.symbols[0].name, "greet");
        assert_eq!(file.symbols[0].docstring.as_deref(), Some("Say hello."));
    }

    #[test]
    fn class_inheritance_becomes_extends() {
        let src = b"class Base:\n    pass\n\nclass Derived(Base):\n    pass\n";
        let mut parser = PythonParser::new().unwrap();
        let (file, _) = parser.parse("app.py", src);
        assert!(file
            .dependencies
            .iter()
            .any(|d| d.kind == crate::types::EdgeKind::Extends && d.target_name == "Base"));
    }

    #[test]
    fn relative_import_is_internal() {
        let src = b"from . import utils\n";
        let mut parser = PythonParser::new().unwrap();
        let (file, _) = parser.parse("app.py", src);
        assert!(!file.dependencies[0].is_external);
    }

    #[test]
    fn methods_are_namespaced_by_class() {
        let src = b"class Widget:\n    def render(self):\n        pass\n";
        let mut parser = PythonParser::new().unwrap();
        let (file, _) = parser.parse("app.py", src);
        assert!(file.symbols.iter().any(|s| s.name == "Widget.render"));
    }
}
