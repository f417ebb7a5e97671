//! JavaScript symbol and dependency extraction (spec.md §4.2, §6).

use crate::parsing::common::{ParsedFile, ParserError};
use crate::parsing::js_family::walk;
use crate::parsing::parser::LanguageParser;
use crate::parsing::ts_support::mirror_ast;
use crate::parsing::Language;
use tree_sitter::Parser;

pub struct JavaScriptParser {
    parser: Parser,
}

impl JavaScriptParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .map_err(|e| format!("javascript grammar: {e}"))?;
        Ok(Self { parser })
    }
}

impl LanguageParser for JavaScriptParser {
    fn parse(&mut self, path: &str, content: &[u8]) -> (ParsedFile, Vec<ParserError>) {
        let mut errors = Vec::new();
        let Some(tree) = self.parser.parse(content, None) else {
            errors.push(ParserError::parse(path, 1, "javascript: parser produced no tree"));
            return (ParsedFile::empty(path, Language::JavaScript, content.to_vec()), errors);
        };
        let root = tree.root_node();
        if root.has_error() {
            errors.push(ParserError::parse(path, 1, "javascript: syntax error recovered partially"));
        }

        let mut symbols = Vec::new();
        let mut dependencies = Vec::new();
        walk(root, content, &mut symbols, &mut dependencies, None);

        let file = ParsedFile {
            path: path.to_string(),
            language: Language::JavaScript,
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
    fn extracts_function_declaration_and_import() {
        let src = br#"import { readFile } from "node:fs";

/** Greets a user. */
function greet(name) {
  console.log(name);
}
"#;
        let mut parser = JavaScriptParser::new().unwrap();
        let (file, errors) = parser.parse("app.js", src);
        assert!(errors.is_empty());
        assert_eq!(file.symbols.len(), 1);
        assert_eq!(file.symbols[0].name, "greet");
        assert_eq!(file.symbols[0].docstring.as_deref(), Some("Greets a user."));
        assert!(file.dependencies.iter().any(|d| d.target_name == "node:fs" && d.is_external));
    }

    #[test]
    fn extracts_class_with_extends() {
        let src = b"class Base {}\nclass Widget extends Base {\n  render() {}\n}\n";
        let mut parser = JavaScriptParser::new().unwrap();
        let (file, _) = parser.parse("app.js", src);
        assert!(file.symbols.iter().any(|s| s.name == "Widget"));
        assert!(file.symbols.iter().any(|s| s.name == "Widget.render"));
        assert!(file
            .dependencies
            .iter()
            .any(|d| d.kind == crate::types::EdgeKind::Extends && d.target_name == "Base"));
    }

    #[test]
    fn arrow_function_binding_is_a_symbol() {
        let src = b"const handleClick = (event) => {\n  doSomething();\n};\n";
        let mut parser = JavaScriptParser::new().unwrap();
        let (file, _) = parser.parse("app.js", src);
        assert!(file.symbols.iter().any(|s| s.name == "handleClick"));
    }
}
