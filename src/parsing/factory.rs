//! Dispatches a `Language` tag to its `LanguageParser` implementation.

use crate::parsing::parser::LanguageParser;
use crate::parsing::{
    c::CParser, cpp::CppParser, go::GoParser, java::JavaParser, javascript::JavaScriptParser,
    kotlin::KotlinParser, objc::ObjcParser, python::PythonParser, swift::SwiftParser,
    typescript::TypeScriptParser, Language,
};

/// Creates a fresh parser instance for a language. Parsers are cheap to
/// construct (one `tree_sitter::Parser` each) so the pool builds one per
/// file rather than sharing across threads.
pub struct ParserFactory;

impl ParserFactory {
    pub fn create(language: Language) -> Result<Box<dyn LanguageParser>, String> {
        match language {
            Language::Go => Ok(Box::new(GoParser::new()?)),
            Language::JavaScript => Ok(Box::new(JavaScriptParser::new()?)),
            Language::TypeScript => Ok(Box::new(TypeScriptParser::new()?)),
            Language::Python => Ok(Box::new(PythonParser::new()?)),
            Language::Java => Ok(Box::new(JavaParser::new()?)),
            Language::Kotlin => Ok(Box::new(KotlinParser::new()?)),
            Language::Swift => Ok(Box::new(SwiftParser::new()?)),
            Language::C => Ok(Box::new(CParser::new()?)),
            Language::Cpp => Ok(Box::new(CppParser::new()?)),
            Language::Objc | Language::ObjcCpp => Ok(Box::new(ObjcParser::new(language)?)),
        }
    }
}
