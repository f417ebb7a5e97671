//! SchemaMapper: turns parser output into stable, content-addressed graph
//! entities (spec.md §4.3).

use crate::parsing::common::{ParsedAstNode, ParsedFile};
use crate::types::{EdgeKind, FileId, NodeId, SymbolId, SymbolKind};
use crate::types::{EXTERNAL_FILE_ID, EXTERNAL_FILE_PATH, NS_EXTERNAL, NS_FILE, NS_SYMBOL};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

/// Guards AST-node assignment against pathologically deep trees, mirroring
/// [`crate::parsing::parser::MAX_AST_DEPTH`].
pub const MAX_AST_DEPTH: usize = 500;

/// Threshold under which an AST node's source text is inlined, mirroring
/// [`crate::parsing::parser::AST_INLINE_TEXT_THRESHOLD`].
pub const AST_TEXT_THRESHOLD: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedSymbol {
    pub id: SymbolId,
    pub file_id: FileId,
    pub name: String,
    pub kind: SymbolKind,
    pub signature: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_byte: u32,
    pub end_byte: u32,
    pub docstring: Option<String>,
    /// Generated semantic summary, distinct from `docstring` (spec.md §3),
    /// persisted to the `summaries` table rather than alongside `symbols`.
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedAstNode {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub file_id: FileId,
    pub node_type: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_byte: u32,
    pub end_byte: u32,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedFile {
    pub id: FileId,
    pub path: String,
    pub language: crate::parsing::Language,
    pub size: u64,
    pub checksum: String,
    pub symbols: Vec<MappedSymbol>,
    pub ast_nodes: Vec<MappedAstNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedEdge {
    pub id: crate::types::EdgeId,
    pub source_id: SymbolId,
    pub target_id: SymbolId,
    pub kind: EdgeKind,
    pub source_file: FileId,
    pub target_file: Option<FileId>,
    pub target_module: Option<String>,
}

/// A dropped edge whose endpoint could not be resolved, recorded rather
/// than silently discarded (spec.md §4.5 step 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedEdge {
    pub kind: EdgeKind,
    pub source_symbol_name: Option<String>,
    pub target_name: String,
    pub source_file: FileId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapOutput {
    pub files: Vec<MappedFile>,
    pub external_symbols: Vec<MappedSymbol>,
    pub edges: Vec<MappedEdge>,
    pub unresolved: Vec<UnresolvedEdge>,
}

pub fn checksum_hex(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn deterministic_uuid(namespace: Uuid, name: &str) -> Uuid {
    Uuid::new_v5(&namespace, name.as_bytes())
}

pub fn file_id_for(path: &str, checksum: &str) -> FileId {
    FileId::from(deterministic_uuid(NS_FILE, &format!("file:{path}:{checksum}")))
}

pub fn symbol_id_for(file_id: FileId, name: &str, start_line: u32, start_byte: u32) -> SymbolId {
    SymbolId::from(deterministic_uuid(
        NS_SYMBOL,
        &format!("{file_id}:{name}:{start_line}:{start_byte}"),
    ))
}

pub fn external_symbol_id_for(module_name: &str) -> SymbolId {
    SymbolId::from(deterministic_uuid(NS_EXTERNAL, &format!("external:{module_name}")))
}

/// Maps a single file's parser output into entities plus the edges it
/// contributes, given an external-module lookup table shared across the
/// whole batch (so the same module name resolves to the same id in every
/// file that imports it).
pub fn map_file(parsed: &ParsedFile, external_ids: &mut HashMap<String, MappedSymbol>) -> (MappedFile, Vec<MappedEdge>, Vec<UnresolvedEdge>) {
    let checksum = checksum_hex(&parsed.content);
    let file_id = file_id_for(&parsed.path, &checksum);

    let mut local: HashMap<String, SymbolId> = HashMap::new();
    let mut symbols = Vec::with_capacity(parsed.symbols.len());
    for sym in &parsed.symbols {
        let id = symbol_id_for(file_id, &sym.name, sym.span.start_line, sym.span.start_byte);
        local.insert(sym.name.clone(), id);
        symbols.push(MappedSymbol {
            id,
            file_id,
            name: sym.name.clone(),
            kind: sym.kind,
            signature: sym.signature.clone(),
            start_line: sym.span.start_line,
            end_line: sym.span.end_line,
            start_byte: sym.span.start_byte,
            end_byte: sym.span.end_byte,
            docstring: sym.docstring.clone(),
            summary: sym.summary.clone(),
        });
    }

    for dep in &parsed.dependencies {
        if dep.is_external && dep.kind == EdgeKind::Import {
            external_ids.entry(dep.target_name.clone()).or_insert_with(|| MappedSymbol {
                id: external_symbol_id_for(&dep.target_name),
                file_id: EXTERNAL_FILE_ID,
                name: dep.target_name.clone(),
                kind: SymbolKind::ExternalModule,
                signature: dep.target_name.clone(),
                start_line: 1,
                end_line: 1,
                start_byte: 0,
                end_byte: 0,
                docstring: None,
                summary: None,
            });
        }
    }

    let ast_nodes = parsed
        .ast_root
        .as_ref()
        .map(|root| assign_ast_ids(root, file_id, None))
        .unwrap_or_default();

    let mut edges = Vec::new();
    let mut unresolved = Vec::new();
    for dep in &parsed.dependencies {
        let source_id = match &dep.source_symbol_name {
            Some(name) => local.get(name).copied(),
            None => symbols.first().map(|s| s.id),
        };
        let Some(source_id) = source_id else {
            unresolved.push(UnresolvedEdge {
                kind: dep.kind,
                source_symbol_name: dep.source_symbol_name.clone(),
                target_name: dep.target_name.clone(),
                source_file: file_id,
            });
            continue;
        };

        let target_id = if let Some(local_id) = local.get(&dep.target_name) {
            Some(*local_id)
        } else if dep.is_external {
            external_ids.get(&dep.target_name).map(|s| s.id)
        } else {
            external_ids
                .get(&dep.target_name)
                .map(|s| s.id)
                .or_else(|| external_ids.get(dep.target_module.as_deref().unwrap_or(&dep.target_name)).map(|s| s.id))
        };

        let Some(target_id) = target_id else {
            unresolved.push(UnresolvedEdge {
                kind: dep.kind,
                source_symbol_name: dep.source_symbol_name.clone(),
                target_name: dep.target_name.clone(),
                source_file: file_id,
            });
            continue;
        };

        edges.push(MappedEdge {
            id: crate::types::EdgeId::new_random(),
            source_id,
            target_id,
            kind: dep.kind,
            source_file: file_id,
            target_file: None,
            target_module: dep.target_module.clone(),
        });
    }

    let mapped_file = MappedFile {
        id: file_id,
        path: parsed.path.clone(),
        language: parsed.language,
        size: parsed.content.len() as u64,
        checksum,
        symbols,
        ast_nodes,
    };

    (mapped_file, edges, unresolved)
}

/// Maps a whole parse batch, resolving cross-file external-module
/// references against a single shared table (spec.md §4.3 step 3).
pub fn map_all(parsed_files: &[ParsedFile]) -> MapOutput {
    let mut external_ids: HashMap<String, MappedSymbol> = HashMap::new();
    // First pass: register every external module any file imports, so a
    // file processed early can still resolve a call into a module another
    // file imports later in iteration order.
    for parsed in parsed_files {
        for dep in &parsed.dependencies {
            if dep.is_external && dep.kind == EdgeKind::Import {
                external_ids.entry(dep.target_name.clone()).or_insert_with(|| MappedSymbol {
                    id: external_symbol_id_for(&dep.target_name),
                    file_id: EXTERNAL_FILE_ID,
                    name: dep.target_name.clone(),
                    kind: SymbolKind::ExternalModule,
                    signature: dep.target_name.clone(),
                    start_line: 1,
                    end_line: 1,
                    start_byte: 0,
                    end_byte: 0,
                    docstring: None,
                    summary: None,
                });
            }
        }
    }

    let mut output = MapOutput::default();
    for parsed in parsed_files {
        let (file, edges, unresolved) = map_file(parsed, &mut external_ids);
        output.files.push(file);
        output.edges.extend(edges);
        output.unresolved.extend(unresolved);
    }
    output.external_symbols = external_ids.into_values().collect();
    output
}

fn assign_ast_ids(root: &ParsedAstNode, file_id: FileId, parent_id: Option<NodeId>) -> Vec<MappedAstNode> {
    struct Frame<'a> {
        node: &'a ParsedAstNode,
        parent_id: Option<NodeId>,
        depth: usize,
    }

    let mut out = Vec::new();
    let mut stack = vec![Frame { node: root, parent_id, depth: 0 }];
    while let Some(frame) = stack.pop() {
        let id = NodeId::new_random();
        out.push(MappedAstNode {
            id,
            parent_id: frame.parent_id,
            file_id,
            node_type: frame.node.node_type.clone(),
            start_line: frame.node.span.start_line,
            end_line: frame.node.span.end_line,
            start_byte: frame.node.span.start_byte,
            end_byte: frame.node.span.end_byte,
            text: frame.node.text.clone(),
        });
        if frame.depth >= MAX_AST_DEPTH {
            continue;
        }
        for child in &frame.node.children {
            stack.push(Frame {
                node: child,
                parent_id: Some(id),
                depth: frame.depth + 1,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::common::{ParsedDependency, ParsedSymbol};
    use crate::parsing::Language;
    use crate::types::Span;

    fn make_parsed() -> ParsedFile {
        let mut file = ParsedFile::empty("a.go", Language::Go, b"package main\n".to_vec());
        file.symbols.push(ParsedSymbol::new(
            "Greet",
            SymbolKind::Function,
            "func Greet()",
            Span::new(3, 5, 10, 40),
        ));
        file.dependencies.push(ParsedDependency::import(None, "fmt", true));
        file.dependencies.push(ParsedDependency::call("Greet", "Println", false));
        file
    }

    #[test]
    fn file_id_is_deterministic() {
        let parsed = make_parsed();
        let checksum = checksum_hex(&parsed.content);
        let a = file_id_for(&parsed.path, &checksum);
        let b = file_id_for(&parsed.path, &checksum);
        assert_eq!(a, b);
    }

    #[test]
    fn symbol_ids_stable_across_runs() {
        let parsed = make_parsed();
        let mut ext1 = HashMap::new();
        let (file1, _, _) = map_file(&parsed, &mut ext1);
        let mut ext2 = HashMap::new();
        let (file2, _, _) = map_file(&parsed, &mut ext2);
        assert_eq!(file1.symbols[0].id, file2.symbols[0].id);
        assert_eq!(file1.id, file2.id);
    }

    #[test]
    fn external_import_materializes_virtual_symbol() {
        let parsed = make_parsed();
        let output = map_all(std::slice::from_ref(&parsed));
        assert_eq!(output.external_symbols.len(), 1);
        assert_eq!(output.external_symbols[0].name, "fmt");
        assert_eq!(output.external_symbols[0].file_id, EXTERNAL_FILE_ID);
        assert_eq!(output.external_symbols[0].id, external_symbol_id_for("fmt"));
    }

    #[test]
    fn unresolved_call_is_collected_not_dropped_silently() {
        let parsed = make_parsed();
        let output = map_all(std::slice::from_ref(&parsed));
        assert!(output.unresolved.iter().any(|u| u.target_name == "Println"));
    }

    #[test]
    fn moving_a_symbol_changes_its_id() {
        let mut parsed = make_parsed();
        let mut ext = HashMap::new();
        let (before, _, _) = map_file(&parsed, &mut ext);
        parsed.symbols[0].span = Span::new(4, 6, 11, 41);
        let (after, _, _) = map_file(&parsed, &mut ext);
        assert_ne!(before.symbols[0].id, after.symbols[0].id);
    }

    #[test]
    fn ast_nodes_get_parent_links() {
        let mut file = ParsedFile::empty("a.go", Language::Go, b"x".to_vec());
        file.ast_root = Some(ParsedAstNode {
            node_type: "source_file".into(),
            span: Span::new(1, 1, 0, 1),
            text: None,
            children: vec![ParsedAstNode {
                node_type: "ident".into(),
                span: Span::new(1, 1, 0, 1),
                text: Some("x".into()),
                children: vec![],
            }],
        });
        let mut ext = HashMap::new();
        let (mapped, _, _) = map_file(&file, &mut ext);
        assert_eq!(mapped.ast_nodes.len(), 2);
        let root = mapped.ast_nodes.iter().find(|n| n.parent_id.is_none()).unwrap();
        let child = mapped.ast_nodes.iter().find(|n| n.parent_id.is_some()).unwrap();
        assert_eq!(child.parent_id, Some(root.id));
    }

    #[test]
    fn sentinel_file_path_constant() {
        assert_eq!(EXTERNAL_FILE_PATH, "__external__");
    }
}
