//! Shared tree-sitter plumbing used by every per-language parser: AST
//! mirroring, span conversion, and doc-comment attachment by scanning
//! preceding sibling comment nodes.

use crate::parsing::parser::{clean_doc_comment, safe_truncate_str, AST_INLINE_TEXT_THRESHOLD, MAX_AST_DEPTH};
use crate::types::Span;
use tree_sitter::Node;

pub fn node_span(node: Node) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(
        start.row as u32 + 1,
        end.row as u32 + 1,
        node.start_byte() as u32,
        node.end_byte() as u32,
    )
}

pub fn node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.start_byte()..node.end_byte()]).unwrap_or_default()
}

/// Mirrors a tree-sitter parse tree into our grammar-agnostic `ParsedAstNode`
/// tree, iteratively to respect `MAX_AST_DEPTH` without risking a native
/// stack overflow on pathological input.
pub fn mirror_ast(root: Node, source: &[u8]) -> crate::parsing::common::ParsedAstNode {
    use crate::parsing::common::ParsedAstNode;

    let mut stack: Vec<Frame> = vec![Frame {
        node: root,
        depth: 0,
        children_done: 0,
        out: ParsedAstNode {
            node_type: root.kind().to_string(),
            span: node_span(root),
            text: inline_text(root, source),
            children: Vec::new(),
        },
    }];
    let mut finished: Option<ParsedAstNode> = None;

    while let Some(frame) = stack.last_mut() {
        if frame.depth >= MAX_AST_DEPTH {
            let done = stack.pop().unwrap().out;
            attach_or_finish(&mut stack, done, &mut finished);
            continue;
        }
        let mut cursor = frame.node.walk();
        let children: Vec<Node> = frame.node.named_children(&mut cursor).collect();
        if frame.children_done < children.len() {
            let child = children[frame.children_done];
            frame.children_done += 1;
            let depth = frame.depth + 1;
            stack.push(Frame {
                node: child,
                depth,
                children_done: 0,
                out: ParsedAstNode {
                    node_type: child.kind().to_string(),
                    span: node_span(child),
                    text: inline_text(child, source),
                    children: Vec::new(),
                },
            });
        } else {
            let done = stack.pop().unwrap().out;
            attach_or_finish(&mut stack, done, &mut finished);
        }
    }

    finished.expect("root frame always produces a finished node")
}

fn attach_or_finish(
    stack: &mut [Frame],
    done: crate::parsing::common::ParsedAstNode,
    finished: &mut Option<crate::parsing::common::ParsedAstNode>,
) {
    if let Some(parent) = stack.last_mut() {
        parent.out.children.push(done);
    } else {
        *finished = Some(done);
    }
}

struct Frame<'a> {
    node: Node<'a>,
    depth: usize,
    children_done: usize,
    out: crate::parsing::common::ParsedAstNode,
}

fn inline_text(node: Node, source: &[u8]) -> Option<String> {
    let len = node.end_byte().saturating_sub(node.start_byte());
    if len == 0 || len > AST_INLINE_TEXT_THRESHOLD || node.named_child_count() > 0 {
        return None;
    }
    let text = node_text(node, source);
    Some(safe_truncate_str(text, AST_INLINE_TEXT_THRESHOLD).to_string())
}

/// Scans backward over consecutive comment-kind siblings immediately
/// preceding `node`, concatenating and cleaning them into a docstring.
/// `comment_kinds` lists the grammar's node kinds that count as comments.
pub fn doc_comment_above<'a>(node: Node<'a>, source: &[u8], comment_kinds: &[&str]) -> Option<String> {
    let mut comments = Vec::new();
    let mut cursor = node.prev_sibling();
    while let Some(sibling) = cursor {
        if comment_kinds.contains(&sibling.kind()) {
            comments.push(node_text(sibling, source).to_string());
            cursor = sibling.prev_sibling();
        } else {
            break;
        }
    }
    if comments.is_empty() {
        return None;
    }
    comments.reverse();
    let joined = comments.join("\n");
    let cleaned = clean_doc_comment(&joined);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Python-style docstring: the first statement in a body is a bare string
/// expression, rather than a preceding comment.
pub fn leading_string_docstring(body: Node, source: &[u8], string_kinds: &[&str]) -> Option<String> {
    let mut cursor = body.walk();
    let first = body.named_children(&mut cursor).next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let mut inner_cursor = first.walk();
    let inner = first.named_children(&mut inner_cursor).next()?;
    if !string_kinds.contains(&inner.kind()) {
        return None;
    }
    let cleaned = clean_doc_comment(node_text(inner, source));
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
