//! Syntax-aware import rewriter built on tree-sitter.

use super::fallback::specifier_ranges;
use super::{rewrite_ranges, ImportOutcome, ImportRewriter, SpecifierRenamer};
use std::ops::Range;
use tracing::debug;
use tree_sitter::{Language, Node, Parser};

pub fn supported_languages() -> &'static [&'static str] {
    &["python", "javascript", "typescript", "rust", "go"]
}

fn grammar_for(language: &str, rel_path: &str) -> Option<Language> {
    let language = match language {
        "python" => tree_sitter_python::LANGUAGE.into(),
        "javascript" => tree_sitter_javascript::LANGUAGE.into(),
        "typescript" if rel_path.to_lowercase().ends_with(".tsx") => {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        }
        "typescript" => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        "rust" => tree_sitter_rust::LANGUAGE.into(),
        "go" => tree_sitter_go::LANGUAGE.into(),
        _ => return None,
    };
    Some(language)
}

/// Byte range of a string literal without its quotes.
fn string_body(node: Node<'_>) -> Option<Range<usize>> {
    let (start, end) = (node.start_byte(), node.end_byte());
    (end >= start + 2).then(|| start + 1..end - 1)
}

fn python_specifiers(node: Node<'_>, out: &mut Vec<Range<usize>>) {
    match node.kind() {
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                if module.kind() == "dotted_name" {
                    out.push(module.byte_range());
                }
            }
            return;
        }
        "import_statement" => {
            for i in 0..node.named_child_count() {
                let Some(child) = node.named_child(i) else { continue };
                match child.kind() {
                    "dotted_name" => out.push(child.byte_range()),
                    "aliased_import" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            out.push(name.byte_range());
                        }
                    }
                    _ => {}
                }
            }
            return;
        }
        _ => {}
    }
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            python_specifiers(child, out);
        }
    }
}

fn js_specifiers(node: Node<'_>, out: &mut Vec<Range<usize>>) {
    if matches!(node.kind(), "import_statement" | "export_statement") {
        if let Some(source) = node.child_by_field_name("source") {
            out.extend(string_body(source));
        }
    }
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            js_specifiers(child, out);
        }
    }
}

/// `require("x")` and `import("x")` calls: the first argument when it is a plain string.
fn js_loader_calls(node: Node<'_>, source: &[u8], out: &mut Vec<Range<usize>>) {
    if node.kind() == "call_expression" {
        let is_loader = node.child_by_field_name("function").is_some_and(|f| {
            f.kind() == "import"
                || (f.kind() == "identifier" && f.utf8_text(source).is_ok_and(|t| t == "require"))
        });
        if is_loader {
            let first_arg = node
                .child_by_field_name("arguments")
                .and_then(|args| args.named_child(0))
                .filter(|arg| arg.kind() == "string");
            if let Some(arg) = first_arg {
                out.extend(string_body(arg));
            }
        }
    }
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            js_loader_calls(child, source, out);
        }
    }
}

/// Leftmost path segment of a `use` argument: the crate name.
fn rust_root_segment(mut node: Node<'_>) -> Option<Node<'_>> {
    loop {
        let next = match node.kind() {
            "scoped_identifier" | "scoped_use_list" | "use_as_clause" => {
                node.child_by_field_name("path")
            }
            "use_wildcard" => node.named_child(0),
            "identifier" => return Some(node),
            _ => return None,
        };
        node = next?;
    }
}

fn rust_specifiers(node: Node<'_>, out: &mut Vec<Range<usize>>) {
    match node.kind() {
        "use_declaration" => {
            if let Some(root) = node.child_by_field_name("argument").and_then(rust_root_segment) {
                out.push(root.byte_range());
            }
            return;
        }
        "extern_crate_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                out.push(name.byte_range());
            }
            return;
        }
        _ => {}
    }
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            rust_specifiers(child, out);
        }
    }
}

fn go_specifiers(node: Node<'_>, out: &mut Vec<Range<usize>>) {
    if node.kind() == "import_spec" {
        if let Some(path) = node.child_by_field_name("path") {
            out.extend(string_body(path));
        }
        return;
    }
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            go_specifiers(child, out);
        }
    }
}

#[derive(Debug, Default)]
pub struct TreeSitterImportRewriter;

impl TreeSitterImportRewriter {
    pub fn new() -> Self {
        Self
    }

    /// Specifier ranges from a clean parse, or `None` when the grammar is
    /// missing or the file does not parse without errors.
    fn parse_ranges(content: &str, language: &str, rel_path: &str) -> Option<Vec<Range<usize>>> {
        let grammar = grammar_for(language, rel_path)?;
        let mut parser = Parser::new();
        parser.set_language(&grammar).ok()?;
        let tree = parser.parse(content, None)?;
        let root = tree.root_node();
        if root.has_error() {
            return None;
        }

        let mut ranges = Vec::new();
        match language {
            "python" => python_specifiers(root, &mut ranges),
            "javascript" | "typescript" => {
                js_specifiers(root, &mut ranges);
                js_loader_calls(root, content.as_bytes(), &mut ranges);
            }
            "rust" => rust_specifiers(root, &mut ranges),
            "go" => go_specifiers(root, &mut ranges),
            _ => return None,
        }
        Some(ranges)
    }
}

impl ImportRewriter for TreeSitterImportRewriter {
    fn name(&self) -> &'static str {
        "native"
    }

    fn rewrite_imports(
        &self,
        content: &str,
        language: &str,
        rel_path: &str,
        renamer: &SpecifierRenamer,
    ) -> ImportOutcome {
        if let Some(ranges) = Self::parse_ranges(content, language, rel_path) {
            return ImportOutcome {
                content: rewrite_ranges(content, ranges, renamer),
                warnings: Vec::new(),
            };
        }

        debug!("Falling back to line-based import fix for {}", rel_path);
        match specifier_ranges(content, language) {
            Some(ranges) => ImportOutcome {
                content: rewrite_ranges(content, ranges, renamer),
                warnings: vec![format!(
                    "{rel_path}: could not parse as {language}; used line-based import fix"
                )],
            },
            None => ImportOutcome {
                content: content.to_string(),
                warnings: vec![format!("no import rules for language '{language}'")],
            },
        }
    }
}
