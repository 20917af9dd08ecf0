//! Directory tree rendering for scan results.

use crate::domain::ScanNode;
use std::collections::HashSet;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const GAP: &str = "    ";

/// Render `root` as an ASCII tree. Directories sort before files; selected
/// paths get a marker.
pub fn render_tree(
    root: &ScanNode,
    max_depth: usize,
    include_files: bool,
    selected: &HashSet<String>,
) -> String {
    let renderer = TreeRenderer { max_depth, include_files, selected };
    let label = if root.name.is_empty() { "." } else { root.name.as_str() };
    let mut out = format!("{label}/");
    renderer.children(root, String::new(), 1, &mut out);
    out
}

struct TreeRenderer<'a> {
    max_depth: usize,
    include_files: bool,
    selected: &'a HashSet<String>,
}

impl TreeRenderer<'_> {
    fn children(&self, node: &ScanNode, indent: String, depth: usize, out: &mut String) {
        if depth > self.max_depth {
            return;
        }

        let mut visible: Vec<&ScanNode> =
            node.children.iter().filter(|c| self.include_files || c.is_dir()).collect();
        visible.sort_by(|a, b| (!a.is_dir(), &a.name).cmp(&(!b.is_dir(), &b.name)));

        let mut rest = visible.len();
        for child in visible {
            rest -= 1;
            let last = rest == 0;
            out.push('\n');
            out.push_str(&indent);
            out.push_str(if last { LAST_BRANCH } else { BRANCH });
            out.push_str(&self.label(child));

            if child.is_dir() {
                let nested = format!("{indent}{}", if last { GAP } else { PIPE });
                self.children(child, nested, depth + 1, out);
            }
        }
    }

    fn label(&self, node: &ScanNode) -> String {
        let mut label = node.name.clone();
        if node.is_dir() {
            label.push('/');
        } else if node.is_binary {
            label.push_str(" [binary]");
        }
        if self.selected.contains(&node.path) {
            label.push_str(" *");
        }
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::TreeScanner;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_render_tree_includes_dirs_and_files() {
        let tmp = TempDir::new().expect("tmp dir");
        let root = tmp.path();
        fs::create_dir(root.join("src")).expect("mkdir src");
        fs::write(root.join("src/main.rs"), "fn main() {}\n").expect("write main");
        fs::write(root.join("README.md"), "# Demo\n").expect("write readme");

        let scan = TreeScanner::new(root).scan().expect("scan");
        let selected: HashSet<String> = ["src/main.rs".to_string()].into_iter().collect();
        let tree = render_tree(&scan.tree, 4, true, &selected);
        assert!(tree.contains("├── src/"));
        assert!(tree.contains("main.rs *"));
        assert!(tree.contains("└── README.md"));
    }

    #[test]
    fn test_render_tree_dirs_only_respects_depth() {
        let tmp = TempDir::new().expect("tmp dir");
        let root = tmp.path();
        fs::create_dir_all(root.join("a/b/c")).expect("mkdir");
        fs::write(root.join("a/file.txt"), "x").expect("write");

        let scan = TreeScanner::new(root).scan().expect("scan");
        let tree = render_tree(&scan.tree, 2, false, &HashSet::new());
        assert!(tree.contains("a/"));
        assert!(tree.contains("b/"));
        assert!(!tree.contains("c/"));
        assert!(!tree.contains("file.txt"));
    }
}
