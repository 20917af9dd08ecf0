//! Scan output types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Dir,
}

/// Coarse role of a file inside the project, used by the UI and the assistant context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Source,
    Test,
    Doc,
    Config,
    Asset,
    Build,
    Other,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Test => "test",
            Self::Doc => "doc",
            Self::Config => "config",
            Self::Asset => "asset",
            Self::Build => "build",
            Self::Other => "other",
        }
    }
}

/// One entry of the walked tree. Paths are relative to the scan root and use `/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanNode {
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    /// File size, or the sum of all descendant file sizes for directories.
    pub size: u64,
    #[serde(default)]
    pub is_binary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FileCategory>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ScanNode>,
}

impl ScanNode {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    /// Depth-first lookup by relative path. The empty string (or ".") is the root.
    pub fn find(&self, rel_path: &str) -> Option<&ScanNode> {
        let wanted = rel_path.trim_matches('/');
        if wanted.is_empty() || wanted == "." {
            return Some(self);
        }
        let mut current = self;
        for segment in wanted.split('/').filter(|s| !s.is_empty() && *s != ".") {
            current = current.children.iter().find(|c| c.name == segment)?;
        }
        Some(current)
    }

    /// All file nodes at or below this node, in tree (sorted) order.
    pub fn files(&self) -> Vec<&ScanNode> {
        let mut out = Vec::new();
        collect_files(self, &mut out);
        out
    }
}

fn collect_files<'a>(node: &'a ScanNode, out: &mut Vec<&'a ScanNode>) {
    match node.kind {
        NodeKind::File => out.push(node),
        NodeKind::Dir => {
            for child in &node.children {
                collect_files(child, out);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub files: usize,
    pub dirs: usize,
    pub total_bytes: u64,
    pub binary_files: usize,
    pub skipped_symlinks: usize,
    pub skipped_excluded: usize,
    pub languages: BTreeMap<String, usize>,
}

/// Technology-stack signals derived from manifest files at the scan root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackSignals {
    pub indicators: BTreeMap<String, bool>,
    pub detected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub root: PathBuf,
    pub tree: ScanNode,
    pub stats: ScanStats,
    pub stack: StackSignals,
    /// HEAD commit of the enclosing git repository, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub excludes: Vec<String>,
}

impl ScanResult {
    pub fn find(&self, rel_path: &str) -> Option<&ScanNode> {
        self.tree.find(rel_path)
    }

    pub fn files(&self) -> Vec<&ScanNode> {
        self.tree.files()
    }
}
