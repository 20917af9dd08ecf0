//! Tree scanner: walks a source root into a typed, classified `ScanNode` tree.

use crate::domain::{NodeKind, ScanNode, ScanResult, ScanStats};
use crate::error::{ExtractError, Result};
use crate::scan::stack::{detect_stack, manifest_stack};
use crate::utils::{
    categorize_file, is_binary_file, language_for_path, normalize_path, BINARY_PROBE_BYTES,
};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Folder and file names excluded from scans at any depth.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".github",
    ".gitlab",
    ".svn",
    ".hg",
    "node_modules",
    "dist",
    "build",
    "target",
    ".next",
    ".nuxt",
    ".cache",
    ".turbo",
    "venv",
    ".venv",
    "env",
    ".mypy_cache",
    ".pytest_cache",
    "__pycache__",
    ".idea",
    ".vscode",
    ".DS_Store",
    "Thumbs.db",
];

pub fn default_excludes() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
}

/// Walks a source tree without following symlinks.
pub struct TreeScanner {
    root_path: PathBuf,
    excludes: Vec<String>,
    respect_gitignore: bool,
    probe_bytes: usize,
}

struct Entry {
    rel_path: String,
    kind: NodeKind,
    size: u64,
    is_binary: bool,
    path: PathBuf,
}

impl TreeScanner {
    /// Create a new TreeScanner with default exclusions.
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            excludes: default_excludes(),
            respect_gitignore: false,
            probe_bytes: BINARY_PROBE_BYTES,
        }
    }

    /// Replace the exclusion set. Entries are names or name globs (`*.egg-info`).
    pub fn excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Set whether to honor `.gitignore` files
    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    /// Set how many leading bytes are probed for binary detection
    pub fn probe_bytes(mut self, bytes: usize) -> Self {
        self.probe_bytes = bytes.max(1);
        self
    }

    fn build_exclude_globset(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excludes {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!("Ignoring invalid exclude pattern {:?}: {}", pattern, e),
            }
        }
        builder.build().map_err(|e| ExtractError::Config(format!("exclude patterns: {e}")))
    }

    /// Scan the tree. Children are sorted by name at every level.
    pub fn scan(&self) -> Result<ScanResult> {
        let root = self
            .root_path
            .canonicalize()
            .map_err(|_| ExtractError::InvalidRoot { path: self.root_path.clone() })?;
        if !root.is_dir() {
            return Err(ExtractError::InvalidRoot { path: self.root_path.clone() });
        }
        debug!("Scanning {}", root.display());

        let excludes = Arc::new(self.build_exclude_globset()?);
        let skipped_excluded = Arc::new(AtomicUsize::new(0));

        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        {
            let excludes = Arc::clone(&excludes);
            let skipped = Arc::clone(&skipped_excluded);
            builder.filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let excluded = entry.file_name().to_str().is_some_and(|n| excludes.is_match(n));
                if excluded {
                    skipped.fetch_add(1, Ordering::Relaxed);
                }
                !excluded
            });
        }

        let mut stats = ScanStats::default();
        let mut entries: Vec<Entry> = Vec::new();

        for entry_result in builder.build() {
            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            if entry.path_is_symlink() {
                stats.skipped_symlinks += 1;
                continue;
            }

            let path = entry.path();
            let rel_path = match path.strip_prefix(&root) {
                Ok(p) => normalize_path(&p.to_string_lossy()),
                Err(_) => continue,
            };
            let Some(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                stats.dirs += 1;
                entries.push(Entry {
                    rel_path,
                    kind: NodeKind::Dir,
                    size: 0,
                    is_binary: false,
                    path: path.to_path_buf(),
                });
            } else if file_type.is_file() {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                let is_binary = is_binary_file(path, self.probe_bytes);
                stats.files += 1;
                stats.total_bytes += size;
                if is_binary {
                    stats.binary_files += 1;
                }
                if let Some(language) = language_for_path(path) {
                    *stats.languages.entry(language.to_string()).or_insert(0) += 1;
                }
                entries.push(Entry {
                    rel_path,
                    kind: NodeKind::File,
                    size,
                    is_binary,
                    path: path.to_path_buf(),
                });
            }
        }
        stats.skipped_excluded = skipped_excluded.load(Ordering::Relaxed);

        let mut tree = ScanNode {
            name: root.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string(),
            path: String::new(),
            kind: NodeKind::Dir,
            size: 0,
            is_binary: false,
            category: None,
            tags: BTreeSet::new(),
            children: Vec::new(),
        };
        for entry in entries {
            insert_entry(&mut tree, entry);
        }
        finalize_dir(&mut tree);

        let stack = detect_stack(&root);
        let revision = source_revision(&root);
        debug!(
            "Scanned {} files, {} dirs, {} bytes ({} symlinks skipped, {} excluded)",
            stats.files, stats.dirs, stats.total_bytes, stats.skipped_symlinks, stats.skipped_excluded
        );

        Ok(ScanResult {
            root,
            tree,
            stats,
            stack,
            revision,
            excludes: self.excludes.clone(),
        })
    }
}

/// Scan `root` with default settings.
pub fn scan_tree(root: impl AsRef<Path>) -> Result<ScanResult> {
    TreeScanner::new(root.as_ref()).scan()
}

fn insert_entry(tree: &mut ScanNode, entry: Entry) {
    let segments: Vec<&str> = entry.rel_path.split('/').collect();
    let Some((name, parents)) = segments.split_last() else {
        return;
    };

    let mut current = tree;
    for segment in parents {
        let position = current.children.iter().position(|c| c.name == *segment);
        current = match position {
            Some(idx) => &mut current.children[idx],
            // The walk yields parents before children; a miss means the parent was pruned.
            None => return,
        };
    }

    let mut tags = BTreeSet::new();
    let category = match entry.kind {
        NodeKind::File => {
            if let Some(language) = language_for_path(&entry.path) {
                tags.insert(format!("lang:{language}"));
            }
            if let Some(stack) = manifest_stack(name) {
                tags.insert(format!("manifest:{stack}"));
            }
            Some(categorize_file(name, &entry.rel_path))
        }
        NodeKind::Dir => None,
    };

    current.children.push(ScanNode {
        name: name.to_string(),
        path: entry.rel_path.clone(),
        kind: entry.kind,
        size: entry.size,
        is_binary: entry.is_binary,
        category,
        tags,
        children: Vec::new(),
    });
}

/// Roll file sizes up into directories and tag directories holding manifests.
fn finalize_dir(node: &mut ScanNode) -> u64 {
    if node.is_file() {
        return node.size;
    }
    let mut total = 0;
    let mut stacks = BTreeSet::new();
    for child in &mut node.children {
        total += finalize_dir(child);
        if child.is_file() {
            if let Some(stack) = manifest_stack(&child.name) {
                stacks.insert(format!("stack:{stack}"));
            }
        }
    }
    node.size = total;
    node.tags.extend(stacks);
    total
}

fn source_revision(root: &Path) -> Option<String> {
    let repo = match git2::Repository::discover(root) {
        Ok(repo) => repo,
        Err(e) => {
            debug!("No git repository around {}: {}", root.display(), e.message());
            return None;
        }
    };
    let head = repo.head().ok()?;
    let commit = head.peel_to_commit().ok()?;
    Some(commit.id().to_string())
}
