//! Source tree scanning: classified node tree, stats and stack signals.

pub mod scanner;
pub mod stack;
pub mod tree;

pub use scanner::{default_excludes, scan_tree, TreeScanner, DEFAULT_EXCLUDES};
pub use stack::detect_stack;
pub use tree::render_tree;
