//! Shared helpers: path handling, classification, hashing and token estimates.

pub mod classify;
pub mod hashing;
pub mod language;
pub mod paths;
pub mod text;
pub mod tokens;

pub use classify::{categorize_file, is_binary_file, is_binary_prefix, BINARY_PROBE_BYTES};
pub use hashing::sha256_hex;
pub use language::language_for_path;
pub use paths::{contained_path, normalize_path, normalize_relative, resolve_lenient};
pub use text::{clip, escape_literal, line_at, line_number};
pub use tokens::{estimate_tokens, truncate_to_tokens};
