//! Structural match/rewrite capability.
//!
//! `comby` is used when it is installed; otherwise a template engine that
//! understands the common `:[hole]` syntax rewrites matched spans directly.

use crate::domain::PatternRule;
use crate::utils::escape_literal;
use fancy_regex::Regex as FancyRegex;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

/// Result of one rule applied to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteResult {
    Rewritten(String),
    NoMatch,
    /// The engine could not run for this file; content passes through unchanged.
    Unavailable(String),
}

pub trait StructuralRewriter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Apply `rule` to `content`. `rel_path` is only used as a language hint.
    fn rewrite(&self, content: &str, rel_path: &str, rule: &PatternRule) -> RewriteResult;
}

/// Matcher argument for a file, e.g. `.py`. Unknown extensions use comby's generic matcher.
fn matcher_for(rel_path: &str) -> String {
    Path::new(rel_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_else(|| ".generic".to_string())
}

pub struct CombyRewriter {
    binary: PathBuf,
    timeout: Duration,
}

impl CombyRewriter {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { binary: binary.into(), timeout }
    }

    /// Locate `comby` on `PATH` and check that it starts.
    pub fn detect(timeout: Duration) -> Option<Self> {
        let binary = find_on_path("comby")?;
        let mut child = Command::new(&binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .ok()?;
        match child.wait_timeout(timeout).ok()? {
            Some(status) if status.success() => Some(Self::new(binary, timeout)),
            Some(_) => None,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                None
            }
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl StructuralRewriter for CombyRewriter {
    fn name(&self) -> &'static str {
        "comby"
    }

    fn rewrite(&self, content: &str, rel_path: &str, rule: &PatternRule) -> RewriteResult {
        let matcher = matcher_for(rel_path);
        debug!("comby {:?} -> {:?} ({})", rule.pattern, rule.rewrite, matcher);

        let mut child = match Command::new(&self.binary)
            .arg(&rule.pattern)
            .arg(&rule.rewrite)
            .args(["-stdin", "-stdout", "-matcher", matcher.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return RewriteResult::Unavailable(format!("failed to spawn comby: {e}")),
        };

        // Feed stdin and drain the pipes on their own threads so a large file
        // cannot deadlock against a full pipe buffer.
        let input = content.as_bytes().to_vec();
        let stdin = child.stdin.take();
        let writer = thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                let _ = stdin.write_all(&input);
            }
        });
        let stdout = child.stdout.take();
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stdout) = stdout {
                let _ = stdout.read_to_end(&mut buf);
            }
            buf
        });
        let stderr = child.stderr.take();
        let err_reader = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf);
            }
            buf
        });

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return RewriteResult::Unavailable(format!(
                    "comby timed out after {} ms",
                    self.timeout.as_millis()
                ));
            }
            Err(e) => return RewriteResult::Unavailable(format!("comby wait failed: {e}")),
        };

        let _ = writer.join();
        let output = reader.join().unwrap_or_default();
        let stderr = err_reader.join().unwrap_or_default();

        if !status.success() {
            return RewriteResult::Unavailable(format!(
                "comby exited with {}: {}",
                status.code().unwrap_or(-1),
                stderr.trim()
            ));
        }
        match String::from_utf8(output) {
            // comby prints nothing when there is no match.
            Ok(out) if out.is_empty() || out == content => RewriteResult::NoMatch,
            Ok(out) => RewriteResult::Rewritten(out),
            Err(_) => RewriteResult::Unavailable("comby produced non-UTF-8 output".to_string()),
        }
    }
}

static HOLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":\[\[(\w+)\]\]|:\[(\w+)\]").expect("valid regex"));

enum Piece<'a> {
    Literal(&'a str),
    /// `:[name]` lazily matches anything; `:[[name]]` matches one identifier.
    Hole { name: &'a str, identifier: bool },
}

fn split_template(template: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for caps in HOLE.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            pieces.push(Piece::Literal(&template[last..whole.start()]));
        }
        match (caps.get(1), caps.get(2)) {
            (Some(name), _) => pieces.push(Piece::Hole { name: name.as_str(), identifier: true }),
            (None, Some(name)) => {
                pieces.push(Piece::Hole { name: name.as_str(), identifier: false })
            }
            _ => {}
        }
        last = whole.end();
    }
    if last < template.len() {
        pieces.push(Piece::Literal(&template[last..]));
    }
    pieces
}

/// Compile a match template: literal runs of whitespace match any whitespace,
/// repeated hole names must match the same text.
fn compile_template(template: &str) -> Result<(FancyRegex, HashMap<String, usize>), String> {
    let mut pattern = String::new();
    let mut groups: HashMap<String, usize> = HashMap::new();
    let mut next_group = 1;

    for piece in split_template(template) {
        match piece {
            Piece::Literal(text) => {
                let mut in_space = false;
                for ch in text.chars() {
                    if ch.is_whitespace() {
                        if !in_space {
                            pattern.push_str(r"\s+");
                        }
                        in_space = true;
                    } else {
                        in_space = false;
                        pattern.push_str(&escape_literal(&ch.to_string()));
                    }
                }
            }
            Piece::Hole { name: "_", identifier } => {
                pattern.push_str(if identifier { r"\w+" } else { r"[\s\S]*?" });
            }
            Piece::Hole { name, identifier } => {
                if let Some(index) = groups.get(name) {
                    pattern.push_str(&format!(r"\{index}"));
                } else {
                    groups.insert(name.to_string(), next_group);
                    next_group += 1;
                    pattern.push_str(if identifier { r"(\w+)" } else { r"([\s\S]*?)" });
                }
            }
        }
    }

    if pattern.is_empty() {
        return Err("empty match template".to_string());
    }
    let regex = FancyRegex::new(&pattern).map_err(|e| format!("invalid match template: {e}"))?;
    Ok((regex, groups))
}

fn render_rewrite(rewrite: &str, captured: &HashMap<&str, &str>) -> String {
    HOLE.replace_all(rewrite, |caps: &regex::Captures<'_>| {
        let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
        captured.get(name).map(|s| s.to_string()).unwrap_or_default()
    })
    .into_owned()
}

/// In-process rewriter for the `:[hole]` template subset.
#[derive(Debug, Default)]
pub struct TemplateRewriter;

impl StructuralRewriter for TemplateRewriter {
    fn name(&self) -> &'static str {
        "template"
    }

    fn rewrite(&self, content: &str, _rel_path: &str, rule: &PatternRule) -> RewriteResult {
        let (regex, groups) = match compile_template(&rule.pattern) {
            Ok(compiled) => compiled,
            Err(e) => return RewriteResult::Unavailable(e),
        };

        let mut out = String::with_capacity(content.len());
        let mut last = 0;
        let mut matched = false;
        for caps in regex.captures_iter(content) {
            let caps = match caps {
                Ok(caps) => caps,
                Err(e) => return RewriteResult::Unavailable(format!("template match failed: {e}")),
            };
            let Some(whole) = caps.get(0) else { continue };
            if whole.as_str().is_empty() {
                continue;
            }
            let captured: HashMap<&str, &str> = groups
                .iter()
                .filter_map(|(name, idx)| caps.get(*idx).map(|m| (name.as_str(), m.as_str())))
                .collect();
            out.push_str(&content[last..whole.start()]);
            out.push_str(&render_rewrite(&rule.rewrite, &captured));
            last = whole.end();
            matched = true;
        }
        if !matched {
            return RewriteResult::NoMatch;
        }
        out.push_str(&content[last..]);
        if out == content {
            RewriteResult::NoMatch
        } else {
            RewriteResult::Rewritten(out)
        }
    }
}

/// Used when structural rewriting is switched off.
#[derive(Debug, Default)]
pub struct DisabledRewriter;

impl StructuralRewriter for DisabledRewriter {
    fn name(&self) -> &'static str {
        "none"
    }

    fn rewrite(&self, _content: &str, _rel_path: &str, _rule: &PatternRule) -> RewriteResult {
        RewriteResult::Unavailable("structural rewriting is disabled".to_string())
    }
}

pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).map(|dir| dir.join(program)).find(|candidate| {
        candidate.is_file() || (cfg!(windows) && candidate.with_extension("exe").is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, rewrite: &str) -> PatternRule {
        PatternRule { pattern: pattern.into(), rewrite: rewrite.into(), languages: Vec::new() }
    }

    #[test]
    fn test_template_swaps_arguments() {
        let r = TemplateRewriter;
        let out = r.rewrite("x = legacy_call(a, b)\n", "app.py", &rule("legacy_call(:[x], :[y])", "modern_call(:[y], :[x])"));
        assert_eq!(out, RewriteResult::Rewritten("x = modern_call(b, a)\n".into()));
    }

    #[test]
    fn test_template_whitespace_is_flexible() {
        let r = TemplateRewriter;
        let out = r.rewrite("if  (ready) {}", "a.js", &rule("if (:[c])", "when (:[c])"));
        assert_eq!(out, RewriteResult::Rewritten("when (ready) {}".into()));
    }

    #[test]
    fn test_template_identifier_hole_and_repeats() {
        let r = TemplateRewriter;
        let input = "a = a + 1; b = c + 1;";
        let out = r.rewrite(input, "a.js", &rule(":[[v]] = :[[v]] + 1", ":[v] += 1"));
        assert_eq!(out, RewriteResult::Rewritten("a += 1; b = c + 1;".into()));
    }

    #[test]
    fn test_template_no_match() {
        let r = TemplateRewriter;
        assert_eq!(r.rewrite("nothing here", "a.py", &rule("foo(:[x])", "bar(:[x])")), RewriteResult::NoMatch);
    }

    #[test]
    fn test_disabled_reports_unavailable() {
        let r = DisabledRewriter;
        assert!(matches!(r.rewrite("x", "a.py", &rule("x", "y")), RewriteResult::Unavailable(_)));
    }

    #[test]
    fn test_matcher_for_extension() {
        assert_eq!(matcher_for("src/app.PY"), ".py");
        assert_eq!(matcher_for("Makefile"), ".generic");
    }

    #[test]
    fn test_missing_comby_binary_is_unavailable() {
        let r = CombyRewriter::new("/nonexistent/comby", Duration::from_millis(100));
        assert!(matches!(r.rewrite("x", "a.py", &rule("x", "y")), RewriteResult::Unavailable(_)));
    }
}
