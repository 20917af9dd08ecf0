//! Secret scrub rules
//!
//! ORDER MATTERS: prefixed token rules come before the named-key rules so a
//! recognizable token is replaced wherever it appears, even outside an assignment.
//! Every replacement keeps the key name and quoting and only swaps the value
//! for [`PLACEHOLDER`], which no rule matches again.

use once_cell::sync::Lazy;
use regex::Regex;

pub const PLACEHOLDER: &str = "<REDACTED>";

const NAMED_KEYS: &str = "API[_-]?KEY|SECRET[_-]?KEY|AUTH[_-]?TOKEN|ACCESS[_-]?TOKEN|PASSWORD|PASSWD|DATABASE_URL|SENTRY_DSN|PRIVATE[_-]?KEY|CLIENT[_-]?SECRET";

#[derive(Debug, Clone)]
pub struct SecretRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: &'static str,
    /// Capture group holding the secret value; 0 is the whole match.
    pub value_group: usize,
}

fn rule(
    name: &'static str,
    pattern: &str,
    replacement: &'static str,
    value_group: usize,
) -> SecretRule {
    SecretRule { name, pattern: Regex::new(pattern).expect("valid regex"), replacement, value_group }
}

pub static DEFAULT_RULES: Lazy<Vec<SecretRule>> = Lazy::new(|| {
    vec![
        // ── Cloud keys ───────────────────────────────────────────────────────────
        rule("aws_access_key", r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b", PLACEHOLDER, 0),
        rule(
            "aws_secret_key",
            r#"(?i)(aws[_\-]?secret[_\-]?(?:access[_\-]?)?key['"]?\s*[:=]\s*['"]?)([A-Za-z0-9/+=]{40})"#,
            "${1}<REDACTED>",
            2,
        ),
        rule("google_api_key", r"\bAIza[0-9A-Za-z\-_]{35}", PLACEHOLDER, 0),
        // ── Prefixed tokens ──────────────────────────────────────────────────────
        rule("openai_key", r"\bsk-(?:proj-)?[A-Za-z0-9_\-]{16,}", PLACEHOLDER, 0),
        rule("github_token", r"\bgh[pousr]_[A-Za-z0-9]{20,}\b", PLACEHOLDER, 0),
        rule("gitlab_token", r"\bglpat-[A-Za-z0-9\-_]{20,}", PLACEHOLDER, 0),
        rule("slack_token", r"\bxox[baprs]-[0-9A-Za-z\-]{10,}", PLACEHOLDER, 0),
        rule("stripe_key", r"\b[sr]k_(?:live|test)_[A-Za-z0-9]{16,}\b", PLACEHOLDER, 0),
        rule("npm_token", r"\bnpm_[A-Za-z0-9]{36}\b", PLACEHOLDER, 0),
        rule("pypi_token", r"\bpypi-[A-Za-z0-9\-_]{50,}", PLACEHOLDER, 0),
        rule(
            "jwt_token",
            r"\beyJ[A-Za-z0-9\-_]+\.eyJ[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+",
            PLACEHOLDER,
            0,
        ),
        // ── Private keys (PEM body only) ─────────────────────────────────────────
        rule(
            "private_key_block",
            r"(-----BEGIN [A-Z ]*PRIVATE KEY-----)([\s\S]*?)(-----END [A-Z ]*PRIVATE KEY-----)",
            "${1}\n<REDACTED>\n${3}",
            2,
        ),
        // ── Connection strings ───────────────────────────────────────────────────
        rule(
            "connection_string",
            r"((?:postgres(?:ql)?|mysql|mariadb|mongodb(?:\+srv)?|redis|amqp)://[^:/\s@]+:)([^@\s]+)(@)",
            "${1}<REDACTED>${3}",
            2,
        ),
        // ── Named keys with a quoted value ───────────────────────────────────────
        rule(
            "named_key_quoted",
            &format!(
                r#"(?i)(\b[A-Za-z0-9_]*(?:{NAMED_KEYS})\b['"]?\s*[:=]\s*)(['"])([^'"\n]+)(['"])"#
            ),
            "${1}${2}<REDACTED>${4}",
            3,
        ),
        // ── Env-style named keys (`KEY=value`, optionally exported) ─────────────
        // No spaces around `=`, and the whole rest of the line must be one bare
        // literal, so code such as `KEY = os.environ[..]` or `KEY=load()` is left alone.
        rule(
            "named_key_env",
            &format!(
                r##"(?m)^(\s*(?:export\s+)?[A-Z0-9_]*(?:{NAMED_KEYS})=)([^\s'"#()\[\]]+)([ \t]*(?:#[^\n]*)?\r?)$"##
            ),
            "${1}<REDACTED>${3}",
            2,
        ),
    ]
});

/// `UPPER_CASE = "value"` assignments, checked for entropy after the named rules.
pub static ENTROPY_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^(\s*[A-Z_][A-Z0-9_]{2,}\s*[=:]\s*["'])([^"'\n]{21,})(["'])"#)
        .expect("valid regex")
});
