//! Optional trailing steps: line-ending normalization and `{{VAR}}` templates.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static TEMPLATE_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Z_][A-Z0-9_]*)\}\}").expect("valid regex"));

/// CRLF to LF. `None` when there was nothing to change.
pub fn normalize_line_endings(content: &str) -> Option<String> {
    content.contains("\r\n").then(|| content.replace("\r\n", "\n"))
}

/// Replace `{{NAME}}` placeholders that have a value; unknown names are kept.
/// Returns the new text and the number of substitutions.
pub fn substitute_templates(content: &str, vars: &BTreeMap<String, String>) -> (String, usize) {
    let mut count = 0;
    let replaced = TEMPLATE_VAR.replace_all(content, |caps: &regex::Captures<'_>| {
        match vars.get(&caps[1]) {
            Some(value) => {
                count += 1;
                value.clone()
            }
            None => caps[0].to_string(),
        }
    });
    (replaced.into_owned(), count)
}

/// Names of `{{NAME}}` placeholders left in `content`, with byte offsets.
pub fn find_template_vars(content: &str) -> Vec<(usize, String)> {
    TEMPLATE_VAR
        .captures_iter(content)
        .filter_map(|caps| caps.get(0).map(|m| (m.start(), caps[1].to_string())))
        .collect()
}

/// Built-in variables. User-provided values take precedence when merged.
pub fn builtin_template_vars(
    project_name: &str,
    source_project: &str,
    today: NaiveDate,
) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("PROJECT_NAME".to_string(), project_name.to_string());
    vars.insert("SOURCE_PROJECT".to_string(), source_project.to_string());
    vars.insert("DATE".to_string(), today.format("%Y-%m-%d").to_string());
    vars.insert("YEAR".to_string(), today.year().to_string());
    vars
}
