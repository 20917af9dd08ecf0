//! Assistant boundary: advisory suggestions about a scan or a plan.
//!
//! Nothing here is reachable from planning or applying. An assistant receives
//! a serialized summary plus the user's request and returns suggested
//! `TransformConfig` fields or prose. Settings are an explicit immutable value
//! and chat history lives in a caller-owned [`SessionStore`].

pub mod context;
pub mod session;

pub use context::{plan_context, scan_context};
pub use session::{ChatMessage, Role, SessionStore};

use crate::domain::{BrandMapping, ImportFixConfig, PatternRule, Plan, ScanResult, TransformConfig};
use crate::plan::PlanSummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Context budget used when the model is unknown.
pub const DEFAULT_CONTEXT_TOKENS: usize = 60_000;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("Assistant is not configured: {0}")]
    Unavailable(String),

    #[error("Assistant returned an unusable response: {0}")]
    InvalidResponse(String),
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
    /// Upper bound for the serialized context, in estimated tokens.
    pub max_context_tokens: usize,
    /// Prior messages replayed with each request.
    pub history_limit: usize,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            api_key: None,
            temperature: 0.7,
            max_context_tokens: DEFAULT_CONTEXT_TOKENS,
            history_limit: 10,
        }
    }
}

// Keep the key out of logs.
impl fmt::Debug for AssistantSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantSettings")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("temperature", &self.temperature)
            .field("max_context_tokens", &self.max_context_tokens)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

impl AssistantSettings {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Context window of the configured model, capped by `max_context_tokens`.
    pub fn context_budget(&self) -> usize {
        let window = match self.model.as_str() {
            "deepseek-coder" | "deepseek-reasoner" => 128_000,
            "deepseek-chat" => 64_000,
            _ => DEFAULT_CONTEXT_TOKENS,
        };
        window.min(self.max_context_tokens)
    }
}

/// Config fields an assistant proposes. Empty fields mean "no opinion".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Suggestion {
    pub summary: String,
    pub brand_map: Vec<BrandMapping>,
    pub patterns: Vec<PatternRule>,
    pub scrub_secrets: Option<bool>,
    pub fix_imports: Option<ImportFixConfig>,
    pub notes: Vec<String>,
}

impl Suggestion {
    /// Parse a structured response. Accepts a bare JSON object or one wrapped
    /// in a fenced code block.
    pub fn from_response(text: &str) -> Result<Self, AssistError> {
        let trimmed = text.trim();
        let body = match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => return Err(AssistError::InvalidResponse("no JSON object found".to_string())),
        };
        serde_json::from_str(body).map_err(|e| AssistError::InvalidResponse(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.brand_map.is_empty()
            && self.patterns.is_empty()
            && self.scrub_secrets.is_none()
            && self.fix_imports.is_none()
    }

    /// Merge into `config`. Brand pairs and patterns already present are kept once.
    pub fn merge_into(&self, config: &mut TransformConfig) {
        for mapping in &self.brand_map {
            if !config.brand_map.iter().any(|m| m.old == mapping.old) {
                config.brand_map.push(mapping.clone());
            }
        }
        for rule in &self.patterns {
            if !config.patterns.contains(rule) {
                config.patterns.push(rule.clone());
            }
        }
        if let Some(scrub) = self.scrub_secrets {
            config.scrub_secrets = scrub;
        }
        if let Some(fix) = &self.fix_imports {
            config.fix_imports = fix.clone();
        }
    }
}

/// An advisory collaborator. Implementations may call out to a model; the
/// pipeline never depends on one being present.
pub trait Assistant {
    fn name(&self) -> &str;

    /// Propose config fields for extracting from `scan`.
    fn suggest_config(&self, request: &str, scan: &ScanResult) -> Result<Suggestion, AssistError>;

    /// Comment on a built plan.
    fn review_plan(&self, request: &str, plan: &Plan) -> Result<String, AssistError>;
}

/// Offline assistant that derives suggestions from the scan and plan alone.
#[derive(Debug, Clone, Default)]
pub struct HeuristicAssistant;

impl Assistant for HeuristicAssistant {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn suggest_config(&self, _request: &str, scan: &ScanResult) -> Result<Suggestion, AssistError> {
        let mut suggestion = Suggestion { scrub_secrets: Some(true), ..Default::default() };
        let mut fix = ImportFixConfig::default();
        for stack in &scan.stack.detected {
            match stack.as_str() {
                "python" => fix.python = true,
                "node" => fix.javascript = true,
                "rust" => fix.rust = true,
                "go" => fix.go = true,
                _ => {}
            }
        }
        if fix.any() {
            suggestion.notes.push(format!("Import fixing enabled for: {}", scan.stack.detected.join(", ")));
            suggestion.fix_imports = Some(fix);
        }
        suggestion.summary = format!(
            "{} files in {}; secret scrubbing recommended for any extraction",
            scan.stats.files,
            scan.root.display()
        );
        Ok(suggestion)
    }

    fn review_plan(&self, _request: &str, plan: &Plan) -> Result<String, AssistError> {
        let summary = PlanSummary::of(plan);
        let mut lines = vec![format!(
            "- {} files ({} transformed, {} copied verbatim)",
            summary.actions, summary.changed, summary.copies
        )];
        if plan.destination_conflict() {
            lines.push("- Destination is not empty; apply will refuse until it is cleared".to_string());
        }
        let residual = &plan.residual;
        if !residual.brand_tokens.is_empty() {
            lines.push(format!(
                "- {} leftover brand tokens; consider a structural pattern for embedded identifiers",
                residual.brand_tokens.len()
            ));
        }
        if !residual.secrets.is_empty() {
            let hint = if plan.config.scrub_secrets { "review them by hand" } else { "enable secret scrubbing" };
            lines.push(format!("- {} secret-like strings remain; {}", residual.secrets.len(), hint));
        }
        if !residual.imports.is_empty() {
            lines.push(format!("- {} suspect imports; check selection or enable import fixing", residual.imports.len()));
        }
        if !residual.template_vars.is_empty() {
            lines.push(format!("- {} unresolved template variables", residual.template_vars.len()));
        }
        if summary.warnings > 0 {
            lines.push(format!("- {} per-file warnings", summary.warnings));
        }
        if residual.is_empty() && summary.warnings == 0 && !plan.destination_conflict() {
            lines.push("- Residual scan is clean".to_string());
        }
        Ok(lines.join("\n"))
    }
}
