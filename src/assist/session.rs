//! Per-process chat history, keyed by project id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), at: Utc::now() }
    }
}

/// Owned by whoever drives the assistant. Never shared with the pipeline.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Vec<ChatMessage>>,
    /// Messages retained per project; 0 keeps everything.
    capacity: usize,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { sessions: HashMap::new(), capacity }
    }

    pub fn push(&mut self, project: &str, message: ChatMessage) {
        let history = self.sessions.entry(project.to_string()).or_default();
        history.push(message);
        if self.capacity > 0 && history.len() > self.capacity {
            let excess = history.len() - self.capacity;
            history.drain(..excess);
        }
    }

    pub fn history(&self, project: &str) -> &[ChatMessage] {
        self.sessions.get(project).map(Vec::as_slice).unwrap_or_default()
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, project: &str, n: usize) -> &[ChatMessage] {
        let history = self.history(project);
        &history[history.len().saturating_sub(n)..]
    }

    pub fn clear(&mut self, project: &str) -> usize {
        self.sessions.remove(project).map(|h| h.len()).unwrap_or(0)
    }

    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }
}
