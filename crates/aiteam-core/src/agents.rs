use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::registry::InstanceLabel;

/// Interactive agent program family running in a pane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Claude,
    Codex,
    Cursor,
    Agent,
}

impl AgentKind {
    /// Every kind, in the order titles are classified
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Codex,
        AgentKind::Claude,
        AgentKind::Cursor,
        AgentKind::Agent,
    ];

    /// Literal used in pane titles and selectors (`codex#1:name`, `codex:1`)
    pub fn slug(&self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Codex => "codex",
            AgentKind::Cursor => "cursor",
            AgentKind::Agent => "agent",
        }
    }

    /// Parse a kind literal (exact, lowercase)
    pub fn from_slug(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slug() == s)
    }

    /// Classify a pane by its title.
    ///
    /// Structured instance titles win; otherwise the leading word decides.
    pub fn from_pane_title(title: &str) -> Option<Self> {
        let t = title.trim();
        if t.is_empty() {
            return None;
        }
        if let Some(label) = InstanceLabel::parse(t) {
            return Some(label.kind);
        }

        let low = t.to_lowercase();
        if low == "codex" || low.starts_with("codex ") {
            return Some(AgentKind::Codex);
        }
        if low.starts_with("claude") {
            return Some(AgentKind::Claude);
        }
        if low.starts_with("agent") {
            return Some(AgentKind::Agent);
        }
        if low.starts_with("cursor") {
            return Some(AgentKind::Cursor);
        }
        None
    }

    /// Short name for operator messages
    pub fn short_name(&self) -> &'static str {
        match self {
            AgentKind::Claude => "Claude",
            AgentKind::Codex => "Codex",
            AgentKind::Cursor => "Cursor",
            AgentKind::Agent => "Agent",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// Check whether a shell command line launches the Codex CLI.
///
/// Leading `VAR=value` assignments are skipped; the program's basename decides.
pub fn is_codex_command(command: &str) -> bool {
    command
        .split_whitespace()
        .find(|part| !(part.contains('=') && !part.starts_with('-')))
        .and_then(|program| Path::new(program.trim_matches(|c| c == '"' || c == '\'')).file_name())
        .map(|name| name == "codex")
        .unwrap_or(false)
}
