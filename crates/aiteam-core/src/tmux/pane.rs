use serde::Serialize;

use crate::agents::AgentKind;

/// tmux `list-panes` format matching [`PaneInfo::parse`]
pub const PANE_FORMAT: &str = "#{pane_id}\t#{pane_index}\t#{pane_title}";

/// Information about a tmux pane within one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaneInfo {
    /// Backend pane id (e.g. `%3`), stable for the pane's lifetime
    pub pane_id: String,
    /// Position within the window; may change after splits
    pub pane_index: u32,
    /// Display title set by the controller
    pub title: String,
}

impl PaneInfo {
    /// Create a pane description
    pub fn new(pane_id: impl Into<String>, pane_index: u32, title: impl Into<String>) -> Self {
        Self {
            pane_id: pane_id.into(),
            pane_index,
            title: title.into(),
        }
    }

    /// Parse a pane info line from tmux list-panes output
    /// Format: pane_id\tpane_index\ttitle
    pub fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() != 3 {
            return None;
        }

        let pane_index = parts[1].trim().parse().ok()?;

        Some(Self {
            pane_id: parts[0].trim().to_string(),
            pane_index,
            title: parts[2].trim().to_string(),
        })
    }

    /// Detect which agent program this pane runs, judging by its title
    pub fn agent_kind(&self) -> Option<AgentKind> {
        AgentKind::from_pane_title(&self.title)
    }

    /// `index:title` form used in "not found" listings
    pub fn short_name(&self) -> String {
        let title = if self.title.is_empty() {
            "(no-title)"
        } else {
            &self.title
        };
        format!("{}:{}", self.pane_index, title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pane_info() {
        let pane = PaneInfo::parse("%4\t1\tcodex#1:analyst").expect("Should parse pane info");

        assert_eq!(pane.pane_id, "%4");
        assert_eq!(pane.pane_index, 1);
        assert_eq!(pane.title, "codex#1:analyst");
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(PaneInfo::parse("%4\t1").is_none());
        assert!(PaneInfo::parse("%4\tx\ttitle").is_none());
        assert!(PaneInfo::parse("%4\t1\ta\tb").is_none());
    }

    #[test]
    fn test_parse_empty_title() {
        let pane = PaneInfo::parse("%0\t0\t").expect("Should parse pane info");
        assert_eq!(pane.title, "");
        assert_eq!(pane.short_name(), "0:(no-title)");
    }

    #[test]
    fn test_agent_kind() {
        let pane = PaneInfo::new("%1", 1, "codex#2:worker");
        assert_eq!(pane.agent_kind(), Some(AgentKind::Codex));

        let pane = PaneInfo::new("%2", 2, "notes");
        assert_eq!(pane.agent_kind(), None);
    }

    #[test]
    fn test_short_name() {
        let pane = PaneInfo::new("%7", 3, "claude");
        assert_eq!(pane.short_name(), "3:claude");
    }
}
