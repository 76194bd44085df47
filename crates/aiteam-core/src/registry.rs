//! Named agent instances encoded in pane titles.
//!
//! A pane title of the form `<kind>#<id>:<name>` marks the pane as an
//! instance. This module owns that grammar; nothing else parses it.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::agents::AgentKind;
use crate::tmux::PaneInfo;

/// `<kind>#<id>[:<name>]`; the id may not contain `:`
static LABEL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<kind>[a-z]+)#(?P<id>[^:]+)(?::(?P<name>.*))?$")
        .expect("Invalid LABEL_PATTERN regex")
});

/// `<kind>:<id>` or `<kind>#<id>`
static ID_SELECTOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<kind>[a-z]+)[:#](?P<id>[^:]+)$").expect("Invalid ID_SELECTOR_PATTERN regex")
});

/// Structured identity decoded from a pane title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLabel {
    pub kind: AgentKind,
    pub id: String,
    /// Human-friendly label; may be empty
    pub name: String,
}

impl InstanceLabel {
    /// Create a label
    pub fn new(kind: AgentKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
        }
    }

    /// Decode a pane title, or `None` when it is not an instance title
    pub fn parse(title: &str) -> Option<Self> {
        let caps = LABEL_PATTERN.captures(title.trim())?;
        let kind = AgentKind::from_slug(&caps["kind"])?;
        let id = caps["id"].trim();
        if id.is_empty() {
            return None;
        }
        let name = caps.name("name").map(|m| m.as_str().trim()).unwrap_or("");
        Some(Self::new(kind, id, name))
    }

    /// Selector that addresses this instance unambiguously (`codex:3`)
    pub fn selector(&self) -> String {
        format!("{}:{}", self.kind.slug(), self.id)
    }
}

impl fmt::Display for InstanceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}:{}", self.kind.slug(), self.id, self.name)
    }
}

/// Parse an id selector (`codex:1`, `codex#err2`) into kind and id
pub fn parse_id_selector(selector: &str) -> Option<(AgentKind, String)> {
    let caps = ID_SELECTOR_PATTERN.captures(selector.trim())?;
    let kind = AgentKind::from_slug(&caps["kind"])?;
    let id = caps["id"].trim();
    if id.is_empty() {
        return None;
    }
    Some((kind, id.to_string()))
}

/// An instance pane together with its decoded label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub label: InstanceLabel,
    pub pane: PaneInfo,
}

impl Instance {
    pub fn id(&self) -> &str {
        &self.label.id
    }

    pub fn name(&self) -> &str {
        &self.label.name
    }
}

/// Panes whose titles decode as instance labels, in pane order
pub fn labelled_panes(panes: &[PaneInfo]) -> impl Iterator<Item = (InstanceLabel, &PaneInfo)> {
    panes
        .iter()
        .filter_map(|pane| InstanceLabel::parse(&pane.title).map(|label| (label, pane)))
}

/// All instances in the pane list, optionally restricted to one kind.
///
/// Titles that do not decode are skipped.
pub fn list_instances(panes: &[PaneInfo], kind: Option<AgentKind>) -> Vec<Instance> {
    labelled_panes(panes)
        .filter(|(label, _)| kind.is_none_or(|k| k == label.kind))
        .map(|(label, pane)| Instance {
            label,
            pane: pane.clone(),
        })
        .collect()
}

/// Ids of all instances of `kind`, in pane order
pub fn instance_ids(panes: &[PaneInfo], kind: AgentKind) -> Vec<String> {
    list_instances(panes, Some(kind))
        .into_iter()
        .map(|i| i.label.id)
        .collect()
}

/// Find the instance of `kind` carrying `id` (first in list order)
pub fn find_instance(panes: &[PaneInfo], kind: AgentKind, id: &str) -> Option<Instance> {
    list_instances(panes, Some(kind))
        .into_iter()
        .find(|i| i.id() == id)
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Next purely numeric id for `kind`: max + 1, or `1` when none exist.
///
/// Prefixed ids such as `err3` do not take part in this sequence.
pub fn next_numeric_id(panes: &[PaneInfo], kind: AgentKind) -> String {
    let max = list_instances(panes, Some(kind))
        .iter()
        .filter(|i| is_all_digits(i.id()))
        .filter_map(|i| i.id().parse::<u64>().ok())
        .max();
    max.map(|n| n + 1).unwrap_or(1).to_string()
}

/// Next id of the form `<prefix><n>` for `kind` (`err1`, `err2`, ...)
pub fn next_prefixed_id(panes: &[PaneInfo], kind: AgentKind, prefix: &str) -> String {
    let max = list_instances(panes, Some(kind))
        .iter()
        .filter_map(|i| i.id().strip_prefix(prefix))
        .filter(|rest| is_all_digits(rest))
        .filter_map(|rest| rest.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{}", prefix, max + 1)
}
