//! Selector resolution: map an operator-supplied string to one pane.
//!
//! Resolution order (first match wins):
//! 1. instance id (`codex:1`, `codex#1`)
//! 2. pane index (all digits)
//! 3. exact title
//! 4. bare kind (`codex`) when exactly one instance of that kind exists
//! 5. instance name, case-sensitive then case-insensitive
//! 6. case-insensitive title
//!
//! The id selector never depends on titles or names, so it is always an
//! unambiguous escape hatch.

use crate::agents::AgentKind;
use crate::error::SelectorError;
use crate::registry::{self, InstanceLabel};
use crate::tmux::PaneInfo;

/// Resolve `selector` to a pane id within `session`
pub fn resolve(session: &str, selector: &str, panes: &[PaneInfo]) -> Result<String, SelectorError> {
    resolve_pane(session, selector, panes).map(|p| p.pane_id.clone())
}

/// Resolve `selector` to the matching pane description
pub fn resolve_pane<'a>(
    session: &str,
    selector: &str,
    panes: &'a [PaneInfo],
) -> Result<&'a PaneInfo, SelectorError> {
    let trimmed = selector.trim();

    if let Some((kind, id)) = registry::parse_id_selector(trimmed) {
        return by_instance_id(session, kind, &id, panes);
    }

    if !selector.is_empty() && selector.chars().all(|c| c.is_ascii_digit()) {
        // Digit strings too long for u32 cannot name any pane
        return selector
            .parse::<u32>()
            .ok()
            .and_then(|index| panes.iter().find(|p| p.pane_index == index))
            .ok_or_else(|| SelectorError::NoSuchIndex {
                index: selector.parse().unwrap_or(u32::MAX),
                session: session.to_string(),
            });
    }

    if let Some(pane) = panes.iter().find(|p| p.title == selector) {
        return Ok(pane);
    }

    let instances: Vec<(InstanceLabel, &PaneInfo)> = registry::labelled_panes(panes).collect();

    if let Some(kind) = AgentKind::from_slug(selector) {
        let of_kind: Vec<&(InstanceLabel, &PaneInfo)> =
            instances.iter().filter(|(l, _)| l.kind == kind).collect();
        match of_kind.as_slice() {
            [] => {}
            [(_, pane)] => return Ok(*pane),
            _ => {
                return Err(SelectorError::AmbiguousKind {
                    kind: kind.slug().to_string(),
                    available: of_kind
                        .iter()
                        .map(|(l, _)| {
                            let name = if l.name.is_empty() { "no-name" } else { l.name.as_str() };
                            format!("{}:{}({})", kind.slug(), l.id, name)
                        })
                        .collect(),
                })
            }
        }
    }

    if let Some(pane) = by_label(session, selector, &instances, |name| name == selector)? {
        return Ok(pane);
    }
    let low = selector.to_lowercase();
    if let Some(pane) = by_label(session, selector, &instances, |name| {
        name.to_lowercase() == low
    })? {
        return Ok(pane);
    }

    if let Some(pane) = panes.iter().find(|p| p.title.to_lowercase() == low) {
        return Ok(pane);
    }

    Err(SelectorError::PaneNotFound {
        selector: selector.to_string(),
        available: panes.iter().map(PaneInfo::short_name).collect(),
    })
}

fn by_instance_id<'a>(
    session: &str,
    kind: AgentKind,
    id: &str,
    panes: &'a [PaneInfo],
) -> Result<&'a PaneInfo, SelectorError> {
    let instances: Vec<(InstanceLabel, &PaneInfo)> = registry::labelled_panes(panes)
        .filter(|(l, _)| l.kind == kind)
        .collect();
    // Ids are meant to be unique; on duplicates the first pane wins
    let found = instances.iter().find(|(l, _)| l.id == id).map(|(_, p)| *p);
    match found {
        Some(pane) => Ok(pane),
        None => Err(SelectorError::NoSuchInstanceId {
            kind: kind.slug().to_string(),
            id: id.to_string(),
            session: session.to_string(),
            available: instances.into_iter().map(|(l, _)| l.id).collect(),
        }),
    }
}

fn by_label<'a, F>(
    session: &str,
    selector: &str,
    instances: &[(InstanceLabel, &'a PaneInfo)],
    matches: F,
) -> Result<Option<&'a PaneInfo>, SelectorError>
where
    F: Fn(&str) -> bool,
{
    let hits: Vec<&(InstanceLabel, &'a PaneInfo)> = instances
        .iter()
        .filter(|(l, _)| !l.name.is_empty() && matches(&l.name))
        .collect();
    match hits.as_slice() {
        [] => Ok(None),
        [(_, pane)] => Ok(Some(*pane)),
        _ => Err(SelectorError::AmbiguousLabel {
            label: selector.to_string(),
            session: session.to_string(),
            alternatives: hits.iter().map(|(l, _)| l.selector()).collect(),
        }),
    }
}
