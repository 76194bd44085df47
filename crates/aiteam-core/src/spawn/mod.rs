//! Pane creation and race-free instance spawning.
//!
//! [`spawn_instance`] holds the per-session [`SpawnLock`] across id
//! allocation, the uniqueness check, pane creation and titling, so two
//! controllers spawning at once never hand out the same id.

mod lock;

pub use lock::{lock_path, sanitize_lock_name, SpawnLock, ANALYZER_SCOPE, SPAWN_SCOPE};

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::agents::AgentKind;
use crate::error::{AiteamError, Result};
use crate::registry::{self, InstanceLabel};
use crate::selector;
use crate::tmux::PaneBackend;

/// What to do when the requested pane or id already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Succeed without creating anything
    #[default]
    Skip,
    /// Fail with a duplicate error
    Error,
}

/// Which pane keeps focus after a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// Return focus to the caller's pane
    #[default]
    Stay,
    /// Leave focus on the new pane
    New,
}

/// Parameters for [`add_pane`]
#[derive(Debug, Clone, Default)]
pub struct AddPaneRequest {
    pub session: String,
    pub title: String,
    pub command: String,
    /// Selector of the pane to split; defaults to the caller's pane, then the first pane
    pub base_pane: Option<String>,
    pub cwd: Option<PathBuf>,
    /// Side-by-side split instead of stacked
    pub vertical: bool,
    pub tiled: bool,
    pub focus: Focus,
    pub policy: DuplicatePolicy,
}

/// Result of [`add_pane`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Created { pane_id: String },
    /// A pane with the same title existed and the policy was `Skip`
    Skipped,
}

/// Split a new pane, title it and start `command` in it
pub fn add_pane(backend: &dyn PaneBackend, req: &AddPaneRequest) -> Result<AddOutcome> {
    let panes = backend.list_panes(&req.session)?;
    if panes.iter().any(|p| p.title == req.title) {
        return match req.policy {
            DuplicatePolicy::Skip => Ok(AddOutcome::Skipped),
            DuplicatePolicy::Error => Err(AiteamError::DuplicatePane {
                title: req.title.clone(),
                session: req.session.clone(),
            }),
        };
    }

    let orig_pane = backend.current_pane().ok();
    let split_target = match (&req.base_pane, &orig_pane) {
        (Some(base), _) => selector::resolve(&req.session, base, &panes)?,
        (None, Some(orig)) => orig.clone(),
        (None, None) => panes
            .first()
            .map(|p| p.pane_id.clone())
            .ok_or_else(|| AiteamError::BackendCommandFailed {
                operation: "list-panes".to_string(),
                diagnostic: format!("no panes found in session '{}'", req.session),
            })?,
    };

    let cwd = req
        .cwd
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .or_else(|| backend.pane_current_path(&split_target).ok().map(PathBuf::from));

    let pane_id = backend.split_from(&split_target, cwd.as_deref(), req.vertical)?;
    debug!(pane = %pane_id, from = %split_target, "Split new pane");
    backend.set_title(&pane_id, &req.title)?;
    backend.write_text(&pane_id, &req.command, true)?;

    if req.tiled {
        backend.tile_layout(&req.session)?;
    }
    if req.focus == Focus::Stay {
        if let Some(orig) = orig_pane {
            backend.select_pane(&orig)?;
        }
    }

    info!(session = %req.session, title = %req.title, pane = %pane_id, "Added pane");
    Ok(AddOutcome::Created { pane_id })
}

/// Run `f` while holding the spawn lock of `session`
pub fn with_exclusive_spawn<T, F>(lock_dir: &Path, session: &str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let _guard = SpawnLock::acquire(lock_dir, SPAWN_SCOPE, session)?;
    f()
}

/// Parameters for [`spawn_instance`]
#[derive(Debug, Clone)]
pub struct InstanceRequest {
    pub session: String,
    pub kind: AgentKind,
    /// Explicit id; allocated when `None` or blank
    pub id: Option<String>,
    /// Instance name; defaults to the kind slug
    pub name: Option<String>,
    pub command: String,
    pub base_pane: Option<String>,
    pub cwd: Option<PathBuf>,
    pub vertical: bool,
    pub tiled: bool,
    pub focus: Focus,
    /// Applied when the id is taken
    pub policy: DuplicatePolicy,
}

impl InstanceRequest {
    pub fn new(session: impl Into<String>, kind: AgentKind, command: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            kind,
            id: None,
            name: None,
            command: command.into(),
            base_pane: None,
            cwd: None,
            vertical: true,
            tiled: false,
            focus: Focus::Stay,
            policy: DuplicatePolicy::Error,
        }
    }
}

/// A freshly started instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceInfo {
    pub id: String,
    pub name: String,
    pub selector: String,
    pub pane_title: String,
    pub session: String,
    pub pane_id: String,
}

/// Result of [`spawn_instance`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnOutcome {
    Started(InstanceInfo),
    /// The id was taken and the policy was `Skip`
    Skipped { id: String, selector: String },
}

/// Reject ids that would decode to a different instance once written into a title
fn check_label(label: &InstanceLabel) -> Result<()> {
    let id_ok = !label.id.contains(|c: char| c == ':' || c.is_whitespace())
        && InstanceLabel::parse(&label.to_string()).is_some_and(|decoded| decoded == *label);
    if !id_ok {
        return Err(AiteamError::invalid(format!(
            "Invalid --id '{}': ids may not contain ':' or whitespace.",
            label.id
        )));
    }
    Ok(())
}

/// Allocate an id and start a new instance pane under the spawn lock
pub fn spawn_instance(
    backend: &dyn PaneBackend,
    lock_dir: &Path,
    req: &InstanceRequest,
) -> Result<SpawnOutcome> {
    with_exclusive_spawn(lock_dir, &req.session, || {
        let panes = backend.list_panes(&req.session)?;
        let id = match req.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => registry::next_numeric_id(&panes, req.kind),
        };
        let name = match req.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => req.kind.slug().to_string(),
        };
        let label = InstanceLabel::new(req.kind, id.clone(), name.clone());
        check_label(&label)?;

        if registry::instance_ids(&panes, req.kind).contains(&id) {
            return match req.policy {
                DuplicatePolicy::Skip => Ok(SpawnOutcome::Skipped {
                    selector: label.selector(),
                    id,
                }),
                DuplicatePolicy::Error => Err(AiteamError::DuplicateInstanceId {
                    kind: req.kind.slug().to_string(),
                    id,
                    session: req.session.clone(),
                }),
            };
        }

        let add = AddPaneRequest {
            session: req.session.clone(),
            title: label.to_string(),
            command: req.command.clone(),
            base_pane: req.base_pane.clone(),
            cwd: req.cwd.clone(),
            vertical: req.vertical,
            tiled: req.tiled,
            focus: req.focus,
            // Two instances must never share a title
            policy: DuplicatePolicy::Error,
        };
        match add_pane(backend, &add)? {
            AddOutcome::Created { pane_id } => Ok(SpawnOutcome::Started(InstanceInfo {
                selector: label.selector(),
                pane_title: label.to_string(),
                session: req.session.clone(),
                id,
                name,
                pane_id,
            })),
            AddOutcome::Skipped => Err(AiteamError::DuplicatePane {
                title: label.to_string(),
                session: req.session.clone(),
            }),
        }
    })
}
