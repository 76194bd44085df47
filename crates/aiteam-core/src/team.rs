//! Creating whole team sessions: several workers, or one main agent.

use std::path::Path;
use std::str::FromStr;

use tracing::{info, warn};

use crate::agents::AgentKind;
use crate::briefing;
use crate::error::{AiteamError, Result};
use crate::tmux::PaneBackend;

/// A pane title and the command started in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worker {
    pub name: String,
    pub command: String,
}

impl Worker {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

impl FromStr for Worker {
    type Err = AiteamError;

    /// Parse `name=command`
    fn from_str(value: &str) -> Result<Self> {
        let (name, command) = value.split_once('=').ok_or_else(|| {
            AiteamError::invalid(format!(
                "Invalid --worker value (expected name=command): {}",
                value
            ))
        })?;
        let (name, command) = (name.trim(), command.trim());
        if name.is_empty() {
            return Err(AiteamError::invalid(format!("Invalid agent name in: {}", value)));
        }
        if command.is_empty() {
            return Err(AiteamError::invalid(format!(
                "Invalid agent command in: {} (empty command)",
                value
            )));
        }
        Ok(Worker::new(name, command))
    }
}

/// Workers started when none are given
pub fn default_workers(codex_command: &str) -> Vec<Worker> {
    vec![
        Worker::new("claude", "claude"),
        Worker::new("codex", codex_command),
    ]
}

/// Pane arrangement for a new team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Side by side
    #[default]
    Vertical,
    /// Stacked
    Horizontal,
    Tiled,
}

/// Create `session` with one pane per worker and start each command.
///
/// Two workers get a single split in the chosen orientation; three or more
/// get alternating splits followed by the tiled layout. A `briefing` file is
/// installed on the new session. Returns the pane ids in worker order.
pub fn spawn_team(
    backend: &dyn PaneBackend,
    session: &str,
    cwd: Option<&Path>,
    workers: &[Worker],
    layout: Layout,
    force: bool,
    briefing: Option<&Path>,
) -> Result<Vec<String>> {
    if workers.is_empty() {
        return Err(AiteamError::invalid("No agents specified."));
    }
    briefing::create_session(backend, session, cwd, force, briefing)?;

    match workers.len() {
        1 => {}
        2 => {
            backend.split_from(session, cwd, layout == Layout::Vertical)?;
        }
        n => {
            let mut vertical = true;
            for _ in 1..n {
                backend.split_from(session, cwd, vertical)?;
                vertical = !vertical;
            }
            backend.tile_layout(session)?;
        }
    }

    let panes = backend.list_panes(session)?;
    if panes.len() != workers.len() {
        warn!(
            "Expected {} panes but found {}; mapping will be best-effort",
            workers.len(),
            panes.len()
        );
    }

    let mut started = Vec::new();
    for (worker, pane) in workers.iter().zip(panes.iter()) {
        backend.set_title(&pane.pane_id, &worker.name)?;
        backend.write_text(&pane.pane_id, &worker.command, true)?;
        started.push(pane.pane_id.clone());
    }
    info!(session, panes = started.len(), "Team session started");
    Ok(started)
}

/// Which agent `start` launches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MainAgent {
    #[default]
    Claude,
    Cursor,
    Codex,
    Custom,
}

impl MainAgent {
    /// Title and command for the main pane, with overrides applied
    pub fn worker(
        self,
        exec: Option<&str>,
        title: Option<&str>,
        codex_command: &str,
    ) -> Result<Worker> {
        let exec = exec.map(str::trim).filter(|s| !s.is_empty());
        let title = title.map(str::trim).filter(|s| !s.is_empty());
        let (default_title, default_command) = match self {
            MainAgent::Claude => (AgentKind::Claude.slug(), Some("claude")),
            MainAgent::Cursor => (AgentKind::Cursor.slug(), Some("agent")),
            MainAgent::Codex => (AgentKind::Codex.slug(), Some(codex_command)),
            MainAgent::Custom => ("main", None),
        };
        let command = exec
            .or(default_command)
            .ok_or_else(|| AiteamError::invalid("For --main custom, you must provide --exec."))?;
        Ok(Worker::new(title.unwrap_or(default_title), command))
    }
}

/// Create `session` with a single pane running the main agent
pub fn start_main(
    backend: &dyn PaneBackend,
    session: &str,
    cwd: Option<&Path>,
    worker: &Worker,
    force: bool,
    briefing: Option<&Path>,
) -> Result<String> {
    briefing::create_session(backend, session, cwd, force, briefing)?;
    let pane = backend
        .list_panes(session)?
        .into_iter()
        .next()
        .ok_or_else(|| AiteamError::BackendCommandFailed {
            operation: "list-panes".to_string(),
            diagnostic: format!("no panes found in session '{}' after creating it", session),
        })?;
    backend.set_title(&pane.pane_id, &worker.name)?;
    backend.write_text(&pane.pane_id, &worker.command, true)?;
    info!(session, title = %worker.name, "Main agent started");
    Ok(pane.pane_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::FakeBackend;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_worker() {
        assert_eq!(
            "codex = codex -p aiteam".parse::<Worker>().unwrap(),
            Worker::new("codex", "codex -p aiteam")
        );
        assert_eq!(
            "env=FOO=1 run".parse::<Worker>().unwrap(),
            Worker::new("env", "FOO=1 run")
        );
    }

    #[test]
    fn test_parse_worker_errors() {
        for bad in ["claude", "=claude", "claude="] {
            let err = bad.parse::<Worker>().unwrap_err();
            assert!(err.is_usage_error(), "{} should be a usage error", bad);
        }
    }

    #[test]
    fn test_spawn_team_two_workers() {
        let backend = FakeBackend::new("scratch", &[]);
        let workers = default_workers("codex -p aiteam");
        let panes = spawn_team(&backend, "demo", None, &workers, Layout::Vertical, false, None).unwrap();
        assert_eq!(panes.len(), 2);
        let titles: Vec<String> = backend.panes().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["claude", "codex"]);
        let commands: Vec<String> = backend.writes().into_iter().map(|w| w.text).collect();
        assert_eq!(commands, vec!["claude", "codex -p aiteam"]);
        assert_eq!(backend.tiled_count(), 0);
    }

    #[test]
    fn test_spawn_team_many_workers_tiles() {
        let backend = FakeBackend::new("scratch", &[]);
        let workers: Vec<Worker> = ["a=x", "b=y", "c=z"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        spawn_team(&backend, "demo", None, &workers, Layout::Vertical, false, None).unwrap();
        assert_eq!(backend.panes().len(), 3);
        assert_eq!(backend.tiled_count(), 1);
    }

    #[test]
    fn test_spawn_team_existing_session_needs_force() {
        let backend = FakeBackend::new("demo", &["old"]);
        let workers = vec![Worker::new("solo", "run")];
        let err = spawn_team(&backend, "demo", None, &workers, Layout::Vertical, false, None).unwrap_err();
        assert!(matches!(err, AiteamError::SessionExists { .. }));

        spawn_team(&backend, "demo", None, &workers, Layout::Vertical, true, None).unwrap();
        assert_eq!(backend.panes()[0].title, "solo");
    }

    #[test]
    fn test_spawn_team_existing_session_discards_briefing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("briefing.md");
        std::fs::write(&path, "notes").unwrap();
        let backend = FakeBackend::new("demo", &["old"]);
        let workers = vec![Worker::new("solo", "run")];

        let err = spawn_team(&backend, "demo", None, &workers, Layout::Vertical, false, Some(&path))
            .unwrap_err();
        assert!(matches!(err, AiteamError::SessionExists { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_main_agent_defaults() {
        assert_eq!(
            MainAgent::Claude.worker(None, None, "codex").unwrap(),
            Worker::new("claude", "claude")
        );
        assert_eq!(
            MainAgent::Cursor.worker(None, None, "codex").unwrap(),
            Worker::new("cursor", "agent")
        );
        assert_eq!(
            MainAgent::Codex.worker(None, Some("lead"), "codex -p x").unwrap(),
            Worker::new("lead", "codex -p x")
        );
        assert_eq!(
            MainAgent::Custom.worker(Some("aider"), None, "codex").unwrap(),
            Worker::new("main", "aider")
        );
        assert!(MainAgent::Custom.worker(None, None, "codex").is_err());
    }

    #[test]
    fn test_start_main() {
        let backend = FakeBackend::new("scratch", &[]);
        let pane = start_main(&backend, "demo", None, &Worker::new("claude", "claude"), false, None).unwrap();
        assert_eq!(backend.panes()[0].pane_id, pane);
        assert_eq!(backend.panes()[0].title, "claude");
        assert_eq!(backend.writes()[0].text, "claude");
    }
}
