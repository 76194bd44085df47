//! Opt-in error analyzer: a Codex pane that explains a failed command.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::actions;
use crate::agents::AgentKind;
use crate::capture;
use crate::error::Result;
use crate::registry::{self, InstanceLabel};
use crate::spawn::{InstanceInfo, SpawnLock, ANALYZER_SCOPE};
use crate::tmux::{PaneBackend, PaneInfo};

/// Id prefix of analyzer instances (`err1`, `err2`, ...)
pub const ANALYZER_ID_PREFIX: &str = "err";

/// Instance name of analyzer panes
pub const ANALYZER_NAME: &str = "error";

/// Lowercase banner fragments printed by Codex on start-up
pub const CODEX_BOOT_NEEDLES: [&str; 2] = ["openai codex", "codex (v"];

/// Error text is cut to this many characters in the prompt
pub const MAX_ERROR_CHARS: usize = 8000;

const ANALYZER_NAMES: [&str; 4] = ["error", "error-analyzer", "error_analysis", "erroranalysis"];

/// Whether an analyzer instance already exists among `panes`
pub fn analyzer_running(panes: &[PaneInfo]) -> bool {
    registry::list_instances(panes, Some(AgentKind::Codex))
        .iter()
        .any(|i| i.id().starts_with(ANALYZER_ID_PREFIX) || ANALYZER_NAMES.contains(&i.name()))
}

fn truncate_error(error_text: &str) -> String {
    let err = error_text.trim();
    if err.chars().count() > MAX_ERROR_CHARS {
        let head: String = err.chars().take(MAX_ERROR_CHARS).collect();
        format!("{}\n... (truncated)", head)
    } else {
        err.to_string()
    }
}

/// Everything the analyzer prompt mentions
#[derive(Debug, Clone)]
pub struct AnalyzerRequest {
    pub session: String,
    pub error_text: String,
    /// The failed command line as typed
    pub command_line: String,
    pub tool_version: String,
    pub codex_command: String,
    pub lock_dir: PathBuf,
    pub boot_timeout: Duration,
}

/// Prompt handed to the analyzer Codex
pub fn build_prompt(req: &AnalyzerRequest, tmux_version: &str, panes: &[PaneInfo]) -> String {
    let pane_summary: Vec<String> = panes
        .iter()
        .map(|p| {
            let title = if p.title.is_empty() { "(no-title)" } else { p.title.as_str() };
            format!("- {}: {} ({})", p.pane_index, title, p.pane_id)
        })
        .collect();

    format!(
        "You are Codex running as an automated *error analysis* agent for the aiteam tmux controller.\n\
         Goal: explain why the command failed and propose a concrete workaround or fix.\n\n\
         aiteam version: {}\n\
         tmux version: {}\n\
         tmux session: {}\n\
         command: {}\n\n\
         tmux panes:\n\
         {}\n\n\
         error:\n\
         -----\n\
         {}\n\
         -----\n\n\
         Please respond with:\n\
         1) Likely root cause (1-3 bullet points)\n\
         2) Fast workaround steps\n\
         3) If this looks like an aiteam bug, propose a minimal patch (file + code snippet)\n",
        req.tool_version,
        tmux_version,
        req.session,
        req.command_line,
        pane_summary.join("\n"),
        truncate_error(&req.error_text),
    )
}

/// Start an analyzer pane for `req`, unless one is running or being started.
///
/// Returns `None` when nothing was started.
pub async fn start_error_analyzer(
    backend: &dyn PaneBackend,
    req: &AnalyzerRequest,
) -> Result<Option<InstanceInfo>> {
    let tmux_version = backend.version()?;
    let Some(_guard) = SpawnLock::try_acquire(&req.lock_dir, ANALYZER_SCOPE, &req.session)? else {
        debug!(session = %req.session, "Error analyzer already being started elsewhere");
        return Ok(None);
    };

    let panes = backend.list_panes(&req.session)?;
    if analyzer_running(&panes) {
        debug!(session = %req.session, "Error analyzer already running");
        return Ok(None);
    }

    let id = registry::next_prefixed_id(&panes, AgentKind::Codex, ANALYZER_ID_PREFIX);
    let label = InstanceLabel::new(AgentKind::Codex, id.clone(), ANALYZER_NAME);

    let orig_pane = backend.current_pane().ok();
    let split_target = match (&orig_pane, panes.first()) {
        (Some(orig), _) => orig.clone(),
        (None, Some(first)) => first.pane_id.clone(),
        (None, None) => return Ok(None),
    };
    let cwd = backend
        .pane_current_path(&split_target)
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok());

    let pane_id = backend.split_from(&split_target, cwd.as_deref(), true)?;
    backend.set_title(&pane_id, &label.to_string())?;
    backend.write_text(&pane_id, &req.codex_command, true)?;
    if !capture::wait_for_boot(backend, &pane_id, &CODEX_BOOT_NEEDLES, req.boot_timeout).await {
        debug!(pane = %pane_id, "Codex banner not seen; sending prompt anyway");
    }

    let prompt = build_prompt(req, &tmux_version, &panes);
    actions::send_text(backend, &req.session, &pane_id, &prompt, true).await?;

    backend.tile_layout(&req.session)?;
    if let Some(orig) = orig_pane {
        backend.select_pane(&orig)?;
    }

    info!(session = %req.session, selector = %label.selector(), "Error analyzer started");
    Ok(Some(InstanceInfo {
        selector: label.selector(),
        pane_title: label.to_string(),
        session: req.session.clone(),
        id,
        name: ANALYZER_NAME.to_string(),
        pane_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::{FakeBackend, ENTER_KEY};
    use pretty_assertions::assert_eq;

    fn request(lock_dir: &std::path::Path, error_text: &str) -> AnalyzerRequest {
        AnalyzerRequest {
            session: "demo".to_string(),
            error_text: error_text.to_string(),
            command_line: "aiteam send --to nobody --body hi".to_string(),
            tool_version: "0.3.0".to_string(),
            codex_command: "codex -p aiteam".to_string(),
            lock_dir: lock_dir.to_path_buf(),
            boot_timeout: Duration::from_millis(200),
        }
    }

    fn pane(id: &str, index: u32, title: &str) -> PaneInfo {
        PaneInfo::new(id, index, title)
    }

    #[test]
    fn test_analyzer_running_detection() {
        assert!(!analyzer_running(&[pane("%0", 0, "claude"), pane("%1", 1, "codex#1:a")]));
        assert!(analyzer_running(&[pane("%1", 1, "codex#err2:x")]));
        assert!(analyzer_running(&[pane("%1", 1, "codex#5:error-analyzer")]));
    }

    #[test]
    fn test_prompt_lists_panes_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let long = "e".repeat(MAX_ERROR_CHARS + 10);
        let prompt = build_prompt(
            &request(dir.path(), &long),
            "tmux 3.4",
            &[pane("%0", 0, "claude"), pane("%3", 1, "")],
        );
        assert!(prompt.contains("tmux version: tmux 3.4\n"));
        assert!(prompt.contains("command: aiteam send --to nobody --body hi\n"));
        assert!(prompt.contains("- 0: claude (%0)\n- 1: (no-title) (%3)\n"));
        assert!(prompt.contains("\n... (truncated)\n-----"));
        assert!(!prompt.contains(&"e".repeat(MAX_ERROR_CHARS + 1)));
    }

    #[tokio::test]
    async fn test_start_error_analyzer_spawns_pane() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("demo", &["claude", "codex#1:a"]).with_current_pane("%0");
        let info = start_error_analyzer(&backend, &request(dir.path(), "Pane not found: nobody"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(info.id, "err1");
        assert_eq!(info.pane_title, "codex#err1:error");
        assert_eq!(info.pane_id, "%2");

        let writes = backend.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].text, "codex -p aiteam");
        assert!(writes[1].text.contains("Pane not found: nobody"));
        assert_eq!(backend.keys(), vec![("%2".to_string(), ENTER_KEY.to_string())]);
        assert_eq!(backend.tiled_count(), 1);
        assert_eq!(backend.current_pane().unwrap(), "%0");
    }

    #[tokio::test]
    async fn test_start_error_analyzer_skips_when_running() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("demo", &["claude", "codex#err1:error"]);
        let started = start_error_analyzer(&backend, &request(dir.path(), "boom"))
            .await
            .unwrap();
        assert!(started.is_none());
        assert_eq!(backend.panes().len(), 2);
    }

    #[tokio::test]
    async fn test_start_error_analyzer_skips_when_locked() {
        let dir = tempfile::tempdir().unwrap();
        let _held = SpawnLock::acquire(dir.path(), ANALYZER_SCOPE, "demo").unwrap();
        let backend = FakeBackend::new("demo", &["claude"]);
        let started = start_error_analyzer(&backend, &request(dir.path(), "boom"))
            .await
            .unwrap();
        assert!(started.is_none());
        assert!(backend.writes().is_empty());
    }
}
