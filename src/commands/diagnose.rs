//! Environment diagnostics and the opt-in error analyzer.

use std::io::Write;
use std::time::Duration;

use tracing::debug;

use aiteam_core::agents::AgentKind;
use aiteam_core::analyzer::{start_error_analyzer, AnalyzerRequest};
use aiteam_core::session::resolve_session;
use aiteam_core::tmux::PaneBackend;
use aiteam_core::Result;

use super::{CommandContext, Status};
use crate::config::{Command, Settings};

/// How long the analyzer waits for the Codex banner before sending its prompt
const ANALYZER_BOOT_TIMEOUT: Duration = Duration::from_secs(10);

/// The aiteam agent pane the caller is running in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentContext {
    pub kind: AgentKind,
    pub session: String,
    pub pane_title: String,
}

/// Classify the caller's pane, if it belongs to an aiteam agent
pub fn detect_agent_context(backend: &dyn PaneBackend) -> Option<AgentContext> {
    let session = backend.current_session().ok()?;
    let pane_id = backend.current_pane().ok()?;
    let pane = backend
        .list_panes(&session)
        .ok()?
        .into_iter()
        .find(|p| p.pane_id == pane_id)?;
    Some(AgentContext {
        kind: pane.agent_kind()?,
        session,
        pane_title: pane.title,
    })
}

fn status_lines(ctx: &AgentContext) -> [String; 2] {
    let title = if ctx.pane_title.is_empty() {
        "(no-title)"
    } else {
        ctx.pane_title.as_str()
    };
    [
        format!(
            "status: running from aiteam agent pane (kind={}, session={}, pane_title={}).",
            ctx.kind, ctx.session, title
        ),
        "hint: spawn peers with `aiteam codex --name <name>` or `aiteam add --worker name=command`."
            .to_string(),
    ]
}

/// Text shown after `--help`: quick commands, plus the caller's agent pane if any
pub fn help_epilog(backend: &dyn PaneBackend, in_tmux: bool) -> String {
    let mut lines = vec![
        "main-agent quick commands:".to_string(),
        "  aiteam codex --name <name>".to_string(),
        "  aiteam add --worker <name>=<command>".to_string(),
        "  aiteam send --to codex:<id> --body \"<task>\"".to_string(),
        "  aiteam capture --from codex:<id> --lines 120".to_string(),
    ];
    if in_tmux {
        if let Some(ctx) = detect_agent_context(backend) {
            lines.extend(status_lines(&ctx));
        }
    }
    lines.join("\n")
}

pub(super) fn doctor<W: Write>(ctx: &CommandContext<'_>, out: &mut W) -> Result<Status> {
    writeln!(out, "aiteam {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "tmux: {}", ctx.backend.version()?)?;
    match &ctx.tmux_path {
        Some(path) => writeln!(out, "tmux path: {}", path.display())?,
        None => writeln!(out, "tmux path: (not found on PATH)")?,
    }
    if let Some(agent) = detect_agent_context(ctx.backend) {
        for line in status_lines(&agent) {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(Status::Success)
}

/// After a control failure, start an error-analyzer Codex pane when enabled.
///
/// Every failure on this path is swallowed; the original error stays the
/// one reported to the user.
pub async fn maybe_start_error_analyzer(
    backend: &dyn PaneBackend,
    settings: &Settings,
    command: &Command,
    error_text: &str,
) {
    if !settings.error_codex {
        return;
    }
    let Ok(session) = resolve_session(backend, command.session()) else {
        debug!("No session for the error analyzer");
        return;
    };

    let req = AnalyzerRequest {
        session,
        error_text: error_text.to_string(),
        command_line: std::env::args().collect::<Vec<_>>().join(" "),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        codex_command: settings.codex_command.clone(),
        lock_dir: settings.lock_dir(),
        boot_timeout: ANALYZER_BOOT_TIMEOUT,
    };
    match start_error_analyzer(backend, &req).await {
        Ok(Some(info)) => eprintln!(
            "Auto-started error-analyzer Codex: {} (pane title: {})",
            info.selector, info.pane_title
        ),
        Ok(None) => {}
        Err(e) => debug!("Error analyzer not started: {}", e),
    }
}
