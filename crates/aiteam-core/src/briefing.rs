//! Ephemeral session briefings pasted into every new Codex pane.
//!
//! The briefing is a private copy of the operator's text stored in a temp
//! file. Its path lives in the [`BRIEFING_OPTION`] session option, and a
//! `session-closed` hook removes the file together with the session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::agents::is_codex_command;
use crate::error::Result;
use crate::session::sanitize_session_name;
use crate::tmux::PaneBackend;

/// Session option holding the briefing file path
pub const BRIEFING_OPTION: &str = "@aiteam_briefing_file";

/// Pause that lets a freshly started Codex reach its prompt before the paste
pub const BRIEFING_PASTE_DELAY: Duration = Duration::from_millis(800);

/// Quote `value` for a POSIX shell
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Header written above the operator's instructions
pub fn briefing_header(session: &str, cwd: &Path) -> String {
    format!(
        "AITEAM SESSION BRIEFING (ephemeral)\n\
         \n\
         This text is pasted into each new Codex pane in this tmux session.\n\
         It is deleted automatically when the tmux session closes.\n\
         \n\
         Session: {}\n\
         Workdir: {}\n\
         \n\
         Instructions:\n\
         \n",
        session,
        cwd.display()
    )
}

/// Write the header plus the contents of `source` into a new temp file in `dir`
pub fn create_briefing_file(
    dir: &Path,
    session: &str,
    cwd: &Path,
    source: &Path,
) -> Result<PathBuf> {
    let instructions = std::fs::read_to_string(source)?;
    let prefix = format!("aiteam_briefing_{}_", sanitize_session_name(session));
    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".md")
        .tempfile_in(dir)?;
    let mut text = briefing_header(session, cwd);
    text.push_str(&instructions);
    std::fs::write(file.path(), text)?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    debug!(path = %path.display(), "Briefing file created");
    Ok(path)
}

/// Remove a briefing file, ignoring failures
pub fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        debug!(path = %path.display(), error = %e, "Briefing file not removed");
    }
}

/// Record the briefing on the session and delete it when the session closes
pub fn install(backend: &dyn PaneBackend, session: &str, path: &Path) -> Result<()> {
    let path = path.display().to_string();
    backend.set_session_option(session, BRIEFING_OPTION, &path)?;
    let cleanup = format!("run-shell \"rm -f -- {}\"", shell_quote(&path));
    backend.set_hook(session, "session-closed", &cleanup)
}

/// Create `session`, then install `briefing` on it.
///
/// The briefing file is removed when the session itself could not be
/// created; afterwards the session hook owns it.
pub fn create_session(
    backend: &dyn PaneBackend,
    session: &str,
    cwd: Option<&Path>,
    force: bool,
    briefing: Option<&Path>,
) -> Result<()> {
    if let Err(e) = backend.create_session(session, cwd, force) {
        if let Some(path) = briefing {
            discard(path);
        }
        return Err(e);
    }
    match briefing {
        Some(path) => install(backend, session, path),
        None => Ok(()),
    }
}

/// Path stored on the session, if a briefing is installed
pub fn briefing_path(backend: &dyn PaneBackend, session: &str) -> Result<Option<PathBuf>> {
    Ok(backend
        .session_option(session, BRIEFING_OPTION)?
        .map(PathBuf::from))
}

/// Trimmed briefing text; `None` when unset, unreadable or blank
pub fn load_text(backend: &dyn PaneBackend, session: &str) -> Option<String> {
    let path = briefing_path(backend, session).ok()??;
    let text = std::fs::read_to_string(&path).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Paste the session briefing into `pane` when `command` starts Codex.
///
/// Returns whether anything was pasted.
pub async fn paste_into(
    backend: &dyn PaneBackend,
    session: &str,
    pane: &str,
    command: &str,
) -> Result<bool> {
    if !is_codex_command(command) {
        return Ok(false);
    }
    let Some(text) = load_text(backend, session) else {
        return Ok(false);
    };
    tokio::time::sleep(BRIEFING_PASTE_DELAY).await;
    backend.write_text(pane, &text, true)?;
    debug!(session, pane, "Briefing pasted");
    Ok(true)
}

/// Kill `session` and remove its briefing file
pub fn kill_session(backend: &dyn PaneBackend, session: &str) -> Result<()> {
    let path = briefing_path(backend, session).ok().flatten();
    backend.kill_session(session)?;
    if let Some(path) = path {
        discard(&path);
    }
    Ok(())
}
