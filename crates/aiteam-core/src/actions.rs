//! One-shot pane operations: send text, hand off a capture.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::agents::AgentKind;
use crate::error::{AiteamError, Result};
use crate::registry::InstanceLabel;
use crate::selector;
use crate::tmux::{PaneBackend, ENTER_KEY};

/// Pause before the confirming Enter sent to Codex panes
pub const CODEX_CONFIRM_DELAY: Duration = Duration::from_millis(80);

/// Pick the text for a send-like command: body, then file, then stdin
pub fn read_input(body: Option<&str>, file: Option<&Path>, pipe: bool) -> Result<String> {
    if let Some(body) = body {
        return Ok(body.to_string());
    }
    if let Some(path) = file {
        return Ok(std::fs::read_to_string(path)?);
    }
    if pipe {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Err(AiteamError::InputMissing)
}

/// Paste `text` into `pane`, pressing Enter unless `activate` is off.
///
/// Codex keeps multi-line input in compose mode after the first Enter, so
/// those panes get one more Enter after a short pause.
pub async fn send_text(
    backend: &dyn PaneBackend,
    session: &str,
    pane: &str,
    text: &str,
    activate: bool,
) -> Result<()> {
    backend.write_text(pane, text, activate)?;
    if activate && text.contains('\n') && is_codex_pane(backend, session, pane)? {
        tokio::time::sleep(CODEX_CONFIRM_DELAY).await;
        backend.send_activation(pane, ENTER_KEY)?;
        debug!(pane, "Sent confirming Enter to Codex pane");
    }
    Ok(())
}

/// Only Codex instance panes (`codex#<id>:<name>`) count; a plain `codex` title does not
fn is_codex_pane(backend: &dyn PaneBackend, session: &str, pane: &str) -> Result<bool> {
    Ok(backend
        .list_panes(session)?
        .iter()
        .find(|p| p.pane_id == pane)
        .and_then(|p| InstanceLabel::parse(&p.title))
        .is_some_and(|label| label.kind == AgentKind::Codex))
}

/// Capture block pasted by [`handoff`]
pub fn format_handoff(header: &str, captured: &str, lines: u32) -> String {
    format!(
        "{}\n----- BEGIN CAPTURE ({} lines) -----\n{}\n----- END CAPTURE -----\n",
        header,
        lines,
        captured.trim_end()
    )
}

/// Capture `from` and paste it, framed, into `to`; returns the pasted message
pub fn handoff(
    backend: &dyn PaneBackend,
    session: &str,
    from: &str,
    to: &str,
    lines: u32,
    header: Option<&str>,
    activate: bool,
) -> Result<String> {
    let panes = backend.list_panes(session)?;
    let src = selector::resolve(session, from, &panes)?;
    let dst = selector::resolve(session, to, &panes)?;
    let captured = backend.capture_scrollback(&src, lines)?;
    let header = match header {
        Some(h) => h.to_string(),
        None => format!("Handoff from {}:", from),
    };
    let message = format_handoff(&header, &captured, lines);
    backend.write_text(&dst, &message, activate)?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::FakeBackend;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_read_input_prefers_body() {
        assert_eq!(read_input(Some("hi"), None, true).unwrap(), "hi");
    }

    #[test]
    fn test_read_input_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "line one\nline two\n").unwrap();
        assert_eq!(
            read_input(None, Some(file.path()), false).unwrap(),
            "line one\nline two\n"
        );
    }

    #[test]
    fn test_read_input_missing() {
        let err = read_input(None, None, false).unwrap_err();
        assert!(matches!(err, AiteamError::InputMissing));
        assert_eq!(
            err.to_string(),
            "No input text provided. Use --body, --file, or --pipe."
        );
    }

    #[tokio::test]
    async fn test_send_multiline_to_codex_adds_enter() {
        let backend = FakeBackend::new("demo", &["claude", "codex#1:a"]);
        send_text(&backend, "demo", "%1", "first\nsecond", true)
            .await
            .unwrap();
        assert_eq!(backend.writes().len(), 1);
        assert_eq!(
            backend.keys(),
            vec![("%1".to_string(), ENTER_KEY.to_string())]
        );
    }

    #[tokio::test]
    async fn test_send_single_line_or_other_kinds_gets_one_enter() {
        let backend = FakeBackend::new("demo", &["claude", "codex#1:a"]);
        send_text(&backend, "demo", "%1", "one line", true)
            .await
            .unwrap();
        send_text(&backend, "demo", "%0", "two\nlines", true)
            .await
            .unwrap();
        send_text(&backend, "demo", "%1", "two\nlines", false)
            .await
            .unwrap();
        assert!(backend.keys().is_empty());
        assert_eq!(backend.writes().len(), 3);
    }

    #[tokio::test]
    async fn test_send_multiline_to_plain_codex_title_gets_one_enter() {
        let backend = FakeBackend::new("demo", &["codex", "codex#2:b"]);
        send_text(&backend, "demo", "%0", "two\nlines", true)
            .await
            .unwrap();
        assert!(backend.keys().is_empty());
        assert!(backend.writes()[0].activate);
    }

    #[test]
    fn test_format_handoff() {
        assert_eq!(
            format_handoff("Handoff from codex:1:", "result\n\n", 50),
            "Handoff from codex:1:\n----- BEGIN CAPTURE (50 lines) -----\nresult\n----- END CAPTURE -----\n"
        );
    }

    #[test]
    fn test_handoff_pastes_capture_into_target() {
        let backend = FakeBackend::new("demo", &["claude", "codex#1:a"])
            .with_frames("%1", &["analysis done\n"]);
        let message = handoff(&backend, "demo", "codex:1", "claude", 80, None, true).unwrap();
        assert!(message.starts_with("Handoff from codex:1:\n"));
        let writes = backend.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].pane, "%0");
        assert_eq!(writes[0].text, message);
    }

    #[test]
    fn test_handoff_custom_header() {
        let backend = FakeBackend::new("demo", &["a", "b"]).with_frames("%0", &["x"]);
        let message = handoff(&backend, "demo", "a", "b", 10, Some("FYI"), false).unwrap();
        assert!(message.starts_with("FYI\n----- BEGIN CAPTURE (10 lines) -----\nx\n"));
        assert!(!backend.writes()[0].activate);
    }
}
