//! Scrollback capture with optional completion-marker wait.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::agents::AgentKind;
use crate::error::Result;
use crate::tmux::PaneBackend;

/// Lower bound for the marker poll cadence
pub const MIN_CAPTURE_INTERVAL: Duration = Duration::from_millis(50);

/// Lines read while waiting for an agent to boot
const BOOT_CAPTURE_LINES: u32 = 120;
const BOOT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Deadline used when `now + wait` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 86_400);

/// `now + wait`, saturating to a far-future deadline
fn deadline_after(wait: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(wait)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Latest capture and whether the marker was seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub text: String,
    pub complete: bool,
}

/// Capture the last `lines` lines of `pane`, waiting for `marker` if given.
///
/// Without a marker this is one capture and always complete. With a marker
/// the pane is polled every `interval` until the marker shows up or
/// `max_wait` runs out; the final sleep is clipped to the deadline.
pub async fn capture_until_marker(
    backend: &dyn PaneBackend,
    pane: &str,
    lines: u32,
    marker: Option<&str>,
    max_wait: Duration,
    interval: Duration,
) -> Result<CaptureOutcome> {
    let marker = match marker {
        Some(m) if !m.is_empty() => m,
        _ => {
            let text = backend.capture_scrollback(pane, lines)?;
            return Ok(CaptureOutcome {
                text,
                complete: true,
            });
        }
    };

    let interval = interval.max(MIN_CAPTURE_INTERVAL);
    let deadline = deadline_after(max_wait);
    loop {
        let text = backend.capture_scrollback(pane, lines)?;
        if text.contains(marker) {
            debug!(pane, marker, "Completion marker found");
            return Ok(CaptureOutcome {
                text,
                complete: true,
            });
        }
        let now = Instant::now();
        if now >= deadline {
            debug!(pane, marker, "Completion marker not seen before deadline");
            return Ok(CaptureOutcome {
                text,
                complete: false,
            });
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// Operator hint printed when a marker wait ran out.
///
/// Known agent panes get an extra line saying the agent is probably still working.
pub fn incomplete_hint(kind: Option<AgentKind>, marker: &str) -> String {
    let mut hint = format!("Capture incomplete: marker '{}' not found yet.", marker);
    if let Some(kind) = kind {
        hint.push('\n');
        hint.push_str(&format!(
            "{} may still be processing; wait and retry.",
            kind.short_name()
        ));
    }
    hint
}

/// Poll `pane` until any of `needles` (lowercase) shows up or `timeout` passes.
///
/// Capture failures count as "not yet". Returns whether a needle was seen.
pub async fn wait_for_boot(
    backend: &dyn PaneBackend,
    pane: &str,
    needles: &[&str],
    timeout: Duration,
) -> bool {
    let deadline = deadline_after(timeout);
    loop {
        let low = backend
            .capture_scrollback(pane, BOOT_CAPTURE_LINES)
            .unwrap_or_default()
            .to_lowercase();
        if needles.iter().any(|n| low.contains(n)) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(BOOT_POLL_INTERVAL.min(deadline - now)).await;
    }
}
