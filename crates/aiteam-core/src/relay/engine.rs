use std::future::Future;
use std::io::Write;
use std::time::{Duration, Instant};

use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use super::dedup::DedupCache;
use super::extract::Extraction;
use crate::error::{AiteamError, Result};
use crate::selector;
use crate::tmux::PaneBackend;

/// Poll interval floor
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// How long a failed backend call waits to see whether an interrupt caused it
pub const INTERRUPT_GRACE: Duration = Duration::from_millis(250);

/// Relay tuning
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Scrollback lines read per poll
    pub lines: u32,
    pub interval: Duration,
    /// Dedup window; zero keeps every hash for the whole run
    pub ttl: Duration,
    /// Forward messages already on screen when the relay starts
    pub include_existing: bool,
    /// Stop after the first forwarded message
    pub once: bool,
    /// Stop after this many forwarded messages (0 = unlimited)
    pub max_sends: u32,
    /// Press Enter after pasting
    pub activate: bool,
    pub header: Option<String>,
    pub prefix: Option<String>,
    /// Print messages instead of pasting them
    pub dry_run: bool,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            lines: 2000,
            interval: Duration::from_secs(1),
            ttl: Duration::from_secs(600),
            include_existing: false,
            once: false,
            max_sends: 0,
            activate: true,
            header: None,
            prefix: None,
            dry_run: false,
        }
    }
}

/// Why the relay loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Once,
    MaxSends,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReport {
    pub sent: usize,
    pub stop: StopReason,
}

/// Header line, prefix line, then the body
pub fn compose_message(body: &str, header: Option<&str>, prefix: Option<&str>) -> String {
    let mut out = String::new();
    for line in [header, prefix].into_iter().flatten() {
        if !line.is_empty() {
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push_str(body);
    out
}

struct Forwarder<'a, W: Write> {
    backend: &'a dyn PaneBackend,
    dst: String,
    route: String,
    options: &'a RelayOptions,
    out: &'a mut W,
    cache: DedupCache,
    sent: &'a mut usize,
}

impl<W: Write> Forwarder<'_, W> {
    /// Dedup and forward one extracted message; `Some` when the run should stop
    fn offer(&mut self, raw: &str, now: Instant) -> Result<Option<StopReason>> {
        let body = raw.trim_matches('\n');
        let key = body.trim();
        if key.is_empty() || !self.cache.check_and_record(key, now) {
            return Ok(None);
        }

        let message = compose_message(
            body,
            self.options.header.as_deref(),
            self.options.prefix.as_deref(),
        );
        if self.options.dry_run {
            writeln!(self.out, "{}", message)?;
            self.out.flush()?;
        } else {
            self.backend
                .write_text(&self.dst, &message, self.options.activate)?;
        }
        *self.sent += 1;
        info!("Relayed 1 message ({} chars): {}", message.chars().count(), self.route);

        if self.options.once {
            return Ok(Some(StopReason::Once));
        }
        if self.options.max_sends > 0 && *self.sent >= self.options.max_sends as usize {
            return Ok(Some(StopReason::MaxSends));
        }
        Ok(None)
    }
}

/// Watch `from` and paste each new extracted message into `to`.
///
/// Both selectors are resolved once up front. The first capture either
/// forwards what is already there (`include_existing`) or only seeds the
/// dedup cache. Afterwards the source is polled every `interval` until
/// `once`/`max_sends` is satisfied or `cancel` resolves.
///
/// `cancel` is polled before the first backend call. A backend failure
/// followed by `cancel` within [`INTERRUPT_GRACE`] counts as an interrupt;
/// any other failure ends the run with an error.
#[allow(clippy::too_many_arguments)]
pub async fn relay<W, C>(
    backend: &dyn PaneBackend,
    session: &str,
    from: &str,
    to: &str,
    extraction: &Extraction,
    options: &RelayOptions,
    cancel: C,
    out: &mut W,
) -> Result<RelayReport>
where
    W: Write,
    C: Future<Output = ()>,
{
    tokio::pin!(cancel);
    let mut sent = 0;
    let outcome = {
        let run = run_relay(backend, session, from, to, extraction, options, out, &mut sent);
        tokio::pin!(run);
        tokio::select! {
            biased;
            _ = &mut cancel => Ok(StopReason::Interrupted),
            outcome = &mut run => outcome,
        }
    };

    let stop = match outcome {
        Ok(stop) => stop,
        // tmux children share our process group and die from the same ctrl-c
        Err(e @ AiteamError::BackendCommandFailed { .. }) => {
            match timeout(INTERRUPT_GRACE, &mut cancel).await {
                Ok(()) => StopReason::Interrupted,
                Err(_) => return Err(e),
            }
        }
        Err(e) => return Err(e),
    };
    if stop == StopReason::Interrupted {
        debug!(sent, "Relay interrupted");
    }
    Ok(RelayReport { sent, stop })
}

#[allow(clippy::too_many_arguments)]
async fn run_relay<W: Write>(
    backend: &dyn PaneBackend,
    session: &str,
    from: &str,
    to: &str,
    extraction: &Extraction,
    options: &RelayOptions,
    out: &mut W,
    sent: &mut usize,
) -> Result<StopReason> {
    let panes = backend.list_panes(session)?;
    let src = selector::resolve(session, from, &panes)?;
    let dst = selector::resolve(session, to, &panes)?;
    debug!(src = %src, dst = %dst, "Relay panes resolved");

    let mut fwd = Forwarder {
        backend,
        dst,
        route: format!("{} -> {}", from, to),
        options,
        out,
        cache: DedupCache::new(options.ttl),
        sent,
    };

    let initial = backend.capture_scrollback(&src, options.lines)?;
    let now = Instant::now();
    for msg in extraction.extract(&initial) {
        if options.include_existing {
            if let Some(stop) = fwd.offer(msg, now)? {
                return Ok(stop);
            }
        } else {
            let key = msg.trim();
            if !key.is_empty() {
                fwd.cache.record(key, now);
            }
        }
    }
    debug!(seeded = fwd.cache.len(), "Relay initial capture processed");

    let interval = options.interval.max(MIN_INTERVAL);
    loop {
        sleep(interval).await;

        let snapshot = backend.capture_scrollback(&src, options.lines)?;
        let now = Instant::now();
        fwd.cache.evict(now);
        for msg in extraction.extract(&snapshot) {
            if let Some(stop) = fwd.offer(msg, now)? {
                return Ok(stop);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::{FakeBackend, PastedText};
    use pretty_assertions::assert_eq;
    use std::future::pending;

    fn push_markers() -> Extraction {
        Extraction::markers("[PUSH]", "[/PUSH]", false).unwrap()
    }

    fn fast(options: RelayOptions) -> RelayOptions {
        RelayOptions {
            interval: MIN_INTERVAL,
            ..options
        }
    }

    fn pasted(pane: &str, text: &str) -> PastedText {
        PastedText {
            pane: pane.to_string(),
            text: text.to_string(),
            activate: true,
        }
    }

    #[test]
    fn test_compose_message_order() {
        assert_eq!(compose_message("body", None, None), "body");
        assert_eq!(compose_message("body", Some("hdr"), None), "hdr\nbody");
        assert_eq!(compose_message("body", None, Some("pfx")), "pfx\nbody");
        assert_eq!(
            compose_message("body", Some("hdr"), Some("pfx")),
            "hdr\npfx\nbody"
        );
    }

    #[tokio::test]
    async fn test_include_existing_once_forwards_exactly_hello() {
        let backend = FakeBackend::new("demo", &["src", "dst"])
            .with_frames("%0", &["[PUSH]\nhello\n[/PUSH]\n"]);
        let options = fast(RelayOptions {
            include_existing: true,
            once: true,
            ..RelayOptions::default()
        });
        let mut out = Vec::new();
        let report = relay(
            &backend,
            "demo",
            "src",
            "dst",
            &push_markers(),
            &options,
            pending(),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(
            report,
            RelayReport {
                sent: 1,
                stop: StopReason::Once
            }
        );
        assert_eq!(backend.writes(), vec![pasted("%1", "hello")]);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_existing_blocks_are_seeded_not_forwarded() {
        let old = "[PUSH]\nold\n[/PUSH]\n";
        let new = "[PUSH]\nold\n[/PUSH]\n[PUSH]\nnew\n[/PUSH]\n";
        let backend =
            FakeBackend::new("demo", &["src", "dst"]).with_frames("%0", &[old, old, new]);
        let options = fast(RelayOptions {
            max_sends: 1,
            ..RelayOptions::default()
        });
        let mut out = Vec::new();
        let report = relay(
            &backend,
            "demo",
            "src",
            "dst",
            &push_markers(),
            &options,
            pending(),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(report.stop, StopReason::MaxSends);
        assert_eq!(backend.writes(), vec![pasted("%1", "new")]);
    }

    #[tokio::test]
    async fn test_no_new_blocks_until_interrupted() {
        let block = "[PUSH]\nsame\n[/PUSH]\n";
        let backend = FakeBackend::new("demo", &["src", "dst"]).with_frames("%0", &[block]);
        let options = fast(RelayOptions::default());
        let mut out = Vec::new();
        let report = relay(
            &backend,
            "demo",
            "src",
            "dst",
            &push_markers(),
            &options,
            sleep(Duration::from_millis(450)),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(
            report,
            RelayReport {
                sent: 0,
                stop: StopReason::Interrupted
            }
        );
        assert!(backend.writes().is_empty());
        assert!(backend.capture_count() >= 3);
    }

    #[tokio::test]
    async fn test_repeated_bodies_forward_once() {
        let frame = "[PUSH]\nping\n[/PUSH]\n[PUSH]\nping\n[/PUSH]\n[PUSH]\n   \n[/PUSH]\n[PUSH]\npong\n[/PUSH]";
        let backend = FakeBackend::new("demo", &["src", "dst"]).with_frames("%0", &[frame]);
        let options = fast(RelayOptions {
            include_existing: true,
            ..RelayOptions::default()
        });
        let mut out = Vec::new();
        let report = relay(
            &backend,
            "demo",
            "src",
            "dst",
            &push_markers(),
            &options,
            sleep(Duration::from_millis(350)),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(
            backend.writes(),
            vec![pasted("%1", "ping"), pasted("%1", "pong")]
        );
    }

    #[tokio::test]
    async fn test_dry_run_prints_composed_message() {
        let backend = FakeBackend::new("demo", &["codex#1:src", "claude"])
            .with_frames("%0", &["[PUSH]\nresult\n[/PUSH]"]);
        let options = fast(RelayOptions {
            include_existing: true,
            once: true,
            dry_run: true,
            header: Some("From codex:1".to_string()),
            prefix: Some("Please review:".to_string()),
            ..RelayOptions::default()
        });
        let mut out = Vec::new();
        relay(
            &backend,
            "demo",
            "codex:1",
            "claude",
            &push_markers(),
            &options,
            pending(),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "From codex:1\nPlease review:\nresult\n"
        );
        assert!(backend.writes().is_empty());
    }

    #[tokio::test]
    async fn test_no_enter_pastes_without_activation() {
        let backend = FakeBackend::new("demo", &["src", "dst"])
            .with_frames("%0", &["[PUSH]x[/PUSH]"]);
        let options = fast(RelayOptions {
            include_existing: true,
            once: true,
            activate: false,
            ..RelayOptions::default()
        });
        let mut out = Vec::new();
        relay(
            &backend,
            "demo",
            "src",
            "dst",
            &push_markers(),
            &options,
            pending(),
            &mut out,
        )
        .await
        .unwrap();
        assert!(!backend.writes()[0].activate);
    }

    #[tokio::test]
    async fn test_pattern_mode_relay() {
        let backend = FakeBackend::new("demo", &["src", "dst"])
            .with_frames("%0", &["", "noise\n>> status ok\n"]);
        let extraction = Extraction::pattern(r"^>> (.+)$", None).unwrap();
        let options = fast(RelayOptions {
            once: true,
            ..RelayOptions::default()
        });
        let mut out = Vec::new();
        relay(
            &backend,
            "demo",
            "src",
            "dst",
            &extraction,
            &options,
            pending(),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(backend.writes(), vec![pasted("%1", "status ok")]);
    }

    #[tokio::test]
    async fn test_backend_failure_ends_relay_with_error() {
        let backend = FakeBackend::new("demo", &["src", "dst"]).fail_captures("%0");
        let options = fast(RelayOptions::default());
        let mut out = Vec::new();
        let err = relay(
            &backend,
            "demo",
            "src",
            "dst",
            &push_markers(),
            &options,
            pending(),
            &mut out,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AiteamError::BackendCommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_interrupt_before_start_skips_backend() {
        let backend = FakeBackend::new("demo", &["src", "dst"])
            .with_frames("%0", &["[PUSH]\nhello\n[/PUSH]\n"]);
        let options = fast(RelayOptions {
            include_existing: true,
            ..RelayOptions::default()
        });
        let mut out = Vec::new();
        let report = relay(
            &backend,
            "demo",
            "src",
            "dst",
            &push_markers(),
            &options,
            std::future::ready(()),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(
            report,
            RelayReport {
                sent: 0,
                stop: StopReason::Interrupted
            }
        );
        assert_eq!(backend.capture_count(), 0);
        assert!(backend.writes().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_during_interrupt_is_clean_stop() {
        let backend = FakeBackend::new("demo", &["src", "dst"]).fail_captures("%0");
        let options = fast(RelayOptions::default());
        let mut out = Vec::new();
        let report = relay(
            &backend,
            "demo",
            "src",
            "dst",
            &push_markers(),
            &options,
            sleep(Duration::from_millis(20)),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(report.stop, StopReason::Interrupted);
        assert_eq!(report.sent, 0);
    }

    #[tokio::test]
    async fn test_unknown_destination_fails_before_capturing() {
        let backend = FakeBackend::new("demo", &["src", "dst"]);
        let options = fast(RelayOptions::default());
        let mut out = Vec::new();
        let err = relay(
            &backend,
            "demo",
            "src",
            "nowhere",
            &push_markers(),
            &options,
            pending(),
            &mut out,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AiteamError::Selector(_)));
        assert_eq!(backend.capture_count(), 0);
    }
}
