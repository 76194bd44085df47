//! `selftest`: relay one marker block between two scratch panes.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use aiteam_core::relay::{relay, Extraction, RelayOptions};
use aiteam_core::tmux::PaneBackend;
use aiteam_core::{AiteamError, Result};

use super::{interrupted, panes, working_dir, CommandContext, Status};
use crate::config::SelftestArgs;

/// Prints a marker block for every `ping` line it reads
const SRC_AGENT: &str = r#"echo READY
while IFS= read -r line; do
  case "$line" in
    "") ;;
    ping|PING) printf '[PUSH]\npong\n[/PUSH]\n' ;;
    *) echo "ECHO:$line" ;;
  esac
done
"#;

/// Time the panes get to start their programs and print
const SETTLE: Duration = Duration::from_millis(400);

const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn run<W: Write>(
    ctx: &CommandContext<'_>,
    args: &SelftestArgs,
    out: &mut W,
) -> Result<Status> {
    let session = match args.session.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => format!("aiteam-selftest-{}", std::process::id()),
    };
    let cwd = working_dir(args.cwd.as_deref())?;
    let dir = tempfile::Builder::new().prefix("aiteam_selftest_").tempdir()?;
    let script = dir.path().join("src_agent.sh");
    std::fs::write(&script, SRC_AGENT)?;

    let result = exercise(ctx.backend, &session, &cwd, &script).await;

    if !args.keep && !args.attach {
        if let Err(e) = ctx.backend.kill_session(&session) {
            debug!("Selftest session not removed: {}", e);
        }
    }

    let status = match &result {
        Ok((true, _)) => {
            writeln!(out, "SELFTEST PASS: relay delivered 'pong' to dst")?;
            Status::Success
        }
        Ok((false, capture)) => {
            eprintln!("SELFTEST FAIL: did not observe 'pong' in dst");
            eprintln!("--- dst capture ---");
            eprintln!("{}", capture);
            Status::Failed
        }
        Err(_) => Status::Failed,
    };

    if args.attach {
        out.flush()?;
        if let Err(e) = panes::attach(ctx.backend, &session) {
            debug!("Selftest attach failed: {}", e);
        }
    }
    result.map(|_| status)
}

/// Build the two-pane session, relay once and read back the destination
async fn exercise(
    backend: &dyn PaneBackend,
    session: &str,
    cwd: &Path,
    script: &Path,
) -> Result<(bool, String)> {
    backend.create_session(session, Some(cwd), true)?;
    backend.split_from(session, Some(cwd), true)?;
    let panes = backend.list_panes(session)?;
    let [src, dst, ..] = panes.as_slice() else {
        return Err(AiteamError::BackendCommandFailed {
            operation: "split-window".to_string(),
            diagnostic: "Selftest expected 2 panes but tmux returned fewer.".to_string(),
        });
    };
    backend.set_title(&src.pane_id, "src")?;
    backend.set_title(&dst.pane_id, "dst")?;

    backend.write_text(&src.pane_id, &format!("sh '{}'", script.display()), true)?;
    backend.write_text(&dst.pane_id, "cat", true)?;
    sleep(SETTLE).await;
    backend.write_text(&src.pane_id, "ping", true)?;
    sleep(SETTLE).await;

    let options = RelayOptions {
        interval: Duration::from_millis(200),
        ttl: Duration::from_secs(60),
        include_existing: true,
        once: true,
        max_sends: 1,
        header: Some("(selftest)".to_string()),
        ..RelayOptions::default()
    };
    let extraction = Extraction::markers("[PUSH]", "[/PUSH]", false)?;
    let mut sink = std::io::sink();
    let relayed = timeout(
        RELAY_TIMEOUT,
        relay(backend, session, "src", "dst", &extraction, &options, interrupted(), &mut sink),
    )
    .await;
    let report = match relayed {
        Ok(report) => report?,
        Err(_) => {
            return Err(AiteamError::BackendCommandFailed {
                operation: "relay".to_string(),
                diagnostic: format!("Selftest relay did not deliver within {:?}.", RELAY_TIMEOUT),
            })
        }
    };
    info!(sent = report.sent, "Selftest relay finished");

    sleep(Duration::from_millis(200)).await;
    let capture = backend.capture_scrollback(&dst.pane_id, 200)?;
    Ok((capture.contains("pong"), capture))
}
