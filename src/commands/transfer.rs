//! Moving text in and out of panes: send, capture, handoff, relay.

use std::io::Write;

use tracing::debug;

use aiteam_core::actions;
use aiteam_core::capture::{capture_until_marker, incomplete_hint};
use aiteam_core::relay::{self, Extraction, RelayOptions};
use aiteam_core::selector;
use aiteam_core::session::resolve_session;
use aiteam_core::Result;

use super::{interrupted, CommandContext, Status};
use crate::config::{secs, CaptureArgs, HandoffArgs, RelayArgs, SendArgs};

pub(super) async fn send(ctx: &CommandContext<'_>, args: &SendArgs) -> Result<Status> {
    let session = resolve_session(ctx.backend, args.session.as_deref())?;
    let panes = ctx.backend.list_panes(&session)?;
    let pane = selector::resolve(&session, &args.to, &panes)?;
    let text = actions::read_input(args.body.as_deref(), args.file.as_deref(), args.pipe)?;
    actions::send_text(ctx.backend, &session, &pane, &text, !args.no_enter).await?;
    Ok(Status::Success)
}

/// Capture a pane; an unmet `--marker` still prints the text but exits with 3
pub(super) async fn capture<W: Write>(
    ctx: &CommandContext<'_>,
    args: &CaptureArgs,
    out: &mut W,
) -> Result<Status> {
    let session = resolve_session(ctx.backend, args.session.as_deref())?;
    let panes = ctx.backend.list_panes(&session)?;
    let pane = selector::resolve_pane(&session, &args.from_pane, &panes)?;

    let lines = args.lines.unwrap_or(ctx.settings.capture.lines).max(1);
    let interval = secs(
        args.interval_seconds
            .unwrap_or(ctx.settings.capture.interval_secs),
    );
    let outcome = capture_until_marker(
        ctx.backend,
        &pane.pane_id,
        lines,
        args.marker.as_deref(),
        secs(args.wait_seconds),
        interval,
    )
    .await?;

    match &args.output {
        Some(path) => std::fs::write(path, &outcome.text)?,
        None => out.write_all(outcome.text.as_bytes())?,
    }

    if outcome.complete {
        return Ok(Status::Success);
    }
    let marker = args.marker.as_deref().unwrap_or_default();
    eprintln!("{}", incomplete_hint(pane.agent_kind(), marker));
    Ok(Status::Incomplete)
}

pub(super) fn handoff(ctx: &CommandContext<'_>, args: &HandoffArgs) -> Result<Status> {
    let session = resolve_session(ctx.backend, args.session.as_deref())?;
    let message = actions::handoff(
        ctx.backend,
        &session,
        &args.from_pane,
        &args.to_pane,
        args.lines.max(1),
        args.header.as_deref(),
        !args.no_enter,
    )?;
    debug!(chars = message.chars().count(), "Handoff pasted");
    Ok(Status::Success)
}

/// Extraction mode from `--regex`/`--group` or the marker tokens
fn extraction(ctx: &CommandContext<'_>, args: &RelayArgs) -> Result<Extraction> {
    match &args.pattern {
        Some(pattern) => Extraction::pattern(pattern, args.group),
        None => Extraction::markers(
            args.begin.as_deref().unwrap_or(&ctx.settings.relay.begin),
            args.end.as_deref().unwrap_or(&ctx.settings.relay.end),
            args.keep_markers,
        ),
    }
}

fn relay_options(ctx: &CommandContext<'_>, args: &RelayArgs) -> RelayOptions {
    let defaults = &ctx.settings.relay;
    RelayOptions {
        lines: args.lines.unwrap_or(defaults.lines).max(1),
        interval: secs(args.interval.unwrap_or(defaults.interval_secs)),
        ttl: secs(args.dedupe_ttl.unwrap_or(defaults.dedupe_ttl_secs)),
        include_existing: args.include_existing,
        once: args.once,
        max_sends: args.max_sends,
        activate: !args.no_enter,
        header: args.header.clone(),
        prefix: args.prefix.clone(),
        dry_run: args.dry_run,
    }
}

/// Run the relay until `--once`/`--max-sends` is met or ctrl-c
pub(super) async fn relay<W: Write>(
    ctx: &CommandContext<'_>,
    args: &RelayArgs,
    out: &mut W,
) -> Result<Status> {
    let session = resolve_session(ctx.backend, args.session.as_deref())?;
    let extraction = extraction(ctx, args)?;
    let options = relay_options(ctx, args);

    let report = relay::relay(
        ctx.backend,
        &session,
        &args.from_pane,
        &args.to_pane,
        &extraction,
        &options,
        interrupted(),
        out,
    )
    .await?;
    debug!(sent = report.sent, stop = ?report.stop, "Relay finished");
    Ok(Status::Success)
}
