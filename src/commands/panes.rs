//! Session and pane lifecycle: spawn, start, add, codex, attach, list, kill.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use aiteam_core::agents::AgentKind;
use aiteam_core::briefing;
use aiteam_core::session::{resolve_new_session_name, resolve_session};
use aiteam_core::spawn::{self, AddOutcome, AddPaneRequest, InstanceRequest, SpawnOutcome};
use aiteam_core::team::{self, MainAgent, Worker};
use aiteam_core::tmux::PaneBackend;
use aiteam_core::{AiteamError, Result};

use super::{working_dir, CommandContext, Status};
use crate::config::{AddArgs, CodexArgs, ListArgs, SpawnArgs, SplitArg, StartArgs};

pub(super) async fn spawn(ctx: &CommandContext<'_>, args: &SpawnArgs) -> Result<Status> {
    let workers = if args.workers.is_empty() {
        team::default_workers(&ctx.settings.codex_command)
    } else {
        args.workers
            .iter()
            .map(|w| w.parse())
            .collect::<Result<Vec<Worker>>>()?
    };

    let cwd = working_dir(args.cwd.as_deref())?;
    let session = new_session_name(ctx.backend, args.session.as_deref(), &cwd).await?;
    let briefing = session_briefing(ctx, &session, &cwd, args.briefing_file.as_deref())?;
    let panes = team::spawn_team(
        ctx.backend,
        &session,
        Some(&cwd),
        &workers,
        args.layout.into(),
        args.force,
        briefing.as_deref(),
    )?;
    if briefing.is_some() {
        for (worker, pane) in workers.iter().zip(&panes) {
            briefing::paste_into(ctx.backend, &session, pane, &worker.command).await?;
        }
    }

    if args.attach {
        return attach(ctx.backend, &session);
    }
    Ok(Status::Success)
}

pub(super) async fn start(ctx: &CommandContext<'_>, args: &StartArgs) -> Result<Status> {
    let worker = MainAgent::from(args.main).worker(
        args.command.as_deref(),
        args.title.as_deref(),
        &ctx.settings.codex_command,
    )?;

    let cwd = working_dir(args.cwd.as_deref())?;
    let session = new_session_name(ctx.backend, args.session.as_deref(), &cwd).await?;
    let briefing = session_briefing(ctx, &session, &cwd, args.briefing_file.as_deref())?;
    let pane = team::start_main(
        ctx.backend,
        &session,
        Some(&cwd),
        &worker,
        args.force,
        briefing.as_deref(),
    )?;
    if briefing.is_some() {
        briefing::paste_into(ctx.backend, &session, &pane, &worker.command).await?;
    }

    if args.attach {
        return attach(ctx.backend, &session);
    }
    Ok(Status::Success)
}

/// Name for a new session, announcing the tmux version and any derived name
async fn new_session_name(
    backend: &dyn PaneBackend,
    requested: Option<&str>,
    cwd: &std::path::Path,
) -> Result<String> {
    let (session, derived) = resolve_new_session_name(backend, requested, cwd).await?;
    eprintln!("tmux: {}", backend.version()?);
    if derived {
        eprintln!("session(auto): {}", session);
    }
    Ok(session)
}

/// Private copy of `--briefing-file` for a session about to be created
fn session_briefing(
    ctx: &CommandContext<'_>,
    session: &str,
    cwd: &Path,
    source: Option<&Path>,
) -> Result<Option<PathBuf>> {
    source
        .map(|src| briefing::create_briefing_file(&ctx.settings.lock_dir(), session, cwd, src))
        .transpose()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(super) async fn add(ctx: &CommandContext<'_>, args: &AddArgs) -> Result<Status> {
    let session = resolve_session(ctx.backend, args.session.as_deref())?;

    let (name, command) = match &args.worker {
        Some(worker_arg) => {
            let worker: Worker = worker_arg.parse()?;
            (Some(worker.name), Some(worker.command))
        }
        None => (args.name.clone(), args.command.clone()),
    };
    let (Some(title), Some(command)) = (non_empty(name), non_empty(command)) else {
        return Err(AiteamError::invalid(
            "Agent not specified. Use --worker name=command or --name/--exec.",
        ));
    };

    let req = AddPaneRequest {
        session: session.clone(),
        title: title.clone(),
        command: command.clone(),
        base_pane: args.split.base_pane.clone(),
        cwd: args.split.cwd.clone(),
        vertical: args.split.layout == SplitArg::Vertical,
        tiled: args.split.tiled,
        focus: args.split.focus.into(),
        policy: args.if_duplicate.into(),
    };
    match spawn::add_pane(ctx.backend, &req)? {
        AddOutcome::Created { pane_id } => {
            briefing::paste_into(ctx.backend, &session, &pane_id, &command).await?;
            debug!(pane = %pane_id, "add finished");
        }
        AddOutcome::Skipped => {
            if !args.split.quiet {
                eprintln!("Pane '{}' already exists in session '{}' (skip).", title, session);
            }
        }
    }
    Ok(Status::Success)
}

fn instance_request(session: String, command: String, args: &CodexArgs) -> InstanceRequest {
    let split = &args.split;
    let mut req = InstanceRequest::new(session, AgentKind::Codex, command);
    req.id = args.id.clone();
    req.name = Some(args.name.clone());
    req.base_pane = split.base_pane.clone();
    req.cwd = split.cwd.clone();
    req.vertical = split.layout == SplitArg::Vertical;
    req.tiled = split.tiled;
    req.focus = split.focus.into();
    req.policy = args.policy.into();
    req
}

pub(super) async fn codex<W: Write>(
    ctx: &CommandContext<'_>,
    args: &CodexArgs,
    out: &mut W,
) -> Result<Status> {
    let session = resolve_session(ctx.backend, args.session.as_deref())?;
    let command = args
        .command
        .clone()
        .unwrap_or_else(|| ctx.settings.codex_command.clone());
    let req = instance_request(session, command, args);

    match spawn::spawn_instance(ctx.backend, &ctx.settings.lock_dir(), &req)? {
        SpawnOutcome::Skipped { id, selector } => {
            if !args.split.quiet {
                eprintln!("Codex id '{}' already exists (skip). Use {} to target it.", id, selector);
            }
        }
        SpawnOutcome::Started(info) => {
            briefing::paste_into(ctx.backend, &info.session, &info.pane_id, &req.command).await?;
            if !args.split.quiet {
                eprintln!(
                    "Started Codex: id={} name={} (target selector: {})",
                    info.id, info.name, info.selector
                );
            }
            if args.json {
                let json = serde_json::to_string(&info).map_err(std::io::Error::from)?;
                writeln!(out, "{}", json)?;
            } else if !args.omit_selector {
                writeln!(out, "{}", info.selector)?;
            }
        }
    }
    Ok(Status::Success)
}

/// Hand the terminal over to tmux; only returns when that failed
pub(super) fn attach(backend: &dyn PaneBackend, session: &str) -> Result<Status> {
    match backend.attach_interactive(session)? {}
}

pub(super) fn list<W: Write>(ctx: &CommandContext<'_>, args: &ListArgs, out: &mut W) -> Result<Status> {
    let filter = args.filter.as_deref().unwrap_or("");
    for session in ctx.backend.list_sessions()? {
        if session.contains(filter) {
            writeln!(out, "{}", session)?;
        }
    }
    Ok(Status::Success)
}

pub(super) fn kill(ctx: &CommandContext<'_>, session: &str) -> Result<Status> {
    briefing::kill_session(ctx.backend, session)?;
    Ok(Status::Success)
}

#[cfg(test)]
mod tests {
    use crate::commands::test_support::{run, settings};
    use super::*;
    use aiteam_core::tmux::FakeBackend;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_spawn_default_workers() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("scratch", &[]);
        let cwd = dir.path().to_string_lossy().into_owned();
        let (status, _) = run(
            &backend,
            &settings(dir.path()),
            &["spawn", "--session", "team", "--cwd", &cwd],
        )
        .await
        .unwrap();

        assert_eq!(status, Status::Success);
        assert!(backend.sessions().contains(&"team".to_string()));
        let titles: Vec<String> = backend.panes().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["claude", "codex"]);
        let commands: Vec<String> = backend.writes().into_iter().map(|w| w.text).collect();
        assert_eq!(commands, vec!["claude", "codex -p aiteam"]);
    }

    #[tokio::test]
    async fn test_spawn_rejects_bad_worker() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("scratch", &[]);
        let err = run(
            &backend,
            &settings(dir.path()),
            &["spawn", "--session", "team", "--worker", "claude"],
        )
        .await
        .unwrap_err();
        assert!(err.is_usage_error());
        assert_eq!(backend.sessions(), vec!["scratch"]);
    }

    #[tokio::test]
    async fn test_start_custom_needs_exec() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("scratch", &[]);
        let err = run(
            &backend,
            &settings(dir.path()),
            &["start", "--session", "solo", "--main", "custom"],
        )
        .await
        .unwrap_err();
        assert!(err.is_usage_error());

        run(
            &backend,
            &settings(dir.path()),
            &["start", "--session", "solo", "--main", "custom", "--exec", "aider", "--cwd", "/"],
        )
        .await
        .unwrap();
        assert_eq!(backend.panes()[0].title, "main");
        assert_eq!(backend.writes()[0].text, "aider");
    }

    fn briefing_source(dir: &Path) -> String {
        let path = dir.join("notes.md");
        std::fs::write(&path, "Focus on the parser.\n").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_start_with_briefing_pastes_into_codex_main() {
        let dir = tempfile::tempdir().unwrap();
        let src = briefing_source(dir.path());
        let backend = FakeBackend::new("scratch", &[]);
        let settings = settings(dir.path());
        run(
            &backend,
            &settings,
            &["start", "--session", "solo", "--main", "codex", "--cwd", "/", "--briefing-file", &src],
        )
        .await
        .unwrap();

        let copy = briefing::briefing_path(&backend, "solo").unwrap().unwrap();
        assert!(copy.starts_with(dir.path()));
        assert_ne!(copy, PathBuf::from(&src));
        let writes = backend.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].text, "codex -p aiteam");
        assert!(writes[1].text.starts_with("AITEAM SESSION BRIEFING (ephemeral)"));
        assert!(writes[1].text.ends_with("Focus on the parser."));
        assert_eq!(backend.hooks()[0].1, "session-closed");

        run(&backend, &settings, &["kill", "--session", "solo"]).await.unwrap();
        assert!(!copy.exists());
        assert!(Path::new(&src).exists());
    }

    #[tokio::test]
    async fn test_spawn_with_briefing_skips_non_codex_workers() {
        let dir = tempfile::tempdir().unwrap();
        let src = briefing_source(dir.path());
        let backend = FakeBackend::new("scratch", &[]);
        run(
            &backend,
            &settings(dir.path()),
            &["spawn", "--session", "team", "--cwd", "/", "--briefing-file", &src],
        )
        .await
        .unwrap();

        let writes = backend.writes();
        let panes: Vec<&str> = writes.iter().map(|w| w.pane.as_str()).collect();
        assert_eq!(panes, vec!["%0", "%1", "%1"]);
        assert!(writes[2].text.contains("Focus on the parser."));
    }

    #[tokio::test]
    async fn test_spawn_missing_briefing_file_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("scratch", &[]);
        let missing = dir.path().join("absent.md").to_string_lossy().into_owned();
        let err = run(
            &backend,
            &settings(dir.path()),
            &["spawn", "--session", "team", "--cwd", "/", "--briefing-file", &missing],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AiteamError::Io(_)));
        assert_eq!(backend.sessions(), vec!["scratch"]);
    }

    #[tokio::test]
    async fn test_codex_pastes_session_briefing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("demo", &["claude"]);
        let notes = dir.path().join("briefing.md");
        std::fs::write(&notes, "  shared context \n").unwrap();
        briefing::install(&backend, "demo", &notes).unwrap();

        run(
            &backend,
            &settings(dir.path()),
            &["codex", "--session", "demo", "--cwd", "/"],
        )
        .await
        .unwrap();

        let writes = backend.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].pane, "%1");
        assert_eq!(writes[1].text, "shared context");
    }

    #[tokio::test]
    async fn test_add_worker_and_skip_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("demo", &["claude"]).with_current_pane("%0");
        let args = ["add", "--worker", "reviewer=codex -p review", "--cwd", "/"];

        run(&backend, &settings(dir.path()), &args).await.unwrap();
        assert_eq!(backend.panes().len(), 2);
        assert_eq!(backend.panes()[1].title, "reviewer");
        assert_eq!(backend.current_pane().unwrap(), "%0");

        let (status, _) = run(&backend, &settings(dir.path()), &args).await.unwrap();
        assert_eq!(status, Status::Success);
        assert_eq!(backend.panes().len(), 2);
    }

    #[tokio::test]
    async fn test_add_requires_agent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("demo", &["claude"]);
        let err = run(
            &backend,
            &settings(dir.path()),
            &["add", "--session", "demo", "--name", "x"],
        )
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("Agent not specified."));
    }

    #[tokio::test]
    async fn test_codex_prints_selector() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("demo", &["claude", "codex#1:a"]);
        let (_, out) = run(
            &backend,
            &settings(dir.path()),
            &["codex", "--session", "demo", "--name", "review", "--cwd", "/"],
        )
        .await
        .unwrap();

        assert_eq!(out, "codex:2\n");
        assert_eq!(backend.panes()[2].title, "codex#2:review");
        assert_eq!(backend.writes()[0].text, "codex -p aiteam");
    }

    #[tokio::test]
    async fn test_codex_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("demo", &["claude"]);
        let (_, out) = run(
            &backend,
            &settings(dir.path()),
            &["codex", "--session", "demo", "--id", "w1", "--json", "--exec", "codex", "--cwd", "/"],
        )
        .await
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["id"], "w1");
        assert_eq!(value["name"], "codex");
        assert_eq!(value["selector"], "codex:w1");
        assert_eq!(value["pane_title"], "codex#w1:codex");
        assert_eq!(value["session"], "demo");
    }

    #[tokio::test]
    async fn test_codex_duplicate_id_policy() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("demo", &["claude", "codex#w1:a"]);
        let err = run(
            &backend,
            &settings(dir.path()),
            &["codex", "--session", "demo", "--id", "w1"],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AiteamError::DuplicateInstanceId { .. }));

        let (status, out) = run(
            &backend,
            &settings(dir.path()),
            &["codex", "--session", "demo", "--id", "w1", "--policy", "skip"],
        )
        .await
        .unwrap();
        assert_eq!(status, Status::Success);
        assert_eq!(out, "");
        assert_eq!(backend.panes().len(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("demo", &["claude"]);
        backend
            .create_session("other", None, false)
            .unwrap();

        let (_, out) = run(&backend, &settings(dir.path()), &["list"]).await.unwrap();
        assert_eq!(out, "demo\nother\n");
        let (_, out) = run(&backend, &settings(dir.path()), &["list", "--filter", "oth"])
            .await
            .unwrap();
        assert_eq!(out, "other\n");
    }

    #[tokio::test]
    async fn test_kill_and_attach() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new("demo", &["claude"]);
        assert!(run(&backend, &settings(dir.path()), &["attach", "--session", "demo"])
            .await
            .is_err());

        run(&backend, &settings(dir.path()), &["kill", "--session", "demo"])
            .await
            .unwrap();
        assert!(backend.sessions().is_empty());
        assert!(run(&backend, &settings(dir.path()), &["kill", "--session", "demo"])
            .await
            .is_err());
    }
}
