//! One function per subcommand, all written against [`PaneBackend`].

mod diagnose;
mod panes;
mod selftest;
mod transfer;

pub use diagnose::{detect_agent_context, help_epilog, maybe_start_error_analyzer, AgentContext};

use std::io::Write;
use std::path::{Path, PathBuf};

use aiteam_core::tmux::PaneBackend;
use aiteam_core::Result;

use crate::config::{Command, Settings};

/// How a command finished when it did not return an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// A capture ran out of time before its marker showed up
    Incomplete,
    /// The command reported its own failure (selftest)
    Failed,
}

impl Status {
    /// Process exit code
    pub fn code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Failed => 1,
            Status::Incomplete => 3,
        }
    }
}

/// Exit code for a command that returned an error
pub fn error_code(err: &aiteam_core::AiteamError) -> i32 {
    if err.is_usage_error() {
        2
    } else {
        1
    }
}

/// What every command gets to work with
pub struct CommandContext<'a> {
    pub backend: &'a dyn PaneBackend,
    pub settings: &'a Settings,
    /// Location of the tmux binary, shown by `doctor`
    pub tmux_path: Option<PathBuf>,
}

/// Run one parsed subcommand; machine-readable output goes to `out`
pub async fn dispatch<W: Write>(
    ctx: &CommandContext<'_>,
    command: &Command,
    out: &mut W,
) -> Result<Status> {
    match command {
        Command::Spawn(args) => panes::spawn(ctx, args).await,
        Command::Start(args) => panes::start(ctx, args).await,
        Command::Add(args) => panes::add(ctx, args).await,
        Command::Codex(args) => panes::codex(ctx, args, out).await,
        Command::Attach(args) => panes::attach(ctx.backend, &args.session),
        Command::List(args) => panes::list(ctx, args, out),
        Command::Kill(args) => panes::kill(ctx, &args.session),
        Command::Send(args) => transfer::send(ctx, args).await,
        Command::Capture(args) => transfer::capture(ctx, args, out).await,
        Command::Handoff(args) => transfer::handoff(ctx, args),
        Command::Relay(args) => transfer::relay(ctx, args, out).await,
        Command::Doctor => diagnose::doctor(ctx, out),
        Command::Selftest(args) => selftest::run(ctx, args, out).await,
    }
}

/// `--cwd`, else the caller's directory
fn working_dir(cwd: Option<&Path>) -> Result<PathBuf> {
    match cwd {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}

/// Resolves once ctrl-c is pressed; never resolves if the handler cannot be installed
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
