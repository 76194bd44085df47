use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use aiteam_core::spawn::{DuplicatePolicy, Focus};
use aiteam_core::team::{Layout, MainAgent};

/// Lines captured by `handoff` when `--lines` is omitted
pub const DEFAULT_HANDOFF_LINES: u32 = 120;

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a tmux session, split panes, and start agent commands
    Spawn(SpawnArgs),
    /// Create a tmux session with a single main agent pane (Claude/Cursor/Codex)
    Start(StartArgs),
    /// Add a new agent pane to an existing session (split from the current pane if inside tmux)
    Add(AddArgs),
    /// Start a new Codex instance in a new pane (multiple Codex panes supported)
    Codex(CodexArgs),
    /// Attach to a tmux session
    Attach(SessionArgs),
    /// Paste text into a pane by selector
    Send(SendArgs),
    /// Capture the last N lines from a pane, optionally waiting for a marker
    Capture(CaptureArgs),
    /// Capture from one pane and paste into another
    Handoff(HandoffArgs),
    /// Watch a pane for marker blocks or regex matches and push them into another pane
    Relay(RelayArgs),
    /// List tmux sessions (optionally filtered)
    List(ListArgs),
    /// Kill a tmux session
    Kill(SessionArgs),
    /// Print environment diagnostics
    Doctor,
    /// Smoke-test that aiteam can move messages between panes (no real AI agents required)
    Selftest(SelftestArgs),
}

impl Command {
    /// Session named on the command line, if any
    pub fn session(&self) -> Option<&str> {
        let session = match self {
            Command::Spawn(a) => &a.session,
            Command::Start(a) => &a.session,
            Command::Add(a) => &a.session,
            Command::Codex(a) => &a.session,
            Command::Send(a) => &a.session,
            Command::Capture(a) => &a.session,
            Command::Handoff(a) => &a.session,
            Command::Relay(a) => &a.session,
            Command::Selftest(a) => &a.session,
            Command::Attach(a) | Command::Kill(a) => return Some(a.session.as_str()),
            Command::List(_) | Command::Doctor => return None,
        };
        session.as_deref()
    }

    /// Whether per-event progress logging was requested
    pub fn is_verbose(&self) -> bool {
        match self {
            Command::Relay(a) => a.verbose,
            Command::Selftest(a) => a.verbose,
            _ => false,
        }
    }
}

/// Split orientation for `spawn`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutArg {
    #[default]
    Vertical,
    Horizontal,
    Tiled,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Vertical => Layout::Vertical,
            LayoutArg::Horizontal => Layout::Horizontal,
            LayoutArg::Tiled => Layout::Tiled,
        }
    }
}

/// Split orientation for a single new pane
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitArg {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyArg {
    Skip,
    Error,
}

impl From<PolicyArg> for DuplicatePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Skip => DuplicatePolicy::Skip,
            PolicyArg::Error => DuplicatePolicy::Error,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusArg {
    #[default]
    Stay,
    New,
}

impl From<FocusArg> for Focus {
    fn from(arg: FocusArg) -> Self {
        match arg {
            FocusArg::Stay => Focus::Stay,
            FocusArg::New => Focus::New,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MainArg {
    #[default]
    Claude,
    Cursor,
    Codex,
    Custom,
}

impl From<MainArg> for MainAgent {
    fn from(arg: MainArg) -> Self {
        match arg {
            MainArg::Claude => MainAgent::Claude,
            MainArg::Cursor => MainAgent::Cursor,
            MainArg::Codex => MainAgent::Codex,
            MainArg::Custom => MainAgent::Custom,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SpawnArgs {
    /// tmux session name (default: derived from the git repo, with -2/-3... on conflicts; fallback: ai-team)
    #[arg(long)]
    pub session: Option<String>,
    /// Working directory for panes (default: current directory)
    #[arg(long)]
    pub cwd: Option<PathBuf>,
    /// Pane split layout for 2 workers; 3+ workers are always tiled
    #[arg(long, value_enum, default_value_t = LayoutArg::Vertical)]
    pub layout: LayoutArg,
    /// Worker definition: name=command (repeatable)
    #[arg(long = "worker")]
    pub workers: Vec<String>,
    /// Replace the session if it already exists
    #[arg(long)]
    pub force: bool,
    /// Briefing text pasted into each new Codex pane of the session; removed when the session closes
    #[arg(long)]
    pub briefing_file: Option<PathBuf>,
    /// Attach after spawning
    #[arg(long)]
    pub attach: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StartArgs {
    /// tmux session name (default: derived from the git repo)
    #[arg(long)]
    pub session: Option<String>,
    /// Working directory for the session (default: current directory)
    #[arg(long)]
    pub cwd: Option<PathBuf>,
    /// Which main agent to start
    #[arg(long, value_enum, default_value_t = MainArg::Claude)]
    pub main: MainArg,
    /// Command that starts the main agent (overrides the default for --main)
    #[arg(long = "exec")]
    pub command: Option<String>,
    /// Pane title for the main agent (default: claude/cursor/codex/main)
    #[arg(long)]
    pub title: Option<String>,
    /// Replace the session if it already exists
    #[arg(long)]
    pub force: bool,
    /// Briefing text pasted into each new Codex pane of the session; removed when the session closes
    #[arg(long)]
    pub briefing_file: Option<PathBuf>,
    /// Attach after starting
    #[arg(long)]
    pub attach: bool,
}

/// Options shared by commands that split one new pane
#[derive(Args, Debug, Clone)]
pub struct SplitOptions {
    /// Working directory for the new pane (default: current directory)
    #[arg(long)]
    pub cwd: Option<PathBuf>,
    /// Split orientation
    #[arg(long, value_enum, default_value_t = SplitArg::Vertical)]
    pub layout: SplitArg,
    /// Apply the tiled layout afterwards
    #[arg(long)]
    pub tiled: bool,
    /// Pane selector to split from (default: current pane)
    #[arg(long)]
    pub base_pane: Option<String>,
    /// Where to leave focus: stay (back to the original pane) or new
    #[arg(long, value_enum, default_value_t = FocusArg::Stay)]
    pub focus: FocusArg,
    /// Reduce stderr output
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// tmux session name (default: current session if inside tmux)
    #[arg(long)]
    pub session: Option<String>,
    /// Worker definition: name=command (alternative to --name/--exec)
    #[arg(long)]
    pub worker: Option<String>,
    /// Agent name (pane title)
    #[arg(long)]
    pub name: Option<String>,
    /// Command to run in the new pane
    #[arg(long = "exec")]
    pub command: Option<String>,
    /// If a pane with the same title already exists
    #[arg(long, value_enum, default_value_t = PolicyArg::Skip)]
    pub if_duplicate: PolicyArg,
    #[command(flatten)]
    pub split: SplitOptions,
}

#[derive(Args, Debug, Clone)]
pub struct CodexArgs {
    /// tmux session name (default: current session if inside tmux)
    #[arg(long)]
    pub session: Option<String>,
    /// Instance id, unique within the session (default: next numeric id)
    #[arg(long)]
    pub id: Option<String>,
    /// Instance label shown in the pane title
    #[arg(long, default_value = "codex")]
    pub name: String,
    /// Command that starts Codex (default: `codex_command` from the config)
    #[arg(long = "exec")]
    pub command: Option<String>,
    /// If the requested --id already exists
    #[arg(long, value_enum, default_value_t = PolicyArg::Error)]
    pub policy: PolicyArg,
    /// Do not print the selector to stdout on success
    #[arg(long)]
    pub omit_selector: bool,
    /// Print a JSON object (id/name/selector/session) to stdout on success
    #[arg(long)]
    pub json: bool,
    #[command(flatten)]
    pub split: SplitOptions,
}

#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// tmux session name
    #[arg(long)]
    pub session: String,
}

#[derive(Args, Debug, Clone)]
#[command(group(clap::ArgGroup::new("input").args(["body", "file", "pipe"])))]
pub struct SendArgs {
    /// tmux session name (default: current session if inside tmux)
    #[arg(long)]
    pub session: Option<String>,
    /// Target pane selector (id selector, name, title or index)
    #[arg(long)]
    pub to: String,
    /// Text to send
    #[arg(long)]
    pub body: Option<String>,
    /// Read text from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Read text from stdin
    #[arg(long)]
    pub pipe: bool,
    /// Do not press Enter after pasting
    #[arg(long)]
    pub no_enter: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    /// tmux session name (default: current session if inside tmux)
    #[arg(long)]
    pub session: Option<String>,
    /// Source pane selector
    #[arg(long = "from")]
    pub from_pane: String,
    /// Number of lines from the bottom (default: from config, 200)
    #[arg(long)]
    pub lines: Option<u32>,
    /// Write the captured text to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Wait until this marker appears in the capture
    #[arg(long)]
    pub marker: Option<String>,
    /// Longest time to wait for --marker, in seconds
    #[arg(long, default_value_t = 30.0)]
    pub wait_seconds: f64,
    /// Poll interval while waiting for --marker, in seconds (default: from config, 1.0)
    #[arg(long)]
    pub interval_seconds: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct HandoffArgs {
    /// tmux session name (default: current session if inside tmux)
    #[arg(long)]
    pub session: Option<String>,
    /// Source pane selector
    #[arg(long = "from")]
    pub from_pane: String,
    /// Destination pane selector
    #[arg(long = "to")]
    pub to_pane: String,
    /// Number of lines to capture
    #[arg(long, default_value_t = DEFAULT_HANDOFF_LINES)]
    pub lines: u32,
    /// Header line (default: "Handoff from <from>:")
    #[arg(long = "caption")]
    pub header: Option<String>,
    /// Do not press Enter after pasting
    #[arg(long)]
    pub no_enter: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RelayArgs {
    /// tmux session name (default: current session if inside tmux)
    #[arg(long)]
    pub session: Option<String>,
    /// Source pane selector
    #[arg(long = "from")]
    pub from_pane: String,
    /// Destination pane selector
    #[arg(long = "to")]
    pub to_pane: String,
    /// Capture window size in lines (default: from config, 2000)
    #[arg(long)]
    pub lines: Option<u32>,
    /// Polling interval in seconds (default: from config, 1.0; minimum 0.1)
    #[arg(long)]
    pub interval: Option<f64>,
    /// Seconds to remember relayed messages; 0 keeps them forever (default: from config, 600)
    #[arg(long = "window-ttl")]
    pub dedupe_ttl: Option<f64>,
    /// Relay matching blocks already visible when the relay starts
    #[arg(long = "already-visible")]
    pub include_existing: bool,
    /// Exit after the first relayed message
    #[arg(long)]
    pub once: bool,
    /// Exit after relaying N messages (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub max_sends: u32,
    /// Do not press Enter after pasting
    #[arg(long)]
    pub no_enter: bool,
    /// Header line prepended to each relayed message
    #[arg(long = "caption")]
    pub header: Option<String>,
    /// Prefix (may be multi-line) prepended to each message, after the header
    #[arg(long)]
    pub prefix: Option<String>,
    /// Print relayed messages to stdout instead of pasting them
    #[arg(long)]
    pub dry_run: bool,
    /// Log each relay event to stderr
    #[arg(long)]
    pub verbose: bool,
    /// Regex used to extract messages; marker mode is used when omitted
    #[arg(long = "regex")]
    pub pattern: Option<String>,
    /// Capture group to send (default: group 1 if present, else the whole match)
    #[arg(long)]
    pub group: Option<usize>,
    /// Marker begin token (default: from config, [PUSH])
    #[arg(long)]
    pub begin: Option<String>,
    /// Marker end token (default: from config, [/PUSH])
    #[arg(long)]
    pub end: Option<String>,
    /// Forward the marker tokens too
    #[arg(long)]
    pub keep_markers: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only show sessions containing this substring
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SelftestArgs {
    /// Session to use (default: aiteam-selftest-<pid>; replaced if it exists)
    #[arg(long)]
    pub session: Option<String>,
    /// Working directory for the selftest session
    #[arg(long)]
    pub cwd: Option<PathBuf>,
    /// Keep the session running after the test
    #[arg(long)]
    pub keep: bool,
    /// Attach to the session after the test (pass or fail)
    #[arg(long)]
    pub attach: bool,
    /// Verbose relay logging
    #[arg(long)]
    pub verbose: bool,
}
