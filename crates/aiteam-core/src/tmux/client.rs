use once_cell::sync::Lazy;
use regex::Regex;
use std::convert::Infallible;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use super::backend::{PaneBackend, ENTER_KEY};
use super::pane::{PaneInfo, PANE_FORMAT};
use crate::error::{AiteamError, Result};

/// Regex pattern for validating tmux pane ids (e.g. `%12`)
static PANE_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%\d+$").expect("Invalid PANE_ID_PATTERN regex"));

/// Validate a pane id before handing it to tmux as a target
fn validate_pane_id(pane: &str) -> Result<()> {
    if !PANE_ID_PATTERN.is_match(pane) {
        return Err(AiteamError::invalid(format!(
            "Invalid tmux pane id: {}",
            pane
        )));
    }
    Ok(())
}

/// Build the `-S` start argument for capture-pane (`-N` lines up from the bottom)
fn capture_start(lines: u32) -> String {
    format!("-{}", lines.max(1))
}

/// Target for a session's lowest-numbered window, whatever `base-index` is
fn first_window(session: &str) -> String {
    format!("{}:^", session)
}

/// Client for interacting with tmux through its command line
pub struct TmuxClient {
    /// tmux executable (overridable for tests and custom installs)
    binary: String,
}

impl TmuxClient {
    /// Creates a new TmuxClient using `tmux` from PATH
    pub fn new() -> Self {
        Self {
            binary: "tmux".to_string(),
        }
    }

    /// Creates a client driving a specific tmux executable
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check if the tmux executable can be found on PATH
    pub fn is_installed(&self) -> bool {
        which::which(&self.binary).is_ok()
    }

    /// Absolute path of the tmux executable, if found on PATH
    pub fn binary_path(&self) -> Option<PathBuf> {
        which::which(&self.binary).ok()
    }

    /// Whether the calling process runs inside a tmux client
    pub fn in_tmux() -> bool {
        std::env::var_os("TMUX").is_some()
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> AiteamError {
        AiteamError::BackendUnavailable {
            diagnostic: format!("{}: {}", self.binary, e),
        }
    }

    /// Run tmux and return its raw output, whatever the exit status
    fn output(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!(args = ?args, "tmux");
        self.command(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))
    }

    /// Run tmux, failing on a non-zero exit status
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(command_failed(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run tmux, ignoring failures (cosmetic options on older tmux versions)
    fn run_best_effort(&self, args: &[&str]) {
        match self.output(args) {
            Ok(output) if !output.status.success() => {
                tracing::debug!(
                    args = ?args,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "ignored tmux failure"
                );
            }
            Err(e) => tracing::debug!(args = ?args, error = %e, "ignored tmux failure"),
            Ok(_) => {}
        }
    }

    /// `display-message -p` for the calling pane
    fn display_current(&self, format: &str) -> Result<String> {
        if !Self::in_tmux() {
            return Err(AiteamError::BackendCommandFailed {
                operation: "display-message".to_string(),
                diagnostic: "not running inside tmux".to_string(),
            });
        }
        // TMUX_PANE pins the lookup to our own pane rather than tmux's "current" client
        let own_pane = std::env::var("TMUX_PANE").ok();
        let mut args = vec!["display-message", "-p"];
        if let Some(pane) = own_pane.as_deref() {
            args.extend(["-t", pane]);
        }
        args.push(format);
        Ok(self.run(&args)?.trim().to_string())
    }

    /// Load text into a uniquely named paste buffer via stdin
    fn load_buffer(&self, text: &str) -> Result<String> {
        let name = format!("aiteam_{}", uuid::Uuid::new_v4().simple());
        let args = ["load-buffer", "-b", name.as_str(), "-"];
        tracing::debug!(args = ?args, bytes = text.len(), "tmux");

        let mut child = self
            .command(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(command_failed(&args, &output));
        }
        Ok(name)
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new()
    }
}

fn command_failed(args: &[&str], output: &Output) -> AiteamError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let mut diagnostic = format!("tmux {}", args.join(" "));
    if !stdout.is_empty() {
        diagnostic.push_str(&format!("\nstdout:\n{}", stdout));
    }
    if !stderr.is_empty() {
        diagnostic.push_str(&format!("\nstderr:\n{}", stderr));
    }
    AiteamError::BackendCommandFailed {
        operation: args.first().copied().unwrap_or("tmux").to_string(),
        diagnostic,
    }
}

impl PaneBackend for TmuxClient {
    fn version(&self) -> Result<String> {
        Ok(self.run(&["-V"])?.trim().to_string())
    }

    fn session_exists(&self, session: &str) -> Result<bool> {
        let target = format!("={}", session);
        let output = self.output(&["has-session", "-t", &target])?;
        Ok(output.status.success())
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        let output = self.output(&["list-sessions", "-F", "#{session_name}"])?;
        // No server running means no sessions
        if !output.status.success() {
            return Ok(Vec::new());
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn list_panes(&self, session: &str) -> Result<Vec<PaneInfo>> {
        let window = first_window(session);
        let stdout = self.run(&["list-panes", "-t", &window, "-F", PANE_FORMAT])?;
        let mut panes: Vec<PaneInfo> = stdout.lines().filter_map(PaneInfo::parse).collect();
        panes.sort_by_key(|p| p.pane_index);
        Ok(panes)
    }

    fn create_session(&self, session: &str, cwd: Option<&Path>, force: bool) -> Result<()> {
        if self.session_exists(session)? {
            if !force {
                return Err(AiteamError::SessionExists {
                    session: session.to_string(),
                });
            }
            self.kill_session(session)?;
        }

        let cwd = cwd.map(|p| p.display().to_string());
        let mut args = vec!["new-session", "-d", "-s", session];
        if let Some(dir) = cwd.as_deref() {
            args.extend(["-c", dir]);
        }
        self.run(&args)?;

        // Show pane titles on borders; older tmux versions lack these options
        self.run_best_effort(&["set-option", "-t", session, "pane-border-status", "top"]);
        self.run_best_effort(&[
            "set-option",
            "-t",
            session,
            "pane-border-format",
            "#{pane_title}",
        ]);
        Ok(())
    }

    fn kill_session(&self, session: &str) -> Result<()> {
        let target = format!("={}", session);
        self.run(&["kill-session", "-t", &target])?;
        Ok(())
    }

    fn split_from(&self, target: &str, cwd: Option<&Path>, vertical: bool) -> Result<String> {
        let cwd = cwd.map(|p| p.display().to_string());
        let mut args = vec!["split-window", "-t", target];
        if let Some(dir) = cwd.as_deref() {
            args.extend(["-c", dir]);
        }
        args.push(if vertical { "-h" } else { "-v" });
        args.extend(["-P", "-F", "#{pane_id}"]);

        let pane_id = self.run(&args)?.trim().to_string();
        if pane_id.is_empty() {
            return Err(AiteamError::BackendCommandFailed {
                operation: "split-window".to_string(),
                diagnostic: "Failed to determine the new pane id after splitting.".to_string(),
            });
        }
        Ok(pane_id)
    }

    fn tile_layout(&self, session: &str) -> Result<()> {
        let window = first_window(session);
        self.run(&["select-layout", "-t", &window, "tiled"])?;
        Ok(())
    }

    fn set_title(&self, pane: &str, title: &str) -> Result<()> {
        validate_pane_id(pane)?;
        self.run(&["select-pane", "-t", pane, "-T", title])?;
        Ok(())
    }

    fn set_session_option(&self, session: &str, name: &str, value: &str) -> Result<()> {
        self.run(&["set-option", "-t", session, name, value])?;
        Ok(())
    }

    fn session_option(&self, session: &str, name: &str) -> Result<Option<String>> {
        let output = self.output(&["show-options", "-v", "-t", session, name])?;
        // Unset user options make show-options fail
        if !output.status.success() {
            return Ok(None);
        }
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!value.is_empty()).then_some(value))
    }

    fn set_hook(&self, session: &str, hook: &str, command: &str) -> Result<()> {
        self.run(&["set-hook", "-t", session, hook, command])?;
        Ok(())
    }

    fn select_pane(&self, pane: &str) -> Result<()> {
        validate_pane_id(pane)?;
        self.run(&["select-pane", "-t", pane])?;
        Ok(())
    }

    fn write_text(&self, pane: &str, text: &str, activate: bool) -> Result<()> {
        validate_pane_id(pane)?;

        // An empty body means "just press Enter" (or nothing at all)
        if !text.is_empty() {
            let buffer = self.load_buffer(text)?;
            // -d deletes the buffer once pasted
            let pasted = self.run(&["paste-buffer", "-d", "-b", &buffer, "-t", pane]);
            if pasted.is_err() {
                self.run_best_effort(&["delete-buffer", "-b", &buffer]);
            }
            pasted?;
        }

        if activate {
            self.send_activation(pane, ENTER_KEY)?;
        }
        Ok(())
    }

    fn send_activation(&self, pane: &str, key: &str) -> Result<()> {
        validate_pane_id(pane)?;
        self.run(&["send-keys", "-t", pane, key])?;
        Ok(())
    }

    fn capture_scrollback(&self, pane: &str, lines: u32) -> Result<String> {
        validate_pane_id(pane)?;
        let start = capture_start(lines);
        self.run(&["capture-pane", "-p", "-t", pane, "-S", &start])
    }

    fn current_session(&self) -> Result<String> {
        self.display_current("#{session_name}")
    }

    fn current_pane(&self) -> Result<String> {
        if let Ok(pane) = std::env::var("TMUX_PANE") {
            if Self::in_tmux() && PANE_ID_PATTERN.is_match(&pane) {
                return Ok(pane);
            }
        }
        self.display_current("#{pane_id}")
    }

    fn pane_current_path(&self, pane: &str) -> Result<String> {
        validate_pane_id(pane)?;
        Ok(self
            .run(&["display-message", "-p", "-t", pane, "#{pane_current_path}"])?
            .trim()
            .to_string())
    }

    #[cfg(unix)]
    fn attach_interactive(&self, session: &str) -> Result<Infallible> {
        use std::os::unix::process::CommandExt;

        let err = self.command(&["attach", "-t", session]).exec();
        if err.kind() == std::io::ErrorKind::NotFound {
            return Err(self.spawn_error(err));
        }
        Err(AiteamError::Io(err))
    }

    #[cfg(not(unix))]
    fn attach_interactive(&self, session: &str) -> Result<Infallible> {
        let status = self
            .command(&["attach", "-t", session])
            .status()
            .map_err(|e| self.spawn_error(e))?;
        std::process::exit(status.code().unwrap_or(1));
    }
}
