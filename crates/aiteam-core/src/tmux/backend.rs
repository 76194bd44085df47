use std::convert::Infallible;
use std::path::Path;

use super::pane::PaneInfo;
use crate::error::Result;

/// Keystroke used to submit pasted text (C-m == Enter)
pub const ENTER_KEY: &str = "C-m";

/// Terminal multiplexer primitives the core relies on.
///
/// Every call is synchronous and either succeeds or fails with
/// [`AiteamError::BackendUnavailable`](crate::AiteamError::BackendUnavailable) or
/// [`AiteamError::BackendCommandFailed`](crate::AiteamError::BackendCommandFailed).
pub trait PaneBackend: Send + Sync {
    /// Multiplexer version string (e.g. `tmux 3.4`)
    fn version(&self) -> Result<String>;

    /// Whether a session with this exact name exists
    fn session_exists(&self, session: &str) -> Result<bool>;

    /// Names of all sessions; empty when no server is running
    fn list_sessions(&self) -> Result<Vec<String>>;

    /// Panes of the session's first window, sorted by index
    fn list_panes(&self, session: &str) -> Result<Vec<PaneInfo>>;

    /// Create a detached session; with `force` an existing one is replaced
    fn create_session(&self, session: &str, cwd: Option<&Path>, force: bool) -> Result<()>;

    /// Destroy a session
    fn kill_session(&self, session: &str) -> Result<()>;

    /// Split `target` (pane, window or session); returns the new pane id.
    ///
    /// `vertical` places the panes side by side.
    fn split_from(&self, target: &str, cwd: Option<&Path>, vertical: bool) -> Result<String>;

    /// Apply the tiled layout to the session's first window
    fn tile_layout(&self, session: &str) -> Result<()>;

    /// Rewrite a pane's title
    fn set_title(&self, pane: &str, title: &str) -> Result<()>;

    /// Set a session-scoped user option (`@name`)
    fn set_session_option(&self, session: &str, name: &str, value: &str) -> Result<()>;

    /// Value of a session-scoped user option; `None` when unset or empty
    fn session_option(&self, session: &str, name: &str) -> Result<Option<String>>;

    /// Run a tmux `command` when `hook` fires for the session
    fn set_hook(&self, session: &str, hook: &str, command: &str) -> Result<()>;

    /// Focus a pane
    fn select_pane(&self, pane: &str) -> Result<()>;

    /// Paste text as one unit, then press Enter when `activate` is set
    fn write_text(&self, pane: &str, text: &str, activate: bool) -> Result<()>;

    /// Send one key name (e.g. `C-m`) to a pane
    fn send_activation(&self, pane: &str, key: &str) -> Result<()>;

    /// Last `lines` lines of a pane's scrollback as plain text
    fn capture_scrollback(&self, pane: &str, lines: u32) -> Result<String>;

    /// Session of the calling client (only inside tmux)
    fn current_session(&self) -> Result<String>;

    /// Pane id of the calling client (only inside tmux)
    fn current_pane(&self) -> Result<String>;

    /// Working directory of a pane's foreground process
    fn pane_current_path(&self, pane: &str) -> Result<String>;

    /// Replace the calling process with an interactive attach.
    ///
    /// Only returns when the replacement could not happen.
    fn attach_interactive(&self, session: &str) -> Result<Infallible>;
}
