//! In-memory [`PaneBackend`] for tests: scripted captures, recorded writes.
//!
//! Panes without scripted frames capture as the text pasted into them.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::path::Path;
use std::time::{Duration, Instant};

use super::backend::PaneBackend;
use super::pane::PaneInfo;
use crate::error::{AiteamError, Result};

/// One `write_text` call as seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PastedText {
    pub pane: String,
    pub text: String,
    pub activate: bool,
}

#[derive(Default)]
struct FakeState {
    sessions: Vec<String>,
    panes: Vec<PaneInfo>,
    next_pane: u32,
    /// Capture frames per pane; the last frame repeats once the queue drains
    frames: HashMap<String, VecDeque<String>>,
    /// Frames that replace the scripted ones once a delay has passed
    timed: HashMap<String, (Instant, String)>,
    failing_captures: Vec<String>,
    writes: Vec<PastedText>,
    keys: Vec<(String, String)>,
    capture_count: usize,
    current_pane: Option<String>,
    tiled: usize,
    split_delay: Duration,
    options: HashMap<(String, String), String>,
    hooks: Vec<(String, String, String)>,
}

/// Scriptable single-window multiplexer
pub struct FakeBackend {
    session: String,
    state: Mutex<FakeState>,
}

impl FakeBackend {
    /// A session whose panes carry `titles`, with ids `%0`, `%1`, ...
    pub fn new(session: &str, titles: &[&str]) -> Self {
        let panes: Vec<PaneInfo> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| PaneInfo::new(format!("%{}", i), i as u32, *t))
            .collect();
        let state = FakeState {
            sessions: vec![session.to_string()],
            next_pane: panes.len() as u32,
            panes,
            ..FakeState::default()
        };
        Self {
            session: session.to_string(),
            state: Mutex::new(state),
        }
    }

    /// Queue capture frames for a pane
    pub fn with_frames(self, pane: &str, frames: &[&str]) -> Self {
        self.state
            .lock()
            .frames
            .entry(pane.to_string())
            .or_default()
            .extend(frames.iter().map(|f| f.to_string()));
        self
    }

    /// Make captures of `pane` return `text` once `delay` has elapsed
    pub fn emit_after(self, pane: &str, delay: Duration, text: &str) -> Self {
        self.state
            .lock()
            .timed
            .insert(pane.to_string(), (Instant::now() + delay, text.to_string()));
        self
    }

    /// Make every capture of `pane` fail
    pub fn fail_captures(self, pane: &str) -> Self {
        self.state.lock().failing_captures.push(pane.to_string());
        self
    }

    /// Pretend the caller runs inside `pane`
    pub fn with_current_pane(self, pane: &str) -> Self {
        self.state.lock().current_pane = Some(pane.to_string());
        self
    }

    /// Slow down pane creation to widen race windows
    pub fn with_split_delay(self, delay: Duration) -> Self {
        self.state.lock().split_delay = delay;
        self
    }

    pub fn panes(&self) -> Vec<PaneInfo> {
        self.state.lock().panes.clone()
    }

    pub fn writes(&self) -> Vec<PastedText> {
        self.state.lock().writes.clone()
    }

    pub fn keys(&self) -> Vec<(String, String)> {
        self.state.lock().keys.clone()
    }

    pub fn capture_count(&self) -> usize {
        self.state.lock().capture_count
    }

    pub fn tiled_count(&self) -> usize {
        self.state.lock().tiled
    }

    pub fn sessions(&self) -> Vec<String> {
        self.state.lock().sessions.clone()
    }

    /// Installed hooks as `(session, hook, command)`
    pub fn hooks(&self) -> Vec<(String, String, String)> {
        self.state.lock().hooks.clone()
    }

    fn require_session(state: &FakeState, session: &str) -> Result<()> {
        if state.sessions.iter().any(|s| s == session) {
            Ok(())
        } else {
            Err(AiteamError::BackendCommandFailed {
                operation: "list-panes".to_string(),
                diagnostic: format!("can't find session: {}", session),
            })
        }
    }

    fn require_pane(state: &FakeState, pane: &str, operation: &str) -> Result<()> {
        if state.panes.iter().any(|p| p.pane_id == pane) {
            Ok(())
        } else {
            Err(AiteamError::BackendCommandFailed {
                operation: operation.to_string(),
                diagnostic: format!("can't find pane: {}", pane),
            })
        }
    }
}

impl PaneBackend for FakeBackend {
    fn version(&self) -> Result<String> {
        Ok("tmux 3.4 (fake)".to_string())
    }

    fn session_exists(&self, session: &str) -> Result<bool> {
        Ok(self.state.lock().sessions.iter().any(|s| s == session))
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        Ok(self.sessions())
    }

    fn list_panes(&self, session: &str) -> Result<Vec<PaneInfo>> {
        let state = self.state.lock();
        Self::require_session(&state, session)?;
        let mut panes = state.panes.clone();
        panes.sort_by_key(|p| p.pane_index);
        Ok(panes)
    }

    fn create_session(&self, session: &str, _cwd: Option<&Path>, force: bool) -> Result<()> {
        let mut state = self.state.lock();
        if state.sessions.iter().any(|s| s == session) && !force {
            return Err(AiteamError::SessionExists {
                session: session.to_string(),
            });
        }
        if !state.sessions.iter().any(|s| s == session) {
            state.sessions.push(session.to_string());
        }
        let id = state.next_pane;
        state.next_pane += 1;
        state.panes = vec![PaneInfo::new(format!("%{}", id), 0, "")];
        Ok(())
    }

    fn kill_session(&self, session: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::require_session(&state, session)?;
        state.sessions.retain(|s| s != session);
        state.options.retain(|(s, _), _| s != session);
        if session == self.session {
            state.panes.clear();
        }
        Ok(())
    }

    fn split_from(&self, _target: &str, _cwd: Option<&Path>, _vertical: bool) -> Result<String> {
        let delay = self.state.lock().split_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let mut state = self.state.lock();
        let id = format!("%{}", state.next_pane);
        state.next_pane += 1;
        let index = state.panes.iter().map(|p| p.pane_index + 1).max().unwrap_or(0);
        state.panes.push(PaneInfo::new(id.clone(), index, ""));
        Ok(id)
    }

    fn tile_layout(&self, _session: &str) -> Result<()> {
        self.state.lock().tiled += 1;
        Ok(())
    }

    fn set_title(&self, pane: &str, title: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::require_pane(&state, pane, "select-pane")?;
        if let Some(p) = state.panes.iter_mut().find(|p| p.pane_id == pane) {
            p.title = title.to_string();
        }
        Ok(())
    }

    fn set_session_option(&self, session: &str, name: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::require_session(&state, session)?;
        state
            .options
            .insert((session.to_string(), name.to_string()), value.to_string());
        Ok(())
    }

    fn session_option(&self, session: &str, name: &str) -> Result<Option<String>> {
        let state = self.state.lock();
        Self::require_session(&state, session)?;
        Ok(state
            .options
            .get(&(session.to_string(), name.to_string()))
            .filter(|v| !v.is_empty())
            .cloned())
    }

    fn set_hook(&self, session: &str, hook: &str, command: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::require_session(&state, session)?;
        state
            .hooks
            .push((session.to_string(), hook.to_string(), command.to_string()));
        Ok(())
    }

    fn select_pane(&self, pane: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::require_pane(&state, pane, "select-pane")?;
        state.current_pane = Some(pane.to_string());
        Ok(())
    }

    fn write_text(&self, pane: &str, text: &str, activate: bool) -> Result<()> {
        let mut state = self.state.lock();
        Self::require_pane(&state, pane, "paste-buffer")?;
        state.writes.push(PastedText {
            pane: pane.to_string(),
            text: text.to_string(),
            activate,
        });
        Ok(())
    }

    fn send_activation(&self, pane: &str, key: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::require_pane(&state, pane, "send-keys")?;
        state.keys.push((pane.to_string(), key.to_string()));
        Ok(())
    }

    fn capture_scrollback(&self, pane: &str, _lines: u32) -> Result<String> {
        let mut state = self.state.lock();
        Self::require_pane(&state, pane, "capture-pane")?;
        state.capture_count += 1;
        if state.failing_captures.iter().any(|p| p == pane) {
            return Err(AiteamError::BackendCommandFailed {
                operation: "capture-pane".to_string(),
                diagnostic: format!("capture of {} refused", pane),
            });
        }
        if let Some((at, text)) = state.timed.get(pane) {
            if Instant::now() >= *at {
                return Ok(text.clone());
            }
        }
        let frame = match state.frames.get_mut(pane) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            // Unscripted panes echo what was pasted into them
            None => state
                .writes
                .iter()
                .filter(|w| w.pane == pane)
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        };
        Ok(frame)
    }

    fn current_session(&self) -> Result<String> {
        let state = self.state.lock();
        match state.current_pane {
            Some(_) => Ok(self.session.clone()),
            None => Err(AiteamError::BackendCommandFailed {
                operation: "display-message".to_string(),
                diagnostic: "not running inside tmux".to_string(),
            }),
        }
    }

    fn current_pane(&self) -> Result<String> {
        self.state
            .lock()
            .current_pane
            .clone()
            .ok_or_else(|| AiteamError::BackendCommandFailed {
                operation: "display-message".to_string(),
                diagnostic: "not running inside tmux".to_string(),
            })
    }

    fn pane_current_path(&self, _pane: &str) -> Result<String> {
        Ok("/tmp".to_string())
    }

    fn attach_interactive(&self, session: &str) -> Result<Infallible> {
        Err(AiteamError::BackendCommandFailed {
            operation: "attach".to_string(),
            diagnostic: format!("cannot attach to {} from a fake backend", session),
        })
    }
}
