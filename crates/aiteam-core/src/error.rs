//! Error types shared by every aiteam operation.
//!
//! Each failure carries enough context (known ids, titles, indices) for the
//! operator to correct the next attempt without another round trip.

use thiserror::Error;

/// Result alias used throughout the core
pub type Result<T> = std::result::Result<T, AiteamError>;

/// Join a list for operator-facing messages, or `(none)` when empty
pub(crate) fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

/// Failure to map a selector onto exactly one pane
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// `<kind>:<id>` selector with no matching instance
    #[error("No {kind} pane with id '{id}' in session {session}. Available {kind} ids: {}", join_or_none(.available))]
    NoSuchInstanceId {
        kind: String,
        id: String,
        session: String,
        available: Vec<String>,
    },

    /// All-digit selector with no pane at that index
    #[error("No pane with index {index} in session {session}")]
    NoSuchIndex { index: u32, session: String },

    /// Bare kind literal while several instances of that kind exist
    #[error("Multiple {kind} panes exist. Please target one by id, e.g. --to {kind}:1\nAvailable: {}", .available.join(", "))]
    AmbiguousKind { kind: String, available: Vec<String> },

    /// Instance name shared by several instances
    #[error("Ambiguous label '{label}' in session {session}. Use an explicit id selector ({}).", .alternatives.join(", "))]
    AmbiguousLabel {
        label: String,
        session: String,
        alternatives: Vec<String>,
    },

    /// Nothing matched at all
    #[error("Pane not found: {selector}. Available: {}", join_or_none(.available))]
    PaneNotFound {
        selector: String,
        available: Vec<String>,
    },
}

impl SelectorError {
    /// Whether the selector matched several panes rather than none
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            SelectorError::AmbiguousKind { .. } | SelectorError::AmbiguousLabel { .. }
        )
    }
}

/// Error type for aiteam operations
#[derive(Debug, Error)]
pub enum AiteamError {
    /// The tmux binary or server cannot be reached at all
    #[error("Unable to execute tmux: {diagnostic}")]
    BackendUnavailable { diagnostic: String },

    /// A single tmux operation failed
    #[error("tmux {operation} failed: {diagnostic}")]
    BackendCommandFailed {
        operation: String,
        diagnostic: String,
    },

    /// Selector resolution failed
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// Requested instance id is already taken (policy `error`)
    #[error("{} id '{id}' already exists in session '{session}'. Pick another --id or omit --id to auto-allocate.", capitalize(.kind))]
    DuplicateInstanceId {
        kind: String,
        id: String,
        session: String,
    },

    /// A pane with the requested title already exists (policy `error`)
    #[error("Pane '{title}' already exists in session '{session}'.")]
    DuplicatePane { title: String, session: String },

    /// Session creation refused because the name is taken
    #[error("Session already exists: {session} (use --force to replace it)")]
    SessionExists { session: String },

    /// No explicit session and the current one cannot be detected
    #[error("No --session provided and the current tmux session could not be detected. Run inside tmux or pass --session.")]
    SessionUnknown,

    /// A send-like operation got no text source
    #[error("No input text provided. Use --body, --file, or --pipe.")]
    InputMissing,

    /// Invalid caller-supplied argument (usage error)
    #[error("{message}")]
    InvalidArgument { message: String },

    /// Invalid relay pattern
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),

    /// Local I/O (lock files, input files, scripts)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AiteamError {
    /// Build an `InvalidArgument` error
    pub fn invalid(message: impl Into<String>) -> Self {
        AiteamError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Whether this error is a caller mistake rather than a control failure
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            AiteamError::InvalidArgument { .. } | AiteamError::Regex(_)
        )
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
