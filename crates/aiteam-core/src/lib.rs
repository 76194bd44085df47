//! Core of aiteam: addressing, spawning, capturing and relaying between
//! agent panes of a tmux session.
//!
//! Every operation talks to tmux through the [`tmux::PaneBackend`] trait;
//! [`tmux::TmuxClient`] is the production implementation.

pub mod actions;
pub mod agents;
pub mod analyzer;
pub mod briefing;
pub mod capture;
pub mod error;
pub mod registry;
pub mod relay;
pub mod selector;
pub mod session;
pub mod spawn;
pub mod team;
pub mod tmux;

pub use error::{AiteamError, Result, SelectorError};
