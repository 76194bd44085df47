mod backend;
mod client;
#[cfg(any(test, feature = "test-support"))]
mod fake;
mod pane;

pub use backend::{PaneBackend, ENTER_KEY};
pub use client::TmuxClient;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeBackend, PastedText};
pub use pane::{PaneInfo, PANE_FORMAT};
