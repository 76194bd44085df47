//! Relay engine: forward marker- or pattern-delimited messages between panes.

mod dedup;
mod engine;
mod extract;

pub use dedup::{body_digest, DedupCache};
pub use engine::{compose_message, relay, RelayOptions, RelayReport, StopReason, MIN_INTERVAL};
pub use extract::Extraction;
