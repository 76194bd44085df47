mod args;
mod settings;

pub use args::{
    AddArgs, CaptureArgs, CodexArgs, Command, FocusArg, HandoffArgs, LayoutArg, ListArgs,
    MainArg, PolicyArg, RelayArgs, SelftestArgs, SendArgs, SessionArgs, SpawnArgs, SplitArg,
    SplitOptions, StartArgs, DEFAULT_HANDOFF_LINES,
};
pub use settings::{
    secs, CaptureSettings, Config, RelaySettings, Settings, DISABLE_ERROR_CODEX_ENV,
    ENABLE_ERROR_CODEX_ENV,
};
