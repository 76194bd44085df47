use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::args::Command;

/// Environment switch that turns the error analyzer on
pub const ENABLE_ERROR_CODEX_ENV: &str = "AITEAM_ENABLE_ERROR_CODEX";

/// Environment switch that turns the error analyzer off (wins over enable)
pub const DISABLE_ERROR_CODEX_ENV: &str = "AITEAM_DISABLE_ERROR_CODEX";

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run several AI coding agents side by side in tmux and move text between them"
)]
pub struct Config {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// On failure, start a Codex pane that analyzes the error
    #[arg(long, global = true)]
    pub error_codex: bool,

    /// Never start the error analyzer (overrides --error-codex and the config)
    #[arg(long, global = true)]
    pub no_error_codex: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Parse command line arguments, showing `epilog` under `--help`
    pub fn parse_args(epilog: String) -> Self {
        let matches = Self::command().after_help(epilog).get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Command used to start Codex panes
    #[serde(default = "default_codex_command")]
    pub codex_command: String,

    /// Directory holding spawn lock files and session briefings (default: system temp dir)
    #[serde(default)]
    pub lock_dir: Option<PathBuf>,

    /// Start the error analyzer after control failures
    #[serde(default)]
    pub error_codex: bool,

    #[serde(default)]
    pub relay: RelaySettings,

    #[serde(default)]
    pub capture: CaptureSettings,
}

fn default_codex_command() -> String {
    "codex -p aiteam".to_string()
}

/// Relay defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Capture window size in lines
    #[serde(default = "default_relay_lines")]
    pub lines: u32,

    /// Polling interval in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,

    /// Seconds a relayed body is remembered (0 = forever)
    #[serde(default = "default_dedupe_ttl_secs")]
    pub dedupe_ttl_secs: f64,

    #[serde(default = "default_begin")]
    pub begin: String,

    #[serde(default = "default_end")]
    pub end: String,
}

fn default_relay_lines() -> u32 {
    2000
}

fn default_interval_secs() -> f64 {
    1.0
}

fn default_dedupe_ttl_secs() -> f64 {
    600.0
}

fn default_begin() -> String {
    "[PUSH]".to_string()
}

fn default_end() -> String {
    "[/PUSH]".to_string()
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            lines: default_relay_lines(),
            interval_secs: default_interval_secs(),
            dedupe_ttl_secs: default_dedupe_ttl_secs(),
            begin: default_begin(),
            end: default_end(),
        }
    }
}

/// Capture defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    #[serde(default = "default_capture_lines")]
    pub lines: u32,

    /// Poll interval while waiting for a marker, in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,
}

fn default_capture_lines() -> u32 {
    200
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            lines: default_capture_lines(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            codex_command: default_codex_command(),
            lock_dir: None,
            error_codex: false,
            relay: RelaySettings::default(),
            capture: CaptureSettings::default(),
        }
    }
}

/// Whether an environment flag holds a truthy value (`1`, `true`, `yes`)
fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Seconds to a `Duration`, treating negative and non-finite values as zero
pub fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file: {:?}", p))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", p));
            }
        }

        // Try default config locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("aiteam/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/aiteam/config.toml")),
            dirs::home_dir().map(|p| p.join(".aiteam.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", path));
            }
        }

        Ok(Self::default())
    }

    /// Merge CLI flags and environment switches (disable always wins)
    pub fn merge_cli(&mut self, cli: &Config) {
        if cli.error_codex || env_flag(ENABLE_ERROR_CODEX_ENV) {
            self.error_codex = true;
        }
        if cli.no_error_codex || env_flag(DISABLE_ERROR_CODEX_ENV) {
            self.error_codex = false;
        }
    }

    /// Validate and normalize settings values
    ///
    /// Polling intervals are floored so a zero interval cannot spin the CPU.
    pub fn validate(&mut self) {
        const MIN_RELAY_INTERVAL: f64 = 0.1;
        const MIN_CAPTURE_INTERVAL: f64 = 0.05;

        self.relay.interval_secs = self.relay.interval_secs.max(MIN_RELAY_INTERVAL);
        self.capture.interval_secs = self.capture.interval_secs.max(MIN_CAPTURE_INTERVAL);
        self.relay.dedupe_ttl_secs = self.relay.dedupe_ttl_secs.max(0.0);
        self.relay.lines = self.relay.lines.max(1);
        self.capture.lines = self.capture.lines.max(1);
    }

    /// Directory for lock files and briefing copies
    pub fn lock_dir(&self) -> PathBuf {
        self.lock_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
