use anyhow::Result;
use std::io::Write;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aiteam::commands::{self, CommandContext, Status};
use aiteam::config::{Config, Settings};
use aiteam_core::tmux::TmuxClient;

#[tokio::main]
async fn main() -> Result<()> {
    let tmux = TmuxClient::new();

    // Parse CLI arguments
    let cli = Config::parse_args(commands::help_epilog(&tmux, TmuxClient::in_tmux()));

    // Setup logging
    setup_logging(cli.debug, cli.command.is_verbose());

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(&cli);
    settings.validate();

    let ctx = CommandContext {
        backend: &tmux,
        settings: &settings,
        tmux_path: tmux.binary_path(),
    };
    let mut stdout = std::io::stdout();
    let code = match commands::dispatch(&ctx, &cli.command, &mut stdout).await {
        Ok(status) => {
            if status == Status::Failed {
                let text = format!("Command failed with exit code {}", status.code());
                commands::maybe_start_error_analyzer(&tmux, &settings, &cli.command, &text).await;
            }
            status.code()
        }
        Err(e) => {
            eprintln!("{}", e);
            let code = commands::error_code(&e);
            if code == 1 {
                commands::maybe_start_error_analyzer(&tmux, &settings, &cli.command, &e.to_string())
                    .await;
            }
            code
        }
    };
    stdout.flush()?;
    std::process::exit(code)
}

fn setup_logging(debug: bool, verbose: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::new(format!("aiteam={level},aiteam_core={level}"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
