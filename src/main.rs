use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scriptstore::{config::Paths, App, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scriptstore")]
#[command(author, version, about = "Browse, install and update device scripts and themes")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Device storage root override for this invocation
    #[arg(long)]
    root: Option<String>,

    /// Treat the network as unavailable
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the interactive TUI
    Tui,

    /// List categories and scripts with their installed status
    List,

    /// Show installed scripts that have a newer version
    Updates,

    /// Install or update a script by package key or name
    Install {
        /// Package key (owner/repo:name) or script name
        target: String,
    },

    /// Delete an installed script's files
    Remove {
        /// Package key (owner/repo:name) or script name
        target: String,
    },

    /// Print the installed version map
    Installed,
}

fn setup_logging(verbosity: u8, also_stderr: bool) -> Result<()> {
    let filter = match verbosity {
        0 => "scriptstore=info",
        1 => "scriptstore=debug",
        2 => "scriptstore=trace",
        _ => "trace",
    };

    // Write logs to a file to avoid corrupting TUI
    let log_file = Paths::new().log_file();
    if let Some(dir) = log_file.parent() {
        std::fs::create_dir_all(dir).ok();
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::sync::Arc::new(file));

    if also_stderr {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let is_tui = matches!(cli.command, Some(Commands::Tui) | None);
    setup_logging(cli.verbose, !is_tui)?;

    // Load configuration
    let mut config = Config::load().await?;
    if let Some(root) = cli.root.as_deref() {
        let trimmed = root.trim();
        if trimmed.is_empty() {
            anyhow::bail!("--root cannot be empty");
        }
        config.storage.root_override = Some(trimmed.to_string());
    }
    if cli.offline {
        config.network.offline = true;
    }

    // Initialize app
    let mut app = App::new(config).await?;

    match cli.command {
        Some(Commands::Tui) | None => app.run_tui().await?,
        Some(Commands::List) => app.cmd_list().await?,
        Some(Commands::Updates) => app.cmd_updates().await?,
        Some(Commands::Install { target }) => app.cmd_install(&target).await?,
        Some(Commands::Remove { target }) => app.cmd_remove(&target).await?,
        Some(Commands::Installed) => app.cmd_installed().await?,
    }

    Ok(())
}
