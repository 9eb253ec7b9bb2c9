//! lanxfer command-line entry point.

mod app;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::app::Action;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// TCP port to listen on / connect to
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Print events as JSON lines instead of a progress bar
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wait for one incoming file and save it
    Receive {
        /// Directory to save the file into
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Send a file to a waiting receiver
    Send {
        /// Receiver IP address or hostname
        address: String,
        /// File to send
        file: PathBuf,
    },
    /// Show the addresses a sender could use to reach this machine
    Ip,
}

fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so JSON output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting lanxfer");

    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.json {
        config.json = true;
    }

    let action = match cli.command {
        Command::Receive { dir } => {
            if let Some(dir) = dir {
                config.download_dir = dir;
            }
            Action::Receive
        }
        Command::Send { address, file } => Action::Send { address, file },
        Command::Ip => {
            app::print_addresses(&config);
            return Ok(ExitCode::SUCCESS);
        }
    };

    let rt = tokio::runtime::Runtime::new()?;
    let success = rt.block_on(app::run(config, action))?;

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
