//! presencewatch - a terminal monitor for a community guild's presence widget.
//!
//! Shows who is online, keeps showing the last known data when the widget
//! or every proxy in front of it is unreachable, and refreshes on its own.
//! Host signals the sync engine reacts to (visibility, connectivity) can be
//! driven from stdin.

mod renderer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use presencewatch_core::sync::{Collaborators, FetchOutcome, LiveDataSync};
use presencewatch_core::{
    Config, FileCache, MemoryCache, PersistentCache, ReqwestClient, SystemClock,
};

use renderer::TerminalRenderer;

/// Environment variable that overrides the configured guild id
const GUILD_ID_ENV: &str = "PRESENCEWATCH_GUILD_ID";

/// Log filter used when RUST_LOG is not set
const DEFAULT_LOG_FILTER: &str = "warn,presencewatch_core=info,presencewatch=info";

#[derive(Debug, Parser)]
#[command(name = "presencewatch", version, about = "Live presence monitor for a community guild widget")]
struct Cli {
    /// Guild to watch (overrides config file and PRESENCEWATCH_GUILD_ID)
    #[arg(long)]
    guild_id: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for the presence cache
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Keep the cache in memory only
    #[arg(long)]
    no_persist: bool,

    /// Run one forced refresh and exit
    #[arg(long)]
    once: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Refresh,
    Hide,
    Show,
    Offline,
    Online,
    Status,
    Help,
    Quit,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "r" | "refresh" => Some(Command::Refresh),
            "hide" => Some(Command::Hide),
            "show" => Some(Command::Show),
            "offline" => Some(Command::Offline),
            "online" => Some(Command::Online),
            "s" | "status" => Some(Command::Status),
            "?" | "h" | "help" => Some(Command::Help),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Initialize the tracing subscriber. Returns the appender guard when
/// logging to a file; it must live until shutdown so buffered lines flush.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("--log-file must name a file: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Ok(guild_id) = std::env::var(GUILD_ID_ENV) {
        config.guild_id = guild_id;
    }
    if let Some(ref guild_id) = cli.guild_id {
        config.guild_id = guild_id.clone();
    }
    Ok(config)
}

fn build_cache(cli: &Cli, config: &Config) -> Result<Arc<dyn PersistentCache>> {
    if cli.no_persist {
        return Ok(Arc::new(MemoryCache::new()));
    }
    let dir = match &cli.cache_dir {
        Some(dir) => dir.clone(),
        None => config.cache_dir()?,
    };
    Ok(Arc::new(FileCache::new(dir)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;

    let config = load_config(&cli)?;
    let sync_config = config.sync_config().context("Invalid configuration")?;

    let sync = LiveDataSync::new(
        sync_config,
        Collaborators {
            http: Arc::new(ReqwestClient::new()?),
            cache: build_cache(&cli, &config)?,
            renderer: Arc::new(TerminalRenderer::new(cli.once)),
            clock: Arc::new(SystemClock),
        },
    );
    info!(guild = %config.guild_id, endpoint = %config.endpoint_url(), "presencewatch starting");

    if cli.once {
        let outcome = sync.refresh_now().await;
        info!(?outcome, "Single refresh finished");
        return match outcome {
            FetchOutcome::Live { .. } => Ok(()),
            other => Err(anyhow!("No live data available ({:?})", other)),
        };
    }

    sync.start();
    print_help();

    let result = run_commands(&sync).await;

    sync.stop();
    info!("presencewatch shutting down");
    result
}

fn print_help() {
    eprintln!("Commands: r(efresh), hide, show, offline, online, s(tatus), h(elp), q(uit)");
}

async fn run_commands(sync: &LiveDataSync) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                return signal.context("Failed to listen for Ctrl+C");
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // stdin closed (e.g. running detached); wait for Ctrl+C
                    return tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C");
                };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Some(Command::Quit) => return Ok(()),
                    Some(command) => handle_command(sync, command),
                    None => {
                        warn!(input = %line.trim(), "Unknown command");
                        print_help();
                    }
                }
            }
        }
    }
}

fn handle_command(sync: &LiveDataSync, command: Command) {
    match command {
        Command::Refresh => {
            let sync = sync.clone();
            tokio::spawn(async move {
                let outcome = sync.refresh_now().await;
                info!(?outcome, "Manual refresh finished");
            });
        }
        Command::Hide => sync.set_visible(false),
        Command::Show => sync.set_visible(true),
        Command::Offline => sync.set_online(false),
        Command::Online => sync.set_online(true),
        Command::Status => {
            let state = sync.snapshot();
            let last_success = state
                .last_success_at
                .map(|at| at.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string());
            eprintln!(
                "status: {}, failures: {}, proxy: {}, last success: {}",
                state.connection_status,
                state.consecutive_failures,
                sync.config().proxies.get(state.active_proxy_index),
                last_success
            );
        }
        Command::Help => print_help(),
        Command::Quit => {}
    }
}
