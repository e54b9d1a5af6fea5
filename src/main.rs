//! # Main Entry Point
//!
//! Wires the bridge together:
//! - Domain: Configuration, Change Records, Traits
//! - Infrastructure: IRC feed listener, Event Fabric client
//! - Application: Formatting, Parsing, Dispatch
//!

mod application;
mod domain;
mod infrastructure;
mod strings;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::application::dispatcher::{FeedCallbacks, FeedDispatcher};
use crate::domain::config::{AppConfig, IrcConfig, LoggingConfig};
use crate::infrastructure::event_fabric::EventFabricClient;
use crate::infrastructure::irc::IrcListener;
use crate::strings::logs;

#[derive(Parser)]
#[command(name = "wikifeed", about = "Forward live wiki changes from IRC to Event Fabric")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen to the feed and forward every change to Event Fabric.
    Run {
        /// Path to config.yaml (JSON works too).
        config: PathBuf,
    },
    /// Listen to the feed and print changes to the console.
    Watch {
        /// Server as host[:port]; the port defaults to 6667.
        server: String,
        channel: String,
        nickname: String,
        listen_nick: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => run(&config).await,
        Command::Watch {
            server,
            channel,
            nickname,
            listen_nick,
        } => {
            let _guard = init_logging(&LoggingConfig::default())?;
            let (host, port) = parse_server(&server)?;
            let config = IrcConfig::new(&host, port, &channel, &nickname, &listen_nick);
            let dispatcher = FeedDispatcher::new(listen_nick, FeedCallbacks::new());
            listen(IrcListener::new(config, Arc::new(dispatcher))).await;
            Ok(())
        }
    }
}

async fn run(config_path: &Path) -> Result<()> {
    // 1. Load Configuration
    let config = AppConfig::load(config_path)?;

    // 2. Logging Setup
    let _guard = init_logging(&config.logging)?;
    tracing::info!("{}", logs::config_loaded(&config_path.display().to_string()));

    // 3. Event Fabric
    let client = EventFabricClient::new(&config.event_fabric).map_err(anyhow::Error::msg)?;
    tracing::info!("{}", logs::LOGGING_IN);
    if let Err(e) = client.login().await {
        bail!(logs::login_fail(&e));
    }
    tracing::info!("{}", logs::LOGIN_SUCCESS);

    // 4. Feed
    let callbacks = FeedCallbacks::new().quiet().forwarding(Arc::new(client));
    let dispatcher = FeedDispatcher::new(config.irc.listen_nickname.clone(), callbacks);
    let listener = IrcListener::new(config.irc.clone(), Arc::new(dispatcher));

    tracing::info!("{}", logs::BOT_START);
    listen(listener).await;
    Ok(())
}

/// Runs the listener until Ctrl-C.
async fn listen(listener: IrcListener) {
    tokio::select! {
        _ = listener.run() => {}
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => tracing::info!("{}", logs::SHUTDOWN),
            Err(e) => tracing::error!("{}", logs::shutdown_fail(&e.to_string())),
        },
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("{},hyper=warn,reqwest=warn", logging.level))
    });

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Layer for file (only when configured)
    let (file_layer, guard) = match &logging.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", file))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Splits `host[:port]`.
fn parse_server(server: &str) -> Result<(String, u16)> {
    match server.split_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("Erroneous port: {}", port))?;
            Ok((host.to_string(), port))
        }
        None => Ok((server.to_string(), 6667)),
    }
}
