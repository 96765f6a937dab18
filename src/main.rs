//! chatbridge binary entry point.
//!
//! Handles CLI parsing, tracing initialization and configuration loading,
//! then either runs the bridge or executes one of the local subcommands
//! (`send`, `check-config`).

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use chatbridge::cli::{Cli, Commands};
use chatbridge::config::{Config, ConfigLoader};

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    init_tracing(cli.verbose)?;
    debug!("parsed CLI arguments: {:?}", cli);

    let loader = ConfigLoader::new();

    match cli.command.take() {
        Some(Commands::Send {
            socket,
            to,
            kind,
            text,
        }) => send_control_message(&loader, &cli, socket, &to, &kind, &text),
        Some(Commands::CheckConfig) => check_config(&loader, &cli),
        None => run_bridge(&loader, &cli),
    }
}

fn run_bridge(loader: &ConfigLoader, cli: &Cli) -> Result<()> {
    let config = loader
        .load(cli.config.as_deref())
        .context("failed to load configuration")?;

    info!(
        jid = %config.connection.jid,
        chatrooms = config.chatrooms.len(),
        logging = config.logging.enabled,
        whitelist = config.whitelist.enabled,
        "starting bridge"
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run_with_session(config))
}

#[cfg(feature = "xmpp")]
async fn run_with_session(config: Config) -> Result<()> {
    use chatbridge::bridge::Bridge;
    use chatbridge::session::xmpp::{ConnectOptions, XmppSession};

    let session = XmppSession::connect(ConnectOptions::from(&config.connection))
        .await
        .context("failed to establish chat session")?;

    Bridge::new(std::sync::Arc::new(session), config).run().await
}

#[cfg(not(feature = "xmpp"))]
async fn run_with_session(_config: Config) -> Result<()> {
    anyhow::bail!("this build carries no chat session backend; rebuild with `--features xmpp`")
}

/// Submit a SendMessage action to the control socket of a running bridge.
fn send_control_message(
    loader: &ConfigLoader,
    cli: &Cli,
    socket: Option<std::path::PathBuf>,
    to: &str,
    kind: &str,
    text: &str,
) -> Result<()> {
    let socket = match socket {
        Some(socket) => socket,
        None => {
            let config = loader
                .load(cli.config.as_deref())
                .context("failed to load configuration")?;
            config.control.socket
        }
    };

    let payload = serde_json::json!({
        "actionType": "SendMessage",
        "actionSettings": {"remote": to, "type": kind, "text": text},
    });

    let mut stream = std::os::unix::net::UnixStream::connect(&socket)
        .with_context(|| format!("failed to connect to control socket {}", socket.display()))?;
    stream
        .write_all(payload.to_string().as_bytes())
        .context("failed to write control payload")?;

    println!("submitted SendMessage via {}", socket.display());
    Ok(())
}

/// Load, validate and print the effective configuration.
fn check_config(loader: &ConfigLoader, cli: &Cli) -> Result<()> {
    let mut config = loader
        .load(cli.config.as_deref())
        .context("configuration is invalid")?;

    if !config.connection.password.is_empty() {
        config.connection.password = "<redacted>".to_string();
    }

    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// # Verbosity Levels
/// - 0 (default): Only warnings and errors
/// - 1 (-v): Info level
/// - 2 (-vv): Debug level
/// - 3+ (-vvv): Trace level
fn init_tracing(verbose: u8) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    Ok(())
}
