//! Command-line interface definitions.
//!
//! Uses clap's derive API for type-safe argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chat bridge daemon.
///
/// chatbridge keeps one chat session open, forwards inbound 1:1 messages to
/// an external notifier command and lets local processes send messages
/// through a unix-socket control channel. Without a subcommand it runs the
/// bridge.
#[derive(Parser, Debug)]
#[command(name = "chatbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to run (or omit to run the bridge).
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to an additional config file.
    ///
    /// Merged on top of the system and user configs, giving it the highest
    /// priority.
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity.
    ///
    /// Can be specified multiple times:
    /// -v    = info level
    /// -vv   = debug level
    /// -vvv  = trace level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Subcommands for chatbridge.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a SendMessage action to a running bridge's control socket.
    Send {
        /// Control socket path (defaults to the configured one).
        #[arg(long = "socket", value_name = "PATH")]
        socket: Option<PathBuf>,

        /// Destination address.
        #[arg(long = "to", value_name = "ADDRESS")]
        to: String,

        /// Message kind ("chat" or "groupchat").
        #[arg(long = "kind", value_name = "KIND", default_value = "chat")]
        kind: String,

        /// Message body.
        text: String,
    },

    /// Load, validate and print the effective configuration.
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_invocation_runs_the_bridge() {
        let cli = Cli::parse_from(["chatbridge"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_config_and_verbosity() {
        let cli = Cli::parse_from(["chatbridge", "-c", "/tmp/bridge.toml", "-vv"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/bridge.toml")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn parse_send_subcommand() {
        let cli = Cli::parse_from([
            "chatbridge",
            "send",
            "--socket",
            "/run/chatbridge/control.sock",
            "--to",
            "ops@conference.example.org",
            "--kind",
            "groupchat",
            "deploy finished",
        ]);

        match cli.command {
            Some(Commands::Send {
                socket,
                to,
                kind,
                text,
            }) => {
                assert_eq!(socket, Some(PathBuf::from("/run/chatbridge/control.sock")));
                assert_eq!(to, "ops@conference.example.org");
                assert_eq!(kind, "groupchat");
                assert_eq!(text, "deploy finished");
            }
            other => panic!("expected Send command, got {other:?}"),
        }
    }

    #[test]
    fn send_kind_defaults_to_chat() {
        let cli = Cli::parse_from(["chatbridge", "send", "--to", "pal@example.org", "hi"]);
        match cli.command {
            Some(Commands::Send { kind, socket, .. }) => {
                assert_eq!(kind, "chat");
                assert!(socket.is_none());
            }
            other => panic!("expected Send command, got {other:?}"),
        }
    }

    #[test]
    fn parse_check_config_subcommand() {
        let cli = Cli::parse_from(["chatbridge", "check-config"]);
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
    }
}
