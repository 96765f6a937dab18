//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::keepalive::DEFAULT_KEEPALIVE_INTERVAL;

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Chat server account settings.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Chatrooms to join at startup.
    #[serde(default)]
    pub chatrooms: Vec<ChatroomConfig>,

    /// Per-chat message logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Sender whitelist for notifier forwarding.
    #[serde(default)]
    pub whitelist: WhitelistConfig,

    /// External notifier command.
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Local control channel.
    #[serde(default)]
    pub control: ControlConfig,

    /// Presence behavior.
    #[serde(default)]
    pub presence: PresenceConfig,
}

impl Config {
    /// Merge another config into this one.
    ///
    /// Lists (chatrooms, whitelist senders) are merged (appended).
    /// Scalars are overridden when the other value is non-default.
    pub fn merge(&mut self, other: Config) {
        self.connection.merge(other.connection);
        self.chatrooms.extend(other.chatrooms);
        self.logging.merge(other.logging);
        self.whitelist.merge(other.whitelist);
        self.notifier.merge(other.notifier);
        self.control.merge(other.control);
        self.presence.merge(other.presence);
    }

    /// Check the merged configuration for values the bridge cannot run
    /// without. Fails fast with the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.jid.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "connection.jid".to_string(),
                message: "account jid must be set".to_string(),
            });
        }
        if self.control.socket.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "control.socket".to_string(),
                message: "control socket path must be set".to_string(),
            });
        }
        if self.logging.enabled && self.logging.directory.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.directory".to_string(),
                message: "log directory must be set when logging is enabled".to_string(),
            });
        }
        for (index, room) in self.chatrooms.iter().enumerate() {
            if room.jid.is_empty() || room.nick.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("chatrooms[{index}]"),
                    message: "chatroom entries need both jid and nick".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Chat server account settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// Server address (`host:port`). Empty means SRV resolution from the
    /// JID domain.
    #[serde(default)]
    pub server: String,

    /// Account JID.
    #[serde(default)]
    pub jid: String,

    /// Account password.
    #[serde(default)]
    pub password: String,

    /// Disable TLS on the stream.
    #[serde(default)]
    pub no_tls: bool,

    /// Status text announced in the initial presence.
    #[serde(default)]
    pub status: String,
}

impl ConnectionConfig {
    fn merge(&mut self, other: ConnectionConfig) {
        if !other.server.is_empty() {
            self.server = other.server;
        }
        if !other.jid.is_empty() {
            self.jid = other.jid;
        }
        if !other.password.is_empty() {
            self.password = other.password;
        }
        if other.no_tls {
            self.no_tls = true;
        }
        if !other.status.is_empty() {
            self.status = other.status;
        }
    }
}

/// A chatroom joined at startup and kept alive by the keepalive task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ChatroomConfig {
    /// Room address.
    pub jid: String,
    /// Nickname used in the room.
    pub nick: String,
}

/// Per-chat message logging.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Whether chat traffic is written to log files.
    #[serde(default)]
    pub enabled: bool,

    /// Directory holding one `<chat>.log` file per chat.
    #[serde(default)]
    pub directory: PathBuf,
}

impl LoggingConfig {
    fn merge(&mut self, other: LoggingConfig) {
        if other.enabled {
            self.enabled = true;
        }
        if !other.directory.as_os_str().is_empty() {
            self.directory = other.directory;
        }
    }
}

/// Sender whitelist for notifier forwarding.
///
/// Membership is exact string equality on the bare sender address; there is
/// no case normalization and no resource stripping.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WhitelistConfig {
    /// Whether the whitelist is enforced.
    #[serde(default)]
    pub enabled: bool,

    /// Allowed sender addresses.
    #[serde(default)]
    pub senders: Vec<String>,
}

impl WhitelistConfig {
    fn merge(&mut self, other: WhitelistConfig) {
        if other.enabled {
            self.enabled = true;
        }
        self.senders.extend(other.senders);
    }
}

/// External notifier command.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotifierConfig {
    /// Command started for each forwarded 1:1 message. Empty disables
    /// forwarding.
    #[serde(default)]
    pub script: PathBuf,
}

impl NotifierConfig {
    fn merge(&mut self, other: NotifierConfig) {
        if !other.script.as_os_str().is_empty() {
            self.script = other.script;
        }
    }
}

/// Local control channel.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ControlConfig {
    /// Filesystem path of the control socket.
    #[serde(default)]
    pub socket: PathBuf,
}

impl ControlConfig {
    fn merge(&mut self, other: ControlConfig) {
        if !other.socket.as_os_str().is_empty() {
            self.socket = other.socket;
        }
    }
}

/// Presence behavior.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PresenceConfig {
    /// Automatically approve subscription requests and ask for the
    /// reciprocal subscription.
    #[serde(default)]
    pub auto_accept_subscriptions: bool,

    /// Keepalive period in seconds; 0 selects the built-in default.
    #[serde(default)]
    pub keepalive_interval_secs: u64,
}

impl PresenceConfig {
    fn merge(&mut self, other: PresenceConfig) {
        if other.auto_accept_subscriptions {
            self.auto_accept_subscriptions = true;
        }
        if other.keepalive_interval_secs != 0 {
            self.keepalive_interval_secs = other.keepalive_interval_secs;
        }
    }

    /// Effective keepalive period.
    pub fn keepalive_interval(&self) -> Duration {
        if self.keepalive_interval_secs == 0 {
            DEFAULT_KEEPALIVE_INTERVAL
        } else {
            Duration::from_secs(self.keepalive_interval_secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_empty() {
        let config = Config::default();

        assert!(config.connection.jid.is_empty());
        assert!(config.chatrooms.is_empty());
        assert!(!config.logging.enabled);
        assert!(!config.whitelist.enabled);
        assert!(config.control.socket.as_os_str().is_empty());
        assert!(!config.presence.auto_accept_subscriptions);
    }

    #[test]
    fn config_deserialize() {
        let toml_str = r#"
            [connection]
            server = "chat.example.org:5222"
            jid = "bridge@example.org"
            password = "secret"
            status = "bridging"

            [[chatrooms]]
            jid = "ops@conference.example.org"
            nick = "bridge"

            [logging]
            enabled = true
            directory = "/var/log/chatbridge"

            [whitelist]
            enabled = true
            senders = ["admin@example.org"]

            [notifier]
            script = "/usr/local/bin/notify"

            [control]
            socket = "/run/chatbridge/control.sock"

            [presence]
            auto_accept_subscriptions = true
            keepalive_interval_secs = 10
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();

        assert_eq!(config.connection.jid, "bridge@example.org");
        assert_eq!(config.chatrooms.len(), 1);
        assert_eq!(config.chatrooms[0].nick, "bridge");
        assert!(config.logging.enabled);
        assert_eq!(
            config.whitelist.senders,
            vec!["admin@example.org".to_string()]
        );
        assert_eq!(
            config.control.socket,
            PathBuf::from("/run/chatbridge/control.sock")
        );
        assert!(config.presence.auto_accept_subscriptions);
        assert_eq!(
            config.presence.keepalive_interval(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn config_merge_overrides_scalars() {
        let mut base: Config = toml::from_str(
            r#"
            [connection]
            jid = "old@example.org"
            password = "old"
        "#,
        )
        .unwrap();

        let override_config: Config = toml::from_str(
            r#"
            [connection]
            jid = "new@example.org"
        "#,
        )
        .unwrap();

        base.merge(override_config);

        assert_eq!(base.connection.jid, "new@example.org");
        // Untouched scalars keep their earlier values.
        assert_eq!(base.connection.password, "old");
    }

    #[test]
    fn config_merge_appends_lists() {
        let mut base: Config = toml::from_str(
            r#"
            [[chatrooms]]
            jid = "a@conference.example.org"
            nick = "bridge"

            [whitelist]
            senders = ["one@example.org"]
        "#,
        )
        .unwrap();

        let override_config: Config = toml::from_str(
            r#"
            [[chatrooms]]
            jid = "b@conference.example.org"
            nick = "bridge"

            [whitelist]
            senders = ["two@example.org"]
        "#,
        )
        .unwrap();

        base.merge(override_config);

        assert_eq!(base.chatrooms.len(), 2);
        assert_eq!(base.whitelist.senders.len(), 2);
    }

    #[test]
    fn validate_requires_jid() {
        let config = Config::default();
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "connection.jid");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn validate_requires_log_directory_when_logging() {
        let config: Config = toml::from_str(
            r#"
            [connection]
            jid = "bridge@example.org"

            [control]
            socket = "/tmp/control.sock"

            [logging]
            enabled = true
        "#,
        )
        .unwrap();

        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "logging.directory");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_incomplete_chatroom() {
        let config: Config = toml::from_str(
            r#"
            [connection]
            jid = "bridge@example.org"

            [control]
            socket = "/tmp/control.sock"

            [[chatrooms]]
            jid = "room@conference.example.org"
            nick = ""
        "#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn keepalive_interval_defaults() {
        let presence = PresenceConfig::default();
        assert_eq!(presence.keepalive_interval(), DEFAULT_KEEPALIVE_INTERVAL);
    }
}
