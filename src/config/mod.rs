//! Configuration loading and schema.
//!
//! Configuration is TOML, loaded from multiple sources and merged in order:
//!
//! 1. System config: `/etc/chatbridge/config.toml`
//! 2. User config: `~/.config/chatbridge/config.toml`
//! 3. Additional config file (via `--config` flag, highest priority)
//!
//! Lists (chatrooms, whitelist senders) are **merged** (appended).
//! Scalars (jid, socket path, toggles) are **overridden** when non-default.

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::{ConfigLoader, SYSTEM_CONFIG_PATH, USER_CONFIG_DIR, USER_CONFIG_FILE};
pub use schema::{
    ChatroomConfig, Config, ConnectionConfig, ControlConfig, LoggingConfig, NotifierConfig,
    PresenceConfig, WhitelistConfig,
};
