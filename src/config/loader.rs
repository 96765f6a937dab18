//! Configuration loading with hierarchy merging.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::ConfigError;
use super::schema::Config;

/// System-wide configuration path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/chatbridge/config.toml";

/// User configuration directory name.
pub const USER_CONFIG_DIR: &str = "chatbridge";

/// User configuration filename.
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Configuration loader with support for hierarchy merging.
pub struct ConfigLoader {
    /// Path to system-wide configuration.
    system_path: PathBuf,
    /// Path to user configuration.
    user_path: PathBuf,
}

impl ConfigLoader {
    /// Create a new loader with the default paths.
    #[must_use]
    pub fn new() -> Self {
        let user_config_dir = dirs::config_dir()
            .map(|p| p.join(USER_CONFIG_DIR))
            .unwrap_or_else(|| PathBuf::from(".config").join(USER_CONFIG_DIR));

        Self {
            system_path: PathBuf::from(SYSTEM_CONFIG_PATH),
            user_path: user_config_dir.join(USER_CONFIG_FILE),
        }
    }

    /// Create a loader with custom paths (for testing).
    #[must_use]
    pub fn with_paths(system_path: PathBuf, user_path: PathBuf) -> Self {
        Self {
            system_path,
            user_path,
        }
    }

    /// Load and merge configuration from all sources, then validate.
    ///
    /// Missing system/user files are skipped; a missing `extra` file (the
    /// `--config` flag) is an error. Invalid TOML fails fast.
    pub fn load(&self, extra: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        if let Some(system_config) = self.load_file(&self.system_path)? {
            config.merge(system_config);
            debug!("loaded system config from {:?}", self.system_path);
        } else {
            debug!("no system config at {:?}", self.system_path);
        }

        if let Some(user_config) = self.load_file(&self.user_path)? {
            config.merge(user_config);
            debug!("loaded user config from {:?}", self.user_path);
        } else {
            debug!("no user config at {:?}", self.user_path);
        }

        if let Some(extra_path) = extra {
            match self.load_file(extra_path)? {
                Some(extra_config) => {
                    config.merge(extra_config);
                    debug!("loaded additional config from {extra_path:?}");
                }
                None => {
                    // Unlike system/user config, an explicitly named file
                    // must exist.
                    return Err(ConfigError::ReadError {
                        path: extra_path.to_path_buf(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "specified config file not found",
                        ),
                    });
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Read and parse one file; `Ok(None)` when the file does not exist.
    fn load_file(&self, path: &Path) -> Result<Option<Config>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
        [connection]
        jid = "bridge@example.org"
        password = "secret"

        [control]
        socket = "/tmp/chatbridge-test.sock"
    "#;

    #[test]
    fn load_single_file_hierarchy() {
        let dir = tempdir().unwrap();
        let system = dir.path().join("system.toml");
        fs::write(&system, MINIMAL).unwrap();

        let loader = ConfigLoader::with_paths(system, dir.path().join("missing-user.toml"));
        let config = loader.load(None).unwrap();

        assert_eq!(config.connection.jid, "bridge@example.org");
    }

    #[test]
    fn user_config_overrides_system() {
        let dir = tempdir().unwrap();
        let system = dir.path().join("system.toml");
        let user = dir.path().join("user.toml");
        fs::write(&system, MINIMAL).unwrap();
        fs::write(
            &user,
            r#"
            [connection]
            jid = "override@example.org"
        "#,
        )
        .unwrap();

        let loader = ConfigLoader::with_paths(system, user);
        let config = loader.load(None).unwrap();

        assert_eq!(config.connection.jid, "override@example.org");
        // Scalars absent from the user file keep the system values.
        assert_eq!(config.connection.password, "secret");
    }

    #[test]
    fn missing_extra_config_is_an_error() {
        let dir = tempdir().unwrap();
        let system = dir.path().join("system.toml");
        fs::write(&system, MINIMAL).unwrap();

        let loader = ConfigLoader::with_paths(system, dir.path().join("user.toml"));
        let result = loader.load(Some(&dir.path().join("nope.toml")));

        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn invalid_toml_fails_fast() {
        let dir = tempdir().unwrap();
        let system = dir.path().join("system.toml");
        fs::write(&system, "connection = 5").unwrap();

        let loader = ConfigLoader::with_paths(system, dir.path().join("user.toml"));
        let result = loader.load(None);

        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn empty_hierarchy_fails_validation() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::with_paths(
            dir.path().join("system.toml"),
            dir.path().join("user.toml"),
        );

        assert!(matches!(
            loader.load(None),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
