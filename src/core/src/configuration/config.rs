use super::types::*;
use crate::error_handling::types::ConfigError;
use crate::web_interface::cookies::is_valid_cookie_name;
use clap::Parser;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration structure that defines all runtime parameters.
///
/// The configuration is read from a TOML file whose tables map onto the fields below.
/// Every table and every key is optional, missing values fall back to their defaults.
///
/// # Examples
///
/// ```
/// use sessionstore::configuration::Config;
///
/// let config: Config = toml::from_str("[session]\ncookie_name = \"app\"").unwrap();
/// assert_eq!(config.session.cookie_name, "app");
/// assert_eq!(config.session.id_length_bytes, 30);
/// ```
///
/// # Fields Overview
///
/// - `session`: cookie name, id length, lifetime and expiry policy of the session store
/// - `persistence`: where the snapshot file lives, if anywhere
/// - `web`: address and port of the demonstration web server
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub persistence: PersistenceConfig,
    pub web: WebConfig,
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            error!("Unable to read configuration file {}: {}", path.display(), e);
            ConfigError::IoError(e)
        })?;
        let config = Self::from_toml(&content)?;
        debug!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values a TOML file cannot constrain by itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let session = &self.session;
        if session.cookie_name.is_empty() {
            return Err(ConfigError::EmptyValue("session.cookie_name".into()));
        }
        if !is_valid_cookie_name(&session.cookie_name) {
            return Err(ConfigError::NotInRange(format!(
                "session.cookie_name '{}' is not a valid cookie name",
                session.cookie_name
            )));
        }
        if session.id_length_bytes == 0 || session.id_length_bytes > MAX_ID_LENGTH_BYTES {
            return Err(ConfigError::NotInRange(format!(
                "session.id_length_bytes must be within 1..={}, got {}",
                MAX_ID_LENGTH_BYTES, session.id_length_bytes
            )));
        }
        if session.lifetime_secs == 0 {
            return Err(ConfigError::NotInRange(
                "session.lifetime_secs must be greater than 0".into(),
            ));
        }
        if let CookieExpiry::Rolling { days } = session.cookie_expiry {
            if days == 0 || days > MAX_COOKIE_DAYS {
                return Err(ConfigError::NotInRange(format!(
                    "session.cookie_expiry.days must be within 1..={}, got {}",
                    MAX_COOKIE_DAYS, days
                )));
            }
        }
        if self.web.bind_address.is_empty() {
            return Err(ConfigError::EmptyValue("web.bind_address".into()));
        }
        Ok(())
    }

    /// Applies the command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&mut self, args: &CliArgs) -> Result<(), ConfigError> {
        if let Some(name) = &args.cookie_name {
            self.session.cookie_name = name.clone();
        }
        if let Some(port) = args.port {
            self.web.port = port;
        }
        if let Some(path) = &args.snapshot_path {
            self.persistence.snapshot_path = Some(path.clone());
        }
        self.validate()
    }

    /// Loads the file named by `args` (or the defaults) and applies the overrides.
    pub fn load(args: &CliArgs) -> Result<Config, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_overrides(args)?;
        Ok(config)
    }
}

/// Command-line arguments of the `sessionstore` binary.
///
/// Each override can also be given through its `SESSIONSTORE_*` environment variable.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "sessionstore")]
#[command(about = "In-process session store with cookie binding and snapshot persistence")]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(long, short = 'c', env = "SESSIONSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Name of the session cookie
    #[arg(long, env = "SESSIONSTORE_COOKIE_NAME")]
    pub cookie_name: Option<String>,

    /// Port of the web server
    #[arg(long, env = "SESSIONSTORE_PORT")]
    pub port: Option<u16>,

    /// Snapshot file loaded at startup and written at shutdown
    #[arg(long, env = "SESSIONSTORE_SNAPSHOT_PATH")]
    pub snapshot_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.session.cookie_name, "sid");
        assert_eq!(config.session.id_length_bytes, 30);
        assert_eq!(config.session.cookie_expiry, CookieExpiry::MatchSession);
        assert!(config.persistence.snapshot_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[session]
cookie_name = "app_session"
id_length_bytes = 16
lifetime_secs = 120
cleanup_on_create = true
cookie_expiry = {{ mode = "rolling", days = 30 }}

[persistence]
snapshot_path = "/tmp/sessions.json"

[web]
port = 9000
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.session.cookie_name, "app_session");
        assert_eq!(config.session.id_length_bytes, 16);
        assert_eq!(config.session.lifetime_secs, 120);
        assert_eq!(config.session.cleanup_interval_secs, 60);
        assert!(config.session.cleanup_on_create);
        assert_eq!(config.session.cookie_expiry, CookieExpiry::Rolling { days: 30 });
        assert_eq!(
            config.persistence.snapshot_path,
            Some(PathBuf::from("/tmp/sessions.json"))
        );
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/sessionstore.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml("[session\ncookie_name = ");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_rejects_bad_values() {
        let result = Config::from_toml("[session]\ncookie_name = \"\"");
        assert!(matches!(result, Err(ConfigError::EmptyValue(_))));

        let result = Config::from_toml("[session]\ncookie_name = \"bad name;\"");
        assert!(matches!(result, Err(ConfigError::NotInRange(_))));

        let result = Config::from_toml("[session]\nid_length_bytes = 0");
        assert!(matches!(result, Err(ConfigError::NotInRange(_))));

        let result = Config::from_toml("[session]\nlifetime_secs = 0");
        assert!(matches!(result, Err(ConfigError::NotInRange(_))));

        let result =
            Config::from_toml("[session]\ncookie_expiry = { mode = \"rolling\", days = 0 }");
        assert!(matches!(result, Err(ConfigError::NotInRange(_))));

        let result = Config::from_toml(
            "[session]\ncookie_expiry = { mode = \"rolling\", days = 4294967295 }",
        );
        assert!(matches!(result, Err(ConfigError::NotInRange(_))));

        let result =
            Config::from_toml("[session]\ncookie_expiry = { mode = \"rolling\", days = 400 }");
        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn test_cli_overrides() {
        let args = CliArgs::try_parse_from([
            "sessionstore",
            "--cookie-name",
            "override",
            "--port",
            "8181",
            "--snapshot-path",
            "/tmp/snap.json",
        ])
        .unwrap_or_else(|e| panic!("{}", e));

        let config = Config::load(&args).unwrap();
        assert_eq!(config.session.cookie_name, "override");
        assert_eq!(config.web.port, 8181);
        assert_eq!(
            config.persistence.snapshot_path,
            Some(PathBuf::from("/tmp/snap.json"))
        );
    }

    #[test]
    #[serial]
    fn test_cli_reads_environment() {
        std::env::set_var("SESSIONSTORE_PORT", "9191");
        let args = CliArgs::try_parse_from(["sessionstore"]);
        std::env::remove_var("SESSIONSTORE_PORT");

        let args = args.unwrap_or_else(|e| panic!("{}", e));
        assert_eq!(args.port, Some(9191));
        assert!(args.config.is_none());
    }
}
