use crate::core::db::{ConnectionDescriptor, SqliteDriver};
use crate::core::{GatewayError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of the environment variables that override file settings.
pub const ENV_PREFIX: &str = "SQLGATE_";

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionParams,
    pub driver: DriverConfig,
}

/// Named connection parameters a descriptor is built from on every request.
///
/// `None` or an empty string means the parameter is missing.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionParams {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        ConnectionParams {
            host: Some("localhost".to_string()),
            port: Some(4900),
            database: Some("test_odbc.db".to_string()),
            user: Some("admin".to_string()),
            password: Some(String::new()),
        }
    }
}

impl ConnectionParams {
    /// Builds the connection descriptor, failing before any I/O when a
    /// required parameter is missing.
    pub fn descriptor(&self) -> Result<ConnectionDescriptor> {
        let port = self.port.map(|p| p.to_string());
        ConnectionDescriptor::new(
            self.host.as_deref(),
            port.as_deref(),
            self.database.as_deref(),
            self.user.as_deref(),
            self.password.as_deref(),
        )
    }
}

/// Backend driver configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriverConfig {
    /// Driver name; only "sqlite" is available.
    pub kind: String,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Create the database file when it does not exist.
    pub create_if_missing: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            kind: "sqlite".to_string(),
            busy_timeout_ms: 5_000,
            create_if_missing: false,
        }
    }
}

impl DriverConfig {
    pub fn sqlite_driver(&self) -> Result<SqliteDriver> {
        if !self.kind.eq_ignore_ascii_case("sqlite") {
            return Err(GatewayError::Configuration(format!("unsupported driver '{}'", self.kind)));
        }
        Ok(SqliteDriver::new(
            Duration::from_millis(self.busy_timeout_ms),
            self.create_if_missing,
        ))
    }
}

impl Config {
    /// Applies environment overrides read through `lookup`.
    ///
    /// An empty value clears the corresponding parameter.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let non_empty = |value: String| if value.trim().is_empty() { None } else { Some(value) };

        if let Some(host) = var("HOST") {
            self.connection.host = non_empty(host);
        }
        if let Some(port) = var("PORT") {
            self.connection.port = match non_empty(port) {
                Some(p) => Some(p.trim().parse::<u16>().map_err(|_| {
                    GatewayError::Configuration(format!("{}PORT must be a port number, got '{}'", ENV_PREFIX, p))
                })?),
                None => None,
            };
        }
        if let Some(database) = var("DATABASE") {
            self.connection.database = non_empty(database);
        }
        if let Some(user) = var("USER") {
            self.connection.user = non_empty(user);
        }
        if let Some(password) = var("PASSWORD") {
            self.connection.password = Some(password);
        }
        if let Some(timeout) = var("BUSY_TIMEOUT_MS") {
            self.driver.busy_timeout_ms = timeout.trim().parse::<u64>().map_err(|_| {
                GatewayError::Configuration(format!(
                    "{}BUSY_TIMEOUT_MS must be a number of milliseconds, got '{}'",
                    ENV_PREFIX, timeout
                ))
            })?;
        }
        Ok(())
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = sqlgate::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        GatewayError::Configuration(format!("cannot read {}: {}", path.display(), e))
    })?;
    toml::from_str(&content)
        .map_err(|e| GatewayError::Configuration(format!("invalid config {}: {}", path.display(), e)))
}

/// The per-user config file location, e.g. `~/.config/sqlgate/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sqlgate").join("config.toml"))
}

/// Resolves the effective configuration: defaults, then the explicit or
/// per-user config file, then environment overrides.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => load_config(path)?,
            None => Config::default(),
        },
    };
    config.apply_env()?;
    Ok(config)
}
