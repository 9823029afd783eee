//! Logging configuration.
//!
//! Values come from the process environment (`LOGNCRASH_*`) or from a
//! `[logncrash]` TOML table:
//!
//! ```toml
//! [logncrash]
//! version = "1.0"
//! host = "h1"
//! platform = "web"
//! app-key = "buzz"
//! log.version = "v1"
//! log.source = "auth"
//! log.type = "app"
//! config.file-path = "/var/log/auth"
//! config.file-name = "app"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LoggingError, Result};

/// Default namespace of the application's own logger.
pub const DEFAULT_APP_LOGGER: &str = "authserver";

/// Default ingestion endpoint.
pub const DEFAULT_ENDPOINT: &str = logncrash_client::DEFAULT_ENDPOINT;

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = logncrash_client::DEFAULT_TIMEOUT_SECS;

/// Settings consumed by the assembler and the remote forwarder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Application version, sent as `projectVersion`.
    pub version: String,
    /// Host identifier.
    pub host: String,
    /// Platform label.
    pub platform: String,
    /// Log format version, sent as `logVersion`.
    pub log_version: String,
    /// Log source label.
    pub log_source: String,
    /// Log type label.
    pub log_type: String,
    /// Project key at the ingestion service, sent as `projectName`.
    pub app_key: String,
    /// Base directory for log files.
    pub file_path: String,
    /// File stem for log files.
    pub file_name: String,
    /// Namespace of the application's own logger.
    #[serde(default = "default_app_logger")]
    pub app_logger: String,
    /// Ingestion endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_app_logger() -> String {
    DEFAULT_APP_LOGGER.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Top level of the TOML document.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    logncrash: LogNCrashSection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LogNCrashSection {
    version: String,
    host: String,
    platform: String,
    app_key: String,
    log: LogSection,
    config: FileSection,
    app_logger: Option<String>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LogSection {
    version: String,
    source: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FileSection {
    file_path: String,
    file_name: String,
}

impl From<LogNCrashSection> for LoggingConfig {
    fn from(section: LogNCrashSection) -> Self {
        Self {
            version: section.version,
            host: section.host,
            platform: section.platform,
            log_version: section.log.version,
            log_source: section.log.source,
            log_type: section.log.kind,
            app_key: section.app_key,
            file_path: section.config.file_path,
            file_name: section.config.file_name,
            app_logger: section.app_logger.unwrap_or_else(default_app_logger),
            endpoint: section.endpoint.unwrap_or_else(default_endpoint),
            timeout_secs: section.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl LoggingConfig {
    /// Creates a configuration from the nine required values; optional
    /// values take their defaults.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        host: impl Into<String>,
        platform: impl Into<String>,
        log_version: impl Into<String>,
        log_source: impl Into<String>,
        log_type: impl Into<String>,
        app_key: impl Into<String>,
        file_path: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            host: host.into(),
            platform: platform.into(),
            log_version: log_version.into(),
            log_source: log_source.into(),
            log_type: log_type.into(),
            app_key: app_key.into(),
            file_path: file_path.into(),
            file_name: file_name.into(),
            app_logger: default_app_logger(),
            endpoint: default_endpoint(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the application logger namespace.
    #[must_use]
    pub fn with_app_logger(mut self, app_logger: impl Into<String>) -> Self {
        self.app_logger = app_logger.into();
        self
    }

    /// Sets the ingestion endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the HTTP timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Load configuration from `LOGNCRASH_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the result does
    /// not validate.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup using the
    /// environment variable names.
    ///
    /// # Errors
    ///
    /// Returns an error if a required key is missing or the result does not
    /// validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| LoggingError::Config(format!("{key} is not set")))
        };

        let timeout_secs = match lookup("LOGNCRASH_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                LoggingError::Config(format!("LOGNCRASH_TIMEOUT_SECS is not a number: {raw}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            version: required("LOGNCRASH_VERSION")?,
            host: required("LOGNCRASH_HOST")?,
            platform: required("LOGNCRASH_PLATFORM")?,
            log_version: required("LOGNCRASH_LOG_VERSION")?,
            log_source: required("LOGNCRASH_LOG_SOURCE")?,
            log_type: required("LOGNCRASH_LOG_TYPE")?,
            app_key: required("LOGNCRASH_APP_KEY")?,
            file_path: required("LOGNCRASH_FILE_PATH")?,
            file_name: required("LOGNCRASH_FILE_NAME")?,
            app_logger: lookup("LOGNCRASH_APP_LOGGER").unwrap_or_else(default_app_logger),
            endpoint: lookup("LOGNCRASH_ENDPOINT").unwrap_or_else(default_endpoint),
            timeout_secs,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LoggingError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| LoggingError::Config(format!("invalid TOML: {e}")))?;

        let config = Self::from(file.logncrash);
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any required value is empty or the endpoint is
    /// not an HTTP URL.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("version", &self.version),
            ("host", &self.host),
            ("platform", &self.platform),
            ("log_version", &self.log_version),
            ("log_source", &self.log_source),
            ("log_type", &self.log_type),
            ("app_key", &self.app_key),
            ("file_path", &self.file_path),
            ("file_name", &self.file_name),
            ("app_logger", &self.app_logger),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(LoggingError::Config(format!("{field} cannot be empty")));
            }
        }

        if self.file_name.contains(['/', '\\']) {
            return Err(LoggingError::Config(
                "file_name must not contain path separators".to_string(),
            ));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(LoggingError::Config(
                "endpoint must start with http:// or https://".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(LoggingError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// `<file_path>/<file_name>.log`
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        Path::new(&self.file_path).join(format!("{}.log", self.file_name))
    }

    /// `<file_path>/LOGS`
    #[must_use]
    pub fn log_archive_dir(&self) -> PathBuf {
        Path::new(&self.file_path).join("LOGS")
    }

    /// `<file_path>/ERROR`
    #[must_use]
    pub fn error_dir(&self) -> PathBuf {
        Path::new(&self.file_path).join("ERROR")
    }

    /// `<file_path>/ERROR/<file_name>.log`
    #[must_use]
    pub fn error_file(&self) -> PathBuf {
        self.error_dir().join(format!("{}.log", self.file_name))
    }
}
