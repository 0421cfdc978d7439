//! Configuration management for cmdlink.
//!
//! This module handles loading, saving, and managing cmdlink configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/cmdlink/config.toml` |
//! | macOS | `~/Library/Application Support/com.cmdlink.Cmdlink/config.toml` |
//! | Windows | `%APPDATA%\cmdlink\Cmdlink\config\config.toml` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use cmdlink_core::config::Config;
//!
//! let config = Config::load()?;
//! println!("Chunk size: {}", config.link.chunk_size);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::checksum::CHECKSUM_LEN;
use crate::error::{Error, Result};
use crate::session::{BufferPolicy, SessionOptions};

/// Main configuration struct for cmdlink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Link settings
    pub link: LinkConfig,
    /// Receiving session settings
    pub session: SessionConfig,
    /// Sending side settings
    pub sender: SenderConfig,
    /// Execution report settings
    pub report: ReportConfig,
}

/// Link configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Largest frame on the link, checksum included
    pub chunk_size: usize,
    /// Address for `listen` and `send`
    pub listen_addr: String,
    /// How long the sender waits for each reply
    #[serde(with = "humantime_serde")]
    pub reply_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            listen_addr: crate::DEFAULT_LISTEN_ADDR.to_string(),
            reply_timeout: Duration::from_secs(5),
        }
    }
}

/// Receiving session configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Largest transfer a peer may announce
    pub max_transfer_size: usize,
    /// Keep or free the receive buffer after a transfer
    pub buffer_policy: BufferPolicy,
    /// Abandon a stalled transfer after this long (unset = wait forever)
    #[serde(
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_transfer_size: crate::DEFAULT_MAX_TRANSFER_SIZE,
            buffer_policy: BufferPolicy::Retain,
            idle_timeout: None,
        }
    }
}

/// Sender configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Whole-transfer restarts before giving up
    pub max_retries: u32,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            max_retries: crate::DEFAULT_MAX_RETRIES,
        }
    }
}

/// Report configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Print the per-command report after each batch
    pub print_report: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { print_report: true }
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            max_transfer_size: config.max_transfer_size,
            buffer_policy: config.buffer_policy,
            idle_timeout: config.idle_timeout,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, falling back to defaults if
    /// it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// fails validation.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Check values that would make the protocol unusable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.link.chunk_size <= CHECKSUM_LEN {
            return Err(Error::InvalidConfig {
                key: "link.chunk_size".to_string(),
                reason: format!("must be larger than {CHECKSUM_LEN}"),
            });
        }
        if u32::try_from(self.session.max_transfer_size).is_err() {
            return Err(Error::InvalidConfig {
                key: "session.max_transfer_size".to_string(),
                reason: "must fit in 32 bits".to_string(),
            });
        }
        if self.link.reply_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                key: "link.reply_timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.session.idle_timeout.is_some_and(|d| d.is_zero()) {
            return Err(Error::InvalidConfig {
                key: "session.idle_timeout".to_string(),
                reason: "must be greater than zero (omit it to wait forever)".to_string(),
            });
        }
        Ok(())
    }

    /// Session options derived from this configuration.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::from(&self.session)
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "cmdlink", "Cmdlink")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

/// Parse a duration string like "30s", "5m" or "1h".
///
/// This is the one format accepted everywhere a duration is configured, in
/// the config file and on the command line.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (digits, scale) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        return None;
    };

    let num: u64 = digits.parse().ok()?;
    num.checked_mul(scale).map(Duration::from_secs)
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    fn parse(s: &str) -> Result<Duration, String> {
        super::parse_duration(s).ok_or_else(|| format!("invalid duration format: {s:?}"))
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        #[allow(clippy::ref_option)]
        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| super::parse(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.link.chunk_size, crate::DEFAULT_CHUNK_SIZE);
        assert_eq!(config.session.buffer_policy, BufferPolicy::Retain);
        assert!(config.session.idle_timeout.is_none());
        assert!(config.report.print_report);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.link.chunk_size = 128;
        original.session.buffer_policy = BufferPolicy::Release;
        original.session.idle_timeout = Some(Duration::from_secs(30));
        original.sender.max_retries = 7;

        original.save_to(&path).expect("save");
        let loaded = Config::load_from(&path).expect("load");

        assert_eq!(loaded.link.chunk_size, 128);
        assert_eq!(loaded.session.buffer_policy, BufferPolicy::Release);
        assert_eq!(loaded.session.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(loaded.sender.max_retries, 7);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml")).expect("load");
        assert_eq!(config.link.listen_addr, crate::DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn test_config_deserialization_partial() {
        let partial_toml = r#"
[link]
chunk_size = 64
reply_timeout = "2m"

[session]
idle_timeout = "10s"
"#;

        let config: Config = toml::from_str(partial_toml).expect("parse partial config");

        assert_eq!(config.link.chunk_size, 64);
        assert_eq!(config.link.reply_timeout, Duration::from_secs(120));
        assert_eq!(config.session.idle_timeout, Some(Duration::from_secs(10)));
        assert_eq!(
            config.session.max_transfer_size,
            crate::DEFAULT_MAX_TRANSFER_SIZE
        );
    }

    #[test]
    fn test_invalid_chunk_size_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[link]\nchunk_size = 4\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(Error::InvalidConfig { key, .. }) if key == "link.chunk_size"
        ));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[link]\nreply_timeout = \"soon\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration(" 1h "), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_hours_accepted_in_config_file() {
        let config: Config =
            toml::from_str("[session]\nidle_timeout = \"1h\"\n").expect("parse hours");
        assert_eq!(config.session.idle_timeout, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        std::fs::write(&path, "[session]\nidle_timeout = \"0s\"\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(Error::InvalidConfig { key, .. }) if key == "session.idle_timeout"
        ));

        std::fs::write(&path, "[link]\nreply_timeout = \"0m\"\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(Error::InvalidConfig { key, .. }) if key == "link.reply_timeout"
        ));
    }

    #[test]
    fn test_buffer_policy_serialization() {
        let toml_str = toml::to_string_pretty(&Config::default()).expect("serialize");
        assert!(
            toml_str.contains("buffer_policy = \"retain\""),
            "Buffer policy should be serialized as lowercase"
        );
        assert!(toml_str.contains("[link]"));
        assert!(!toml_str.contains("idle_timeout"));
    }

    #[test]
    fn test_session_options_conversion() {
        let mut config = Config::default();
        config.session.max_transfer_size = 512;
        let options = config.session_options();
        assert_eq!(options.max_transfer_size, 512);
        assert_eq!(options.buffer_policy, BufferPolicy::Retain);
    }

    #[test]
    fn test_config_path() {
        assert!(Config::config_path().ends_with("config.toml"));
    }
}
