//! Runtime configuration for the claim desk.
//!
//! # Responsibility
//! - Describe store location, logging and claim policy in one serde model.
//! - Load it from an optional JSON file with per-field defaults.
//!
//! # Invariants
//! - A validated config always allows at least one claim attempt and one
//!   team per problem statement.

use crate::model::problem_statement::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DB_FILE_NAME: &str = "cyberfest.sqlite3";
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 25;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Errors from loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Claim coordinator policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// Capacity applied to new problem statements without an explicit one.
    pub default_capacity: u32,
    /// Total transaction attempts per claim before `TransactionConflict`.
    pub max_attempts: u32,
    /// Linear backoff step between attempts.
    pub retry_backoff_ms: u64,
    /// SQLite busy timeout per connection.
    pub busy_timeout_ms: u64,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            default_capacity: DEFAULT_CAPACITY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl ClaimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_capacity == 0 {
            return Err(ConfigError::Invalid("claim.default_capacity must be >= 1"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("claim.max_attempts must be >= 1"));
        }
        Ok(())
    }

    /// Delay before attempt `attempt + 1`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Top-level application config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute log directory. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub claim: ClaimConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            claim: ClaimConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, else returns defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path must not be empty"));
        }
        self.claim.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ClaimConfig, ConfigError};
    use std::time::Duration;

    #[test]
    fn defaults_are_valid_and_use_capacity_three() {
        let config = AppConfig::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.claim.default_capacity, 3);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config: AppConfig =
            serde_json::from_str(r#"{"db_path":"event.db","claim":{"max_attempts":9}}"#)
                .expect("partial config should parse");
        assert_eq!(config.db_path.to_str(), Some("event.db"));
        assert_eq!(config.claim.max_attempts, 9);
        assert_eq!(config.claim.default_capacity, 3);
    }

    #[test]
    fn validate_rejects_zero_capacity_and_zero_attempts() {
        let zero_capacity = ClaimConfig {
            default_capacity: 0,
            ..ClaimConfig::default()
        };
        assert!(matches!(
            zero_capacity.validate(),
            Err(ConfigError::Invalid(_))
        ));

        let zero_attempts = ClaimConfig {
            max_attempts: 0,
            ..ClaimConfig::default()
        };
        assert!(zero_attempts.validate().is_err());
    }

    #[test]
    fn backoff_grows_linearly() {
        let config = ClaimConfig {
            retry_backoff_ms: 10,
            ..ClaimConfig::default()
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(10));
        assert_eq!(config.backoff_for(3), Duration::from_millis(30));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reads_file_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cyberfest.json");
        std::fs::write(&path, r#"{"claim":{"default_capacity":0}}"#).unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        std::fs::write(&path, r#"{"log_level":"warn"}"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.log_level, "warn");
    }
}
