//! Service settings loaded from a JSON document.
//!
//! # Responsibility
//! - Parse the settings file into typed repository descriptors.
//! - Apply defaults for host, base URL, log level and pool size.
//!
//! # Invariants
//! - A loaded `Config` always has at least one repository.
//! - Repository ids are path-safe and never collide with reserved routes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub const DEFAULT_HOSTNAME: &str = "localhost:8484";
pub const DEFAULT_POOL_SIZE: usize = 4;
const MAX_POOL_SIZE: usize = 64;
const RESERVED_REPOSITORY_IDS: &[&str] = &["repositories", "repository", "help", "favicon.ico"];

static REPOSITORY_ID_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").ok());

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read settings: {err}"),
            Self::Parse(err) => write!(f, "cannot parse settings: {err}"),
            Self::Invalid(message) => write!(f, "invalid settings: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Field values applied to imported records when they arrive unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportDefaults {
    pub default_collection: String,
    pub default_official_url: String,
    pub default_rights: String,
    pub default_refereed: String,
    pub default_status: String,
    pub strip_tags: bool,
}

/// Settings for one logical repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub dsn: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub write: bool,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(flatten)]
    pub defaults: ImportDefaults,
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub logfile: String,
    #[serde(default)]
    pub log_level: String,
    #[serde(rename = "eprint_repositories", default)]
    pub repositories: BTreeMap<String, RepositoryConfig>,
}

impl Config {
    /// Reads, parses and validates a settings file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let src = std::fs::read_to_string(path)?;
        Self::from_json_str(&src)
    }

    /// Parses and validates a settings document.
    pub fn from_json_str(src: &str) -> ConfigResult<Self> {
        let mut config: Config = serde_json::from_str(src)?;
        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    pub fn repository_ids(&self) -> Vec<String> {
        self.repositories.keys().cloned().collect()
    }

    fn apply_defaults(&mut self) {
        if self.hostname.trim().is_empty() {
            self.hostname = DEFAULT_HOSTNAME.to_string();
        }
        if self.base_url.trim().is_empty() {
            self.base_url = format!("http://{}", self.hostname);
        }
        if self.log_level.trim().is_empty() {
            self.log_level = crate::logging::default_log_level().to_string();
        }
        for repository in self.repositories.values_mut() {
            if repository.base_url.trim().is_empty() {
                repository.base_url = self.base_url.clone();
            }
            repository.base_url = repository.base_url.trim_end_matches('/').to_string();
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.repositories.is_empty() {
            return Err(ConfigError::Invalid(
                "eprint_repositories must name at least one repository".to_string(),
            ));
        }
        for (id, repository) in &self.repositories {
            validate_repository_id(id)?;
            if repository.dsn.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "repository `{id}` has an empty dsn"
                )));
            }
            if repository.pool_size == 0 || repository.pool_size > MAX_POOL_SIZE {
                return Err(ConfigError::Invalid(format!(
                    "repository `{id}` pool_size must be within 1..={MAX_POOL_SIZE}, got {}",
                    repository.pool_size
                )));
            }
        }
        Ok(())
    }
}

fn validate_repository_id(id: &str) -> ConfigResult<()> {
    if RESERVED_REPOSITORY_IDS.contains(&id) {
        return Err(ConfigError::Invalid(format!(
            "repository id `{id}` is reserved"
        )));
    }
    let valid = REPOSITORY_ID_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(id));
    if !valid {
        return Err(ConfigError::Invalid(format!(
            "repository id `{id}` must match [A-Za-z0-9_.-]+"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError, DEFAULT_HOSTNAME, DEFAULT_POOL_SIZE};
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let config = Config::from_json_str(
            r#"{"eprint_repositories": {"lemurprints": {"dsn": "/tmp/lemur.sqlite3"}}}"#,
        )
        .expect("minimal settings should parse");

        assert_eq!(config.hostname, DEFAULT_HOSTNAME);
        assert_eq!(config.base_url, "http://localhost:8484");
        let repository = &config.repositories["lemurprints"];
        assert_eq!(repository.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(repository.base_url, "http://localhost:8484");
        assert!(!repository.write);
        assert!(!repository.defaults.strip_tags);
    }

    #[test]
    fn import_defaults_are_read_from_repository_block() {
        let config = Config::from_json_str(
            r#"{
                "hostname": "localhost:9000",
                "eprint_repositories": {
                    "thesis": {
                        "dsn": "/srv/thesis.sqlite3",
                        "base_url": "https://thesis.example.edu/",
                        "write": true,
                        "default_collection": "CaltechTHESIS",
                        "default_status": "inbox",
                        "strip_tags": true
                    }
                }
            }"#,
        )
        .expect("settings should parse");

        let repository = &config.repositories["thesis"];
        assert!(repository.write);
        assert_eq!(repository.base_url, "https://thesis.example.edu");
        assert_eq!(repository.defaults.default_collection, "CaltechTHESIS");
        assert_eq!(repository.defaults.default_status, "inbox");
        assert!(repository.defaults.strip_tags);
        assert_eq!(config.base_url, "http://localhost:9000");
    }

    #[test]
    fn rejects_empty_repository_set() {
        let err = Config::from_json_str(r#"{"hostname": "localhost:8484"}"#)
            .expect_err("no repositories must fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_reserved_and_malformed_ids() {
        let reserved =
            Config::from_json_str(r#"{"eprint_repositories": {"help": {"dsn": "/tmp/a"}}}"#)
                .expect_err("reserved id must fail");
        assert!(reserved.to_string().contains("reserved"));

        let malformed =
            Config::from_json_str(r#"{"eprint_repositories": {"a/b": {"dsn": "/tmp/a"}}}"#)
                .expect_err("slash in id must fail");
        assert!(matches!(malformed, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_dsn_and_pool_size_out_of_range() {
        let dsn = Config::from_json_str(r#"{"eprint_repositories": {"a": {"dsn": " "}}}"#)
            .expect_err("empty dsn must fail");
        assert!(dsn.to_string().contains("dsn"));

        let pool = Config::from_json_str(
            r#"{"eprint_repositories": {"a": {"dsn": "/tmp/a", "pool_size": 0}}}"#,
        )
        .expect_err("zero pool size must fail");
        assert!(pool.to_string().contains("pool_size"));
    }

    #[test]
    fn load_reads_file_and_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{ not json").expect("write settings");
        let err = Config::load(file.path()).expect_err("broken json must fail");
        assert!(matches!(err, ConfigError::Parse(_)));

        let missing = Config::load("/nonexistent/settings.json").expect_err("missing file");
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
