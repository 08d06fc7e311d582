//! Configuration types for Rewind

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cache::Cache;
use crate::message::{Request, Response};
use crate::predicate::Predicate;
use crate::replay::{DiskQueueReplay, ReplayOrder};
use crate::storage::DiskQueueStorage;
use crate::{Result, RewindError};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for storing/loading recordings
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Replay settings
    #[serde(default)]
    pub replay: ReplayConfig,
    /// Which messages to store and replay
    #[serde(default)]
    pub filter: FilterConfig,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            replay: ReplayConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

/// Replay settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Order in which recorded folders are visited
    #[serde(default)]
    pub order: ReplayOrder,
}

/// Rule-based predicate
///
/// Requests are judged by `methods` and `path_prefixes`, responses by
/// `statuses`. An empty list accepts everything. Storage keeps a pair when
/// either half is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Accepted request methods
    #[serde(default)]
    pub methods: Vec<String>,
    /// Accepted request path prefixes
    #[serde(default)]
    pub path_prefixes: Vec<String>,
    /// Accepted response status codes
    #[serde(default)]
    pub statuses: Vec<u16>,
}

impl FilterConfig {
    /// Whether a request passes the request rules
    pub fn accepts_request(&self, request: &Request) -> bool {
        let method_ok = self.methods.is_empty()
            || self
                .methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case(request.method()));
        let path_ok = self.path_prefixes.is_empty()
            || self
                .path_prefixes
                .iter()
                .any(|prefix| request.path().starts_with(prefix.as_str()));

        method_ok && path_ok
    }

    /// Whether a response passes the response rules
    pub fn accepts_response(&self, response: &Response) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&response.status())
    }

    /// Build the predicate these rules describe
    #[must_use]
    pub fn predicate(&self) -> Predicate {
        let rules = self.clone();
        Predicate::new(move |message| {
            if let Some(request) = message.as_request() {
                rules.accepts_request(request)
            } else if let Some(response) = message.as_response() {
                rules.accepts_response(response)
            } else {
                true
            }
        })
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RewindError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| RewindError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(RewindError::ConfigError(
                "base_dir cannot be empty".to_string(),
            ));
        }

        for (i, method) in self.filter.methods.iter().enumerate() {
            if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(RewindError::ConfigError(format!(
                    "filter.methods[{i}]: invalid method {method:?}"
                )));
            }
        }

        for (i, prefix) in self.filter.path_prefixes.iter().enumerate() {
            if !prefix.starts_with('/') {
                return Err(RewindError::ConfigError(format!(
                    "filter.path_prefixes[{i}]: must start with '/', got {prefix:?}"
                )));
            }
        }

        for (i, status) in self.filter.statuses.iter().enumerate() {
            if !(100..=999).contains(status) {
                return Err(RewindError::ConfigError(format!(
                    "filter.statuses[{i}]: {status} is not a status code"
                )));
            }
        }

        Ok(())
    }

    /// Predicate described by the filter rules
    #[must_use]
    pub fn predicate(&self) -> Predicate {
        self.filter.predicate()
    }

    /// Disk cache rooted at `base_dir`
    #[must_use]
    pub fn disk_cache(&self) -> Cache {
        Cache::disk(self.base_dir.clone(), self.predicate())
    }

    /// Disk queue storage rooted at `base_dir`
    #[must_use]
    pub fn disk_queue_storage(&self) -> DiskQueueStorage {
        DiskQueueStorage::new(self.base_dir.clone(), self.predicate())
    }

    /// Disk queue replay rooted at `base_dir`
    #[must_use]
    pub fn disk_queue_replay(&self) -> DiskQueueReplay {
        DiskQueueReplay::new(self.base_dir.clone(), self.predicate()).with_order(self.replay.order)
    }
}
