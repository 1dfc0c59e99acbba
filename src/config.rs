//! Configuration management and validation.
//!
//! One `Config` struct covers the connection, the hot-folder layout,
//! the polling/debounce schedule, the retry policy, and the merge
//! behavior. Values come from defaults, an optional JSON file, and CLI
//! flags, in that order of precedence.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::app::models::OverlapMode;
use crate::constants::{
    DEFAULT_CONNECTION_RETRY_DELAY_SECS, DEFAULT_FILE_PATTERNS, DEFAULT_MAX_CONNECTION_ATTEMPTS,
    DEFAULT_PLUGINS, DEFAULT_POLLING_INTERVAL_SECS, DEFAULT_QUIET_PERIOD_SECS,
    MAX_WORKER_MULTIPLIER,
};
use crate::error::{Error, Result};

/// Global configuration for field visit processing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote store server address
    pub server_address: String,

    /// Credentials presented to the remote store
    pub username: String,
    pub password: String,

    /// Folder watched for incoming field data files
    pub hot_folder: PathBuf,

    /// Explicit folder for files being processed; defaults to
    /// `Processing` under the hot folder
    pub processing_folder: Option<PathBuf>,

    /// Explicit folder for cleanly uploaded files; defaults to
    /// `Uploaded` under the hot folder
    pub uploaded_folder: Option<PathBuf>,

    /// Explicit folder for files with withheld visits; defaults to
    /// `PartialUploads` under the hot folder
    pub partial_folder: Option<PathBuf>,

    /// Explicit folder for failed files; defaults to `Failed` under
    /// the hot folder
    pub failed_folder: Option<PathBuf>,

    /// Comma-separated glob patterns restricting eligible file names
    pub file_patterns: Vec<String>,

    /// Parser plugin identifiers, in priority order
    pub plugins: Vec<String>,

    /// Hot-folder polling interval in seconds
    pub polling_interval_secs: u64,

    /// Seconds a file must remain unmodified before processing
    pub quiet_period_secs: u64,

    /// Concurrent per-file workers; 0 means one per processing unit
    pub max_concurrent_files: usize,

    /// Connection attempts before the process gives up
    pub max_connection_attempts: u32,

    /// Delay between connection attempts in seconds
    pub connection_retry_delay_secs: u64,

    /// How visit windows are compared when merging fragments
    pub overlap_mode: OverlapMode,

    /// Stop voluntarily after this many files (None = unbounded)
    pub max_files_processed: Option<usize>,

    /// Stop voluntarily after this long with nothing to do
    pub max_idle_secs: Option<u64>,

    /// Parse and merge but never upload
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            username: String::new(),
            password: String::new(),
            hot_folder: PathBuf::new(),
            processing_folder: None,
            uploaded_folder: None,
            partial_folder: None,
            failed_folder: None,
            file_patterns: DEFAULT_FILE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            plugins: DEFAULT_PLUGINS.iter().map(|s| s.to_string()).collect(),
            polling_interval_secs: DEFAULT_POLLING_INTERVAL_SECS,
            quiet_period_secs: DEFAULT_QUIET_PERIOD_SECS,
            max_concurrent_files: 0,
            max_connection_attempts: DEFAULT_MAX_CONNECTION_ATTEMPTS,
            connection_retry_delay_secs: DEFAULT_CONNECTION_RETRY_DELAY_SECS,
            overlap_mode: OverlapMode::WholeDay,
            max_files_processed: None,
            max_idle_secs: None,
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::configuration(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Set the hot folder
    pub fn with_hot_folder(mut self, hot_folder: PathBuf) -> Self {
        self.hot_folder = hot_folder;
        self
    }

    /// Set the server address
    pub fn with_server(mut self, address: impl Into<String>) -> Self {
        self.server_address = address.into();
        self
    }

    /// Set file name patterns from a comma-separated list
    pub fn with_patterns(mut self, patterns: &str) -> Self {
        self.file_patterns = patterns
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    /// Set the overlap mode
    pub fn with_overlap_mode(mut self, mode: OverlapMode) -> Self {
        self.overlap_mode = mode;
        self
    }

    /// Enable dry-run mode
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Resolved worker count: configured value, defaulting to the
    /// number of processing units and capped at twice that to bound
    /// remote-server load
    pub fn worker_count(&self) -> usize {
        let cpus = num_cpus::get().max(1);
        let requested = if self.max_concurrent_files == 0 {
            cpus
        } else {
            self.max_concurrent_files
        };
        requested.min(cpus * MAX_WORKER_MULTIPLIER)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_secs(self.quiet_period_secs)
    }

    pub fn connection_retry_delay(&self) -> Duration {
        Duration::from_secs(self.connection_retry_delay_secs)
    }

    pub fn max_idle(&self) -> Option<Duration> {
        self.max_idle_secs.map(Duration::from_secs)
    }

    /// Validate the configuration before any processing starts
    pub fn validate(&self) -> Result<()> {
        if self.hot_folder.as_os_str().is_empty() {
            return Err(Error::configuration("hot folder must be set"));
        }
        if self.server_address.is_empty() && !self.dry_run {
            return Err(Error::configuration(
                "server address must be set unless running with --dry-run",
            ));
        }
        if self.polling_interval_secs == 0 {
            return Err(Error::configuration("polling interval must be non-zero"));
        }
        if self.max_connection_attempts == 0 {
            return Err(Error::configuration(
                "at least one connection attempt is required",
            ));
        }
        if self.plugins.is_empty() {
            return Err(Error::configuration("at least one plugin must be enabled"));
        }
        if self.file_patterns.is_empty() {
            return Err(Error::configuration(
                "at least one file pattern must be given",
            ));
        }
        Ok(())
    }
}
