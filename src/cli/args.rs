//! Command-line argument definitions for the field visit processor.
//!
//! Defines the CLI interface using the clap derive API. Flags overlay
//! values loaded from an optional JSON configuration file.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::app::models::OverlapMode;
use crate::config::Config;
use crate::error::Result;

/// CLI arguments for the field visit hot-folder processor
///
/// Watches a folder for field-collected hydrological observation
/// files, parses them into consolidated visits, and publishes the
/// visits to a remote time-series store.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fieldvisit-processor",
    version,
    about = "Parse field observation files into visits and publish them to a remote store"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Watch a hot folder and process incoming field data files
    Process(ProcessArgs),
    /// Validate configuration and remote store connectivity, then exit
    Check(CheckArgs),
}

/// CLI spelling of the merge overlap mode
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OverlapModeArg {
    /// Exact interval comparison; touching windows stay separate
    Strict,
    /// Same calendar day joins the same visit
    WholeDay,
}

impl From<OverlapModeArg> for OverlapMode {
    fn from(arg: OverlapModeArg) -> Self {
        match arg {
            OverlapModeArg::Strict => OverlapMode::Strict,
            OverlapModeArg::WholeDay => OverlapMode::WholeDay,
        }
    }
}

/// Arguments for the process command
#[derive(Debug, Clone, Parser)]
pub struct ProcessArgs {
    /// JSON configuration file; flags given here override its values
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Folder watched for incoming field data files
    #[arg(short = 'f', long = "hot-folder", value_name = "PATH")]
    pub hot_folder: Option<PathBuf>,

    /// Remote store server address
    #[arg(short = 's', long = "server", value_name = "URL")]
    pub server: Option<String>,

    /// Remote store username
    #[arg(long = "username", value_name = "NAME")]
    pub username: Option<String>,

    /// Remote store password
    #[arg(long = "password", value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Explicit folder for files being processed (default: Processing
    /// under the hot folder)
    #[arg(long = "processing-folder", value_name = "PATH")]
    pub processing_folder: Option<PathBuf>,

    /// Explicit folder for cleanly uploaded files (default: Uploaded
    /// under the hot folder)
    #[arg(long = "uploaded-folder", value_name = "PATH")]
    pub uploaded_folder: Option<PathBuf>,

    /// Explicit folder for files with withheld visits (default:
    /// PartialUploads under the hot folder)
    #[arg(long = "partial-folder", value_name = "PATH")]
    pub partial_folder: Option<PathBuf>,

    /// Explicit folder for failed files (default: Failed under the
    /// hot folder)
    #[arg(long = "failed-folder", value_name = "PATH")]
    pub failed_folder: Option<PathBuf>,

    /// Comma-separated glob patterns for eligible file names
    #[arg(long = "patterns", value_name = "GLOBS")]
    pub patterns: Option<String>,

    /// Comma-separated parser plugin identifiers, in priority order
    #[arg(long = "plugins", value_name = "NAMES")]
    pub plugins: Option<String>,

    /// Hot-folder polling interval in seconds
    #[arg(long = "polling-interval", value_name = "SECS")]
    pub polling_interval: Option<u64>,

    /// Seconds a file must stay unmodified before processing
    #[arg(long = "quiet-period", value_name = "SECS")]
    pub quiet_period: Option<u64>,

    /// Maximum concurrent file workers (0 = one per processing unit)
    #[arg(long = "max-concurrent", value_name = "N")]
    pub max_concurrent: Option<usize>,

    /// Connection attempts before giving up
    #[arg(long = "max-attempts", value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Delay between connection attempts in seconds
    #[arg(long = "retry-delay", value_name = "SECS")]
    pub retry_delay: Option<u64>,

    /// How visit windows are compared when merging fragments
    #[arg(long = "overlap-mode", value_enum)]
    pub overlap_mode: Option<OverlapModeArg>,

    /// Stop after processing this many files
    #[arg(long = "max-files", value_name = "N")]
    pub max_files: Option<usize>,

    /// Stop after this many seconds with nothing to do
    #[arg(long = "max-idle", value_name = "SECS")]
    pub max_idle: Option<u64>,

    /// Parse and merge but never upload
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl ProcessArgs {
    /// Resolve the effective configuration: defaults, then the config
    /// file, then explicit flags
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(hot_folder) = self.hot_folder {
            config.hot_folder = hot_folder;
        }
        if let Some(server) = self.server {
            config.server_address = server;
        }
        if let Some(username) = self.username {
            config.username = username;
        }
        if let Some(password) = self.password {
            config.password = password;
        }
        if let Some(folder) = self.processing_folder {
            config.processing_folder = Some(folder);
        }
        if let Some(folder) = self.uploaded_folder {
            config.uploaded_folder = Some(folder);
        }
        if let Some(folder) = self.partial_folder {
            config.partial_folder = Some(folder);
        }
        if let Some(folder) = self.failed_folder {
            config.failed_folder = Some(folder);
        }
        if let Some(patterns) = self.patterns {
            config = config.with_patterns(&patterns);
        }
        if let Some(plugins) = self.plugins {
            config.plugins = plugins
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Some(secs) = self.polling_interval {
            config.polling_interval_secs = secs;
        }
        if let Some(secs) = self.quiet_period {
            config.quiet_period_secs = secs;
        }
        if let Some(n) = self.max_concurrent {
            config.max_concurrent_files = n;
        }
        if let Some(n) = self.max_attempts {
            config.max_connection_attempts = n;
        }
        if let Some(secs) = self.retry_delay {
            config.connection_retry_delay_secs = secs;
        }
        if let Some(mode) = self.overlap_mode {
            config.overlap_mode = mode.into();
        }
        if let Some(n) = self.max_files {
            config.max_files_processed = Some(n);
        }
        if let Some(secs) = self.max_idle {
            config.max_idle_secs = Some(secs);
        }
        if self.dry_run {
            config.dry_run = true;
        }

        Ok(config)
    }
}

/// Arguments for the check command
#[derive(Debug, Clone, Parser)]
pub struct CheckArgs {
    /// JSON configuration file
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Remote store server address
    #[arg(short = 's', long = "server", value_name = "URL")]
    pub server: Option<String>,

    /// Remote store username
    #[arg(long = "username", value_name = "NAME")]
    pub username: Option<String>,

    /// Remote store password
    #[arg(long = "password", value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Check against the built-in in-memory store instead of a live
    /// server
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_args(extra: &[&str]) -> ProcessArgs {
        let mut argv = vec!["fieldvisit-processor", "process"];
        argv.extend_from_slice(extra);
        match Args::parse_from(argv).command {
            Some(Commands::Process(args)) => args,
            other => panic!("expected process command, got {other:?}"),
        }
    }

    #[test]
    fn flags_overlay_defaults() {
        let args = process_args(&[
            "--hot-folder",
            "/data/hot",
            "--server",
            "https://hydro.example.org",
            "--patterns",
            "*.json,*.zip",
            "--overlap-mode",
            "strict",
            "--max-files",
            "10",
            "--dry-run",
        ]);
        let config = args.into_config().unwrap();

        assert_eq!(config.hot_folder, PathBuf::from("/data/hot"));
        assert_eq!(config.file_patterns, vec!["*.json", "*.zip"]);
        assert_eq!(config.overlap_mode, OverlapMode::Strict);
        assert_eq!(config.max_files_processed, Some(10));
        assert!(config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn state_folder_overrides_reach_the_config() {
        let args = process_args(&[
            "--uploaded-folder",
            "/archive/done",
            "--failed-folder",
            "/archive/bad",
        ]);
        let config = args.into_config().unwrap();

        assert_eq!(config.uploaded_folder, Some(PathBuf::from("/archive/done")));
        assert_eq!(config.failed_folder, Some(PathBuf::from("/archive/bad")));
        assert_eq!(config.processing_folder, None);
        assert_eq!(config.partial_folder, None);
    }

    #[test]
    fn plugin_list_splits_on_commas() {
        let args = process_args(&["--plugins", "json-field-data, json-field-data"]);
        let config = args.into_config().unwrap();
        assert_eq!(config.plugins.len(), 2);
    }
}
