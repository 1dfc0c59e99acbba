//! Hot-folder file discovery.
//!
//! Polling-based scan of the hot folder with a glob pattern filter and
//! a quiet-period debounce: a file still being written is skipped until
//! it has been unmodified for the configured delay.

use glob::Pattern;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Scanner for eligible files in the hot folder
#[derive(Debug)]
pub struct FileDiscovery {
    hot_folder: PathBuf,
    patterns: Vec<Pattern>,
    quiet_period: Duration,
}

impl FileDiscovery {
    /// Build a scanner from configuration; invalid glob patterns are a
    /// configuration error
    pub fn new(config: &Config) -> Result<Self> {
        let mut patterns = Vec::with_capacity(config.file_patterns.len());
        for raw in &config.file_patterns {
            let pattern = Pattern::new(raw)
                .map_err(|e| Error::configuration(format!("bad file pattern '{raw}': {e}")))?;
            patterns.push(pattern);
        }
        Ok(Self {
            hot_folder: config.hot_folder.clone(),
            patterns,
            quiet_period: config.quiet_period(),
        })
    }

    /// One scan pass: stable, pattern-matching files directly inside
    /// the hot folder, sorted by name for deterministic ordering.
    /// State folders are subdirectories and never descended into.
    pub async fn scan(&self) -> Result<Vec<PathBuf>> {
        let mut eligible = Vec::new();
        let now = SystemTime::now();

        let mut dir = fs::read_dir(&self.hot_folder).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if !file_type.is_file() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !self.patterns.iter().any(|p| p.matches(name)) {
                debug!("Skipping {} (no pattern match)", name);
                continue;
            }

            match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => {
                    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
                    if age < self.quiet_period {
                        debug!(
                            "Skipping {} (modified {:?} ago, quiet period {:?})",
                            name, age, self.quiet_period
                        );
                        continue;
                    }
                }
                Err(e) => {
                    // Probably vanished mid-scan; the claim will sort it out
                    warn!("Could not stat {}: {}", path.display(), e);
                    continue;
                }
            }

            eligible.push(path);
        }

        eligible.sort();
        Ok(eligible)
    }
}
