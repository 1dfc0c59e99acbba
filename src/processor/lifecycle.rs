//! File lifecycle state machine.
//!
//! Each hot-folder file moves Discovered → Processing → one of
//! {Uploaded, PartialUpload, Failed} by physical relocation into the
//! folder representing the new state. The initial move doubles as a
//! mutual-exclusion lock: a failed claim means another actor already
//! owns the file.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::app::models::{FileRecord, FileState};
use crate::config::Config;
use crate::constants::{FAILED_FOLDER, PARTIAL_FOLDER, PROCESSING_FOLDER, UPLOADED_FOLDER};
use crate::error::Result;

/// Result of attempting to claim a discovered file
#[derive(Debug)]
pub enum ClaimOutcome {
    /// File is now in the Processing folder and owned by this worker
    Claimed(FileRecord),
    /// File vanished or is locked; another actor may be handling it
    AlreadyTaken,
}

/// The state folders a file moves through
#[derive(Debug, Clone)]
pub struct StateFolders {
    processing: PathBuf,
    uploaded: PathBuf,
    partial: PathBuf,
    failed: PathBuf,
}

impl StateFolders {
    /// Derive the folder layout from configuration. Each state folder
    /// may be overridden explicitly; otherwise it nests under the hot
    /// folder with the default name.
    pub fn new(config: &Config) -> Self {
        let root = &config.hot_folder;
        let resolve = |explicit: &Option<PathBuf>, default_name: &str| {
            explicit
                .clone()
                .unwrap_or_else(|| root.join(default_name))
        };
        Self {
            processing: resolve(&config.processing_folder, PROCESSING_FOLDER),
            uploaded: resolve(&config.uploaded_folder, UPLOADED_FOLDER),
            partial: resolve(&config.partial_folder, PARTIAL_FOLDER),
            failed: resolve(&config.failed_folder, FAILED_FOLDER),
        }
    }

    /// Create every state folder that does not exist yet
    pub async fn ensure_exist(&self) -> Result<()> {
        for folder in [&self.processing, &self.uploaded, &self.partial, &self.failed] {
            fs::create_dir_all(folder).await?;
        }
        Ok(())
    }

    /// Folder representing a state. Only Processing and the terminal
    /// states have folders; Discovered files live in the hot folder.
    pub fn folder_for(&self, state: FileState) -> &Path {
        match state {
            FileState::Processing | FileState::Discovered => &self.processing,
            FileState::Uploaded => &self.uploaded,
            FileState::PartialUpload => &self.partial,
            FileState::Failed => &self.failed,
        }
    }

    /// Claim a discovered file by moving it into Processing.
    ///
    /// The rename is atomic on the same filesystem, so exactly one
    /// claimant wins; losing the race is silent and not an error.
    pub async fn claim(&self, path: &Path) -> Result<ClaimOutcome> {
        let destination = next_free_path(&self.processing, path).await?;
        match fs::rename(path, &destination).await {
            Ok(()) => {
                debug!("Claimed {} as {}", path.display(), destination.display());
                Ok(ClaimOutcome::Claimed(FileRecord {
                    path: destination,
                    state: FileState::Processing,
                }))
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
                ) =>
            {
                debug!("Could not claim {}: {}", path.display(), e);
                Ok(ClaimOutcome::AlreadyTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Move a claimed file to the folder of its new state
    pub async fn transition(&self, record: &mut FileRecord, state: FileState) -> Result<()> {
        let destination = next_free_path(self.folder_for(state), &record.path).await?;
        fs::rename(&record.path, &destination).await?;
        debug!(
            "{} -> {:?} at {}",
            record.path.display(),
            state,
            destination.display()
        );
        record.path = destination;
        record.state = state;
        Ok(())
    }
}

/// First collision-free destination for a file name inside a folder:
/// `name.ext`, then `name (1).ext`, `name (2).ext`, ...
async fn next_free_path(folder: &Path, source: &Path) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");
    let extension = source.extension().and_then(|e| e.to_str());

    let mut candidate = folder.join(source.file_name().unwrap_or_default());
    let mut suffix = 0u32;
    while fs::try_exists(&candidate).await? {
        suffix += 1;
        let name = match extension {
            Some(ext) => format!("{stem} ({suffix}).{ext}"),
            None => format!("{stem} ({suffix})"),
        };
        candidate = folder.join(name);
    }
    Ok(candidate)
}
