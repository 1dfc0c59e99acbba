//! Error handling for field visit processing operations.
//!
//! Provides error types with context for parsing, merging, file
//! lifecycle, and remote store failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::remote::RemoteStoreError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Plugin load error: {message}")]
    PluginLoad { message: String },

    #[error("No plugin recognized file: {path}")]
    CannotParse { path: PathBuf },

    #[error("Plugin '{plugin}' rejected file {path}: {reason}")]
    ParsedInvalid {
        plugin: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Archive error in {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error(
        "Attachment '{entry}' declares {size} bytes, exceeding the {limit} byte in-memory limit"
    )]
    AttachmentTooLarge {
        entry: String,
        size: u64,
        limit: u64,
    },

    #[error("File {path} parsed cleanly but produced no visits")]
    NoVisitsProduced { path: PathBuf },

    #[error("Merge session already finalized; no further activities may be added")]
    FinalizeAlreadyCalled,

    #[error("Unknown location '{identifier}' referenced by {path}")]
    UnknownLocation { identifier: String, path: PathBuf },

    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteStoreError),

    #[error("Connection to {address} failed after {attempts} attempts")]
    ConnectionExhausted { address: String, attempts: u32 },

    #[error("Server version {found} is below the minimum supported {minimum}")]
    IncompatibleServerVersion { found: String, minimum: String },

    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a plugin load error
    pub fn plugin_load(message: impl Into<String>) -> Self {
        Self::PluginLoad {
            message: message.into(),
        }
    }

    /// Create a processing interrupted error
    pub fn processing_interrupted(reason: impl Into<String>) -> Self {
        Self::ProcessingInterrupted {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
