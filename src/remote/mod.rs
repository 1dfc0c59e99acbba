//! Remote time-series store collaborator interface.
//!
//! The processor talks to the remote store exclusively through
//! [`RemoteStoreClient`], so the concrete transport stays swappable and
//! the pipeline is testable against the in-memory implementation.

pub mod memory;
pub mod resilience;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::app::models::{LocationInfo, Visit};

/// Errors reported by the remote store collaborator.
///
/// "Not found", "ambiguous match" and transport/version failures must
/// stay distinguishable so callers can route them differently.
#[derive(Error, Debug)]
pub enum RemoteStoreError {
    #[error("no match for {kind} '{value}'")]
    NotFound { kind: String, value: String },

    #[error("ambiguous match for {kind} '{value}': {count} candidates")]
    AmbiguousMatch {
        kind: String,
        value: String,
        count: usize,
    },

    #[error("transport failure: {message}")]
    Transport { message: String },

    #[error("server version '{version}' could not be interpreted")]
    IncompatibleVersion { version: String },
}

impl RemoteStoreError {
    pub fn not_found(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// A visit that already exists at the remote store, as returned by
/// range queries
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingVisit {
    pub id: String,
    pub location_identifier: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub activity_count: usize,
}

/// One entry of the remote parameter vocabulary
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub id: String,
    pub display_name: String,
    pub unit: String,
}

/// Contract with the remote time-series store.
///
/// Read operations are idempotent. Write operations report the
/// server-assigned id of the created record.
#[async_trait]
pub trait RemoteStoreClient: Send + Sync {
    /// Establish (or verify) the connection using the configured
    /// credentials
    async fn connect(&self) -> Result<(), RemoteStoreError>;

    /// Remote server version string, e.g. "2021.4"
    async fn server_version(&self) -> Result<String, RemoteStoreError>;

    /// Resolve a location by its human-assigned identifier
    async fn location_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<LocationInfo, RemoteStoreError>;

    /// Resolve a location by its server-assigned unique id
    async fn location_by_unique_id(&self, unique_id: &str)
    -> Result<LocationInfo, RemoteStoreError>;

    /// Visits already recorded for a location within [from, to]
    async fn visits_in_range(
        &self,
        location_identifier: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExistingVisit>, RemoteStoreError>;

    /// Known parameter vocabulary
    async fn parameters(&self) -> Result<Vec<ParameterInfo>, RemoteStoreError>;

    /// Create a visit record, returning its server-assigned id
    async fn create_visit(&self, visit: &Visit) -> Result<String, RemoteStoreError>;

    /// Attach a raw payload to a location, e.g. an archive side-car
    async fn attach_file(
        &self,
        location_identifier: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<(), RemoteStoreError>;
}

/// Pick the remote client for a configuration.
///
/// Dry runs get the permissive in-memory store so files can be parsed
/// and merged offline. Live uploads need a deployment-provided
/// transport driven through [`crate::processor::HotFolderProcessor`]
/// directly.
pub fn client_for(
    config: &crate::config::Config,
) -> crate::error::Result<Arc<dyn RemoteStoreClient>> {
    use crate::error::Error;
    if config.dry_run {
        Ok(Arc::new(
            memory::InMemoryRemoteStore::new().with_permissive_locations(),
        ))
    } else {
        Err(Error::configuration(
            "no remote transport is built into this binary; run with --dry-run for offline \
             verification, or drive HotFolderProcessor with a RemoteStoreClient implementation",
        ))
    }
}
