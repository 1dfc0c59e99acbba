//! Location metadata cache.
//!
//! Read-mostly, write-once-per-key cache in front of the remote
//! store's location lookups. Safe for concurrent workers; racing
//! redundant population of the same key is tolerated.

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::app::models::LocationInfo;
use crate::remote::{RemoteStoreClient, RemoteStoreError};

/// Lazily populated location lookup cache
#[derive(Debug, Default)]
pub struct LocationCache {
    by_identifier: RwLock<HashMap<String, LocationInfo>>,
    by_unique_id: RwLock<HashMap<String, LocationInfo>>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve by identifier, hitting the remote store on a miss.
    /// "Not found" is `Ok(None)`; ambiguous matches and transport
    /// failures propagate.
    pub async fn get_by_identifier(
        &self,
        client: &dyn RemoteStoreClient,
        identifier: &str,
    ) -> Result<Option<LocationInfo>, RemoteStoreError> {
        if let Some(cached) = self
            .by_identifier
            .read()
            .expect("location cache poisoned")
            .get(identifier)
        {
            return Ok(Some(cached.clone()));
        }

        match client.location_by_identifier(identifier).await {
            Ok(location) => {
                debug!("Caching location '{}'", identifier);
                self.store(&location);
                Ok(Some(location))
            }
            Err(RemoteStoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve by server-assigned unique id
    pub async fn get_by_unique_id(
        &self,
        client: &dyn RemoteStoreClient,
        unique_id: &str,
    ) -> Result<Option<LocationInfo>, RemoteStoreError> {
        if let Some(cached) = self
            .by_unique_id
            .read()
            .expect("location cache poisoned")
            .get(unique_id)
        {
            return Ok(Some(cached.clone()));
        }

        match client.location_by_unique_id(unique_id).await {
            Ok(location) => {
                self.store(&location);
                Ok(Some(location))
            }
            Err(RemoteStoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&self, location: &LocationInfo) {
        self.by_identifier
            .write()
            .expect("location cache poisoned")
            .entry(location.identifier.clone())
            .or_insert_with(|| location.clone());
        self.by_unique_id
            .write()
            .expect("location cache poisoned")
            .entry(location.unique_id.clone())
            .or_insert_with(|| location.clone());
    }

    /// Number of identifiers currently cached
    pub fn len(&self) -> usize {
        self.by_identifier
            .read()
            .expect("location cache poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
