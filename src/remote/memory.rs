//! In-memory remote store.
//!
//! Implements [`RemoteStoreClient`] over process-local maps. Backs the
//! pipeline and merge tests, and gives `--dry-run` verification a
//! target that never touches a real server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::app::models::{LocationInfo, Visit};
use crate::remote::{ExistingVisit, ParameterInfo, RemoteStoreClient, RemoteStoreError};

/// Process-local [`RemoteStoreClient`] implementation
#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    version: Option<String>,
    fail_connect: bool,
    permissive_locations: bool,
    upload_delay: Option<std::time::Duration>,
    connect_attempts: AtomicU32,
    locations: Mutex<HashMap<String, LocationInfo>>,
    visits: Mutex<Vec<StoredVisit>>,
    parameters: Mutex<Vec<ParameterInfo>>,
    attachments: Mutex<Vec<(String, String)>>,
    next_id: AtomicU32,
}

#[derive(Debug, Clone)]
struct StoredVisit {
    id: String,
    visit: Visit,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the reported server version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Make every connect attempt fail with a transport error
    pub fn with_failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Fabricate metadata for any requested location instead of
    /// requiring registration. Offline dry-run verification uses this
    /// so documents can be parsed without a live server's location
    /// list.
    pub fn with_permissive_locations(mut self) -> Self {
        self.permissive_locations = true;
        self
    }

    /// Make every visit upload take this long, simulating a slow
    /// server
    pub fn with_upload_delay(mut self, delay: std::time::Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    /// Register a known location
    pub fn with_location(self, location: LocationInfo) -> Self {
        self.locations
            .lock()
            .expect("location map poisoned")
            .insert(location.identifier.clone(), location);
        self
    }

    /// Register the parameter vocabulary
    pub fn with_parameters(self, parameters: Vec<ParameterInfo>) -> Self {
        *self.parameters.lock().expect("parameter list poisoned") = parameters;
        self
    }

    /// Seed a pre-existing visit, as if another uploader created it
    pub fn seed_visit(&self, visit: Visit) {
        let id = format!("seeded-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.visits
            .lock()
            .expect("visit list poisoned")
            .push(StoredVisit { id, visit });
    }

    /// Number of connect calls observed
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored visit, in creation order
    pub fn stored_visits(&self) -> Vec<Visit> {
        self.visits
            .lock()
            .expect("visit list poisoned")
            .iter()
            .map(|s| s.visit.clone())
            .collect()
    }

    /// Attached (location, file name) pairs, in upload order
    pub fn attached_files(&self) -> Vec<(String, String)> {
        self.attachments
            .lock()
            .expect("attachment list poisoned")
            .clone()
    }
}

#[async_trait]
impl RemoteStoreClient for InMemoryRemoteStore {
    async fn connect(&self) -> Result<(), RemoteStoreError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(RemoteStoreError::transport("connection refused"));
        }
        Ok(())
    }

    async fn server_version(&self) -> Result<String, RemoteStoreError> {
        Ok(self.version.clone().unwrap_or_else(|| "2021.4".to_string()))
    }

    async fn location_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<LocationInfo, RemoteStoreError> {
        if let Some(location) = self
            .locations
            .lock()
            .expect("location map poisoned")
            .get(identifier)
        {
            return Ok(location.clone());
        }
        if self.permissive_locations {
            return Ok(LocationInfo {
                identifier: identifier.to_string(),
                unique_id: format!("uid-{identifier}"),
                name: identifier.to_string(),
                utc_offset_hours: 0.0,
            });
        }
        Err(RemoteStoreError::not_found(
            "location identifier",
            identifier,
        ))
    }

    async fn location_by_unique_id(
        &self,
        unique_id: &str,
    ) -> Result<LocationInfo, RemoteStoreError> {
        let locations = self.locations.lock().expect("location map poisoned");
        let matches: Vec<_> = locations
            .values()
            .filter(|l| l.unique_id == unique_id)
            .collect();
        match matches.len() {
            0 => Err(RemoteStoreError::not_found("location unique id", unique_id)),
            1 => Ok(matches[0].clone()),
            count => Err(RemoteStoreError::AmbiguousMatch {
                kind: "location unique id".to_string(),
                value: unique_id.to_string(),
                count,
            }),
        }
    }

    async fn visits_in_range(
        &self,
        location_identifier: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExistingVisit>, RemoteStoreError> {
        let visits = self.visits.lock().expect("visit list poisoned");
        Ok(visits
            .iter()
            .filter(|s| {
                s.visit.location.identifier == location_identifier
                    && s.visit.interval.start <= to
                    && s.visit.interval.end >= from
            })
            .map(|s| ExistingVisit {
                id: s.id.clone(),
                location_identifier: s.visit.location.identifier.clone(),
                start: s.visit.interval.start,
                end: s.visit.interval.end,
                activity_count: s.visit.activities.len(),
            })
            .collect())
    }

    async fn parameters(&self) -> Result<Vec<ParameterInfo>, RemoteStoreError> {
        Ok(self.parameters.lock().expect("parameter list poisoned").clone())
    }

    async fn create_visit(&self, visit: &Visit) -> Result<String, RemoteStoreError> {
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        let id = format!("visit-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.visits
            .lock()
            .expect("visit list poisoned")
            .push(StoredVisit {
                id: id.clone(),
                visit: visit.clone(),
            });
        Ok(id)
    }

    async fn attach_file(
        &self,
        location_identifier: &str,
        file_name: &str,
        _content: &[u8],
    ) -> Result<(), RemoteStoreError> {
        self.attachments
            .lock()
            .expect("attachment list poisoned")
            .push((location_identifier.to_string(), file_name.to_string()));
        Ok(())
    }
}
