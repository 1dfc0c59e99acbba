//! Conflict detection against the remote store.
//!
//! Screens each finalized visit immediately before upload so a visit
//! window that already exists remotely is flagged instead of uploaded.
//! Results are never cached across a file's processing, keeping the
//! race window against concurrent uploaders small.

use std::sync::Arc;
use tracing::debug;

use crate::app::models::Visit;
use crate::error::Result;
use crate::remote::RemoteStoreClient;

/// Read-only, idempotent pre-upload conflict check
pub struct ConflictDetector {
    client: Arc<dyn RemoteStoreClient>,
}

impl ConflictDetector {
    pub fn new(client: Arc<dyn RemoteStoreClient>) -> Self {
        Self { client }
    }

    /// True when any existing remote visit overlaps the closed
    /// day-range of this visit's window at its location
    pub async fn has_conflict(&self, visit: &Visit) -> Result<bool> {
        let (day_start, day_end) = visit.interval.day_span();
        let existing = self
            .client
            .visits_in_range(&visit.location.identifier, day_start, day_end)
            .await?;

        if let Some(first) = existing.first() {
            debug!(
                "Conflict at {}: existing visit {} [{} .. {}] overlaps [{} .. {}]",
                visit.location.identifier,
                first.id,
                first.start,
                first.end,
                visit.interval.start,
                visit.interval.end
            );
        }
        Ok(!existing.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{LocationInfo, TimeInterval};
    use crate::remote::memory::InMemoryRemoteStore;
    use chrono::{TimeZone, Utc};

    fn location() -> LocationInfo {
        LocationInfo {
            identifier: "LOC-1".to_string(),
            unique_id: "uid-1".to_string(),
            name: "Gauge One".to_string(),
            utc_offset_hours: 0.0,
        }
    }

    fn visit_between(h1: u32, h2: u32) -> Visit {
        Visit {
            location: location(),
            interval: TimeInterval::new(
                Utc.with_ymd_and_hms(2024, 3, 1, h1, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 1, h2, 0, 0).unwrap(),
            ),
            activities: Vec::new(),
            party: None,
        }
    }

    #[tokio::test]
    async fn no_existing_visits_means_no_conflict() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let detector = ConflictDetector::new(store);
        assert!(!detector.has_conflict(&visit_between(8, 10)).await.unwrap());
    }

    #[tokio::test]
    async fn exact_window_match_is_a_conflict() {
        let store = Arc::new(InMemoryRemoteStore::new());
        store.seed_visit(visit_between(8, 10));
        let detector = ConflictDetector::new(store);
        assert!(detector.has_conflict(&visit_between(8, 10)).await.unwrap());
    }

    #[tokio::test]
    async fn same_day_different_hours_still_conflicts() {
        // The day-range query deliberately widens the window to the
        // whole calendar day
        let store = Arc::new(InMemoryRemoteStore::new());
        store.seed_visit(visit_between(6, 7));
        let detector = ConflictDetector::new(store);
        assert!(detector.has_conflict(&visit_between(14, 15)).await.unwrap());
    }

    #[tokio::test]
    async fn other_location_does_not_conflict() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let mut other = visit_between(8, 10);
        other.location.identifier = "LOC-2".to_string();
        store.seed_visit(other);
        let detector = ConflictDetector::new(store);
        assert!(!detector.has_conflict(&visit_between(8, 10)).await.unwrap());
    }
}
