//! Visit merge engine.
//!
//! Defers visit materialization for one parse session so that multiple
//! parsed fragments with overlapping windows collapse into a single
//! logical visit. Activities parsed late in a session can retroactively
//! join a visit created earlier, which an eager-append design could not
//! do without a second pass.

#[cfg(test)]
pub mod tests;

use tracing::debug;

use crate::app::models::{Activity, LocationInfo, OverlapMode, TimeInterval, Visit};
use crate::app::services::plugins::VisitHandle;
use crate::error::{Error, Result};

/// A visit that has been reported but not yet materialized
#[derive(Debug, Clone)]
struct PendingVisit {
    location: LocationInfo,
    interval: TimeInterval,
    activities: Vec<Activity>,
    party: Option<String>,
}

/// One parse session's working set of pending visits.
///
/// Owned exclusively by the session for the duration of one file's
/// parse; `finalize` converts the set into permanent visits exactly
/// once, in the order the pending visits were first created.
#[derive(Debug)]
pub struct MergeSession {
    pending: Vec<PendingVisit>,
    overlap_mode: OverlapMode,
    finalized: bool,
}

impl MergeSession {
    pub fn new(overlap_mode: OverlapMode) -> Self {
        Self {
            pending: Vec::new(),
            overlap_mode,
            finalized: false,
        }
    }

    /// Attach a visit fragment.
    ///
    /// When a pending visit at the same location overlaps the candidate
    /// window (per the configured overlap mode), the fragment joins it
    /// and the pending window widens to cover the candidate; otherwise
    /// a new pending visit is registered.
    pub fn attach_visit(
        &mut self,
        location: &LocationInfo,
        interval: TimeInterval,
    ) -> Result<VisitHandle> {
        if self.finalized {
            return Err(Error::FinalizeAlreadyCalled);
        }

        for (index, pending) in self.pending.iter_mut().enumerate() {
            if pending.location.identifier != location.identifier {
                continue;
            }
            let overlaps = match self.overlap_mode {
                OverlapMode::Strict => pending.interval.overlaps(&interval),
                OverlapMode::WholeDay => pending.interval.overlaps_whole_day(&interval),
            };
            if overlaps {
                pending.interval.widen(interval.start);
                pending.interval.widen(interval.end);
                debug!(
                    "Merged visit fragment at {} into pending visit {} ({} -> {})",
                    location.identifier, index, pending.interval.start, pending.interval.end
                );
                return Ok(VisitHandle(index));
            }
        }

        self.pending.push(PendingVisit {
            location: location.clone(),
            interval,
            activities: Vec::new(),
            party: None,
        });
        debug!(
            "Registered pending visit {} at {} [{} .. {})",
            self.pending.len() - 1,
            location.identifier,
            interval.start,
            interval.end
        );
        Ok(VisitHandle(self.pending.len() - 1))
    }

    /// Append an activity and widen the owning visit's interval over
    /// every concrete timestamp the activity carries. Unknown
    /// (missing) timestamps are ignored.
    pub fn add_activity(&mut self, handle: VisitHandle, activity: Activity) -> Result<()> {
        if self.finalized {
            return Err(Error::FinalizeAlreadyCalled);
        }
        let pending = self
            .pending
            .get_mut(handle.0)
            .ok_or_else(|| Error::configuration(format!("unknown visit handle {}", handle.0)))?;

        for timestamp in activity.timestamps() {
            pending.interval.widen(timestamp);
        }
        pending.activities.push(activity);
        Ok(())
    }

    /// Record the field party for a pending visit; first report wins
    pub fn set_party(&mut self, handle: VisitHandle, party: &str) -> Result<()> {
        if self.finalized {
            return Err(Error::FinalizeAlreadyCalled);
        }
        let pending = self
            .pending
            .get_mut(handle.0)
            .ok_or_else(|| Error::configuration(format!("unknown visit handle {}", handle.0)))?;
        if pending.party.is_none() {
            pending.party = Some(party.to_string());
        }
        Ok(())
    }

    /// Number of pending visits accumulated so far
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Convert every pending visit into the permanent result list, in
    /// creation order. May be called once; no further merging occurs
    /// afterwards.
    pub fn finalize(&mut self) -> Result<Vec<Visit>> {
        if self.finalized {
            return Err(Error::FinalizeAlreadyCalled);
        }
        self.finalized = true;

        let visits = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|pending| Visit {
                location: pending.location,
                interval: pending.interval,
                activities: pending.activities,
                party: pending.party,
            })
            .collect();
        Ok(visits)
    }
}
