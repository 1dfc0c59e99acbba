//! Per-file processing pipeline.
//!
//! Runs one claimed file through chain dispatch, the merge session,
//! conflict screening, and per-visit upload, and classifies the
//! terminal outcome. Errors here are file-scoped: they decide this
//! file's fate and never abort sibling files.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::app::models::{
    Activity, FileRecord, FileState, LocationInfo, OverlapMode, ParseOutcome, TimeInterval, Visit,
};
use crate::app::services::archive::Attachment;
use crate::app::services::chain::ChainedParser;
use crate::app::services::conflict::ConflictDetector;
use crate::app::services::location_cache::LocationCache;
use crate::app::services::merge::MergeSession;
use crate::app::services::plugins::{FieldDataSink, ParseContext, PluginRegistry, VisitHandle};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::remote::RemoteStoreClient;

/// Sink for one parse session, wiring plugins to the merge engine and
/// the location cache
pub struct SessionSink {
    session: MergeSession,
    client: Arc<dyn RemoteStoreClient>,
    locations: Arc<LocationCache>,
    source: PathBuf,
}

impl SessionSink {
    pub fn new(
        overlap_mode: OverlapMode,
        client: Arc<dyn RemoteStoreClient>,
        locations: Arc<LocationCache>,
        source: PathBuf,
    ) -> Self {
        Self {
            session: MergeSession::new(overlap_mode),
            client,
            locations,
            source,
        }
    }

    /// Hand the accumulated session back for finalization
    pub fn into_session(self) -> MergeSession {
        self.session
    }
}

#[async_trait]
impl FieldDataSink for SessionSink {
    async fn add_visit(
        &mut self,
        location_identifier: &str,
        interval: TimeInterval,
    ) -> Result<VisitHandle> {
        let location = self
            .locations
            .get_by_identifier(self.client.as_ref(), location_identifier)
            .await?
            .ok_or_else(|| Error::UnknownLocation {
                identifier: location_identifier.to_string(),
                path: self.source.clone(),
            })?;
        self.session.attach_visit(&location, interval)
    }

    async fn add_activity(&mut self, visit: VisitHandle, activity: Activity) -> Result<()> {
        self.session.add_activity(visit, activity)
    }

    async fn set_party(&mut self, visit: VisitHandle, party: &str) -> Result<()> {
        self.session.set_party(visit, party)
    }

    async fn location_by_identifier(&self, identifier: &str) -> Result<Option<LocationInfo>> {
        Ok(self
            .locations
            .get_by_identifier(self.client.as_ref(), identifier)
            .await?)
    }

    async fn location_by_unique_id(&self, unique_id: &str) -> Result<Option<LocationInfo>> {
        Ok(self
            .locations
            .get_by_unique_id(self.client.as_ref(), unique_id)
            .await?)
    }
}

/// Terminal classification of one file's processing
#[derive(Debug)]
pub struct FilePipelineResult {
    pub outcome: FileState,
    pub visits_uploaded: usize,
    pub visits_skipped: usize,
    /// The error that failed the file, when it failed
    pub error: Option<Error>,
}

/// Stateless per-file pipeline shared across workers
pub struct ProcessingPipeline {
    registry: Arc<PluginRegistry>,
    client: Arc<dyn RemoteStoreClient>,
    locations: Arc<LocationCache>,
    overlap_mode: OverlapMode,
    dry_run: bool,
}

impl ProcessingPipeline {
    pub fn new(
        registry: Arc<PluginRegistry>,
        client: Arc<dyn RemoteStoreClient>,
        locations: Arc<LocationCache>,
        config: &Config,
    ) -> Self {
        Self {
            registry,
            client,
            locations,
            overlap_mode: config.overlap_mode,
            dry_run: config.dry_run,
        }
    }

    /// Process one claimed file to a terminal classification. Never
    /// returns Err; failures are folded into the result.
    pub async fn process_file(&self, record: &FileRecord) -> FilePipelineResult {
        match self.run(record).await {
            Ok(result) => result,
            Err(e) => FilePipelineResult {
                outcome: FileState::Failed,
                visits_uploaded: 0,
                visits_skipped: 0,
                error: Some(e),
            },
        }
    }

    async fn run(&self, record: &FileRecord) -> Result<FilePipelineResult> {
        let payload = fs::read(&record.path).await?;
        let file_name = record
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let context = ParseContext {
            file_name: file_name.clone(),
            location_hint: None,
        };

        let mut sink = SessionSink::new(
            self.overlap_mode,
            self.client.clone(),
            self.locations.clone(),
            record.path.clone(),
        );
        let chain = ChainedParser::parse(
            &self.registry,
            &payload,
            &context,
            &mut sink,
            &record.path,
        )
        .await?;

        match chain.outcome {
            ParseOutcome::CannotParse => {
                return Err(Error::CannotParse {
                    path: record.path.clone(),
                });
            }
            ParseOutcome::ParsedInvalid(reason) => {
                return Err(Error::ParsedInvalid {
                    plugin: chain.plugin.unwrap_or_else(|| "unknown".to_string()),
                    path: record.path.clone(),
                    reason,
                });
            }
            ParseOutcome::ParsedValid => {}
        }

        let visits = sink.into_session().finalize()?;
        if visits.is_empty() {
            return Err(Error::NoVisitsProduced {
                path: record.path.clone(),
            });
        }
        debug!("{}: {} finalized visit(s)", file_name, visits.len());

        let detector = ConflictDetector::new(self.client.clone());
        let mut uploaded = 0usize;
        let mut skipped = 0usize;
        let mut upload_failure: Option<Error> = None;
        let mut uploaded_visits: Vec<&Visit> = Vec::new();

        for visit in &visits {
            // Screen immediately before upload, never from a cache
            if detector.has_conflict(visit).await? {
                warn!(
                    "{}: visit at {} [{} .. {}) conflicts with an existing remote visit, withholding",
                    file_name,
                    visit.location.identifier,
                    visit.interval.start,
                    visit.interval.end
                );
                skipped += 1;
                continue;
            }

            if self.dry_run {
                info!(
                    "{}: dry run, would upload visit at {} with {} activities",
                    file_name,
                    visit.location.identifier,
                    visit.activity_count()
                );
                uploaded += 1;
                continue;
            }

            // One remote call per visit so one bad visit cannot block
            // its siblings
            match self.client.create_visit(visit).await {
                Ok(id) => {
                    info!(
                        "{}: uploaded visit {} at {} with {} activities",
                        file_name,
                        id,
                        visit.location.identifier,
                        visit.activity_count()
                    );
                    uploaded += 1;
                    uploaded_visits.push(visit);
                }
                Err(e) => {
                    error!(
                        "{}: upload failed for visit at {}: {}",
                        file_name, visit.location.identifier, e
                    );
                    if upload_failure.is_none() {
                        upload_failure = Some(e.into());
                    }
                }
            }
        }

        if !self.dry_run && !uploaded_visits.is_empty() {
            self.attach_side_cars(&file_name, uploaded_visits[0], &chain.attachments)
                .await?;
        }

        if let Some(e) = upload_failure {
            return Ok(FilePipelineResult {
                outcome: FileState::Failed,
                visits_uploaded: uploaded,
                visits_skipped: skipped,
                error: Some(e),
            });
        }

        let outcome = if skipped > 0 {
            FileState::PartialUpload
        } else {
            FileState::Uploaded
        };
        Ok(FilePipelineResult {
            outcome,
            visits_uploaded: uploaded,
            visits_skipped: skipped,
            error: None,
        })
    }

    /// Upload recorded archive attachments against the visit's location
    async fn attach_side_cars(
        &self,
        file_name: &str,
        visit: &Visit,
        attachments: &[Attachment],
    ) -> Result<()> {
        for attachment in attachments {
            let name = attachment
                .entry
                .path
                .rsplit('/')
                .next()
                .unwrap_or(&attachment.entry.path);
            self.client
                .attach_file(&visit.location.identifier, name, &attachment.content)
                .await?;
            debug!(
                "{}: attached '{}' ({} bytes) to {}",
                file_name,
                attachment.entry.path,
                attachment.entry.size,
                visit.location.identifier
            );
        }
        Ok(())
    }
}
