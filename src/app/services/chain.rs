//! Chained plugin dispatch.
//!
//! Offers a payload to every registered plugin in priority order,
//! unwrapping the primary+attachments archive convention when no
//! plugin claims the raw bytes, and applying the all-or-nothing rule
//! to multi-entry containers.

use std::path::Path;
use tracing::debug;

use crate::app::models::ParseOutcome;
use crate::app::services::archive::{self, Attachment, Unwrapped};
use crate::app::services::plugins::{FieldDataSink, ParseContext, PluginRegistry};
use crate::error::Result;

/// Aggregated outcome of one chain dispatch
#[derive(Debug)]
pub struct ChainResult {
    pub outcome: ParseOutcome,
    /// Name of the plugin that settled the outcome, when one did
    pub plugin: Option<String>,
    /// Side-car attachments recorded during archive unwrapping;
    /// recorded, never parsed
    pub attachments: Vec<Attachment>,
}

impl ChainResult {
    fn bare(outcome: ParseOutcome, plugin: Option<String>) -> Self {
        Self {
            outcome,
            plugin,
            attachments: Vec::new(),
        }
    }
}

/// Dispatcher that tries multiple independent parsers against one
/// payload
pub struct ChainedParser;

impl ChainedParser {
    /// Offer a payload to the chain.
    ///
    /// Order: direct parse first (a plugin may claim an archive it
    /// understands natively), then archive unwrapping with a retry on
    /// the primary entry. When both attempts fail, the archive-side
    /// outcome takes precedence as the more specific interpretation.
    pub async fn parse(
        registry: &PluginRegistry,
        payload: &[u8],
        context: &ParseContext,
        sink: &mut dyn FieldDataSink,
        source: &Path,
    ) -> Result<ChainResult> {
        let direct = offer_to_all(registry, payload, context, sink).await?;
        if direct.0 == ParseOutcome::ParsedValid {
            return Ok(ChainResult::bare(direct.0, direct.1));
        }

        match archive::unwrap(payload, source)? {
            Unwrapped::PrimaryWithAttachments {
                primary_name,
                primary,
                attachments,
            } => {
                debug!(
                    "{}: no plugin claimed raw payload, retrying on primary '{}'",
                    context.file_name, primary_name
                );
                let inner_context = ParseContext {
                    file_name: format!("{}:{}", context.file_name, primary_name),
                    location_hint: context.location_hint.clone(),
                };
                let (outcome, plugin) =
                    offer_to_all(registry, &primary, &inner_context, sink).await?;
                Ok(ChainResult {
                    attachments: if outcome == ParseOutcome::ParsedValid {
                        attachments
                    } else {
                        Vec::new()
                    },
                    outcome,
                    plugin,
                })
            }
            Unwrapped::MultiEntry(entries) => {
                parse_container(registry, entries, context, sink).await
            }
            Unwrapped::NotAnArchive => Ok(ChainResult::bare(direct.0, direct.1)),
        }
    }
}

/// Offer a container's entries to the whole chain, entry by entry.
///
/// Every entry must be claimed by some plugin for the container to
/// succeed; one unclaimed entry fails the whole container so sibling
/// data is never silently dropped.
async fn parse_container(
    registry: &PluginRegistry,
    entries: Vec<(String, Vec<u8>)>,
    context: &ParseContext,
    sink: &mut dyn FieldDataSink,
) -> Result<ChainResult> {
    let total = entries.len();
    for (index, (name, content)) in entries.into_iter().enumerate() {
        let entry_context = ParseContext {
            file_name: format!("{}:{}", context.file_name, name),
            location_hint: context.location_hint.clone(),
        };
        let (outcome, plugin) = offer_to_all(registry, &content, &entry_context, sink).await?;
        match outcome {
            ParseOutcome::ParsedValid => {
                debug!(
                    "{}: container entry {}/{} '{}' claimed by {:?}",
                    context.file_name,
                    index + 1,
                    total,
                    name,
                    plugin
                );
            }
            ParseOutcome::CannotParse => {
                debug!(
                    "{}: container entry '{}' unclaimed, failing whole container",
                    context.file_name, name
                );
                return Ok(ChainResult::bare(ParseOutcome::CannotParse, None));
            }
            invalid @ ParseOutcome::ParsedInvalid(_) => {
                return Ok(ChainResult::bare(invalid, plugin));
            }
        }
    }
    Ok(ChainResult::bare(ParseOutcome::ParsedValid, None))
}

/// Offer one payload to each plugin in priority order until one claims
/// it. `ParsedInvalid` stops the chain; `CannotParse` moves on.
async fn offer_to_all(
    registry: &PluginRegistry,
    payload: &[u8],
    context: &ParseContext,
    sink: &mut dyn FieldDataSink,
) -> Result<(ParseOutcome, Option<String>)> {
    for plugin in registry.plugins() {
        match plugin.parse(payload, context, sink).await? {
            ParseOutcome::CannotParse => continue,
            outcome => return Ok((outcome, Some(plugin.name().to_string()))),
        }
    }
    Ok((ParseOutcome::CannotParse, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{Activity, LocationInfo, TimeInterval};
    use crate::app::services::plugins::{FieldDataPlugin, VisitHandle};
    use async_trait::async_trait;
    use std::io::{Cursor, Write};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use zip::write::SimpleFileOptions;

    /// Sink that only counts what plugins report
    #[derive(Default)]
    struct RecordingSink {
        visits: usize,
        activities: usize,
    }

    #[async_trait]
    impl FieldDataSink for RecordingSink {
        async fn add_visit(
            &mut self,
            _location_identifier: &str,
            _interval: TimeInterval,
        ) -> Result<VisitHandle> {
            self.visits += 1;
            Ok(VisitHandle(self.visits - 1))
        }

        async fn add_activity(&mut self, _visit: VisitHandle, _activity: Activity) -> Result<()> {
            self.activities += 1;
            Ok(())
        }

        async fn set_party(&mut self, _visit: VisitHandle, _party: &str) -> Result<()> {
            Ok(())
        }

        async fn location_by_identifier(
            &self,
            _identifier: &str,
        ) -> Result<Option<LocationInfo>> {
            Ok(None)
        }

        async fn location_by_unique_id(&self, _unique_id: &str) -> Result<Option<LocationInfo>> {
            Ok(None)
        }
    }

    /// Plugin claiming payloads that start with a fixed magic prefix
    struct PrefixPlugin {
        name: &'static str,
        prefix: &'static [u8],
        attempts: Arc<AtomicUsize>,
    }

    impl PrefixPlugin {
        fn new(name: &'static str, prefix: &'static [u8]) -> Self {
            Self {
                name,
                prefix,
                attempts: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl FieldDataPlugin for PrefixPlugin {
        fn name(&self) -> &str {
            self.name
        }

        async fn parse(
            &self,
            payload: &[u8],
            _context: &ParseContext,
            sink: &mut dyn FieldDataSink,
        ) -> Result<ParseOutcome> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if !payload.starts_with(self.prefix) {
                return Ok(ParseOutcome::CannotParse);
            }
            let handle = sink
                .add_visit(
                    "LOC-1",
                    TimeInterval::instant(chrono::Utc::now()),
                )
                .await?;
            sink.add_activity(
                handle,
                Activity::Inspection {
                    time: None,
                    notes: None,
                },
            )
            .await?;
            Ok(ParseOutcome::ParsedValid)
        }
    }

    /// Plugin that claims a prefix but always reports invalid structure
    struct RejectingPlugin {
        prefix: &'static [u8],
    }

    #[async_trait]
    impl FieldDataPlugin for RejectingPlugin {
        fn name(&self) -> &str {
            "rejecting"
        }

        async fn parse(
            &self,
            payload: &[u8],
            _context: &ParseContext,
            _sink: &mut dyn FieldDataSink,
        ) -> Result<ParseOutcome> {
            if payload.starts_with(self.prefix) {
                Ok(ParseOutcome::ParsedInvalid("bad structure".to_string()))
            } else {
                Ok(ParseOutcome::CannotParse)
            }
        }
    }

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn context() -> ParseContext {
        ParseContext {
            file_name: "test.dat".to_string(),
            location_hint: None,
        }
    }

    #[tokio::test]
    async fn outcome_is_independent_of_earlier_cannot_parse_plugins() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(PrefixPlugin::new("first", b"AAAA")));
        registry.register(Arc::new(PrefixPlugin::new("second", b"BBBB")));
        let claiming = Arc::new(PrefixPlugin::new("third", b"MAGIC"));
        registry.register(claiming.clone());

        let mut sink = RecordingSink::default();
        let result = ChainedParser::parse(
            &registry,
            b"MAGIC payload",
            &context(),
            &mut sink,
            Path::new("test.dat"),
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, ParseOutcome::ParsedValid);
        assert_eq!(result.plugin.as_deref(), Some("third"));
        assert_eq!(sink.visits, 1);
    }

    #[tokio::test]
    async fn unrecognized_payload_is_cannot_parse() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(PrefixPlugin::new("only", b"MAGIC")));

        let mut sink = RecordingSink::default();
        let result = ChainedParser::parse(
            &registry,
            b"something else entirely",
            &context(),
            &mut sink,
            Path::new("test.dat"),
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, ParseOutcome::CannotParse);
        assert!(result.plugin.is_none());
    }

    #[tokio::test]
    async fn archive_primary_is_retried_and_attachments_recorded() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(PrefixPlugin::new("only", b"MAGIC")));

        let payload = build_zip(&[
            ("visit.dat", b"MAGIC inner"),
            ("attachments/photo.jpg", b"jpeg"),
        ]);

        let mut sink = RecordingSink::default();
        let result = ChainedParser::parse(
            &registry,
            &payload,
            &context(),
            &mut sink,
            Path::new("test.zip"),
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, ParseOutcome::ParsedValid);
        assert_eq!(result.attachments.len(), 1);
        assert_eq!(result.attachments[0].entry.path, "attachments/photo.jpg");
        assert_eq!(sink.visits, 1);
    }

    #[tokio::test]
    async fn archive_side_error_takes_precedence_over_direct() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(RejectingPlugin { prefix: b"MAGIC" }));

        // Raw payload is unclaimed; the unwrapped primary is claimed
        // but structurally invalid, and that error must surface
        let payload = build_zip(&[
            ("visit.dat", b"MAGIC broken"),
            ("attachments/notes.txt", b"notes"),
        ]);

        let mut sink = RecordingSink::default();
        let result = ChainedParser::parse(
            &registry,
            &payload,
            &context(),
            &mut sink,
            Path::new("test.zip"),
        )
        .await
        .unwrap();

        assert_eq!(
            result.outcome,
            ParseOutcome::ParsedInvalid("bad structure".to_string())
        );
        assert!(result.attachments.is_empty());
    }

    #[tokio::test]
    async fn container_with_unclaimed_entry_fails_whole_container() {
        let mut registry = PluginRegistry::new();
        let plugin = Arc::new(PrefixPlugin::new("p1", b"MAGIC"));
        registry.register(plugin.clone());

        let payload = build_zip(&[
            ("one.dat", b"MAGIC first"),
            ("two.dat", b"MAGIC second"),
            ("three.dat", b"unclaimed bytes"),
        ]);

        let mut sink = RecordingSink::default();
        let result = ChainedParser::parse(
            &registry,
            &payload,
            &context(),
            &mut sink,
            Path::new("container.zip"),
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, ParseOutcome::CannotParse);
    }

    #[tokio::test]
    async fn container_with_all_entries_claimed_succeeds() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(PrefixPlugin::new("p1", b"MAGIC")));

        let payload = build_zip(&[("one.dat", b"MAGIC first"), ("two.dat", b"MAGIC second")]);

        let mut sink = RecordingSink::default();
        let result = ChainedParser::parse(
            &registry,
            &payload,
            &context(),
            &mut sink,
            Path::new("container.zip"),
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, ParseOutcome::ParsedValid);
        assert_eq!(sink.visits, 2);
    }
}
