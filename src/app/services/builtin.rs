//! Built-in JSON field data plugin.
//!
//! Claims UTF-8 JSON documents carrying a top-level `fieldVisits`
//! array. Anything that is not JSON, or is JSON without that marker,
//! falls through the chain as `CannotParse`; a claimed document with
//! structural problems is `ParsedInvalid` and terminal for the file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::app::models::{Activity, ParseOutcome, TimeInterval};
use crate::app::services::plugins::{FieldDataPlugin, FieldDataSink, ParseContext};
use crate::error::Result;

/// Parser for the JSON field data interchange format
#[derive(Debug, Default)]
pub struct JsonFieldDataPlugin;

impl JsonFieldDataPlugin {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldDataDocument {
    location_identifier: Option<String>,
    field_visits: Vec<FieldVisitDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldVisitDoc {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    #[serde(default)]
    party: Option<String>,
    #[serde(default)]
    readings: Vec<ReadingDoc>,
    #[serde(default)]
    discharge_measurements: Vec<DischargeDoc>,
    #[serde(default)]
    calibrations: Vec<CalibrationDoc>,
    #[serde(default)]
    inspections: Vec<InspectionDoc>,
    #[serde(default)]
    level_surveys: Vec<LevelSurveyDoc>,
    #[serde(default)]
    control_conditions: Vec<ControlConditionDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadingDoc {
    parameter_id: String,
    unit: String,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DischargeDoc {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    discharge: f64,
    unit: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalibrationDoc {
    parameter_id: String,
    value: f64,
    #[serde(default)]
    time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InspectionDoc {
    #[serde(default)]
    time: Option<DateTime<Utc>>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LevelSurveyDoc {
    #[serde(default)]
    time: Option<DateTime<Utc>>,
    #[serde(default)]
    party: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ControlConditionDoc {
    condition: String,
    #[serde(default)]
    time: Option<DateTime<Utc>>,
}

#[async_trait]
impl FieldDataPlugin for JsonFieldDataPlugin {
    fn name(&self) -> &str {
        "json-field-data"
    }

    async fn parse(
        &self,
        payload: &[u8],
        context: &ParseContext,
        sink: &mut dyn FieldDataSink,
    ) -> Result<ParseOutcome> {
        // Claim check: valid JSON object with a fieldVisits member
        let value: serde_json::Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(_) => return Ok(ParseOutcome::CannotParse),
        };
        if value.get("fieldVisits").is_none() {
            return Ok(ParseOutcome::CannotParse);
        }

        // Claimed from here on: structural problems are terminal
        let document: FieldDataDocument = match serde_json::from_value(value) {
            Ok(document) => document,
            Err(e) => return Ok(ParseOutcome::ParsedInvalid(e.to_string())),
        };

        let identifier = match document
            .location_identifier
            .as_deref()
            .or(context.location_hint.as_deref())
        {
            Some(identifier) => identifier.to_string(),
            None => {
                return Ok(ParseOutcome::ParsedInvalid(
                    "document names no location and no location hint was given".to_string(),
                ));
            }
        };

        if sink.location_by_identifier(&identifier).await?.is_none() {
            return Ok(ParseOutcome::ParsedInvalid(format!(
                "location '{identifier}' is not known to the remote store"
            )));
        }

        if document.field_visits.is_empty() {
            return Ok(ParseOutcome::ParsedInvalid(
                "document contains an empty fieldVisits array".to_string(),
            ));
        }

        debug!(
            "{}: claiming {} with {} visit fragment(s) at {}",
            self.name(),
            context.file_name,
            document.field_visits.len(),
            identifier
        );

        for visit_doc in document.field_visits {
            let interval = TimeInterval::new(visit_doc.start_time, visit_doc.end_time);
            let handle = sink.add_visit(&identifier, interval).await?;
            if let Some(party) = visit_doc.party {
                sink.set_party(handle, &party).await?;
            }

            for r in visit_doc.readings {
                sink.add_activity(
                    handle,
                    Activity::Reading {
                        parameter_id: r.parameter_id,
                        unit: r.unit,
                        value: r.value,
                        time: r.time,
                    },
                )
                .await?;
            }
            for d in visit_doc.discharge_measurements {
                sink.add_activity(
                    handle,
                    Activity::DischargeMeasurement {
                        period: TimeInterval::new(d.start_time, d.end_time),
                        discharge: d.discharge,
                        unit: d.unit,
                    },
                )
                .await?;
            }
            for c in visit_doc.calibrations {
                sink.add_activity(
                    handle,
                    Activity::Calibration {
                        parameter_id: c.parameter_id,
                        time: c.time,
                        value: c.value,
                    },
                )
                .await?;
            }
            for i in visit_doc.inspections {
                sink.add_activity(
                    handle,
                    Activity::Inspection {
                        time: i.time,
                        notes: i.notes,
                    },
                )
                .await?;
            }
            for l in visit_doc.level_surveys {
                sink.add_activity(
                    handle,
                    Activity::LevelSurvey {
                        time: l.time,
                        party: l.party,
                    },
                )
                .await?;
            }
            for c in visit_doc.control_conditions {
                sink.add_activity(
                    handle,
                    Activity::ControlCondition {
                        time: c.time,
                        condition: c.condition,
                    },
                )
                .await?;
            }
        }

        Ok(ParseOutcome::ParsedValid)
    }
}
