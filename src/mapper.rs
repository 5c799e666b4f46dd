//! Category mapper contract and driver
//!
//! A category mapper turns the responses of one provider endpoint into
//! canonical data points of one measure. Implementors only declare where the
//! records live, how units and timestamps are declared, which records to
//! exclude and how to build a body; the provided `map` methods run the shared
//! per-document algorithm:
//!
//! 1. locate the record list (absent list: no points, not an error)
//! 2. resolve the document-scoped unit once
//! 3. per record: inclusion policy, body, time frame, provenance
//!
//! A record that fails coercion is dropped and mapping continues with the next
//! one. Only fatal errors (gaps in the mapping rules) abort the batch.

use crate::error::MappingError;
use crate::node::find_node;
use crate::policy::{Exclusion, InclusionPolicy};
use crate::provenance::ProvenanceRule;
use crate::time_frame::TimestampScheme;
use crate::types::{DataPoint, Measure, Provider};
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Outcome of mapping a single raw record
#[derive(Debug)]
pub enum RecordOutcome<B> {
    Mapped(DataPoint<B>),
    /// Filtered out by the inclusion policy
    Excluded(Exclusion),
    /// Malformed upstream data; the record is skipped
    Dropped(MappingError),
}

/// Why a record produced no data point
#[derive(Debug)]
pub enum SkipReason {
    Excluded(Exclusion),
    Dropped(MappingError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Excluded(Exclusion::DisallowedSource { source, marker }) => {
                write!(f, "excluded: source {source} matches '{marker}'")
            }
            SkipReason::Excluded(Exclusion::SentinelValue { field, value }) => {
                write!(f, "excluded: {field} is the sentinel value {value}")
            }
            SkipReason::Dropped(err) => write!(f, "dropped: {err}"),
        }
    }
}

/// A record (or a whole document, when `record_index` is `None`) that was skipped
#[derive(Debug)]
pub struct SkippedRecord {
    pub document_index: usize,
    pub record_index: Option<usize>,
    pub reason: SkipReason,
}

/// Points produced by a mapping pass together with what was skipped
#[derive(Debug)]
pub struct MappingReport<P> {
    pub points: Vec<P>,
    pub skipped: Vec<SkippedRecord>,
    pub documents: usize,
}

impl<P> Default for MappingReport<P> {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            skipped: Vec::new(),
            documents: 0,
        }
    }
}

impl<P> MappingReport<P> {
    pub fn excluded_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| matches!(s.reason, SkipReason::Excluded(_)))
            .count()
    }

    pub fn dropped_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| matches!(s.reason, SkipReason::Dropped(_)))
            .count()
    }

    /// Convert the points, keeping the skip diagnostics
    pub fn map_points<Q>(self, f: impl FnMut(P) -> Q) -> MappingReport<Q> {
        MappingReport {
            points: self.points.into_iter().map(f).collect(),
            skipped: self.skipped,
            documents: self.documents,
        }
    }
}

/// Mapper from one provider endpoint's records to one canonical measure
pub trait CategoryMapper {
    type Body: Measure;
    /// Unit resolved once per document; `()` when the category declares none
    type Unit: Copy;

    fn provider(&self) -> Provider;

    /// Path of the record list inside a response document
    fn list_path(&self) -> &str;

    /// Resolve the document-scoped unit declaration
    fn resolve_unit(&self, document: &Value) -> Result<Self::Unit, MappingError>;

    fn inclusion_policy(&self) -> &InclusionPolicy;

    fn timestamp_scheme(&self) -> Option<&TimestampScheme>;

    fn provenance_rule(&self) -> &ProvenanceRule;

    /// Build the measurement body from required and optional record fields
    fn build_body(&self, record: &Value, unit: Self::Unit) -> Result<Self::Body, MappingError>;

    /// Map a single record. `Err` is returned only for fatal errors.
    fn map_record(
        &self,
        record: &Value,
        document: &Value,
        unit: Self::Unit,
    ) -> Result<RecordOutcome<Self::Body>, MappingError> {
        if !record.is_object() {
            return Ok(RecordOutcome::Dropped(MappingError::TypeMismatch {
                path: self.list_path().to_string(),
                expected: "object",
            }));
        }

        if let Some(exclusion) = self.inclusion_policy().evaluate(record) {
            return Ok(RecordOutcome::Excluded(exclusion));
        }

        let built = self.build_body(record, unit).and_then(|body| {
            let time_frame = match self.timestamp_scheme() {
                Some(scheme) => scheme.resolve(record, document)?,
                None => None,
            };
            let provenance = self.provenance_rule().attach(record, document)?;
            Ok(DataPoint::new(
                body.with_effective_time_frame(time_frame),
                provenance,
            ))
        });

        match built {
            Ok(point) => Ok(RecordOutcome::Mapped(point)),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => Ok(RecordOutcome::Dropped(err)),
        }
    }

    /// Map a sequence of response documents, preserving document and record order
    fn map(&self, documents: &[Value]) -> Result<Vec<DataPoint<Self::Body>>, MappingError> {
        self.map_with_report(documents).map(|report| report.points)
    }

    /// Like [`CategoryMapper::map`], also reporting every skipped record
    fn map_with_report(
        &self,
        documents: &[Value],
    ) -> Result<MappingReport<DataPoint<Self::Body>>, MappingError> {
        let schema = <Self::Body as Measure>::schema_id();
        let span = tracing::debug_span!("map", provider = self.provider().as_str(), schema = %schema);
        let _guard = span.enter();

        let mut report = MappingReport {
            documents: documents.len(),
            ..MappingReport::default()
        };

        for (document_index, document) in documents.iter().enumerate() {
            let Some(records) = find_node(document, self.list_path()).and_then(Value::as_array)
            else {
                debug!(document_index, list = self.list_path(), "no record list in document");
                continue;
            };
            if records.is_empty() {
                continue;
            }

            let unit = match self.resolve_unit(document) {
                Ok(unit) => unit,
                Err(err) if err.is_fatal() => {
                    warn!(document_index, error = %err, "aborting batch");
                    return Err(err);
                }
                Err(err) => {
                    debug!(document_index, error = %err, "unit unresolved, skipping document");
                    report.skipped.push(SkippedRecord {
                        document_index,
                        record_index: None,
                        reason: SkipReason::Dropped(err),
                    });
                    continue;
                }
            };

            for (record_index, record) in records.iter().enumerate() {
                let outcome = match self.map_record(record, document, unit) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        warn!(document_index, record_index, error = %err, "aborting batch");
                        return Err(err);
                    }
                };

                match outcome {
                    RecordOutcome::Mapped(point) => report.points.push(point),
                    RecordOutcome::Excluded(exclusion) => {
                        trace!(document_index, record_index, ?exclusion, "record excluded");
                        report.skipped.push(SkippedRecord {
                            document_index,
                            record_index: Some(record_index),
                            reason: SkipReason::Excluded(exclusion),
                        });
                    }
                    RecordOutcome::Dropped(err) => {
                        debug!(document_index, record_index, error = %err, "record dropped");
                        report.skipped.push(SkippedRecord {
                            document_index,
                            record_index: Some(record_index),
                            reason: SkipReason::Dropped(err),
                        });
                    }
                }
            }
        }

        debug!(
            documents = report.documents,
            points = report.points.len(),
            excluded = report.excluded_count(),
            dropped = report.dropped_count(),
            "mapping finished"
        );

        Ok(report)
    }
}
