//! Provenance attachment
//!
//! Derives the acquisition provenance (source name, modality, originating
//! source id, last update time) of a data point from its raw record.

use crate::error::MappingError;
use crate::node::{optional_epoch, optional_str};
use crate::time_frame::{epoch_to_datetime, resolve_offset, EpochSpec};
use crate::types::{AcquisitionProvenance, Modality, Provider};
use serde_json::Value;

/// Signal a provider uses to tell sensed from self-reported records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalitySignal {
    /// A string field naming the data source
    SourceField {
        field: &'static str,
        self_reported: &'static str,
        sensed: &'static str,
    },
    /// Origin identifier containing a marker means self-reported, anything else sensed
    OriginMarker {
        field: &'static str,
        self_reported_marker: &'static str,
    },
}

/// Provenance rules of one provider category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvenanceRule {
    pub provider: Provider,
    /// Modality used when the record carries no usable signal
    pub default_modality: Modality,
    pub modality: ModalitySignal,
    /// Field copied verbatim into `source_origin_id`
    pub origin_id_field: Option<&'static str>,
    /// Epoch field holding the provider's last-modified time
    pub updated_at: Option<(&'static str, EpochSpec)>,
}

impl ProvenanceRule {
    pub fn attach(
        &self,
        record: &Value,
        document: &Value,
    ) -> Result<AcquisitionProvenance, MappingError> {
        let source_origin_id = match self.origin_id_field {
            Some(field) => optional_str(record, field)?.map(str::to_string),
            None => None,
        };

        let modality = self.modality(record)?.unwrap_or(self.default_modality);

        let source_updated_date_time = match self.updated_at {
            Some((field, spec)) => match optional_epoch(record, field)? {
                Some(raw) => {
                    let offset = resolve_offset(&spec.offset, record, document)?;
                    Some(epoch_to_datetime(raw, &spec, offset, field)?)
                }
                None => None,
            },
            None => None,
        };

        Ok(AcquisitionProvenance {
            source_name: self.provider.source_name().to_string(),
            modality: Some(modality),
            source_origin_id,
            source_updated_date_time,
        })
    }

    fn modality(&self, record: &Value) -> Result<Option<Modality>, MappingError> {
        match self.modality {
            ModalitySignal::SourceField {
                field,
                self_reported,
                sensed,
            } => Ok(match optional_str(record, field)? {
                Some(v) if v == self_reported => Some(Modality::SelfReported),
                Some(v) if v == sensed => Some(Modality::Sensed),
                _ => None,
            }),
            ModalitySignal::OriginMarker {
                field,
                self_reported_marker,
            } => Ok(optional_str(record, field)?.map(|origin| {
                if origin.contains(self_reported_marker) {
                    Modality::SelfReported
                } else {
                    Modality::Sensed
                }
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_frame::{EpochEncoding, EpochPrecision, OffsetSource};
    use chrono::{DateTime, FixedOffset};
    use serde_json::json;

    fn ihealth_rule() -> ProvenanceRule {
        ProvenanceRule {
            provider: Provider::Ihealth,
            default_modality: Modality::Sensed,
            modality: ModalitySignal::SourceField {
                field: "DataSource",
                self_reported: "Manual",
                sensed: "FromDevice",
            },
            origin_id_field: Some("DataID"),
            updated_at: Some((
                "LastChangeTime",
                EpochSpec {
                    precision: EpochPrecision::Seconds,
                    encoding: EpochEncoding::Instant,
                    offset: OffsetSource::Field {
                        name: "TimeZone",
                        fallback: FixedOffset::east_opt(0).unwrap(),
                    },
                },
            )),
        }
    }

    #[test]
    fn test_manual_data_source_is_self_reported() {
        let record = json!({ "DataSource": "Manual", "DataID": "abc" });
        let provenance = ihealth_rule().attach(&record, &json!({})).unwrap();

        assert_eq!(provenance.modality, Some(Modality::SelfReported));
        assert_eq!(provenance.source_origin_id.as_deref(), Some("abc"));
        assert_eq!(provenance.source_name, "iHealth");
    }

    #[test]
    fn test_missing_signal_falls_back_to_default() {
        let provenance = ihealth_rule().attach(&json!({}), &json!({})).unwrap();
        assert_eq!(provenance.modality, Some(Modality::Sensed));
        assert_eq!(provenance.source_origin_id, None);
        assert_eq!(provenance.source_updated_date_time, None);
    }

    #[test]
    fn test_last_change_time_is_an_instant() {
        let record = json!({ "LastChangeTime": 1443044760, "TimeZone": "-0600" });
        let provenance = ihealth_rule().attach(&record, &json!({})).unwrap();

        let expected = DateTime::parse_from_rfc3339("2015-09-23T21:46:00Z").unwrap();
        assert_eq!(provenance.source_updated_date_time, Some(expected));
    }

    #[test]
    fn test_origin_marker() {
        let rule = ProvenanceRule {
            provider: Provider::GoogleFit,
            default_modality: Modality::Sensed,
            modality: ModalitySignal::OriginMarker {
                field: "originDataSourceId",
                self_reported_marker: "user_input",
            },
            origin_id_field: Some("originDataSourceId"),
            updated_at: None,
        };

        let manual = json!({ "originDataSourceId": "raw:com.google.heart_rate.bpm:com.google.android.apps.fitness:user_input" });
        assert_eq!(
            rule.attach(&manual, &json!({})).unwrap().modality,
            Some(Modality::SelfReported)
        );

        let watch = json!({ "originDataSourceId": "raw:com.google.heart_rate.bpm:watch" });
        assert_eq!(
            rule.attach(&watch, &json!({})).unwrap().modality,
            Some(Modality::Sensed)
        );
    }

    #[test]
    fn test_ill_typed_origin_is_an_error() {
        let record = json!({ "DataID": 42 });
        assert!(matches!(
            ihealth_rule().attach(&record, &json!({})),
            Err(MappingError::TypeMismatch { .. })
        ));
    }
}
