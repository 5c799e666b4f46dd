//! Google Fit category mappers
//!
//! Google Fit dataset responses hold a `point` list. Each point covers a
//! `startTimeNanos`..`endTimeNanos` interval (UTC epoch nanoseconds, encoded as
//! strings) and carries its value in `value[0]`. The `originDataSourceId`
//! identifies the stream that produced the point; points typed in by the user
//! come from a stream ending in `user_input`.

use crate::error::MappingError;
use crate::mapper::CategoryMapper;
use crate::node::require_f64;
use crate::policy::InclusionPolicy;
use crate::provenance::{ModalitySignal, ProvenanceRule};
use crate::time_frame::{EpochPrecision, EpochSpec, TimestampScheme};
use crate::types::{CaloriesBurned, HeartRate, Modality, Provider};
use serde_json::Value;

pub const POINT_LIST: &str = "point";
pub const ORIGIN_FIELD: &str = "originDataSourceId";

/// Origin marker of the derived basal metabolic rate stream
pub const BASAL_METABOLIC_RATE_MARKER: &str = "bmr";

const START_FIELD: &str = "startTimeNanos";
const END_FIELD: &str = "endTimeNanos";
const FLOAT_VALUE_FIELD: &str = "value.0.fpVal";
const USER_INPUT_MARKER: &str = "user_input";

/// Timestamp and provenance rules shared by every Google Fit category
#[derive(Debug, Clone, Copy)]
struct GoogleFitRecordRules {
    timestamps: TimestampScheme,
    provenance: ProvenanceRule,
}

impl Default for GoogleFitRecordRules {
    fn default() -> Self {
        Self {
            timestamps: TimestampScheme::EpochInterval {
                start: START_FIELD,
                end: END_FIELD,
                epoch: EpochSpec::utc(EpochPrecision::Nanos),
            },
            provenance: ProvenanceRule {
                provider: Provider::GoogleFit,
                default_modality: Modality::Sensed,
                modality: ModalitySignal::OriginMarker {
                    field: ORIGIN_FIELD,
                    self_reported_marker: USER_INPUT_MARKER,
                },
                origin_id_field: Some(ORIGIN_FIELD),
                updated_at: None,
            },
        }
    }
}

/// Calories burned from the `com.google.calories.expended` data type.
///
/// Points derived from the basal metabolic rate are excluded; they describe
/// resting expenditure rather than activity.
#[derive(Debug, Clone)]
pub struct GoogleFitCaloriesBurnedMapper {
    rules: GoogleFitRecordRules,
    policy: InclusionPolicy,
}

impl Default for GoogleFitCaloriesBurnedMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleFitCaloriesBurnedMapper {
    pub fn new() -> Self {
        Self::default_rules().with_excluded_origin_markers([BASAL_METABOLIC_RATE_MARKER])
    }

    fn default_rules() -> Self {
        Self {
            rules: GoogleFitRecordRules::default(),
            policy: InclusionPolicy::AdmitAll,
        }
    }

    /// Replace the set of origin markers whose points are excluded.
    /// An empty set admits every point.
    pub fn with_excluded_origin_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers: Vec<String> = markers.into_iter().map(Into::into).collect();
        self.policy = if markers.is_empty() {
            InclusionPolicy::AdmitAll
        } else {
            InclusionPolicy::ExcludeSourceContaining {
                field: ORIGIN_FIELD,
                markers,
            }
        };
        self
    }
}

impl CategoryMapper for GoogleFitCaloriesBurnedMapper {
    type Body = CaloriesBurned;
    type Unit = ();

    fn provider(&self) -> Provider {
        Provider::GoogleFit
    }

    fn list_path(&self) -> &str {
        POINT_LIST
    }

    fn resolve_unit(&self, _document: &Value) -> Result<(), MappingError> {
        Ok(())
    }

    fn inclusion_policy(&self) -> &InclusionPolicy {
        &self.policy
    }

    fn timestamp_scheme(&self) -> Option<&TimestampScheme> {
        Some(&self.rules.timestamps)
    }

    fn provenance_rule(&self) -> &ProvenanceRule {
        &self.rules.provenance
    }

    fn build_body(&self, record: &Value, _unit: ()) -> Result<CaloriesBurned, MappingError> {
        Ok(CaloriesBurned::new(require_f64(record, FLOAT_VALUE_FIELD)?))
    }
}

/// Heart rate from the `com.google.heart_rate.bpm` data type
#[derive(Debug, Clone)]
pub struct GoogleFitHeartRateMapper {
    rules: GoogleFitRecordRules,
    policy: InclusionPolicy,
}

impl Default for GoogleFitHeartRateMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleFitHeartRateMapper {
    pub fn new() -> Self {
        Self {
            rules: GoogleFitRecordRules::default(),
            policy: InclusionPolicy::AdmitAll,
        }
    }
}

impl CategoryMapper for GoogleFitHeartRateMapper {
    type Body = HeartRate;
    type Unit = ();

    fn provider(&self) -> Provider {
        Provider::GoogleFit
    }

    fn list_path(&self) -> &str {
        POINT_LIST
    }

    fn resolve_unit(&self, _document: &Value) -> Result<(), MappingError> {
        Ok(())
    }

    fn inclusion_policy(&self) -> &InclusionPolicy {
        &self.policy
    }

    fn timestamp_scheme(&self) -> Option<&TimestampScheme> {
        Some(&self.rules.timestamps)
    }

    fn provenance_rule(&self) -> &ProvenanceRule {
        &self.rules.provenance
    }

    fn build_body(&self, record: &Value, _unit: ()) -> Result<HeartRate, MappingError> {
        Ok(HeartRate::new(require_f64(record, FLOAT_VALUE_FIELD)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::SkipReason;
    use crate::policy::Exclusion;
    use crate::types::{Measure, TimeFrame};
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    const CALORIES_RESPONSE: &str = r#"{
        "minStartTimeNs": "1400000000000000000",
        "maxEndTimeNs": "1400000200000000000",
        "dataSourceId": "derived:com.google.calories.expended:com.google.android.gms:merge_calories_expended",
        "point": [
            {
                "startTimeNanos": "1400000000000000000",
                "endTimeNanos": "1400000060000000000",
                "dataTypeName": "com.google.calories.expended",
                "originDataSourceId": "raw:com.google.calories.expended:com.google.android.apps.fitness:user_input",
                "value": [{ "fpVal": 200.0 }]
            },
            {
                "startTimeNanos": "1400000060000000000",
                "endTimeNanos": "1400000120000000000",
                "dataTypeName": "com.google.calories.expended",
                "originDataSourceId": "derived:com.google.calories.expended:com.google.android.gms:from_bmr",
                "value": [{ "fpVal": 1.2 }]
            },
            {
                "startTimeNanos": "1400000120000000000",
                "endTimeNanos": "1400000200000000000",
                "dataTypeName": "com.google.calories.expended",
                "originDataSourceId": "raw:com.google.calories.expended:com.mc.miband1:watch",
                "value": [{ "fpVal": 13.5 }]
            }
        ]
    }"#;

    const HEART_RATE_RESPONSE: &str = r#"{
        "dataSourceId": "derived:com.google.heart_rate.bpm:com.google.android.gms:merge_heart_rate_bpm",
        "point": [
            {
                "startTimeNanos": "1400000000000000000",
                "endTimeNanos": "1400000000000000000",
                "dataTypeName": "com.google.heart_rate.bpm",
                "originDataSourceId": "raw:com.google.heart_rate.bpm:com.mc.miband1:watch",
                "value": [{ "fpVal": 76.0 }]
            },
            {
                "startTimeNanos": "1400000060000000000",
                "endTimeNanos": "1400000060000000000",
                "dataTypeName": "com.google.heart_rate.bpm",
                "originDataSourceId": "raw:com.google.heart_rate.bpm:com.google.android.apps.fitness:user_input",
                "value": [{ "fpVal": 62.0 }]
            }
        ]
    }"#;

    fn parse(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    fn dt(rfc3339: &str) -> chrono::DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn test_calories_exclude_basal_metabolic_rate() {
        let report = GoogleFitCaloriesBurnedMapper::new()
            .map_with_report(&[parse(CALORIES_RESPONSE)])
            .unwrap();

        assert_eq!(report.points.len(), 2);
        assert_eq!(report.points[0].body.kcal_burned.value, 200.0);
        assert_eq!(report.points[1].body.kcal_burned.value, 13.5);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].record_index, Some(1));
        assert!(matches!(
            &report.skipped[0].reason,
            SkipReason::Excluded(Exclusion::DisallowedSource { marker, .. }) if marker == "bmr"
        ));
    }

    #[test]
    fn test_calories_interval_and_modality() {
        let points = GoogleFitCaloriesBurnedMapper::new()
            .map(&[parse(CALORIES_RESPONSE)])
            .unwrap();

        assert_eq!(
            points[0].body.effective_time_frame(),
            Some(&TimeFrame::Interval {
                start: dt("2014-05-13T16:53:20Z"),
                end: dt("2014-05-13T16:54:20Z"),
            })
        );
        assert_eq!(points[0].modality(), Some(Modality::SelfReported));
        assert_eq!(points[1].modality(), Some(Modality::Sensed));
        assert_eq!(points[0].header.acquisition_provenance.source_name, "Google Fit");
        assert_eq!(
            points[1].header.acquisition_provenance.source_origin_id.as_deref(),
            Some("raw:com.google.calories.expended:com.mc.miband1:watch")
        );
    }

    #[test]
    fn test_custom_excluded_origin_markers() {
        let admit_all = GoogleFitCaloriesBurnedMapper::new()
            .with_excluded_origin_markers(Vec::<String>::new())
            .map(&[parse(CALORIES_RESPONSE)])
            .unwrap();
        assert_eq!(admit_all.len(), 3);

        let no_watch = GoogleFitCaloriesBurnedMapper::new()
            .with_excluded_origin_markers(["bmr", "miband"])
            .map(&[parse(CALORIES_RESPONSE)])
            .unwrap();
        assert_eq!(no_watch.len(), 1);
    }

    #[test]
    fn test_heart_rate_points_collapse_to_instants() {
        let points = GoogleFitHeartRateMapper::new()
            .map(&[parse(HEART_RATE_RESPONSE)])
            .unwrap();

        assert_eq!(points.len(), 2);

        let expected = HeartRate::new(76.0)
            .with_effective_time_frame(Some(TimeFrame::DateTime(dt("2014-05-13T16:53:20Z"))));
        assert_eq!(points[0].body, expected);
        assert_eq!(points[1].body.heart_rate.value, 62.0);
        assert_eq!(points[1].modality(), Some(Modality::SelfReported));
    }

    #[test]
    fn test_point_without_value_is_dropped() {
        let response = serde_json::json!({
            "point": [
                {
                    "startTimeNanos": "1400000000000000000",
                    "endTimeNanos": "1400000060000000000",
                    "value": []
                },
                {
                    "startTimeNanos": "1400000060000000000",
                    "endTimeNanos": "1400000120000000000",
                    "value": [{ "fpVal": 80.0 }]
                }
            ]
        });

        let report = GoogleFitHeartRateMapper::new()
            .map_with_report(&[response])
            .unwrap();

        assert_eq!(report.points.len(), 1);
        assert_eq!(report.dropped_count(), 1);
        assert_eq!(report.points[0].body.heart_rate.value, 80.0);
        // missing origin falls back to the default modality
        assert_eq!(report.points[0].modality(), Some(Modality::Sensed));
    }

    #[test]
    fn test_reversed_interval_is_dropped() {
        let response = serde_json::json!({
            "point": [{
                "startTimeNanos": "1400000060000000000",
                "endTimeNanos": "1400000000000000000",
                "value": [{ "fpVal": 5.0 }]
            }]
        });

        let report = GoogleFitCaloriesBurnedMapper::new()
            .map_with_report(&[response])
            .unwrap();

        assert!(report.points.is_empty());
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::Dropped(MappingError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_documents_map_in_order() {
        let points = GoogleFitHeartRateMapper::new()
            .map(&[parse(HEART_RATE_RESPONSE), serde_json::json!({}), parse(HEART_RATE_RESPONSE)])
            .unwrap();

        let values: Vec<f64> = points.iter().map(|p| p.body.heart_rate.value).collect();
        assert_eq!(values, vec![76.0, 62.0, 76.0, 62.0]);
    }
}
