//! Mapper registry
//!
//! Looks up the category mapper for a provider/category pair by name and runs
//! it over raw response documents, returning type-erased data points. Also
//! parses response documents from JSON or NDJSON text.

use crate::adapters::{
    GoogleFitCaloriesBurnedMapper, GoogleFitHeartRateMapper, IhealthBloodPressureMapper,
    IhealthHeartRateMapper, IhealthOxygenSaturationMapper,
};
use crate::error::MappingError;
use crate::mapper::{CategoryMapper, MappingReport};
use crate::types::{
    BloodPressure, CaloriesBurned, DataPoint, HeartRate, OxygenSaturation, Provider, SchemaId,
};
use serde::Serialize;
use serde_json::Value;

/// Canonical measure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    BloodPressure,
    HeartRate,
    CaloriesBurned,
    OxygenSaturation,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BloodPressure => "blood-pressure",
            Category::HeartRate => "heart-rate",
            Category::CaloriesBurned => "calories-burned",
            Category::OxygenSaturation => "oxygen-saturation",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "blood-pressure" => Some(Category::BloodPressure),
            "heart-rate" => Some(Category::HeartRate),
            "calories-burned" => Some(Category::CaloriesBurned),
            "oxygen-saturation" => Some(Category::OxygenSaturation),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider/category pairs with a registered mapper
pub const SUPPORTED: &[(Provider, Category)] = &[
    (Provider::Ihealth, Category::BloodPressure),
    (Provider::Ihealth, Category::HeartRate),
    (Provider::Ihealth, Category::OxygenSaturation),
    (Provider::GoogleFit, Category::CaloriesBurned),
    (Provider::GoogleFit, Category::HeartRate),
];

pub fn is_supported(provider: Provider, category: Category) -> bool {
    SUPPORTED.contains(&(provider, category))
}

/// A data point of any canonical measure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnyDataPoint {
    BloodPressure(DataPoint<BloodPressure>),
    HeartRate(DataPoint<HeartRate>),
    CaloriesBurned(DataPoint<CaloriesBurned>),
    OxygenSaturation(DataPoint<OxygenSaturation>),
}

impl AnyDataPoint {
    pub fn schema_id(&self) -> &SchemaId {
        match self {
            AnyDataPoint::BloodPressure(p) => &p.header.schema_id,
            AnyDataPoint::HeartRate(p) => &p.header.schema_id,
            AnyDataPoint::CaloriesBurned(p) => &p.header.schema_id,
            AnyDataPoint::OxygenSaturation(p) => &p.header.schema_id,
        }
    }
}

/// Map documents with the mapper registered for `provider` and `category`.
///
/// iHealth reports heart rate on both its blood pressure and blood oxygen
/// endpoints; each document is mapped with both, blood pressure first.
pub fn map_documents(
    provider: Provider,
    category: Category,
    documents: &[Value],
) -> Result<MappingReport<AnyDataPoint>, MappingError> {
    match (provider, category) {
        (Provider::Ihealth, Category::BloodPressure) => Ok(IhealthBloodPressureMapper::new()
            .map_with_report(documents)?
            .map_points(AnyDataPoint::BloodPressure)),
        (Provider::Ihealth, Category::HeartRate) => {
            let mappers = [
                IhealthHeartRateMapper::blood_pressure(),
                IhealthHeartRateMapper::blood_oxygen(),
            ];
            map_per_document(&mappers, documents)
        }
        (Provider::Ihealth, Category::OxygenSaturation) => {
            Ok(IhealthOxygenSaturationMapper::new()
                .map_with_report(documents)?
                .map_points(AnyDataPoint::OxygenSaturation))
        }
        (Provider::GoogleFit, Category::CaloriesBurned) => {
            Ok(GoogleFitCaloriesBurnedMapper::new()
                .map_with_report(documents)?
                .map_points(AnyDataPoint::CaloriesBurned))
        }
        (Provider::GoogleFit, Category::HeartRate) => Ok(GoogleFitHeartRateMapper::new()
            .map_with_report(documents)?
            .map_points(AnyDataPoint::HeartRate)),
        (provider, category) => Err(MappingError::UnknownCategory {
            provider: provider.as_str().to_string(),
            category: category.as_str().to_string(),
        }),
    }
}

/// Like [`map_documents`], resolving provider and category from their names
pub fn map_documents_by_name(
    provider: &str,
    category: &str,
    documents: &[Value],
) -> Result<MappingReport<AnyDataPoint>, MappingError> {
    let unknown = || MappingError::UnknownCategory {
        provider: provider.to_string(),
        category: category.to_string(),
    };
    let provider = Provider::parse(provider).ok_or_else(unknown)?;
    let category = Category::parse(category).ok_or_else(unknown)?;
    map_documents(provider, category, documents)
}

/// Run several heart rate mappers over each document in turn, keeping document order
fn map_per_document(
    mappers: &[IhealthHeartRateMapper],
    documents: &[Value],
) -> Result<MappingReport<AnyDataPoint>, MappingError> {
    let mut report = MappingReport {
        documents: documents.len(),
        ..MappingReport::default()
    };

    for (document_index, document) in documents.iter().enumerate() {
        for mapper in mappers {
            let single = mapper.map_with_report(std::slice::from_ref(document))?;
            report
                .points
                .extend(single.points.into_iter().map(AnyDataPoint::HeartRate));
            report
                .skipped
                .extend(single.skipped.into_iter().map(|mut skipped| {
                    skipped.document_index = document_index;
                    skipped
                }));
        }
    }

    Ok(report)
}

/// Parse a JSON array of response documents; a single object is one document
pub fn parse_documents_json(json: &str) -> Result<Vec<Value>, MappingError> {
    match serde_json::from_str(json)? {
        Value::Array(documents) => Ok(documents),
        document @ Value::Object(_) => Ok(vec![document]),
        _ => Err(MappingError::ParseError(
            "expected a JSON object or an array of objects".to_string(),
        )),
    }
}

/// Parse NDJSON (newline-delimited JSON), one response document per line
pub fn parse_documents_ndjson(ndjson: &str) -> Result<Vec<Value>, MappingError> {
    let mut documents = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(document) => documents.push(document),
            Err(e) => {
                return Err(MappingError::ParseError(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn blood_pressure_document() -> Value {
        json!({
            "BPDataList": [
                { "HP": 120, "LP": 80, "HR": 72, "MDate": 1443023160, "TimeZone": "-0600" }
            ],
            "BPUnit": 0
        })
    }

    fn blood_oxygen_document() -> Value {
        json!({
            "BODataList": [
                { "BO": 98, "HR": 64, "MDate": 1443023160, "TimeZone": "-0600" },
                { "BO": 97, "HR": 0, "MDate": 1443023220, "TimeZone": "-0600" }
            ]
        })
    }

    #[test]
    fn test_category_names() {
        for (_, category) in SUPPORTED {
            assert_eq!(Category::parse(category.as_str()), Some(*category));
        }
        assert_eq!(Category::parse("HEART_RATE"), Some(Category::HeartRate));
        assert_eq!(Category::parse("step-count"), None);
    }

    #[test]
    fn test_unknown_pair_is_fatal() {
        let err = map_documents(Provider::GoogleFit, Category::BloodPressure, &[]).unwrap_err();
        assert!(err.is_fatal());
        assert!(!is_supported(Provider::GoogleFit, Category::BloodPressure));

        let err = map_documents_by_name("fitbit", "heart-rate", &[]).unwrap_err();
        assert!(matches!(err, MappingError::UnknownCategory { .. }));
    }

    #[test]
    fn test_ihealth_heart_rate_reads_both_endpoints() {
        let documents = [blood_oxygen_document(), blood_pressure_document()];
        let report = map_documents(Provider::Ihealth, Category::HeartRate, &documents).unwrap();

        let values: Vec<f64> = report
            .points
            .iter()
            .map(|p| match p {
                AnyDataPoint::HeartRate(point) => point.body.heart_rate.value,
                other => panic!("unexpected point {other:?}"),
            })
            .collect();
        assert_eq!(values, vec![64.0, 72.0]);

        assert_eq!(report.documents, 2);
        assert_eq!(report.excluded_count(), 1);
        assert_eq!(report.skipped[0].document_index, 0);
        assert_eq!(report.skipped[0].record_index, Some(1));
    }

    #[test]
    fn test_map_by_name() {
        let report =
            map_documents_by_name("iHealth", "blood_pressure", &[blood_pressure_document()])
                .unwrap();
        assert_eq!(report.points.len(), 1);
        assert_eq!(report.points[0].schema_id().to_string(), "omh:blood-pressure:1.0");
    }

    #[test]
    fn test_any_data_point_serializes_untagged() {
        let report = map_documents(
            Provider::Ihealth,
            Category::OxygenSaturation,
            &[blood_oxygen_document()],
        )
        .unwrap();

        let json = serde_json::to_value(&report.points[0]).unwrap();
        assert_eq!(json["body"]["oxygen_saturation"]["value"], 98.0);
        assert_eq!(json["body"]["oxygen_saturation"]["unit"], "%");
        assert_eq!(json["header"]["schema_id"]["name"], "oxygen-saturation");
        assert_eq!(
            json["header"]["acquisition_provenance"]["modality"],
            "SENSED"
        );
    }

    #[test]
    fn test_parse_documents_json() {
        let documents = parse_documents_json(r#"[{"point": []}, {"point": []}]"#).unwrap();
        assert_eq!(documents.len(), 2);

        let documents = parse_documents_json(r#"{"BPDataList": []}"#).unwrap();
        assert_eq!(documents.len(), 1);

        assert!(matches!(
            parse_documents_json("42"),
            Err(MappingError::ParseError(_))
        ));
        assert!(matches!(
            parse_documents_json("{"),
            Err(MappingError::JsonError(_))
        ));
    }

    #[test]
    fn test_parse_documents_ndjson() {
        let ndjson = "{\"point\": []}\n\n{\"BODataList\": []}\n";
        assert_eq!(parse_documents_ndjson(ndjson).unwrap().len(), 2);

        let err = parse_documents_ndjson("{}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
