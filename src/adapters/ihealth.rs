//! iHealth category mappers
//!
//! iHealth returns one list of measurement records per endpoint
//! (`BPDataList`, `BODataList`). Measurement times (`MDate`) are epoch seconds
//! holding the user's local wall-clock time, paired with a `TimeZone` offset
//! such as `"-0600"`. Blood pressure units are declared once per response in
//! `BPUnit`.

use crate::error::MappingError;
use crate::mapper::CategoryMapper;
use crate::node::{optional_str, require_f64, require_node};
use crate::policy::InclusionPolicy;
use crate::provenance::{ModalitySignal, ProvenanceRule};
use crate::time_frame::{
    utc_offset, EpochEncoding, EpochPrecision, EpochSpec, OffsetSource, TimestampScheme,
};
use crate::types::{BloodPressure, HeartRate, Modality, OxygenSaturation, Provider};
use crate::units::{to_mmhg, PressureUnit};
use chrono::FixedOffset;
use serde_json::Value;

pub const BLOOD_PRESSURE_UNIT_FIELD: &str = "BPUnit";

const MEASURED_AT_FIELD: &str = "MDate";
const TIME_ZONE_FIELD: &str = "TimeZone";
const LAST_CHANGED_FIELD: &str = "LastChangeTime";
const DATA_ID_FIELD: &str = "DataID";
const DATA_SOURCE_FIELD: &str = "DataSource";
const NOTE_FIELD: &str = "Note";

const SYSTOLIC_FIELD: &str = "HP";
const DIASTOLIC_FIELD: &str = "LP";
const HEART_RATE_FIELD: &str = "HR";
const OXYGEN_FIELD: &str = "BO";

/// iHealth reports 0 for readings the device did not take
const NOT_MEASURED: f64 = 0.0;

/// iHealth endpoints that carry measurement lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IhealthEndpoint {
    BloodPressure,
    BloodOxygen,
}

impl IhealthEndpoint {
    pub fn list_path(&self) -> &'static str {
        match self {
            IhealthEndpoint::BloodPressure => "BPDataList",
            IhealthEndpoint::BloodOxygen => "BODataList",
        }
    }
}

/// Timestamp and provenance rules shared by every iHealth category
#[derive(Debug, Clone, Copy)]
struct IhealthRecordRules {
    timestamps: TimestampScheme,
    provenance: ProvenanceRule,
}

impl IhealthRecordRules {
    fn new(fallback_offset: FixedOffset) -> Self {
        let offset = OffsetSource::Field {
            name: TIME_ZONE_FIELD,
            fallback: fallback_offset,
        };

        Self {
            timestamps: TimestampScheme::EpochInstant {
                field: MEASURED_AT_FIELD,
                epoch: EpochSpec {
                    precision: EpochPrecision::Seconds,
                    encoding: EpochEncoding::LocalWallClock,
                    offset,
                },
            },
            provenance: ProvenanceRule {
                provider: Provider::Ihealth,
                default_modality: Modality::Sensed,
                modality: ModalitySignal::SourceField {
                    field: DATA_SOURCE_FIELD,
                    self_reported: "Manual",
                    sensed: "FromDevice",
                },
                origin_id_field: Some(DATA_ID_FIELD),
                updated_at: Some((
                    LAST_CHANGED_FIELD,
                    EpochSpec {
                        precision: EpochPrecision::Seconds,
                        encoding: EpochEncoding::Instant,
                        offset,
                    },
                )),
            },
        }
    }
}

impl Default for IhealthRecordRules {
    fn default() -> Self {
        Self::new(utc_offset())
    }
}

fn user_note(record: &Value) -> Result<Option<&str>, MappingError> {
    optional_str(record, NOTE_FIELD)
}

/// Blood pressure from the iHealth blood pressure endpoint
#[derive(Debug, Clone)]
pub struct IhealthBloodPressureMapper {
    rules: IhealthRecordRules,
    policy: InclusionPolicy,
}

impl Default for IhealthBloodPressureMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl IhealthBloodPressureMapper {
    pub fn new() -> Self {
        Self {
            rules: IhealthRecordRules::default(),
            policy: InclusionPolicy::AdmitAll,
        }
    }

    /// Offset applied when neither the record nor the response carries a `TimeZone`
    pub fn with_fallback_offset(mut self, offset: FixedOffset) -> Self {
        self.rules = IhealthRecordRules::new(offset);
        self
    }
}

impl CategoryMapper for IhealthBloodPressureMapper {
    type Body = BloodPressure;
    type Unit = PressureUnit;

    fn provider(&self) -> Provider {
        Provider::Ihealth
    }

    fn list_path(&self) -> &str {
        IhealthEndpoint::BloodPressure.list_path()
    }

    fn resolve_unit(&self, document: &Value) -> Result<PressureUnit, MappingError> {
        PressureUnit::from_declaration(require_node(document, BLOOD_PRESSURE_UNIT_FIELD)?)
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

    fn build_body(&self, record: &Value, unit: PressureUnit) -> Result<BloodPressure, MappingError> {
        let systolic = to_mmhg(require_f64(record, SYSTOLIC_FIELD)?, unit);
        let diastolic = to_mmhg(require_f64(record, DIASTOLIC_FIELD)?, unit);

        Ok(BloodPressure::new(systolic, diastolic).with_user_notes(user_note(record)?))
    }
}

/// Heart rate reported alongside blood pressure or blood oxygen readings
#[derive(Debug, Clone)]
pub struct IhealthHeartRateMapper {
    endpoint: IhealthEndpoint,
    rules: IhealthRecordRules,
    policy: InclusionPolicy,
}

impl IhealthHeartRateMapper {
    pub fn new(endpoint: IhealthEndpoint) -> Self {
        Self {
            endpoint,
            rules: IhealthRecordRules::default(),
            policy: InclusionPolicy::ExcludeSentinel {
                field: HEART_RATE_FIELD,
                sentinel: NOT_MEASURED,
            },
        }
    }

    pub fn blood_oxygen() -> Self {
        Self::new(IhealthEndpoint::BloodOxygen)
    }

    pub fn blood_pressure() -> Self {
        Self::new(IhealthEndpoint::BloodPressure)
    }

    pub fn with_fallback_offset(mut self, offset: FixedOffset) -> Self {
        self.rules = IhealthRecordRules::new(offset);
        self
    }
}

impl CategoryMapper for IhealthHeartRateMapper {
    type Body = HeartRate;
    type Unit = ();

    fn provider(&self) -> Provider {
        Provider::Ihealth
    }

    fn list_path(&self) -> &str {
        self.endpoint.list_path()
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
        let bpm = require_f64(record, HEART_RATE_FIELD)?;
        Ok(HeartRate::new(bpm).with_user_notes(user_note(record)?))
    }
}

/// Blood oxygen saturation from the iHealth blood oxygen endpoint
#[derive(Debug, Clone)]
pub struct IhealthOxygenSaturationMapper {
    rules: IhealthRecordRules,
    policy: InclusionPolicy,
}

impl Default for IhealthOxygenSaturationMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl IhealthOxygenSaturationMapper {
    pub fn new() -> Self {
        Self {
            rules: IhealthRecordRules::default(),
            policy: InclusionPolicy::ExcludeSentinel {
                field: OXYGEN_FIELD,
                sentinel: NOT_MEASURED,
            },
        }
    }

    pub fn with_fallback_offset(mut self, offset: FixedOffset) -> Self {
        self.rules = IhealthRecordRules::new(offset);
        self
    }
}

impl CategoryMapper for IhealthOxygenSaturationMapper {
    type Body = OxygenSaturation;
    type Unit = ();

    fn provider(&self) -> Provider {
        Provider::Ihealth
    }

    fn list_path(&self) -> &str {
        IhealthEndpoint::BloodOxygen.list_path()
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

    fn build_body(&self, record: &Value, _unit: ()) -> Result<OxygenSaturation, MappingError> {
        let percent = require_f64(record, OXYGEN_FIELD)?;
        Ok(OxygenSaturation::new(percent).with_user_notes(user_note(record)?))
    }
}
