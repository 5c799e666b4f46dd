//! Canonical measurement schema
//!
//! This module defines the provider-independent data points produced by every
//! category mapper: a typed measurement body plus a header carrying schema and
//! provenance metadata.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace used for all canonical schema identifiers
pub const SCHEMA_NAMESPACE: &str = "omh";

/// Provider identifier for provenance tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Ihealth,
    GoogleFit,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ihealth => "ihealth",
            Provider::GoogleFit => "googlefit",
        }
    }

    /// Name written into the acquisition provenance of every data point
    pub fn source_name(&self) -> &'static str {
        match self {
            Provider::Ihealth => "iHealth",
            Provider::GoogleFit => "Google Fit",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "ihealth" => Some(Provider::Ihealth),
            "googlefit" => Some(Provider::GoogleFit),
            _ => None,
        }
    }
}

/// Whether a measurement was sensed by a device or entered by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Sensed,
    SelfReported,
}

/// Schema identifier (namespace, name, version)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaId {
    pub namespace: String,
    pub name: String,
    pub version: String,
}

impl SchemaId {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            namespace: SCHEMA_NAMESPACE.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.name, self.version)
    }
}

/// Effective time of a measurement. Both variants always carry an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFrame {
    DateTime(DateTime<FixedOffset>),
    Interval {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
}

impl TimeFrame {
    /// Start of the frame (the instant itself for point-in-time frames)
    pub fn start(&self) -> DateTime<FixedOffset> {
        match self {
            TimeFrame::DateTime(dt) => *dt,
            TimeFrame::Interval { start, .. } => *start,
        }
    }
}

/// A numeric value tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitValue<U> {
    pub unit: U,
    pub value: f64,
}

impl<U> UnitValue<U> {
    pub fn new(unit: U, value: f64) -> Self {
        Self { unit, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloodPressureUnit {
    #[serde(rename = "mmHg")]
    MmHg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartRateUnit {
    #[serde(rename = "beats/min")]
    BeatsPerMinute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KcalUnit {
    #[serde(rename = "kcal")]
    Kilocalorie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PercentUnit {
    #[serde(rename = "%")]
    Percent,
}

/// Common behaviour of canonical measurement bodies
pub trait Measure: Clone + Serialize {
    /// Schema identifier of this measure
    fn schema_id() -> SchemaId;

    fn effective_time_frame(&self) -> Option<&TimeFrame>;

    fn user_notes(&self) -> Option<&str>;

    fn with_effective_time_frame(self, time_frame: Option<TimeFrame>) -> Self;
}

/// Generates the shared time frame / notes plumbing of a measure body.
macro_rules! impl_measure {
    ($body:ty, $name:literal, $version:literal) => {
        impl Measure for $body {
            fn schema_id() -> SchemaId {
                SchemaId::new($name, $version)
            }

            fn effective_time_frame(&self) -> Option<&TimeFrame> {
                self.effective_time_frame.as_ref()
            }

            fn user_notes(&self) -> Option<&str> {
                self.user_notes.as_deref()
            }

            fn with_effective_time_frame(mut self, time_frame: Option<TimeFrame>) -> Self {
                self.effective_time_frame = time_frame;
                self
            }
        }

        impl $body {
            /// Attach user notes; empty or whitespace-only notes are ignored
            pub fn with_user_notes(mut self, notes: Option<&str>) -> Self {
                self.user_notes = notes
                    .filter(|n| !n.trim().is_empty())
                    .map(|n| n.to_string());
                self
            }
        }
    };
}

/// Systolic/diastolic blood pressure pair, always in mmHg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic_blood_pressure: UnitValue<BloodPressureUnit>,
    pub diastolic_blood_pressure: UnitValue<BloodPressureUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_time_frame: Option<TimeFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_notes: Option<String>,
}

impl BloodPressure {
    pub fn new(systolic_mmhg: f64, diastolic_mmhg: f64) -> Self {
        Self {
            systolic_blood_pressure: UnitValue::new(BloodPressureUnit::MmHg, systolic_mmhg),
            diastolic_blood_pressure: UnitValue::new(BloodPressureUnit::MmHg, diastolic_mmhg),
            effective_time_frame: None,
            user_notes: None,
        }
    }
}

impl_measure!(BloodPressure, "blood-pressure", "1.0");

/// Heart rate in beats per minute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRate {
    pub heart_rate: UnitValue<HeartRateUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_time_frame: Option<TimeFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_notes: Option<String>,
}

impl HeartRate {
    pub fn new(beats_per_minute: f64) -> Self {
        Self {
            heart_rate: UnitValue::new(HeartRateUnit::BeatsPerMinute, beats_per_minute),
            effective_time_frame: None,
            user_notes: None,
        }
    }
}

impl_measure!(HeartRate, "heart-rate", "1.0");

/// Energy expended, in kilocalories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaloriesBurned {
    pub kcal_burned: UnitValue<KcalUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_time_frame: Option<TimeFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_notes: Option<String>,
}

impl CaloriesBurned {
    pub fn new(kcal: f64) -> Self {
        Self {
            kcal_burned: UnitValue::new(KcalUnit::Kilocalorie, kcal),
            effective_time_frame: None,
            user_notes: None,
        }
    }
}

impl_measure!(CaloriesBurned, "calories-burned", "1.0");

/// Blood oxygen saturation (SpO2), 0-100 percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OxygenSaturation {
    pub oxygen_saturation: UnitValue<PercentUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_time_frame: Option<TimeFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_notes: Option<String>,
}

impl OxygenSaturation {
    pub fn new(percent: f64) -> Self {
        Self {
            oxygen_saturation: UnitValue::new(PercentUnit::Percent, percent),
            effective_time_frame: None,
            user_notes: None,
        }
    }
}

impl_measure!(OxygenSaturation, "oxygen-saturation", "1.0");

/// Where a data point came from and how it was acquired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionProvenance {
    pub source_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modality: Option<Modality>,
    /// Provider-side identifier of the originating data source or record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_origin_id: Option<String>,
    /// When the provider last changed the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_updated_date_time: Option<DateTime<FixedOffset>>,
}

/// Data point header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPointHeader {
    pub id: Uuid,
    pub creation_date_time: DateTime<Utc>,
    pub schema_id: SchemaId,
    pub acquisition_provenance: AcquisitionProvenance,
}

/// A canonical data point: a measurement body plus its header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint<B> {
    pub header: DataPointHeader,
    pub body: B,
}

impl<B: Measure> DataPoint<B> {
    /// Build a data point whose header schema is derived from the body type
    pub fn new(body: B, acquisition_provenance: AcquisitionProvenance) -> Self {
        let header = DataPointHeader {
            id: Uuid::new_v4(),
            creation_date_time: Utc::now(),
            schema_id: B::schema_id(),
            acquisition_provenance,
        };
        Self { header, body }
    }

    pub fn modality(&self) -> Option<Modality> {
        self.header.acquisition_provenance.modality
    }
}
