//! Synheart Shim - Health data provider response mapping
//!
//! Shim turns raw JSON responses from third-party health data providers
//! (iHealth, Google Fit) into canonical, provider-independent data points:
//! locate record list → resolve document unit → inclusion policy → body →
//! time frame → provenance.
//!
//! ## Modules
//!
//! - **Mapping framework**: [`mapper::CategoryMapper`] and the shared per-document driver
//! - **Building blocks**: value coercion, unit conversion, time frames, inclusion
//!   policies and provenance rules
//! - **Providers**: one mapper per provider and category in [`adapters`]
//! - **Registry**: name-based lookup used by the `shim` binary

pub mod adapters;
pub mod error;
pub mod mapper;
pub mod node;
pub mod policy;
pub mod provenance;
pub mod registry;
pub mod time_frame;
pub mod types;
pub mod units;

pub use adapters::{
    GoogleFitCaloriesBurnedMapper, GoogleFitHeartRateMapper, IhealthBloodPressureMapper,
    IhealthHeartRateMapper, IhealthOxygenSaturationMapper,
};
pub use error::MappingError;
pub use mapper::{CategoryMapper, MappingReport, RecordOutcome, SkipReason, SkippedRecord};
pub use registry::{map_documents, AnyDataPoint, Category};
pub use types::{DataPoint, Measure, Modality, Provider, TimeFrame};

/// Shim version reported by the `shim` binary
pub const SHIM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the `shim` binary
pub const PRODUCER_NAME: &str = "synheart-shim";
