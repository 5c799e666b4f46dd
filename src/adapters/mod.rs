//! Provider category mappers
//!
//! Each submodule holds the [`CategoryMapper`](crate::mapper::CategoryMapper)
//! implementations for one provider's API responses.

mod googlefit;
mod ihealth;

pub use googlefit::{
    GoogleFitCaloriesBurnedMapper, GoogleFitHeartRateMapper, BASAL_METABOLIC_RATE_MARKER,
};
pub use ihealth::{
    IhealthBloodPressureMapper, IhealthEndpoint, IhealthHeartRateMapper,
    IhealthOxygenSaturationMapper,
};
