//! Unit conversion
//!
//! Converts provider-native units into the canonical unit of each measure.
//! Conversion happens once, at mapping time. Unknown unit declarations are
//! rejected with `UnsupportedUnit`; nothing here falls back to an assumed unit.

use crate::error::MappingError;
use serde_json::Value;

/// kPa to mmHg
pub const KPA_TO_MMHG: f64 = 7.500617;

/// Pressure units seen in provider payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureUnit {
    MmHg,
    Kpa,
}

impl PressureUnit {
    /// Resolve an iHealth `BPUnit` declaration (`0` mmHg, `1` kPa, or the unit name)
    pub fn from_declaration(declaration: &Value) -> Result<Self, MappingError> {
        match declaration {
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(PressureUnit::MmHg),
                Some(1) => Ok(PressureUnit::Kpa),
                _ => Err(unsupported("pressure", declaration)),
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "mmhg" => Ok(PressureUnit::MmHg),
                "kpa" => Ok(PressureUnit::Kpa),
                _ => Err(unsupported("pressure", declaration)),
            },
            _ => Err(unsupported("pressure", declaration)),
        }
    }
}

pub fn to_mmhg(value: f64, unit: PressureUnit) -> f64 {
    match unit {
        PressureUnit::MmHg => value,
        PressureUnit::Kpa => value * KPA_TO_MMHG,
    }
}

fn unsupported(kind: &'static str, declaration: &Value) -> MappingError {
    let code = match declaration {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    MappingError::UnsupportedUnit { kind, code }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kpa_to_mmhg() {
        let mmhg = to_mmhg(13.3, PressureUnit::Kpa);
        assert!((mmhg - 99.758).abs() < 0.001);
        assert!((mmhg - 13.3 * 7.500617).abs() < 1e-9);
    }

    #[test]
    fn test_mmhg_is_identity() {
        assert_eq!(to_mmhg(120.0, PressureUnit::MmHg), 120.0);
    }

    #[test]
    fn test_pressure_declarations() {
        assert_eq!(
            PressureUnit::from_declaration(&json!(0)).unwrap(),
            PressureUnit::MmHg
        );
        assert_eq!(
            PressureUnit::from_declaration(&json!(1)).unwrap(),
            PressureUnit::Kpa
        );
        assert_eq!(
            PressureUnit::from_declaration(&json!("kPa")).unwrap(),
            PressureUnit::Kpa
        );
    }

    #[test]
    fn test_unknown_pressure_code_is_fatal() {
        let err = PressureUnit::from_declaration(&json!(2)).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, MappingError::UnsupportedUnit { ref code, .. } if code == "2"));
    }
}
