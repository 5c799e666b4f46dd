//! Record inclusion policy
//!
//! Decides, before any body is built, whether a raw record should produce a
//! data point at all. Exclusion is an expected filtering step and is reported
//! separately from coercion failures.

use crate::node::find_node;
use serde::Serialize;
use serde_json::Value;

/// Why a record was filtered out
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Exclusion {
    /// Originating source matches a disallowed marker (e.g. basal metabolic rate)
    DisallowedSource { source: String, marker: String },
    /// Primary value equals the provider's "not measured" sentinel
    SentinelValue { field: String, value: f64 },
}

/// Per-category inclusion predicate
#[derive(Debug, Clone, PartialEq)]
pub enum InclusionPolicy {
    AdmitAll,
    /// Reject records whose `field` string contains any of `markers`
    ExcludeSourceContaining {
        field: &'static str,
        markers: Vec<String>,
    },
    /// Reject records whose numeric `field` equals `sentinel`
    ExcludeSentinel { field: &'static str, sentinel: f64 },
    /// Apply each policy in turn; the first exclusion wins
    All(Vec<InclusionPolicy>),
}

impl InclusionPolicy {
    /// Returns the exclusion for `record`, or `None` when it is admitted.
    ///
    /// Absent or ill-typed fields never exclude a record; they are left for
    /// body construction to reject.
    pub fn evaluate(&self, record: &Value) -> Option<Exclusion> {
        match self {
            InclusionPolicy::AdmitAll => None,
            InclusionPolicy::ExcludeSourceContaining { field, markers } => {
                let source = find_node(record, field)?.as_str()?;
                markers
                    .iter()
                    .find(|m| source.contains(m.as_str()))
                    .map(|marker| Exclusion::DisallowedSource {
                        source: source.to_string(),
                        marker: marker.clone(),
                    })
            }
            InclusionPolicy::ExcludeSentinel { field, sentinel } => {
                let value = find_node(record, field)?.as_f64()?;
                if value == *sentinel {
                    Some(Exclusion::SentinelValue {
                        field: field.to_string(),
                        value,
                    })
                } else {
                    None
                }
            }
            InclusionPolicy::All(policies) => policies.iter().find_map(|p| p.evaluate(record)),
        }
    }

    pub fn admits(&self, record: &Value) -> bool {
        self.evaluate(record).is_none()
    }
}
