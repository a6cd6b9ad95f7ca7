use crate::trace::TraceStep;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;

/// Marker used for an unresolvable token or an invalid result.
pub const ERROR_MARKER: &str = "ERROR!";

/// A calculation result: a number, or `ERROR!` when evaluation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculationValue {
    Number(Decimal),
    Error,
}

impl CalculationValue {
    pub fn is_error(&self) -> bool {
        matches!(self, CalculationValue::Error)
    }
}

impl fmt::Display for CalculationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculationValue::Number(v) => write!(f, "{v}"),
            CalculationValue::Error => write!(f, "{ERROR_MARKER}"),
        }
    }
}

impl Serialize for CalculationValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CalculationValue::Number(v) => rust_decimal::serde::float::serialize(v, serializer),
            CalculationValue::Error => serializer.serialize_str(ERROR_MARKER),
        }
    }
}

/// Result of evaluating one calculation.
#[derive(Debug, Clone, Serialize)]
pub struct CalculationOutcome {
    pub value: CalculationValue,
    /// Human-readable explanations for every degraded token or failure.
    pub reasons: Vec<String>,
    /// The arithmetic string assembled from resolved tokens.
    pub expression: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<TraceStep>,
}
