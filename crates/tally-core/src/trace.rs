use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStepType {
    Literal,
    ResolveAggregate,
    ResolveConstant,
    ResolveCalculation,
    Degraded,
    Evaluate,
}

/// One resolution step taken while evaluating a calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub step_type: TraceStepType,
    pub message: String,
}

impl TraceStep {
    pub fn new(step_type: TraceStepType, message: impl Into<String>) -> Self {
        Self {
            step_type,
            message: message.into(),
        }
    }

    pub fn literal(text: &str) -> Self {
        Self::new(TraceStepType::Literal, format!("Literal '{text}'"))
    }

    pub fn resolved(step_type: TraceStepType, pointer: &str, value: &str) -> Self {
        Self::new(step_type, format!("Resolved '{pointer}' -> {value}"))
    }

    pub fn degraded(pointer: &str, reason: &str) -> Self {
        Self::new(
            TraceStepType::Degraded,
            format!("Degraded '{pointer}' to ERROR!: {reason}"),
        )
    }
}
