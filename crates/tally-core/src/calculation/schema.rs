use crate::model::{first_version, latest_default};
use crate::pointer::Pointer;
use serde::{Deserialize, Serialize};

/// A named, versioned formula. The expression is evaluated left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculation {
    pub name: String,
    pub unique_id: String,
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default = "latest_default")]
    pub latest: bool,
    #[serde(default)]
    pub unit: String,
    pub expression: Vec<Pointer>,
}

/// Fields an author supplies when creating or editing a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationDraft {
    pub name: String,
    pub unique_id: String,
    #[serde(default)]
    pub unit: String,
    pub expression: Vec<Pointer>,
}

impl CalculationDraft {
    pub(crate) fn into_version(self, version: u32) -> Calculation {
        Calculation {
            name: self.name,
            unique_id: self.unique_id,
            version,
            latest: true,
            unit: self.unit,
            expression: self.expression,
        }
    }
}
