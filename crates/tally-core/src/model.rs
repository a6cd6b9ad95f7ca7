use crate::error::TallyError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit marker meaning "no conversion, take the value as-is".
pub const NO_UNIT: &str = "N/A";

/// A single answer cell as submitted in a meter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum CellValue {
    #[default]
    Empty,
    Number(Decimal),
    Text(String),
}

impl CellValue {
    /// Numeric reading of the cell. Text that parses as a decimal counts.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            CellValue::Number(v) => Some(*v),
            CellValue::Text(s) => parse_decimal(s),
            CellValue::Empty => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Empty,
            serde_json::Value::Number(n) => match parse_decimal(&n.to_string()) {
                Some(d) => CellValue::Number(d),
                None => CellValue::Text(n.to_string()),
            },
            serde_json::Value::String(s) => CellValue::Text(s),
            serde_json::Value::Bool(b) => CellValue::Text(b.to_string()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<CellValue> for serde_json::Value {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => serde_json::Value::Null,
            CellValue::Number(d) => serde_json::from_str(&d.to_string())
                .unwrap_or_else(|_| serde_json::Value::String(d.to_string())),
            CellValue::Text(s) => serde_json::Value::String(s),
        }
    }
}

/// Parse a decimal, accepting plain and scientific notation.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Number,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixRow {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixColumn {
    pub name: String,
    pub input_type: InputType,
    /// Canonical unit every submission in this column is converted to.
    #[serde(default = "default_unit")]
    pub output_unit: String,
}

fn default_unit() -> String {
    NO_UNIT.to_string()
}

impl MatrixColumn {
    pub fn is_numeric(&self) -> bool {
        self.input_type == InputType::Number
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixContent {
    pub rows: Vec<MatrixRow>,
    pub columns: Vec<MatrixColumn>,
}

impl MatrixContent {
    pub fn has_numeric_column(&self) -> bool {
        self.columns.iter().any(MatrixColumn::is_numeric)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MaterialContent {
    Matrix(MatrixContent),
    Text,
    Number,
}

/// A reusable question definition. Each edit is stored as a new version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: String,
    pub unique_id: String,
    pub name: String,
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default = "latest_default")]
    pub latest: bool,
    #[serde(flatten)]
    pub content: MaterialContent,
}

pub(crate) fn first_version() -> u32 {
    1
}

pub(crate) fn latest_default() -> bool {
    true
}

impl Material {
    pub fn is_matrix_content(&self) -> bool {
        matches!(self.content, MaterialContent::Matrix(_))
    }

    /// The matrix layout, or `NotMatrix` for any other material type.
    pub fn matrix(&self) -> Result<&MatrixContent, TallyError> {
        match &self.content {
            MaterialContent::Matrix(m) => Ok(m),
            _ => Err(TallyError::NotMatrix {
                material: self.unique_id.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRef {
    pub id: String,
    pub unique_id: String,
}

/// A filled-in questionnaire for one company and financial year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub company_id: String,
    pub financial_year: String,
    /// Materials in template order; meter inputs align with this list.
    pub materials: Vec<MaterialRef>,
}

impl Form {
    /// Input index of the given material within this form's meters.
    pub fn position_of(&self, material_unique_id: &str) -> Option<usize> {
        self.materials
            .iter()
            .position(|m| m.unique_id == material_unique_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixAnswer {
    pub answer: Vec<Vec<CellValue>>,
    /// One declared unit per column.
    #[serde(default)]
    pub unit: Vec<String>,
}

impl MatrixAnswer {
    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.answer.get(row).and_then(|r| r.get(col))
    }

    pub fn unit(&self, col: usize) -> Option<&str> {
        self.unit.get(col).map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarAnswer {
    pub answer: CellValue,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeterInput {
    Matrix(MatrixAnswer),
    Scalar(ScalarAnswer),
}

impl MeterInput {
    pub fn as_matrix(&self) -> Option<&MatrixAnswer> {
        match self {
            MeterInput::Matrix(m) => Some(m),
            MeterInput::Scalar(_) => None,
        }
    }
}

/// One submission instance of a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meter {
    pub id: String,
    pub form_id: String,
    #[serde(default)]
    pub inputs: Vec<Option<MeterInput>>,
}

impl Meter {
    pub fn matrix_input(&self, index: usize) -> Option<&MatrixAnswer> {
        self.inputs
            .get(index)
            .and_then(Option::as_ref)
            .and_then(MeterInput::as_matrix)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantMeta {
    pub location: String,
    pub value: Decimal,
}

/// A named value that varies by company location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constant {
    pub unique_id: String,
    #[serde(default)]
    pub name: String,
    pub meta: Vec<ConstantMeta>,
}

impl Constant {
    pub fn value_for(&self, location: &str) -> Option<Decimal> {
        self.meta
            .iter()
            .find(|m| m.location == location)
            .map(|m| m.value)
    }
}

/// Directed conversion edge: 1 `input` = `rate` `output`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitEdge {
    pub input: String,
    pub output: String,
    pub rate: Decimal,
}
