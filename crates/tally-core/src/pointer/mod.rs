pub mod catalog;

use crate::error::TallyError;
use crate::model::MatrixContent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row/column value meaning "aggregate across this axis".
pub const ALL: i64 = -1;

/// One element of a calculation's expression.
///
/// Serialized as `{ "text": ..., "method": ..., ... }` with `method` naming the
/// pointer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Pointer {
    Number(LiteralToken),
    Operator(LiteralToken),
    Sum(AggregatePointer),
    Countif(AggregatePointer),
    Constant(ConstantPointer),
    Calculation(CalculationPointer),
}

impl Pointer {
    pub fn number(text: impl Into<String>) -> Self {
        Pointer::Number(LiteralToken { text: text.into() })
    }

    pub fn operator(text: impl Into<String>) -> Self {
        Pointer::Operator(LiteralToken { text: text.into() })
    }

    pub fn constant(unique_id: impl Into<String>) -> Self {
        let unique_id = unique_id.into();
        Pointer::Constant(ConstantPointer {
            text: format!("constant:{unique_id}"),
            constant_unique_id: unique_id,
        })
    }

    pub fn calculation(unique_id: impl Into<String>) -> Self {
        let unique_id = unique_id.into();
        Pointer::Calculation(CalculationPointer {
            text: format!("calculation:{unique_id}"),
            calculation_unique_id: unique_id,
        })
    }

    pub fn text(&self) -> &str {
        match self {
            Pointer::Number(t) | Pointer::Operator(t) => &t.text,
            Pointer::Sum(p) | Pointer::Countif(p) => &p.text,
            Pointer::Constant(p) => &p.text,
            Pointer::Calculation(p) => &p.text,
        }
    }

    /// The aggregation mode and target, for material aggregate pointers.
    pub fn as_aggregate(&self) -> Option<(AggregateMethod, &AggregatePointer)> {
        match self {
            Pointer::Sum(p) => Some((AggregateMethod::Sum, p)),
            Pointer::Countif(p) => Some((AggregateMethod::Countif, p)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateMethod {
    Sum,
    Countif,
}

impl fmt::Display for AggregateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateMethod::Sum => write!(f, "sum"),
            AggregateMethod::Countif => write!(f, "countif"),
        }
    }
}

/// A literal digit string or arithmetic operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralToken {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Case-insensitive pattern tested by countif pointers.
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatePointer {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_id: Option<String>,
    pub material_unique_id: String,
    pub row: i64,
    pub col: i64,
    #[serde(default)]
    pub payload: Payload,
}

/// Which cells of a matrix an aggregate pointer covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Cell { row: usize, col: usize },
    Row(usize),
    Column(usize),
    Whole,
}

impl Scope {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        match *self {
            Scope::Cell { row: r, col: c } => r == row && c == col,
            Scope::Row(r) => r == row,
            Scope::Column(c) => c == col,
            Scope::Whole => true,
        }
    }
}

impl AggregatePointer {
    /// Resolve `row`/`col` into a scope, checking them against the matrix.
    pub fn scope(&self, matrix: &MatrixContent) -> Result<Scope, TallyError> {
        let row = axis_index(self.row, matrix.rows.len());
        let col = axis_index(self.col, matrix.columns.len());
        match (row, col) {
            (Some(Some(row)), Some(Some(col))) => Ok(Scope::Cell { row, col }),
            (Some(Some(row)), Some(None)) => Ok(Scope::Row(row)),
            (Some(None), Some(Some(col))) => Ok(Scope::Column(col)),
            (Some(None), Some(None)) => Ok(Scope::Whole),
            _ => Err(TallyError::PointerOutOfBounds {
                text: self.text.clone(),
                row: self.row,
                col: self.col,
            }),
        }
    }
}

/// `Some(None)` for the whole axis, `Some(Some(i))` for an index, `None` when
/// out of bounds.
fn axis_index(value: i64, len: usize) -> Option<Option<usize>> {
    if value == ALL {
        return Some(None);
    }
    usize::try_from(value).ok().filter(|&i| i < len).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstantPointer {
    pub text: String,
    pub constant_unique_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationPointer {
    pub text: String,
    pub calculation_unique_id: String,
}
