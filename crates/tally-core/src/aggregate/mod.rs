//! Folds matrix answers from many meters into numeric totals.

pub mod grid;
pub mod scoped;

pub use grid::{aggregate_grid, GridAggregate, GridQuery};
pub use scoped::aggregate_pointer;

use crate::error::TallyError;
use crate::model::{CellValue, Form, MatrixAnswer, MatrixColumn};
use crate::provider::EngineContext;
use crate::units::UnitConverter;
use rust_decimal::Decimal;

/// Matrix answers given for a material across every meter of one form.
///
/// Forms that do not include the material yield nothing. Meters whose input
/// at the material's position is missing or not a matrix are skipped.
pub(crate) fn matrix_answers(
    ctx: &EngineContext<'_>,
    form: &Form,
    material_unique_id: &str,
) -> Result<Vec<MatrixAnswer>, TallyError> {
    let Some(index) = form.position_of(material_unique_id) else {
        return Ok(Vec::new());
    };

    let meters = ctx.meters.meters_for_form(&form.id)?;
    Ok(meters
        .iter()
        .filter_map(|m| m.matrix_input(index).cloned())
        .collect())
}

/// `a + b`, or `Overflow` when the sum leaves the decimal range.
pub(crate) fn checked_add(a: Decimal, b: Decimal, target: &str) -> Result<Decimal, TallyError> {
    a.checked_add(b).ok_or_else(|| TallyError::Overflow {
        context: format!("summing '{target}'"),
    })
}

/// A numeric cell converted into its column's canonical unit.
///
/// Absent, blank or non-numeric answers contribute zero.
pub(crate) fn numeric_cell(
    converter: &UnitConverter<'_>,
    answer: &MatrixAnswer,
    row: usize,
    col: usize,
    column: &MatrixColumn,
) -> Result<Decimal, TallyError> {
    match answer.cell(row, col).and_then(CellValue::as_decimal) {
        Some(value) => converter.normalize(value, answer.unit(col), &column.output_unit),
        None => Ok(Decimal::ZERO),
    }
}
