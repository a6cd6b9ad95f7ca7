use super::{checked_add, matrix_answers, numeric_cell};
use crate::error::TallyError;
use crate::model::{Form, MatrixAnswer, MatrixContent};
use crate::pointer::{AggregateMethod, AggregatePointer, Scope};
use crate::provider::EngineContext;
use crate::units::{round2, UnitConverter};
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use tracing::debug;

/// Resolve a material aggregate pointer over the given forms.
///
/// Each form containing the material contributes its own total, rounded to 2
/// decimals, and the per-form totals are added together.
pub fn aggregate_pointer(
    ctx: &EngineContext<'_>,
    method: AggregateMethod,
    pointer: &AggregatePointer,
    forms: &[Form],
) -> Result<Decimal, TallyError> {
    let material = ctx.resolve_material(pointer.material_id.as_deref(), &pointer.material_unique_id)?;
    let matrix = material.matrix()?;
    let scope = pointer.scope(matrix)?;
    let converter = UnitConverter::new(ctx.units);
    let pattern = match method {
        AggregateMethod::Countif => Some(compile_pattern(&pointer.payload.search)?),
        AggregateMethod::Sum => None,
    };

    let mut total = Decimal::ZERO;
    for form in forms {
        let answers = matrix_answers(ctx, form, &pointer.material_unique_id)?;
        if answers.is_empty() {
            continue;
        }

        let mut form_total = Decimal::ZERO;
        for answer in &answers {
            let meter_total = match &pattern {
                Some(re) => count_matches(re, answer, matrix, scope),
                None => sum_cells(&converter, answer, matrix, scope, &pointer.text)?,
            };
            form_total = checked_add(form_total, meter_total, &pointer.text)?;
        }

        debug!(
            pointer = %pointer.text,
            form = %form.id,
            meters = answers.len(),
            total = %form_total,
            "resolved pointer for form"
        );
        total = checked_add(total, round2(form_total), &pointer.text)?;
    }

    Ok(total)
}

/// Case-insensitive matcher for a countif search pattern.
pub fn compile_pattern(search: &str) -> Result<Regex, TallyError> {
    RegexBuilder::new(search)
        .case_insensitive(true)
        .build()
        .map_err(|e| TallyError::InvalidPattern {
            pattern: search.to_string(),
            reason: e.to_string(),
        })
}

fn scoped_cells(matrix: &MatrixContent, scope: Scope) -> impl Iterator<Item = (usize, usize)> + '_ {
    (0..matrix.rows.len()).flat_map(move |row| {
        (0..matrix.columns.len())
            .filter(move |&col| scope.contains(row, col))
            .map(move |col| (row, col))
    })
}

fn sum_cells(
    converter: &UnitConverter<'_>,
    answer: &MatrixAnswer,
    matrix: &MatrixContent,
    scope: Scope,
    pointer: &str,
) -> Result<Decimal, TallyError> {
    let mut sum = Decimal::ZERO;
    for (row, col) in scoped_cells(matrix, scope) {
        let column = &matrix.columns[col];
        if column.is_numeric() {
            let value = numeric_cell(converter, answer, row, col, column)?;
            sum = checked_add(sum, value, pointer)?;
        }
    }
    Ok(sum)
}

fn count_matches(re: &Regex, answer: &MatrixAnswer, matrix: &MatrixContent, scope: Scope) -> Decimal {
    let hits = scoped_cells(matrix, scope)
        .filter_map(|(row, col)| answer.cell(row, col))
        .filter(|cell| !cell.is_blank() && re.is_match(&cell.to_string()))
        .count();
    Decimal::from(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_case_insensitive() {
        let re = compile_pattern("name 1").unwrap();
        assert!(re.is_match("Name 1"));
        assert!(re.is_match("my NAME 1 entry"));
        assert!(!re.is_match("Name 2"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = compile_pattern("(unclosed").unwrap_err();
        assert!(matches!(err, TallyError::InvalidPattern { .. }));
    }
}
