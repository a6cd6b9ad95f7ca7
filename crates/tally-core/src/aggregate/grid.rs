use super::{checked_add, matrix_answers, numeric_cell};
use crate::error::TallyError;
use crate::model::MatrixContent;
use crate::provider::EngineContext;
use crate::units::{round2, UnitConverter};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Which submissions a grid aggregation covers.
#[derive(Debug, Clone, Copy)]
pub struct GridQuery<'q> {
    pub company_id: &'q str,
    pub financial_year: &'q str,
    pub material_unique_id: &'q str,
    /// Restrict to a single form.
    pub form_id: Option<&'q str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellTotal {
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub unit: String,
}

/// Total for one numeric (row, col) cell.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridEntry {
    pub row: usize,
    pub col: usize,
    pub row_name: String,
    pub col_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowGroup {
    pub row: String,
    #[serde(flatten)]
    pub columns: BTreeMap<String, CellTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnGroup {
    pub col: String,
    #[serde(flatten)]
    pub rows: BTreeMap<String, CellTotal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridAggregate {
    pub material_unique_id: String,
    pub material_name: String,
    pub entries: Vec<GridEntry>,
    pub group_by_row: Vec<RowGroup>,
    pub group_by_column: Vec<ColumnGroup>,
}

impl GridAggregate {
    pub fn entry(&self, row: usize, col: usize) -> Option<&GridEntry> {
        self.entries.iter().find(|e| e.row == row && e.col == col)
    }
}

/// Sum every numeric cell of a matrix material across a company's forms for
/// one financial year.
pub fn aggregate_grid(
    ctx: &EngineContext<'_>,
    query: GridQuery<'_>,
) -> Result<GridAggregate, TallyError> {
    let material = ctx.resolve_material(None, query.material_unique_id)?;
    let matrix = material.matrix()?;
    check_pivot_keys(matrix, &material.unique_id)?;
    let converter = UnitConverter::new(ctx.units);

    let mut entries: Vec<GridEntry> = Vec::new();
    for (row, row_def) in matrix.rows.iter().enumerate() {
        for (col, column) in matrix.columns.iter().enumerate() {
            if column.is_numeric() {
                entries.push(GridEntry {
                    row,
                    col,
                    row_name: row_def.name.clone(),
                    col_name: column.name.clone(),
                    value: Decimal::ZERO,
                    unit: column.output_unit.clone(),
                });
            }
        }
    }

    let forms = ctx.forms.forms_for(query.company_id, query.financial_year)?;
    let mut meter_count = 0usize;
    for form in forms
        .iter()
        .filter(|f| query.form_id.map_or(true, |id| f.id == id))
    {
        let answers = matrix_answers(ctx, form, &material.unique_id)?;
        meter_count += answers.len();
        for answer in &answers {
            for entry in entries.iter_mut() {
                let column = &matrix.columns[entry.col];
                let value = numeric_cell(&converter, answer, entry.row, entry.col, column)?;
                entry.value = checked_add(entry.value, value, &material.unique_id)?;
            }
        }
    }

    for entry in entries.iter_mut() {
        entry.value = round2(entry.value);
    }

    debug!(
        material = %material.unique_id,
        company = query.company_id,
        financial_year = query.financial_year,
        meters = meter_count,
        "aggregated matrix grid"
    );

    let group_by_row = matrix
        .rows
        .iter()
        .enumerate()
        .map(|(row, def)| RowGroup {
            row: def.name.clone(),
            columns: entries
                .iter()
                .filter(|e| e.row == row)
                .map(|e| (e.col_name.clone(), total(e)))
                .collect(),
        })
        .collect();

    let group_by_column = matrix
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_numeric())
        .map(|(col, def)| ColumnGroup {
            col: def.name.clone(),
            rows: entries
                .iter()
                .filter(|e| e.col == col)
                .map(|e| (e.row_name.clone(), total(e)))
                .collect(),
        })
        .collect();

    Ok(GridAggregate {
        material_unique_id: material.unique_id.clone(),
        material_name: material.name.clone(),
        entries,
        group_by_row,
        group_by_column,
    })
}

/// Row and numeric column names become keys of the pivoted groups, next to the
/// `row` and `col` label fields. Each name must be unique on its axis and must
/// not shadow the label.
fn check_pivot_keys(matrix: &MatrixContent, material: &str) -> Result<(), TallyError> {
    let rows = matrix.rows.iter().map(|r| r.name.as_str());
    let columns = matrix
        .columns
        .iter()
        .filter(|c| c.is_numeric())
        .map(|c| c.name.as_str());

    for (axis, names, label) in [
        ("row", rows.collect::<Vec<_>>(), "col"),
        ("column", columns.collect::<Vec<_>>(), "row"),
    ] {
        let mut seen = BTreeSet::new();
        for name in names {
            if name == label {
                return Err(TallyError::Validation(format!(
                    "material '{material}' has a {axis} named '{label}', which clashes with the grid label"
                )));
            }
            if !seen.insert(name) {
                return Err(TallyError::Validation(format!(
                    "material '{material}' has duplicate {axis} name '{name}'"
                )));
            }
        }
    }
    Ok(())
}

fn total(entry: &GridEntry) -> CellTotal {
    CellTotal {
        value: entry.value,
        unit: entry.unit.clone(),
    }
}
