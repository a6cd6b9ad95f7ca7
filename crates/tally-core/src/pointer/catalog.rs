//! Enumerates the pointers a formula author can pick from.
//!
//! Generation is pure and order-stable: cells (rows outer, columns inner),
//! then row-only, then column-only, then the whole-matrix pointer.

use super::{AggregateMethod, AggregatePointer, Payload, Pointer, ALL};
use crate::calculation::schema::Calculation;
use crate::error::TallyError;
use crate::model::{Constant, Material};
use crate::provider::EngineContext;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialPointers {
    pub material_id: String,
    pub material_unique_id: String,
    pub material_name: String,
    pub sum: Vec<Pointer>,
    pub countif: Vec<Pointer>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PointerCatalog {
    pub materials: Vec<MaterialPointers>,
    pub constants: Vec<Pointer>,
    pub calculations: Vec<Pointer>,
}

impl PointerCatalog {
    pub fn len(&self) -> usize {
        self.materials
            .iter()
            .map(|m| m.sum.len() + m.countif.len())
            .sum::<usize>()
            + self.constants.len()
            + self.calculations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sum and countif pointers for one matrix material.
pub fn material_pointers(material: &Material) -> Result<MaterialPointers, TallyError> {
    let matrix = material.matrix()?;
    let numeric: Vec<usize> = matrix
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_numeric())
        .map(|(i, _)| i)
        .collect();
    let all_columns: Vec<usize> = (0..matrix.columns.len()).collect();
    let rows = matrix.rows.len();

    let sum = if matrix.has_numeric_column() {
        scoped_pointers(material, AggregateMethod::Sum, rows, &numeric)
    } else {
        Vec::new()
    };
    let countif = scoped_pointers(material, AggregateMethod::Countif, rows, &all_columns);

    Ok(MaterialPointers {
        material_id: material.id.clone(),
        material_unique_id: material.unique_id.clone(),
        material_name: material.name.clone(),
        sum,
        countif,
    })
}

fn scoped_pointers(
    material: &Material,
    method: AggregateMethod,
    rows: usize,
    columns: &[usize],
) -> Vec<Pointer> {
    let mut scopes: Vec<(i64, i64)> = Vec::new();
    for row in 0..rows {
        for &col in columns {
            scopes.push((row as i64, col as i64));
        }
    }
    scopes.extend((0..rows).map(|row| (row as i64, ALL)));
    scopes.extend(columns.iter().map(|&col| (ALL, col as i64)));
    scopes.push((ALL, ALL));

    scopes
        .into_iter()
        .map(|(row, col)| aggregate_pointer(material, method, row, col))
        .collect()
}

fn aggregate_pointer(material: &Material, method: AggregateMethod, row: i64, col: i64) -> Pointer {
    let pointer = AggregatePointer {
        text: aggregate_text(method, &material.unique_id, row, col),
        material_id: Some(material.id.clone()),
        material_unique_id: material.unique_id.clone(),
        row,
        col,
        payload: Payload::default(),
    };
    match method {
        AggregateMethod::Sum => Pointer::Sum(pointer),
        AggregateMethod::Countif => Pointer::Countif(pointer),
    }
}

/// Display text such as `sum:gas:r0:c1` or `countif:gas:all:c2`.
pub fn aggregate_text(method: AggregateMethod, unique_id: &str, row: i64, col: i64) -> String {
    let row = if row == ALL { "all".to_string() } else { format!("r{row}") };
    let col = if col == ALL { "all".to_string() } else { format!("c{col}") };
    format!("{method}:{unique_id}:{row}:{col}")
}

pub fn constant_pointers(constants: &[Constant]) -> Vec<Pointer> {
    constants
        .iter()
        .map(|c| Pointer::constant(c.unique_id.clone()))
        .collect()
}

pub fn calculation_pointers(calculations: &[Calculation]) -> Vec<Pointer> {
    calculations
        .iter()
        .map(|c| Pointer::calculation(c.unique_id.clone()))
        .collect()
}

/// Every pointer available against the latest data in the store.
pub fn dataset_pointers(ctx: &EngineContext<'_>) -> Result<PointerCatalog, TallyError> {
    let mut materials = Vec::new();
    for material in ctx.materials.latest_materials()? {
        if material.is_matrix_content() {
            materials.push(material_pointers(&material)?);
        }
    }

    Ok(PointerCatalog {
        materials,
        constants: constant_pointers(&ctx.constants.constants()?),
        calculations: calculation_pointers(&ctx.calculations.latest_calculations()?),
    })
}
