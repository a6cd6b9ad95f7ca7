use std::path::Path;
use tally_core::aggregate::{aggregate_grid, GridQuery};
use tally_core::error::TallyError;
use tally_core::store::load_dataset;

use crate::output;

pub fn run(
    data: &Path,
    material: &str,
    company: &str,
    year: &str,
    form: Option<&str>,
    output_format: &str,
) -> Result<(), TallyError> {
    let store = load_dataset(data)?;
    let grid = aggregate_grid(
        &store.context(),
        GridQuery {
            company_id: company,
            financial_year: year,
            material_unique_id: material,
            form_id: form,
        },
    )?;

    match output_format {
        "json" => output::json::print(&grid)?,
        _ => output::table::print_grid(&grid),
    }

    Ok(())
}
