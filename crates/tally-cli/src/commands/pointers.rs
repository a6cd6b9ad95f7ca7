use std::path::Path;
use tally_core::error::TallyError;
use tally_core::pointer::catalog::{dataset_pointers, material_pointers, PointerCatalog};
use tally_core::store::load_dataset;

use crate::output;

pub fn run(data: &Path, material: Option<&str>, output_format: &str) -> Result<(), TallyError> {
    let store = load_dataset(data)?;
    let ctx = store.context();

    let catalog = match material {
        Some(unique_id) => {
            let material = ctx.resolve_material(None, unique_id)?;
            PointerCatalog {
                materials: vec![material_pointers(&material)?],
                ..PointerCatalog::default()
            }
        }
        None => dataset_pointers(&ctx)?,
    };

    match output_format {
        "json" => output::json::print(&catalog)?,
        _ => {
            output::table::print_catalog(&catalog);
            eprintln!("{} pointer(s)", catalog.len());
        }
    }

    Ok(())
}
