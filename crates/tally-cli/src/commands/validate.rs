use std::path::Path;
use tally_core::calculation::CalculationDraft;
use tally_core::error::TallyError;
use tally_core::store::{load_dataset, save_dataset};
use tracing::info;

pub fn run(data: &Path, draft_file: Option<&Path>, save: bool) -> Result<(), TallyError> {
    // Loading already rejects malformed version chains.
    let mut store = load_dataset(data)?;
    println!("Dataset OK: {}", data.display());

    let warnings = store.calculation_warnings();
    for warning in &warnings {
        println!("  warning: {warning}");
    }

    let Some(path) = draft_file else {
        if !warnings.is_empty() {
            println!("{} calculation(s) need attention", warnings.len());
        }
        return Ok(());
    };

    let json = std::fs::read_to_string(path)?;
    let draft: CalculationDraft = serde_json::from_str(&json)?;
    store.validate_expression(&draft.unique_id, &draft.expression)?;
    println!("Calculation '{}' is valid", draft.unique_id);

    if save {
        let exists = store.calculation_history(&draft.unique_id).is_some();
        let stored = if exists {
            store.update_calculation(draft)?
        } else {
            store.create_calculation(draft)?
        };
        info!(calculation = %stored.unique_id, version = stored.version, "stored calculation");
        println!("Stored '{}' as version {}", stored.unique_id, stored.version);
        save_dataset(&store, data)?;
        eprintln!("Dataset written to {}", data.display());
    }

    Ok(())
}
