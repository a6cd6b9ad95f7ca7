use std::path::Path;
use tally_core::error::TallyError;
use tally_core::store::load_dataset;

use crate::output;

pub fn run(
    data: &Path,
    calculation: &str,
    company: &str,
    year: &str,
    trace: bool,
    output_format: &str,
) -> Result<(), TallyError> {
    let store = load_dataset(data)?;
    let mut outcome = tally_core::calculate(&store.context(), calculation, company, year)?;

    if !trace {
        outcome.steps.clear();
    }

    match output_format {
        "json" => output::json::print(&outcome)?,
        _ => output::table::print_outcome(calculation, &outcome, trace),
    }

    Ok(())
}
