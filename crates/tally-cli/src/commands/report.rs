use std::path::Path;
use tally_core::error::TallyError;
use tally_core::report::ReportRequest;
use tally_core::store::load_dataset;

use crate::output;

pub fn run(
    data: &Path,
    name: &str,
    company: &str,
    year: &str,
    locale: Option<&str>,
    output_format: &str,
) -> Result<(), TallyError> {
    let store = load_dataset(data)?;
    let request = ReportRequest {
        report_name: name,
        company_id: company,
        financial_year: year,
        locale,
    };
    let lines = tally_core::render_report(&store.context(), request)?;

    match output_format {
        "json" => output::json::print(&lines)?,
        _ => output::table::print_report(name, &lines),
    }

    Ok(())
}
