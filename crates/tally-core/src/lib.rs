pub mod aggregate;
pub mod calculation;
pub mod error;
pub mod model;
pub mod pointer;
pub mod provider;
pub mod report;
pub mod store;
pub mod trace;
pub mod units;

use calculation::{CalculationOutcome, Calculator};
use error::TallyError;
use provider::EngineContext;
use report::{ReportLine, ReportRequest};

/// Evaluate the latest version of one calculation for a company and
/// financial year.
pub fn calculate(
    ctx: &EngineContext<'_>,
    calculation_id: &str,
    company_id: &str,
    financial_year: &str,
) -> Result<CalculationOutcome, TallyError> {
    let calculation = ctx
        .calculations
        .latest_calculation(calculation_id)?
        .ok_or_else(|| TallyError::CalculationNotFound(calculation_id.to_string()))?;
    let forms = ctx.forms.forms_for(company_id, financial_year)?;

    Calculator::new(*ctx).calculate(company_id, &forms, &calculation)
}

/// Main API entry point: render a named report.
pub fn render_report(
    ctx: &EngineContext<'_>,
    request: ReportRequest<'_>,
) -> Result<Vec<ReportLine>, TallyError> {
    report::render_report(ctx, request)
}
