pub mod i18n;

use crate::calculation::{CalculationValue, Calculator};
use crate::error::TallyError;
use crate::provider::EngineContext;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A named, ordered collection of calculations. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    /// Calculation unique ids, rendered against their latest version.
    pub calculations: Vec<String>,
}

/// One rendered calculation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub name: String,
    pub unique_id: String,
    pub result: CalculationValue,
    pub unit: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ReportRequest<'r> {
    pub report_name: &'r str,
    pub company_id: &'r str,
    pub financial_year: &'r str,
    pub locale: Option<&'r str>,
}

/// Render a report for one company and financial year.
///
/// A failing calculation renders as `ERROR!` without affecting its siblings.
/// Missing reports, companies and structural aggregation errors are returned
/// as `Err`.
pub fn render_report(
    ctx: &EngineContext<'_>,
    request: ReportRequest<'_>,
) -> Result<Vec<ReportLine>, TallyError> {
    let report = ctx
        .reports
        .report(request.report_name)?
        .ok_or_else(|| TallyError::ReportNotFound(request.report_name.to_string()))?;
    let forms = ctx
        .forms
        .forms_for(request.company_id, request.financial_year)?;
    let fields = match request.locale {
        Some(locale) => ctx.contents.custom_fields(locale)?,
        None => None,
    };

    let calculator = Calculator::new(*ctx);
    let mut lines = Vec::with_capacity(report.calculations.len());

    for unique_id in &report.calculations {
        let Some(calculation) = ctx.calculations.latest_calculation(unique_id)? else {
            warn!(report = %report.name, calculation = %unique_id, "report lists a missing calculation");
            lines.push(ReportLine {
                name: unique_id.clone(),
                unique_id: unique_id.clone(),
                result: CalculationValue::Error,
                unit: String::new(),
                reasons: vec![format!("calculation '{unique_id}' does not exist")],
            });
            continue;
        };

        let outcome = calculator.calculate(request.company_id, &forms, &calculation)?;
        lines.push(ReportLine {
            name: calculation.name,
            unique_id: calculation.unique_id,
            result: outcome.value,
            unit: calculation.unit,
            reasons: outcome.reasons,
        });
    }

    if let Some(fields) = &fields {
        for line in lines.iter_mut() {
            line.name = i18n::translate(&line.name, fields);
            line.unit = i18n::translate(&line.unit, fields);
        }
    }

    info!(
        report = %report.name,
        company = request.company_id,
        financial_year = request.financial_year,
        forms = forms.len(),
        lines = lines.len(),
        "rendered report"
    );

    Ok(lines)
}
