use super::expr;
use super::outcome::{CalculationOutcome, CalculationValue, ERROR_MARKER};
use super::schema::Calculation;
use crate::aggregate::aggregate_pointer;
use crate::error::TallyError;
use crate::model::{Company, Form};
use crate::pointer::{AggregateMethod, ConstantPointer, Pointer};
use crate::provider::EngineContext;
use crate::trace::{TraceStep, TraceStepType};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Evaluates calculations for one company over a fixed set of forms.
pub struct Calculator<'a> {
    ctx: EngineContext<'a>,
}

/// Tokens, reasons and steps gathered while walking one expression.
#[derive(Default)]
struct Walk {
    tokens: Vec<String>,
    reasons: Vec<String>,
    steps: Vec<TraceStep>,
}

impl Walk {
    fn push_value(&mut self, step_type: TraceStepType, pointer: &str, value: Decimal) {
        let text = value.normalize().to_string();
        self.steps.push(TraceStep::resolved(step_type, pointer, &text));
        self.tokens.push(text);
    }

    fn degrade(&mut self, pointer: &str, reason: String) {
        warn!(pointer, reason = %reason, "pointer degraded to error marker");
        self.steps.push(TraceStep::degraded(pointer, &reason));
        self.tokens.push(ERROR_MARKER.to_string());
        self.reasons.push(reason);
    }
}

impl<'a> Calculator<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self { ctx }
    }

    /// Evaluate `calculation` for `company_id` over `forms`.
    ///
    /// Pointer lookups that fail degrade to `ERROR!` and record a reason; the
    /// overall value becomes `ERROR!` when the assembled expression does not
    /// evaluate. Structural aggregation errors (missing or non-matrix
    /// material, unmatched units) are returned as `Err`.
    pub fn calculate(
        &self,
        company_id: &str,
        forms: &[Form],
        calculation: &Calculation,
    ) -> Result<CalculationOutcome, TallyError> {
        let company = self.ctx.company(company_id)?;
        let mut chain = vec![calculation.unique_id.clone()];
        self.evaluate(&company, forms, calculation, &mut chain)
    }

    fn evaluate(
        &self,
        company: &Company,
        forms: &[Form],
        calculation: &Calculation,
        chain: &mut Vec<String>,
    ) -> Result<CalculationOutcome, TallyError> {
        let mut walk = Walk::default();

        for pointer in &calculation.expression {
            match pointer {
                Pointer::Number(token) | Pointer::Operator(token) => {
                    walk.steps.push(TraceStep::literal(&token.text));
                    walk.tokens.push(token.text.clone());
                }
                Pointer::Sum(target) => {
                    let value = aggregate_pointer(&self.ctx, AggregateMethod::Sum, target, forms)?;
                    walk.push_value(TraceStepType::ResolveAggregate, &target.text, value);
                }
                Pointer::Countif(target) => {
                    let value = aggregate_pointer(&self.ctx, AggregateMethod::Countif, target, forms)?;
                    walk.push_value(TraceStepType::ResolveAggregate, &target.text, value);
                }
                Pointer::Constant(target) => match self.resolve_constant(company, target)? {
                    Ok(value) => walk.push_value(TraceStepType::ResolveConstant, &target.text, value),
                    Err(reason) => walk.degrade(&target.text, reason),
                },
                Pointer::Calculation(target) => {
                    let unique_id = &target.calculation_unique_id;
                    if chain.contains(unique_id) {
                        let cycle = chain
                            .iter()
                            .map(String::as_str)
                            .chain(std::iter::once(unique_id.as_str()))
                            .collect::<Vec<_>>()
                            .join(" -> ");
                        walk.degrade(&target.text, format!("circular calculation reference: {cycle}"));
                        continue;
                    }

                    let Some(child) = self.ctx.calculations.latest_calculation(unique_id)? else {
                        walk.degrade(
                            &target.text,
                            format!(
                                "calculation '{}' referenced by '{}' does not exist",
                                unique_id, calculation.name
                            ),
                        );
                        continue;
                    };

                    chain.push(unique_id.clone());
                    let inner = self.evaluate(company, forms, &child, chain)?;
                    chain.pop();

                    walk.reasons.extend(inner.reasons);
                    match inner.value {
                        CalculationValue::Number(value) => {
                            walk.push_value(TraceStepType::ResolveCalculation, &target.text, value)
                        }
                        CalculationValue::Error => {
                            walk.steps.push(TraceStep::degraded(
                                &target.text,
                                &format!("'{}' evaluated to ERROR!", child.name),
                            ));
                            walk.tokens.push(ERROR_MARKER.to_string());
                        }
                    }
                }
            }
        }

        let expression = walk.tokens.concat();
        let value = match expr::evaluate(&expression) {
            Ok(value) => {
                let value = value.normalize();
                debug!(calculation = %calculation.unique_id, %expression, %value, "evaluated calculation");
                walk.steps.push(TraceStep::new(
                    TraceStepType::Evaluate,
                    format!("Evaluated '{expression}' = {value}"),
                ));
                CalculationValue::Number(value)
            }
            Err(e) => {
                warn!(calculation = %calculation.unique_id, %expression, error = %e, "calculation is not valid");
                walk.steps.push(TraceStep::new(
                    TraceStepType::Evaluate,
                    format!("Could not evaluate '{expression}': {e}"),
                ));
                walk.reasons.push(format!("{} is not valid", calculation.name));
                CalculationValue::Error
            }
        };

        Ok(CalculationOutcome {
            value,
            reasons: walk.reasons,
            expression,
            steps: walk.steps,
        })
    }

    /// The constant's value at the company's location, or a reason it has none.
    fn resolve_constant(
        &self,
        company: &Company,
        target: &ConstantPointer,
    ) -> Result<Result<Decimal, String>, TallyError> {
        let unique_id = &target.constant_unique_id;
        let matches = self.ctx.constants.find_by_unique_id(unique_id)?;
        let constant = match matches.as_slice() {
            [only] => only,
            [] => return Ok(Err(format!("constant '{unique_id}' does not exist"))),
            many => {
                return Ok(Err(format!(
                    "constant '{unique_id}' is ambiguous ({} records)",
                    many.len()
                )))
            }
        };

        Ok(constant.value_for(&company.location).ok_or_else(|| {
            format!(
                "constant '{}' has no value for location '{}'",
                unique_id, company.location
            )
        }))
    }
}
