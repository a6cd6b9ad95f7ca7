pub mod engine;
pub mod expr;
pub mod outcome;
pub mod schema;

pub use engine::Calculator;
pub use outcome::{CalculationOutcome, CalculationValue, ERROR_MARKER};
pub use schema::{Calculation, CalculationDraft};
