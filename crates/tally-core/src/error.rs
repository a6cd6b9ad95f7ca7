use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    #[error("material '{0}' not found")]
    MaterialNotFound(String),

    #[error("material '{material}' is not a matrix material")]
    NotMatrix { material: String },

    #[error("pointer '{text}' is out of bounds (row {row}, col {col})")]
    PointerOutOfBounds { text: String, row: i64, col: i64 },

    #[error("can't match the unit from '{from}' to '{to}'")]
    UnitMismatch { from: String, to: String },

    #[error("unit edge {input} -> {output} has a zero rate")]
    InvalidRate { input: String, output: String },

    #[error("arithmetic overflow while {context}")]
    Overflow { context: String },

    #[error("invalid countif pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("company '{0}' not found")]
    CompanyNotFound(String),

    #[error("report '{0}' not found")]
    ReportNotFound(String),

    #[error("calculation '{0}' not found")]
    CalculationNotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("failed to load dataset from {path}: {reason}")]
    DatasetLoad { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
