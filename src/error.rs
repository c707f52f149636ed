// Error types for knowledge-base loading

use thiserror::Error;

/// Raised while loading or validating a knowledge base.
///
/// Every variant is fatal to startup: a process must not serve
/// classification requests with a partially invalid table.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to read knowledge base: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse knowledge base JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Merchant '{merchant}': commonPatterns must not be empty")]
    EmptyPatternList { merchant: String },

    #[error("Merchant '{merchant}': pattern #{index} is blank")]
    BlankPattern { merchant: String, index: usize },

    #[error("Merchant '{merchant}': confidence {value} is outside 0-100")]
    ConfidenceOutOfRange { merchant: String, value: u8 },

    #[error("Merchant '{merchant}': {field} must not be empty")]
    EmptyField {
        merchant: String,
        field: &'static str,
    },

    #[error("MCC code '{code}': mapped category is empty")]
    EmptyMccCategory { code: String },

    #[error("mccConfidence {value} is outside 0-100")]
    CodePriorOutOfRange { value: u8 },
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;
