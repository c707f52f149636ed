// Merchant Classifier - Core Library
// Exposes all modules for use in the CLI and tests

pub mod classifier;
pub mod error;
pub mod knowledge;

// Re-export commonly used types
pub use classifier::{
    normalize_description, ClassificationResult, Classifier, MatchBasis, SharedKnowledge,
};
pub use error::ConfigurationError;
pub use knowledge::{CategoryType, KnowledgeBase, MerchantRecord, UNCATEGORIZED};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
