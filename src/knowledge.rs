// 📇 Knowledge Base - Static merchant + MCC lookup tables
// Loaded once at process start, immutable for the process lifetime
//
// Two tables:
// - merchants: merchant key → MerchantRecord (patterns, category, prior)
// - mccCategories: merchant-category-code → default category label
//
// Schema violations are reported at load time (ConfigurationError),
// never during classification.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::classifier::normalize_description;
use crate::error::{ConfigurationError, Result};

/// Category label returned when nothing matches
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Default prior for MCC-based matches when the document does not tune it.
/// Code-based classification is coarser than a named-merchant match.
const DEFAULT_MCC_CONFIDENCE: u8 = 60;

const BUILTIN_KNOWLEDGE_BASE: &str = include_str!("../data/knowledge_base.json");

// ============================================================================
// CATEGORY TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryType {
    /// Expense category (money going out)
    Expense,

    /// Income category (money coming in)
    Income,

    /// Transfer between accounts (neutral)
    Transfer,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Expense => "Expense",
            CategoryType::Income => "Income",
            CategoryType::Transfer => "Transfer",
        }
    }
}

// ============================================================================
// MERCHANT RECORD
// ============================================================================

/// One known merchant, keyed by a stable merchant key in the knowledge base.
///
/// `common_patterns` are substrings tested against the normalized
/// transaction description. They are stored normalized (upper-case,
/// whitespace collapsed) so matching is case-insensitive by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantRecord {
    /// Human-readable merchant name (e.g., "McDonald's")
    pub display_name: String,

    /// Canonical upper-case form, secondary match key (e.g., "MCDONALDS")
    pub normalized_name: String,

    /// Category label attached on match
    pub suggested_category: String,

    /// Expense / Income / Transfer
    pub category_type: CategoryType,

    /// Static prior confidence for this merchant's patterns (0-100)
    pub confidence: u8,

    /// Ordered substrings that indicate this merchant.
    /// May contain punctuation (e.g., "WAL-MART", "APPLE.COM/BILL").
    pub common_patterns: Vec<String>,

    /// MCC codes historically associated with this merchant
    #[serde(default)]
    pub mcc_codes: Vec<String>,
}

impl MerchantRecord {
    /// Longest pattern of this record occurring as a substring of the
    /// normalized description, if any.
    pub fn longest_matching_pattern(&self, normalized_description: &str) -> Option<&str> {
        self.common_patterns
            .iter()
            .filter(|pattern| normalized_description.contains(pattern.as_str()))
            .max_by_key(|pattern| pattern.len())
            .map(String::as_str)
    }
}

// ============================================================================
// KNOWLEDGE BASE
// ============================================================================

/// The full static knowledge base: merchant table + MCC table.
///
/// Load once at startup via `from_file` / `from_json` / `builtin` (all
/// validate), then share behind an `Arc`. Nothing here mutates at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    /// Fixed prior for code-based matches (tunable in the document)
    #[serde(default = "default_mcc_confidence")]
    pub mcc_confidence: u8,

    /// Merchant key → record. BTreeMap so iteration follows the
    /// lexicographic key order the tie-break rule relies on.
    pub merchants: BTreeMap<String, MerchantRecord>,

    /// MCC code → default category label
    pub mcc_categories: BTreeMap<String, String>,
}

fn default_mcc_confidence() -> u8 {
    DEFAULT_MCC_CONFIDENCE
}

impl KnowledgeBase {
    /// Load and validate a knowledge base from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let kb = Self::from_json(&content)?;
        debug!(
            path = %path.as_ref().display(),
            merchants = kb.merchant_count(),
            mcc_codes = kb.mcc_count(),
            "knowledge base loaded"
        );
        Ok(kb)
    }

    /// Load and validate a knowledge base from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let mut kb: KnowledgeBase = serde_json::from_str(content)?;
        kb.finalize()?;
        Ok(kb)
    }

    /// The knowledge base shipped with the crate (data/knowledge_base.json)
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_KNOWLEDGE_BASE)
    }

    /// Normalize patterns and fail fast on structurally invalid entries
    fn finalize(&mut self) -> Result<()> {
        if self.mcc_confidence > 100 {
            return Err(ConfigurationError::CodePriorOutOfRange {
                value: self.mcc_confidence,
            });
        }

        for (key, record) in self.merchants.iter_mut() {
            if record.display_name.trim().is_empty() {
                return Err(ConfigurationError::EmptyField {
                    merchant: key.clone(),
                    field: "displayName",
                });
            }
            if record.normalized_name.trim().is_empty() {
                return Err(ConfigurationError::EmptyField {
                    merchant: key.clone(),
                    field: "normalizedName",
                });
            }
            if record.suggested_category.trim().is_empty() {
                return Err(ConfigurationError::EmptyField {
                    merchant: key.clone(),
                    field: "suggestedCategory",
                });
            }
            if record.confidence > 100 {
                return Err(ConfigurationError::ConfidenceOutOfRange {
                    merchant: key.clone(),
                    value: record.confidence,
                });
            }
            if record.common_patterns.is_empty() {
                return Err(ConfigurationError::EmptyPatternList {
                    merchant: key.clone(),
                });
            }

            // Patterns go through the same normalization as descriptions,
            // so a match never depends on the document's casing or spacing.
            for (index, pattern) in record.common_patterns.iter_mut().enumerate() {
                let normalized = normalize_description(pattern);
                if normalized.is_empty() {
                    return Err(ConfigurationError::BlankPattern {
                        merchant: key.clone(),
                        index,
                    });
                }
                *pattern = normalized;
            }
        }

        for (code, category) in &self.mcc_categories {
            if category.trim().is_empty() {
                return Err(ConfigurationError::EmptyMccCategory { code: code.clone() });
            }
        }

        // Cross-table consistency is advisory, not enforced
        for (key, record) in &self.merchants {
            for code in &record.mcc_codes {
                if !self.mcc_categories.contains_key(code) {
                    warn!(merchant = %key, mcc = %code, "merchant MCC code missing from MCC table");
                }
            }
        }

        Ok(())
    }

    /// Look up a merchant record by key
    pub fn merchant(&self, key: &str) -> Option<&MerchantRecord> {
        self.merchants.get(key)
    }

    /// Look up the default category for an MCC code
    pub fn mcc_category(&self, code: &str) -> Option<&str> {
        self.mcc_categories.get(code).map(String::as_str)
    }

    /// Number of known merchants
    pub fn merchant_count(&self) -> usize {
        self.merchants.len()
    }

    /// Number of MCC code mappings
    pub fn mcc_count(&self) -> usize {
        self.mcc_categories.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_kb(merchant_json: &str) -> String {
        format!(
            r#"{{
                "merchants": {{ {} }},
                "mccCategories": {{ "5814": "Restaurants" }}
            }}"#,
            merchant_json
        )
    }

    fn coffee_merchant(confidence: u8, patterns: &str) -> String {
        format!(
            r#""coffeeco": {{
                "displayName": "Coffee Co",
                "normalizedName": "COFFEE CO",
                "suggestedCategory": "Café",
                "categoryType": "EXPENSE",
                "confidence": {},
                "commonPatterns": {},
                "mccCodes": ["5814"]
            }}"#,
            confidence, patterns
        )
    }

    #[test]
    fn test_builtin_loads() {
        let kb = KnowledgeBase::builtin().unwrap();

        assert!(kb.merchant_count() > 20);
        assert!(kb.mcc_count() > 15);
        assert_eq!(kb.mcc_confidence, 60);
        assert_eq!(kb.mcc_category("5814"), Some("Restaurants"));

        let amazon = kb.merchant("amazon").unwrap();
        assert_eq!(amazon.display_name, "Amazon");
        assert_eq!(amazon.confidence, 98);
        assert_eq!(amazon.category_type, CategoryType::Expense);
    }

    #[test]
    fn test_from_file_round_trip() {
        let kb = KnowledgeBase::builtin().unwrap();
        let json = serde_json::to_string(&kb).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = KnowledgeBase::from_file(file.path()).unwrap();
        assert_eq!(loaded.merchant_count(), kb.merchant_count());
        assert_eq!(loaded.mcc_count(), kb.mcc_count());
    }

    #[test]
    fn test_from_file_missing_path() {
        let result = KnowledgeBase::from_file("/nonexistent/kb.json");
        assert!(matches!(result, Err(ConfigurationError::Io(_))));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result = KnowledgeBase::from_json("{ not json");
        assert!(matches!(result, Err(ConfigurationError::Json(_))));
    }

    #[test]
    fn test_patterns_normalized_on_load() {
        let json = minimal_kb(&coffee_merchant(90, r#"["  coffee   co ", "Wal-Mart"]"#));
        let kb = KnowledgeBase::from_json(&json).unwrap();

        let record = kb.merchant("coffeeco").unwrap();
        assert_eq!(record.common_patterns, vec!["COFFEE CO", "WAL-MART"]);
    }

    #[test]
    fn test_empty_pattern_list_rejected() {
        let json = minimal_kb(&coffee_merchant(90, "[]"));
        let result = KnowledgeBase::from_json(&json);

        match result {
            Err(ConfigurationError::EmptyPatternList { merchant }) => {
                assert_eq!(merchant, "coffeeco");
            }
            other => panic!("expected EmptyPatternList, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_pattern_rejected() {
        let json = minimal_kb(&coffee_merchant(90, r#"["COFFEE", "   "]"#));
        let result = KnowledgeBase::from_json(&json);

        match result {
            Err(ConfigurationError::BlankPattern { merchant, index }) => {
                assert_eq!(merchant, "coffeeco");
                assert_eq!(index, 1);
            }
            other => panic!("expected BlankPattern, got {:?}", other),
        }
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let json = minimal_kb(&coffee_merchant(101, r#"["COFFEE"]"#));
        let result = KnowledgeBase::from_json(&json);

        match result {
            Err(ConfigurationError::ConfidenceOutOfRange { merchant, value }) => {
                assert_eq!(merchant, "coffeeco");
                assert_eq!(value, 101);
            }
            other => panic!("expected ConfidenceOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_display_name_rejected() {
        let json = minimal_kb(
            r#""coffeeco": {
                "displayName": "",
                "normalizedName": "COFFEE CO",
                "suggestedCategory": "Café",
                "categoryType": "EXPENSE",
                "confidence": 90,
                "commonPatterns": ["COFFEE"]
            }"#,
        );
        let result = KnowledgeBase::from_json(&json);

        match result {
            Err(ConfigurationError::EmptyField { merchant, field }) => {
                assert_eq!(merchant, "coffeeco");
                assert_eq!(field, "displayName");
            }
            other => panic!("expected EmptyField, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_mcc_category_rejected() {
        let json = r#"{
            "merchants": {},
            "mccCategories": { "5814": "  " }
        }"#;
        let result = KnowledgeBase::from_json(json);

        match result {
            Err(ConfigurationError::EmptyMccCategory { code }) => {
                assert_eq!(code, "5814");
            }
            other => panic!("expected EmptyMccCategory, got {:?}", other),
        }
    }

    #[test]
    fn test_mcc_confidence_out_of_range_rejected() {
        let json = r#"{
            "mccConfidence": 150,
            "merchants": {},
            "mccCategories": {}
        }"#;
        let result = KnowledgeBase::from_json(json);

        assert!(matches!(
            result,
            Err(ConfigurationError::CodePriorOutOfRange { value: 150 })
        ));
    }

    #[test]
    fn test_mcc_confidence_defaults_when_absent() {
        let json = r#"{
            "merchants": {},
            "mccCategories": {}
        }"#;
        let kb = KnowledgeBase::from_json(json).unwrap();
        assert_eq!(kb.mcc_confidence, 60);
    }

    #[test]
    fn test_unknown_merchant_mcc_is_not_fatal() {
        // Codes missing from the MCC table only warn
        let json = format!(
            r#"{{
                "merchants": {{ {} }},
                "mccCategories": {{}}
            }}"#,
            coffee_merchant(90, r#"["COFFEE"]"#)
        );
        let kb = KnowledgeBase::from_json(&json).unwrap();
        assert_eq!(kb.merchant_count(), 1);
    }

    #[test]
    fn test_builtin_mcc_codes_all_mapped() {
        let kb = KnowledgeBase::builtin().unwrap();

        for (key, record) in &kb.merchants {
            for code in &record.mcc_codes {
                assert!(
                    kb.mcc_category(code).is_some(),
                    "merchant '{}' lists MCC {} missing from the MCC table",
                    key,
                    code
                );
            }
        }
    }

    #[test]
    fn test_longest_matching_pattern() {
        let kb = KnowledgeBase::builtin().unwrap();
        let uber = kb.merchant("uber").unwrap();

        assert_eq!(uber.longest_matching_pattern("UBER TRIP HELP.UBER.COM"), Some("UBER TRIP"));
        assert_eq!(uber.longest_matching_pattern("UBER 0423"), Some("UBER"));
        assert_eq!(uber.longest_matching_pattern("LYFT RIDE"), None);
    }

    #[test]
    fn test_category_type_as_str() {
        assert_eq!(CategoryType::Expense.as_str(), "Expense");
        assert_eq!(CategoryType::Income.as_str(), "Income");
        assert_eq!(CategoryType::Transfer.as_str(), "Transfer");
    }
}
