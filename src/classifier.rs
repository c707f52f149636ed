// 🏷️ Merchant Classifier - pattern scoring + MCC fallback
//
// classify(description, mcc_code) resolves in three phases:
// 1. Pattern phase: substring scan of every merchant's patterns against
//    the normalized description; best match wins (longest pattern, then
//    higher prior, then smallest merchant key).
// 2. Code phase: MCC table lookup, only when no pattern matched.
// 3. Fallback: "Uncategorized" with zero confidence.
//
// Substring matching (not word-boundary) is deliberate: processors
// append reference numbers, store numbers, and city/state codes that
// would break token-exact matching.

use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::knowledge::{KnowledgeBase, MerchantRecord, UNCATEGORIZED};

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize a raw transaction description for matching.
///
/// Upper-cases and collapses internal whitespace; punctuation stays
/// intact because knowledge-base patterns may include it ("WAL-MART").
///
/// Example: "  Amazon.com*ab12cd34 " → "AMAZON.COM*AB12CD34"
pub fn normalize_description(description: &str) -> String {
    description
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

/// Which rule produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchBasis {
    /// A merchant pattern matched the description
    Pattern,

    /// No pattern matched; the MCC code was found in the MCC table
    Code,

    /// Nothing matched
    None,
}

impl MatchBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchBasis::Pattern => "PATTERN",
            MatchBasis::Code => "CODE",
            MatchBasis::None => "NONE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    /// Matched merchant's key, absent when no pattern matched
    pub merchant_key: Option<String>,

    /// Resolved category label ("Uncategorized" when nothing applies)
    pub category: String,

    /// 0-100
    pub confidence: u8,

    pub match_basis: MatchBasis,
}

impl ClassificationResult {
    /// The defined no-match result. Not an error; callers decide whether
    /// it needs manual review.
    pub fn uncategorized() -> Self {
        ClassificationResult {
            merchant_key: None,
            category: UNCATEGORIZED.to_string(),
            confidence: 0,
            match_basis: MatchBasis::None,
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Pure classifier over an immutable knowledge base.
///
/// Holds an `Arc<KnowledgeBase>`, so it is cheap to clone and safe to
/// invoke from any number of threads with no locking.
#[derive(Clone)]
pub struct Classifier {
    knowledge: Arc<KnowledgeBase>,
}

impl Classifier {
    pub fn new(knowledge: KnowledgeBase) -> Self {
        Classifier {
            knowledge: Arc::new(knowledge),
        }
    }

    /// Build from an already-shared knowledge base (snapshot from
    /// `SharedKnowledge`, or an `Arc` the caller keeps elsewhere)
    pub fn from_shared(knowledge: Arc<KnowledgeBase>) -> Self {
        Classifier { knowledge }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Classify a raw transaction description, with an optional MCC code.
    ///
    /// Untrusted, arbitrary-length input is fine; the empty string is
    /// valid and never matches. An MCC code absent from the MCC table is
    /// simply unused, not an error.
    pub fn classify(&self, description: &str, mcc_code: Option<&str>) -> ClassificationResult {
        let normalized = normalize_description(description);

        if let Some(result) = self.match_patterns(&normalized) {
            return result;
        }

        if let Some(code) = mcc_code {
            if let Some(category) = self.knowledge.mcc_category(code) {
                debug!(mcc = %code, category, "classified by MCC code");
                return ClassificationResult {
                    merchant_key: None,
                    category: category.to_string(),
                    confidence: self.knowledge.mcc_confidence,
                    match_basis: MatchBasis::Code,
                };
            }
        }

        ClassificationResult::uncategorized()
    }

    /// Pattern phase: scan every merchant, keep the best match.
    ///
    /// Tie-break: (a) longest matching pattern, (b) higher static
    /// confidence, (c) lexicographically smallest merchant key. The
    /// merchant table iterates in key order and the best candidate is
    /// only replaced on a strict improvement, so (c) holds for free.
    fn match_patterns(&self, normalized: &str) -> Option<ClassificationResult> {
        let mut best: Option<(&str, &MerchantRecord, &str)> = None;

        for (key, record) in &self.knowledge.merchants {
            let Some(pattern) = record.longest_matching_pattern(normalized) else {
                continue;
            };

            let improves = match best {
                None => true,
                Some((_, best_record, best_pattern)) => {
                    pattern.len() > best_pattern.len()
                        || (pattern.len() == best_pattern.len()
                            && record.confidence > best_record.confidence)
                }
            };

            if improves {
                best = Some((key.as_str(), record, pattern));
            }
        }

        best.map(|(key, record, pattern)| {
            debug!(merchant = %key, pattern, "classified by pattern");
            ClassificationResult {
                merchant_key: Some(key.to_string()),
                category: record.suggested_category.clone(),
                confidence: record.confidence,
                match_basis: MatchBasis::Pattern,
            }
        })
    }
}

// ============================================================================
// SHARED KNOWLEDGE (hot reload)
// ============================================================================

/// Process-wide knowledge-base handle with atomic snapshot replacement.
///
/// Readers clone out an `Arc` snapshot and classify against that, so a
/// `replace` never exposes a partially updated table; in-flight
/// classifications keep the snapshot they started with.
pub struct SharedKnowledge {
    current: RwLock<Arc<KnowledgeBase>>,
}

impl SharedKnowledge {
    pub fn new(knowledge: KnowledgeBase) -> Self {
        SharedKnowledge {
            current: RwLock::new(Arc::new(knowledge)),
        }
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        self.current.read().unwrap().clone()
    }

    /// A classifier bound to the current snapshot
    pub fn classifier(&self) -> Classifier {
        Classifier::from_shared(self.snapshot())
    }

    /// Swap in a replacement knowledge base; returns the previous one
    pub fn replace(&self, knowledge: KnowledgeBase) -> Arc<KnowledgeBase> {
        let mut current = self.current.write().unwrap();
        std::mem::replace(&mut *current, Arc::new(knowledge))
    }
}

// ============================================================================
// TESTS
// ============================================================================
