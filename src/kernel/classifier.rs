use serde::{Deserialize, Serialize};
use std::fmt;

/// Emotional category an utterance is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCategory {
    Stress,
    Sadness,
    Anger,
    Fatigue,
    Positive,
    CalmingRequest,
    Default,
}

impl ResponseCategory {
    /// Every category, in rule priority order with `Default` last.
    pub const ALL: [ResponseCategory; 7] = [
        ResponseCategory::Stress,
        ResponseCategory::Sadness,
        ResponseCategory::Anger,
        ResponseCategory::Fatigue,
        ResponseCategory::Positive,
        ResponseCategory::CalmingRequest,
        ResponseCategory::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCategory::Stress => "stress",
            ResponseCategory::Sadness => "sadness",
            ResponseCategory::Anger => "anger",
            ResponseCategory::Fatigue => "fatigue",
            ResponseCategory::Positive => "positive",
            ResponseCategory::CalmingRequest => "calming_request",
            ResponseCategory::Default => "default",
        }
    }
}

impl fmt::Display for ResponseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the keyword table.
#[derive(Debug)]
pub struct KeywordRule {
    pub category: ResponseCategory,
    pub keywords: &'static [&'static str],
}

/// Keyword rules in evaluation order. The first rule with any matching keyword wins,
/// so stress outranks sadness, sadness outranks anger, and so on.
pub const RULES: &[KeywordRule] = &[
    KeywordRule {
        category: ResponseCategory::Stress,
        keywords: &["stress", "anxious", "worried"],
    },
    KeywordRule {
        category: ResponseCategory::Sadness,
        keywords: &["sad", "upset", "cry"],
    },
    KeywordRule {
        category: ResponseCategory::Anger,
        keywords: &["angry", "frustrated", "mad"],
    },
    KeywordRule {
        category: ResponseCategory::Fatigue,
        keywords: &["tired", "exhausted", "drain"],
    },
    KeywordRule {
        category: ResponseCategory::Positive,
        keywords: &["good", "happy", "great"],
    },
    KeywordRule {
        category: ResponseCategory::CalmingRequest,
        keywords: &["breath", "calm", "relax"],
    },
];

/// PURE FUNCTION: utterance text -> category.
///
/// Case-insensitive substring search; keywords are plain lowercase ASCII so
/// "STRESSED" and "Stressful" both land in `Stress`. Empty input is `Default`.
pub fn classify(text: &str) -> ResponseCategory {
    let lowered = text.to_lowercase();

    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| lowered.contains(kw)))
        .map(|rule| rule.category)
        .unwrap_or(ResponseCategory::Default)
}
