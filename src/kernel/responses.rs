//! Canned response texts and the validated per-category pool.

use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};
use crate::kernel::classifier::ResponseCategory;

pub const GREETING: &str = "Hello, I'm Serene. I'm here to listen and support you. How are you feeling today? Take your time - there's no rush. 💙";

pub const GUIDED_BREATHING: &str = "Let's take a moment for a calming breathing exercise. Find a comfortable position. Now, breathe in slowly through your nose for four counts... one, two, three, four. Hold your breath gently for four counts... one, two, three, four. Now breathe out slowly through your mouth for six counts... one, two, three, four, five, six. You're doing beautifully. Let's do this two more times together.";

pub const AFFIRMATION: &str = "You are enough, exactly as you are. This moment is temporary, and you have the strength to get through it. I believe in you.";

const STRESS: &[&str] = &[
    "I hear that you're feeling stressed. That's completely understandable - life can feel overwhelming sometimes. Would you like to try a gentle breathing exercise with me? Just breathe in slowly for 4 counts, hold for 4, then breathe out for 6. You're safe here. 🌸",
    "I hear that you're feeling stressed. Let's take a moment together. Breathe in slowly with me... and breathe out. You're safe here, and this feeling will pass.",
];

const SADNESS: &[&str] = &[
    "I'm so sorry you're feeling this way. Your feelings are completely valid, and it's okay to not be okay sometimes. You don't have to go through this alone. Would you like to talk more about what's weighing on your heart? 💙",
    "I'm so sorry you're feeling this way. Your feelings are completely valid. Remember, you don't have to carry this alone. I'm here with you.",
];

const ANGER: &[&str] = &[
    "I can sense your frustration, and that must be really difficult. Sometimes anger is our heart's way of protecting us. Take a moment to breathe with me. What would help you feel a little lighter right now? 🌿",
];

const FATIGUE: &[&str] = &[
    "It sounds like you're carrying a lot right now. Being tired isn't just about sleep - sometimes our hearts get tired too. You deserve rest and gentleness. What's one small thing that might bring you a moment of peace today? ✨",
];

const POSITIVE: &[&str] = &[
    "I'm so glad to hear you're feeling good! Those moments of lightness are precious. What's bringing you joy today? Remember to hold onto this feeling - you deserve all the happiness in the world. 🌻",
];

const CALMING_REQUEST: &[&str] = &[
    "Let's breathe together. Find a comfortable position and place one hand on your chest, one on your belly. Breathe in slowly through your nose for 4 counts... hold for 4... and breathe out through your mouth for 6. You're doing beautifully. Would you like to continue this for a few more breaths? 🌊",
];

const DEFAULT: &[&str] = &[
    "Thank you for sharing that with me. Your feelings matter, and I'm here to listen. What's on your mind right now? 💙",
    "I hear you, and I want you to know that whatever you're going through, you don't have to face it alone. Would you like to tell me more? 🌸",
    "That sounds important to you. I'm here to listen without judgment. Take your time - there's no pressure at all. ✨",
    "I'm grateful you felt comfortable sharing that with me. How are you taking care of yourself today? 🌿",
    "Your feelings are valid, and it's okay to take things one moment at a time. What would feel most supportive right now? 💙",
    "Thank you for sharing that with me. Your voice matters, and I'm here to listen. Whatever you're feeling right now is okay.",
];

fn builtin_entries(category: ResponseCategory) -> &'static [&'static str] {
    match category {
        ResponseCategory::Stress => STRESS,
        ResponseCategory::Sadness => SADNESS,
        ResponseCategory::Anger => ANGER,
        ResponseCategory::Fatigue => FATIGUE,
        ResponseCategory::Positive => POSITIVE,
        ResponseCategory::CalmingRequest => CALMING_REQUEST,
        ResponseCategory::Default => DEFAULT,
    }
}

/// Candidate replies per category. Every category has at least one non-blank entry;
/// construction fails otherwise, so lookups never come back empty.
#[derive(Debug, Clone)]
pub struct ResponsePool {
    entries: HashMap<ResponseCategory, Vec<String>>,
}

impl ResponsePool {
    /// Build a pool from explicit entries. All categories must be present.
    pub fn new(mut entries: HashMap<ResponseCategory, Vec<String>>) -> ConfigResult<Self> {
        for category in ResponseCategory::ALL {
            let list = entries.entry(category).or_default();
            if list.is_empty() {
                return Err(ConfigError::EmptyPool { category });
            }
            if list.iter().any(|s| s.trim().is_empty()) {
                return Err(ConfigError::BlankResponse { category });
            }
        }
        Ok(Self { entries })
    }

    pub fn builtin() -> Self {
        let entries = ResponseCategory::ALL
            .iter()
            .map(|c| {
                let list = builtin_entries(*c).iter().map(|s| s.to_string()).collect();
                (*c, list)
            })
            .collect();
        Self { entries }
    }

    /// Built-in pool with some categories replaced.
    pub fn with_overrides(overrides: HashMap<ResponseCategory, Vec<String>>) -> ConfigResult<Self> {
        let mut entries = Self::builtin().entries;
        entries.extend(overrides);
        Self::new(entries)
    }

    pub fn candidates(&self, category: ResponseCategory) -> &[String] {
        self.entries
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, category: ResponseCategory, text: &str) -> bool {
        self.candidates(category).iter().any(|c| c == text)
    }
}

impl Default for ResponsePool {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_pool_is_valid() {
        let pool = ResponsePool::builtin();
        let rebuilt = ResponsePool::new(pool.entries.clone());
        assert!(rebuilt.is_ok());
        for category in ResponseCategory::ALL {
            assert!(!pool.candidates(category).is_empty());
        }
    }

    #[test]
    fn test_pool_shape() {
        let pool = ResponsePool::builtin();
        assert_eq!(pool.candidates(ResponseCategory::Stress).len(), 2);
        assert_eq!(pool.candidates(ResponseCategory::Sadness).len(), 2);
        assert_eq!(pool.candidates(ResponseCategory::CalmingRequest).len(), 1);
        assert_eq!(pool.candidates(ResponseCategory::Default).len(), 6);
    }

    #[test]
    fn test_empty_override_is_fatal() {
        let mut overrides = HashMap::new();
        overrides.insert(ResponseCategory::Anger, Vec::new());
        let err = ResponsePool::with_overrides(overrides).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EmptyPool { category: ResponseCategory::Anger }
        ));
    }

    #[test]
    fn test_blank_entry_is_fatal() {
        let mut overrides = HashMap::new();
        overrides.insert(ResponseCategory::Positive, vec!["  ".to_string()]);
        assert!(matches!(
            ResponsePool::with_overrides(overrides),
            Err(ConfigError::BlankResponse { .. })
        ));
    }

    #[test]
    fn test_missing_category_is_fatal() {
        let mut entries = HashMap::new();
        entries.insert(ResponseCategory::Stress, vec!["breathe".to_string()]);
        assert!(ResponsePool::new(entries).is_err());
    }
}
