//! Configuration for a companion session.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigResult;
use crate::kernel::classifier::ResponseCategory;
use crate::kernel::responses::{ResponsePool, GREETING};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    /// Display name of the listener persona.
    pub persona_name: String,
    /// Opening assistant message. `None` uses the built-in greeting;
    /// an empty string starts with an empty transcript.
    pub greeting: Option<String>,
    pub composition: CompositionConfig,
    pub voice: SynthesisSettings,
    /// Per-category replacements for the built-in reply pool.
    pub responses: ResponseOverrides,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            persona_name: "Serene".to_string(),
            greeting: None,
            composition: CompositionConfig::default(),
            voice: SynthesisSettings::default(),
            responses: ResponseOverrides::default(),
        }
    }
}

impl CompanionConfig {
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Greeting to seed the transcript with, if any.
    pub fn greeting_text(&self) -> Option<&str> {
        match self.greeting.as_deref() {
            None => Some(GREETING),
            Some(text) if text.trim().is_empty() => None,
            Some(text) => Some(text),
        }
    }

    /// Validated reply pool: built-ins plus overrides.
    pub fn response_pool(&self) -> ConfigResult<ResponsePool> {
        ResponsePool::with_overrides(self.responses.to_map())
    }
}

/// Replacement candidate lists, one optional list per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResponseOverrides {
    pub stress: Option<Vec<String>>,
    pub sadness: Option<Vec<String>>,
    pub anger: Option<Vec<String>>,
    pub fatigue: Option<Vec<String>>,
    pub positive: Option<Vec<String>>,
    pub calming_request: Option<Vec<String>>,
    pub default: Option<Vec<String>>,
}

impl ResponseOverrides {
    pub fn to_map(&self) -> HashMap<ResponseCategory, Vec<String>> {
        let slots = [
            (ResponseCategory::Stress, &self.stress),
            (ResponseCategory::Sadness, &self.sadness),
            (ResponseCategory::Anger, &self.anger),
            (ResponseCategory::Fatigue, &self.fatigue),
            (ResponseCategory::Positive, &self.positive),
            (ResponseCategory::CalmingRequest, &self.calming_request),
            (ResponseCategory::Default, &self.default),
        ];
        slots
            .into_iter()
            .filter_map(|(category, list)| list.clone().map(|l| (category, l)))
            .collect()
    }
}

/// Reply composition timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Base "thinking" pause before the reply is appended.
    pub delay_ms: u64,
    /// Extra random pause in `0..=jitter_ms`.
    pub jitter_ms: u64,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1500,
            jitter_ms: 0,
        }
    }
}

impl CompositionConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Speech synthesis parameters, tuned for a gentle, calm delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    /// 1.0 is the platform's normal speed.
    pub rate: f32,
    /// 1.0 is the platform's normal pitch.
    pub pitch: f32,
    /// 0.0 - 1.0
    pub volume: f32,
    pub language: String,
    /// Substrings matched case-insensitively against platform voice names, in preference order.
    pub preferred_voices: Vec<String>,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            rate: 0.8,
            pitch: 1.1,
            volume: 0.9,
            language: "en-US".to_string(),
            preferred_voices: vec![
                "female".to_string(),
                "samantha".to_string(),
                "alex".to_string(),
            ],
        }
    }
}

impl SynthesisSettings {
    /// First available voice matching a preference, in preference order.
    pub fn resolve_voice(&self, available: &[String]) -> Option<String> {
        self.preferred_voices.iter().find_map(|pref| {
            let pref = pref.to_lowercase();
            available
                .iter()
                .find(|name| name.to_lowercase().contains(&pref))
                .cloned()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = CompanionConfig::from_toml_str("").unwrap();
        assert_eq!(config.persona_name, "Serene");
        assert_eq!(config.composition.delay_ms, 1500);
        assert_eq!(config.voice.rate, 0.8);
        assert_eq!(config.greeting_text(), Some(GREETING));
    }

    #[test]
    fn test_partial_sections() {
        let raw = r#"
            greeting = ""

            [composition]
            jitter_ms = 1000

            [voice]
            preferred_voices = ["karen"]

            [responses]
            positive = ["That's wonderful to hear."]
        "#;
        let config = CompanionConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.greeting_text(), None);
        assert_eq!(config.composition.delay_ms, 1500);
        assert_eq!(config.composition.jitter_ms, 1000);
        assert_eq!(config.voice.pitch, 1.1);

        let pool = config.response_pool().unwrap();
        assert_eq!(
            pool.candidates(ResponseCategory::Positive),
            &["That's wonderful to hear.".to_string()]
        );
        assert_eq!(pool.candidates(ResponseCategory::Default).len(), 6);
    }

    #[test]
    fn test_empty_response_override_rejected() {
        let raw = "[responses]\nanger = []\n";
        let config = CompanionConfig::from_toml_str(raw).unwrap();
        assert!(matches!(
            config.response_pool(),
            Err(ConfigError::EmptyPool { .. })
        ));
    }

    #[test]
    fn test_unknown_category_is_parse_error() {
        let raw = "[responses]\njoy = [\"yay\"]\n";
        assert!(matches!(
            CompanionConfig::from_toml_str(raw),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_voice_preference_order() {
        let settings = SynthesisSettings::default();
        let voices = vec![
            "Alex".to_string(),
            "Samantha".to_string(),
            "Daniel".to_string(),
        ];
        assert_eq!(settings.resolve_voice(&voices), Some("Samantha".to_string()));
        assert_eq!(settings.resolve_voice(&["Daniel".to_string()]), None);
    }
}
