//! Vibe policy model.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inclusive range with optional bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundedRange<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> BoundedRange<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    /// True when both bounds are present and inverted.
    pub fn is_inverted(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min > max)
    }

    /// Only the bounds that are present are checked.
    pub fn contains(&self, value: T) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// A party's declared musical policy.
///
/// Produced elsewhere from a free-text vibe description and treated here as
/// read-only input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VibeRuleSet {
    pub allowed_genres: Option<Vec<String>>,
    pub blocked_genres: Vec<String>,
    pub allowed_moods: Option<Vec<String>>,
    pub blocked_moods: Vec<String>,
    pub allowed_era_range: Option<BoundedRange<i32>>,
    pub energy_range: Option<BoundedRange<f32>>,
    pub explicit_allowed: bool,
    pub blocked_artists: Vec<String>,
    pub priority_artists: Vec<String>,
    pub custom_rules: Vec<String>,
}

impl VibeRuleSet {
    pub fn validate(&self) -> Result<()> {
        if self.allowed_era_range.is_some_and(|r| r.is_inverted()) {
            bail!("allowedEraRange min must not exceed max");
        }
        if self.energy_range.is_some_and(|r| r.is_inverted()) {
            bail!("energyRange min must not exceed max");
        }
        Ok(())
    }

    /// Parse and validate a rule set from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        let rule_set: Self = serde_json::from_str(json).context("Invalid vibe rule set JSON")?;
        rule_set.validate()?;
        Ok(rule_set)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vibe file: {:?}", path))?;
        Self::from_json(&content).with_context(|| format!("Failed to parse vibe file: {:?}", path))
    }

    /// Allowed moods, trimmed and lowercased, blanks dropped.
    pub fn allowed_mood_keys(&self) -> Vec<String> {
        self.allowed_moods
            .iter()
            .flatten()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect()
    }

    pub fn blocked_mood_keys(&self) -> Vec<String> {
        self.blocked_moods
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect()
    }

    pub fn blocked_artist_keys(&self) -> Vec<String> {
        self.blocked_artists
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

/// Outcome of checking one entry against a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibeCheckResult {
    pub matches: bool,
    pub reason: String,
}

impl VibeCheckResult {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            matches: true,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            matches: false,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains_with_optional_bounds() {
        let open = BoundedRange::<i32>::default();
        assert!(open.contains(1900));

        let from_2000 = BoundedRange::new(Some(2000), None);
        assert!(from_2000.contains(2000));
        assert!(!from_2000.contains(1999));

        let until_1990 = BoundedRange::new(None, Some(1990));
        assert!(until_1990.contains(1975));
        assert!(!until_1990.contains(1991));
    }

    #[test]
    fn test_validate_rejects_inverted_ranges() {
        let rules = VibeRuleSet {
            allowed_era_range: Some(BoundedRange::new(Some(2010), Some(2000))),
            ..Default::default()
        };
        assert!(rules.validate().is_err());

        let rules = VibeRuleSet {
            energy_range: Some(BoundedRange::new(Some(0.9), Some(0.1))),
            ..Default::default()
        };
        assert!(rules.validate().is_err());

        let rules = VibeRuleSet {
            allowed_era_range: Some(BoundedRange::new(Some(2000), Some(2000))),
            ..Default::default()
        };
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_from_json_camel_case_and_defaults() {
        let rules = VibeRuleSet::from_json(
            r#"{
                "allowedMoods": ["Sad", "chill"],
                "blockedArtists": ["Nickelback"],
                "allowedEraRange": {"min": 2000}
            }"#,
        )
        .unwrap();
        assert_eq!(rules.allowed_mood_keys(), vec!["sad", "chill"]);
        assert_eq!(rules.blocked_artist_keys(), vec!["nickelback"]);
        assert_eq!(rules.allowed_era_range.unwrap().min, Some(2000));
        assert!(rules.blocked_moods.is_empty());
        assert!(!rules.explicit_allowed);
    }

    #[test]
    fn test_from_json_rejects_inverted_range() {
        let result = VibeRuleSet::from_json(r#"{"allowedEraRange": {"min": 2020, "max": 1990}}"#);
        assert!(result.is_err());
    }
}
