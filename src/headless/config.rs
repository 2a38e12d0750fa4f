//! JSON configuration parsing for headless mode

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::combat::ledger::EnemyKind;
use crate::settings::InputProfile;

/// Headless round configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessRoundConfig {
    /// Enemy waves, each a list of kind names (e.g. `["Skeleton", "Slime"]`)
    pub waves: Vec<Vec<String>>,
    /// "Desktop" (default) or "ReducedInput"
    #[serde(default = "default_input_profile")]
    pub input_profile: String,
    /// Custom output path for the round log (optional)
    #[serde(default)]
    pub output_path: Option<String>,
    /// Maximum round duration in seconds (default: 300)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Random seed for reproducible rounds
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_input_profile() -> String {
    "Desktop".to_string()
}

fn default_max_duration() -> f32 {
    300.0
}

impl HeadlessRoundConfig {
    /// Config with default settings for the given waves
    pub fn new(waves: Vec<Vec<String>>) -> Self {
        Self {
            waves,
            input_profile: default_input_profile(),
            output_path: None,
            max_duration_secs: default_max_duration(),
            random_seed: None,
        }
    }

    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: HeadlessRoundConfig =
            serde_json::from_str(json).map_err(|e| format!("Failed to parse JSON: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.waves.is_empty() {
            return Err("waves must contain at least one wave".to_string());
        }
        for (index, wave) in self.waves.iter().enumerate() {
            if wave.is_empty() {
                return Err(format!("wave {} has no enemies", index + 1));
            }
            for name in wave {
                Self::parse_kind(name)?;
            }
        }

        Self::parse_profile(&self.input_profile)?;

        if self.max_duration_secs <= 0.0 {
            return Err("max_duration_secs must be positive".to_string());
        }

        Ok(())
    }

    fn parse_kind(name: &str) -> Result<EnemyKind, String> {
        EnemyKind::parse(name).ok_or_else(|| {
            format!(
                "Unknown enemy: '{}'. Valid enemies: Skeleton, Zombie, Spider, Slime",
                name
            )
        })
    }

    fn parse_profile(name: &str) -> Result<InputProfile, String> {
        InputProfile::parse(name).ok_or_else(|| {
            format!(
                "Unknown input profile: '{}'. Valid profiles: Desktop, ReducedInput",
                name
            )
        })
    }

    pub fn input_profile(&self) -> Result<InputProfile, String> {
        Self::parse_profile(&self.input_profile)
    }

    /// Waves as enemy kinds
    pub fn enemy_waves(&self) -> Result<Vec<Vec<EnemyKind>>, String> {
        self.waves
            .iter()
            .map(|wave| wave.iter().map(|name| Self::parse_kind(name)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = HeadlessRoundConfig::from_json(r#"{ "waves": [["Skeleton"]] }"#).unwrap();
        assert_eq!(config.max_duration_secs, 300.0);
        assert_eq!(config.input_profile().unwrap(), InputProfile::Desktop);
        assert!(config.random_seed.is_none());
    }

    #[test]
    fn test_unknown_enemy_is_rejected() {
        let err = HeadlessRoundConfig::from_json(r#"{ "waves": [["Vampire"]] }"#).unwrap_err();
        assert!(err.contains("Vampire"));
    }

    #[test]
    fn test_empty_wave_is_rejected() {
        assert!(HeadlessRoundConfig::from_json(r#"{ "waves": [["Slime"], []] }"#).is_err());
        assert!(HeadlessRoundConfig::from_json(r#"{ "waves": [] }"#).is_err());
    }

    #[test]
    fn test_bad_profile_and_duration_are_rejected() {
        let mut config = HeadlessRoundConfig::new(vec![vec!["Zombie".to_string()]]);
        config.input_profile = "Gamepad".to_string();
        assert!(config.validate().is_err());

        config.input_profile = "ReducedInput".to_string();
        config.max_duration_secs = 0.0;
        assert!(config.validate().is_err());
    }
}
