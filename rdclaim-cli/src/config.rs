use anyhow::{Context, Result};
use config::{Config, ConfigError, File};
use rdclaim_engine::RuleSet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared_types::Percentage;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    pub rules: Option<RulesConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Overrides applied on top of the built-in rule set
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct RulesConfig {
    pub unconnected_cap: Option<Percentage>,
    pub paye_cap_threshold: Option<Decimal>,
    pub paye_cap_multiplier: Option<Decimal>,
    pub excluded_keywords: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "info" or "rdclaim_engine=debug"
    pub level: Option<String>,
    pub file: Option<String>,
}

const DEFAULT_CONFIG: &str = r#"
[rules]
# Share of eligible cost allowed for unconnected subcontractors and EPWs
# unconnected_cap = 65

# SME PAYE/NIC cap: threshold + multiplier x liability
# paye_cap_threshold = 20000
# paye_cap_multiplier = 3

# Lines whose name or description contains any of these are excluded
# excluded_keywords = ["dividend", "recharge"]

[logging]
level = "info"
# file = "/tmp/rdclaim.log"
"#;

impl EngineConfig {
    /// Load from `path`, or from the default location, creating it with
    /// commented defaults when missing.
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let config_path = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Message(format!(
                        "Config file not found at {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let config_path = get_config_path();

                // Create config directory if it doesn't exist
                if let Some(parent) = config_path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ConfigError::Message(format!("Failed to create config directory: {e}"))
                    })?;
                }

                if !config_path.exists() {
                    std::fs::write(&config_path, DEFAULT_CONFIG).map_err(|e| {
                        ConfigError::Message(format!("Failed to write default config: {e}"))
                    })?;
                }
                config_path
            }
        };

        let builder = Config::builder()
            .add_source(File::from(config_path.clone()))
            .build()?;

        let config: EngineConfig = builder.try_deserialize()?;

        Ok((config, config_path))
    }

    /// Built-in rules with this file's overrides applied.
    pub fn rule_set(&self) -> Result<RuleSet> {
        let mut rules = RuleSet::default();

        if let Some(overrides) = &self.rules {
            if let Some(cap) = overrides.unconnected_cap {
                rules = rules.with_unconnected_cap(cap);
            }
            if let Some(threshold) = overrides.paye_cap_threshold {
                rules.paye_cap.threshold = threshold;
            }
            if let Some(multiplier) = overrides.paye_cap_multiplier {
                rules.paye_cap.multiplier = multiplier;
            }
            if let Some(keywords) = &overrides.excluded_keywords {
                rules.excluded_keywords = keywords.clone();
            }
        }

        rules.validate().context("Invalid rule overrides in config")?;
        Ok(rules)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn log_file(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.file.as_deref())
    }
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("rdclaim").join("engine.toml")
    } else {
        PathBuf::from("engine.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared_types::CostCategory;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_parses() {
        let file = write_config(DEFAULT_CONFIG);
        let (config, _) = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.log_level(), Some("info"));
        assert_eq!(config.rule_set().unwrap(), RuleSet::default());
    }

    #[test]
    fn test_rule_overrides() {
        let file = write_config(
            r#"
[rules]
unconnected_cap = 50
paye_cap_threshold = 25000
excluded_keywords = ["dividend"]
"#,
        );
        let (config, _) = EngineConfig::load(Some(file.path())).unwrap();
        let rules = config.rule_set().unwrap();

        assert_eq!(
            rules
                .for_category(CostCategory::Epw)
                .unwrap()
                .unconnected_cap
                .unwrap()
                .whole(),
            dec!(50)
        );
        assert_eq!(rules.paye_cap.threshold, dec!(25000));
        assert_eq!(rules.paye_cap.multiplier, dec!(3));
        assert_eq!(rules.excluded_keywords, vec!["dividend".to_string()]);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let file = write_config("[rules]\npaye_cap_multiplier = -1\n");
        let (config, _) = EngineConfig::load(Some(file.path())).unwrap();
        assert!(config.rule_set().is_err());
    }

    #[test]
    fn test_missing_explicit_path() {
        let err = EngineConfig::load(Some(Path::new("/nonexistent/rdclaim.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
