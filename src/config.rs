use crate::constants;
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env::VarError;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "review_pipeline.toml";
pub const CONFIG_PATH_ENV: &str = "REVIEW_PIPELINE_CONFIG";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSettings,
    pub sentiment: SentimentSettings,
    pub storage: StorageSettings,
    pub banks: Vec<BankSource>,
    /// keyword -> theme; an empty table selects the built-in banking taxonomy
    pub themes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub top_n: usize,
    pub max_features: usize,
    pub ngram_max: usize,
    pub default_source: String,
    pub data_dir: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_n: 5,
            max_features: 1000,
            ngram_max: 2,
            default_source: constants::DEFAULT_SOURCE.to_string(),
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentimentSettings {
    pub positive_threshold: f64,
    pub negative_threshold: f64,
    pub lexicon_path: Option<PathBuf>,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            positive_threshold: 0.05,
            negative_threshold: -0.05,
            lexicon_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database_path: PathBuf,
    pub output_dir: PathBuf,
    pub dump_path: PathBuf,
    pub log_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("output/reviews.db"),
            output_dir: PathBuf::from("output"),
            dump_path: PathBuf::from("output/database_dump.sql"),
            log_dir: "logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BankSource {
    pub name: String,
    pub file: String,
}

impl Config {
    /// Load from an explicit path, `$REVIEW_PIPELINE_CONFIG`, or `review_pipeline.toml`.
    ///
    /// A missing default file yields the built-in defaults; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match config_path_from_env(std::env::var(CONFIG_PATH_ENV))? {
                Some(p) => (p, true),
                None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
            },
        };

        if !path.exists() && !required {
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.top_n == 0 {
            return Err(PipelineError::Config("pipeline.top_n must be at least 1".to_string()));
        }
        if self.pipeline.ngram_max == 0 {
            return Err(PipelineError::Config("pipeline.ngram_max must be at least 1".to_string()));
        }
        if self.pipeline.max_features == 0 {
            return Err(PipelineError::Config(
                "pipeline.max_features must be at least 1".to_string(),
            ));
        }
        let (negative, positive) = (
            self.sentiment.negative_threshold,
            self.sentiment.positive_threshold,
        );
        if !(negative <= 0.0 && 0.0 <= positive) {
            return Err(PipelineError::Config(format!(
                "sentiment thresholds must satisfy \
                 negative_threshold ({}) <= 0 <= positive_threshold ({})",
                negative, positive
            )));
        }
        // Theme lists are stored comma-joined
        if let Some((keyword, theme)) = self.themes.iter().find(|(_, theme)| theme.contains(',')) {
            return Err(PipelineError::Config(format!(
                "theme '{}' for keyword '{}' must not contain a comma",
                theme, keyword
            )));
        }
        Ok(())
    }

    /// Configured banks, falling back to the three default bank files.
    pub fn bank_sources(&self) -> Vec<BankSource> {
        if !self.banks.is_empty() {
            return self.banks.clone();
        }
        constants::default_banks()
            .into_iter()
            .map(|(name, file)| BankSource {
                name: name.to_string(),
                file: file.to_string(),
            })
            .collect()
    }
}

/// Path named by the config env var. Unset or blank means none; a value that is
/// not valid unicode is an error rather than a silent fallback.
fn config_path_from_env(value: std::result::Result<String, VarError>) -> Result<Option<PathBuf>> {
    match value {
        Ok(p) if !p.trim().is_empty() => Ok(Some(PathBuf::from(p.trim()))),
        Ok(_) | Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.pipeline.top_n, 5);
        assert_eq!(config.pipeline.default_source, "Google Play");
        assert!((config.sentiment.positive_threshold - 0.05).abs() < f64::EPSILON);
        assert!((config.sentiment.negative_threshold + 0.05).abs() < f64::EPSILON);
        assert!(config.themes.is_empty());
        assert_eq!(config.bank_sources().len(), 3);
    }

    #[test]
    fn test_parses_sections() {
        let config = Config::from_toml_str(
            r#"
            [pipeline]
            top_n = 3

            [sentiment]
            positive_threshold = 0.2

            [[banks]]
            name = "BOA"
            file = "boa.csv"

            [themes]
            login = "Account Access"
            "money transfer" = "Transactions"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.top_n, 3);
        assert_eq!(config.pipeline.max_features, 1000);
        assert!((config.sentiment.positive_threshold - 0.2).abs() < f64::EPSILON);
        assert_eq!(
            config.bank_sources(),
            vec![BankSource {
                name: "BOA".to_string(),
                file: "boa.csv".to_string()
            }]
        );
        assert_eq!(config.themes.get("money transfer").map(String::as_str), Some("Transactions"));
    }

    #[test]
    fn test_rejects_invalid_settings() {
        assert!(Config::from_toml_str("[pipeline]\ntop_n = 0").is_err());
        assert!(Config::from_toml_str(
            "[sentiment]\npositive_threshold = -0.5\nnegative_threshold = 0.5"
        )
        .is_err());
    }

    #[test]
    fn test_thresholds_must_straddle_zero() {
        let thresholds = |positive: f64, negative: f64| {
            Config::from_toml_str(&format!(
                "[sentiment]\npositive_threshold = {positive:?}\nnegative_threshold = {negative:?}"
            ))
        };
        assert!(thresholds(-0.1, -0.2).is_err());
        assert!(thresholds(0.3, 0.1).is_err());
        assert!(thresholds(0.0, 0.0).is_ok());
        assert!(thresholds(0.05, -0.05).is_ok());
    }

    #[test]
    fn test_rejects_comma_in_theme_name() {
        let err = Config::from_toml_str("[themes]\nfee = \"Fees, Charges\"").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(Config::from_toml_str("[themes]\nfee = \"Fees and Charges\"").is_ok());
    }

    #[test]
    fn test_config_path_from_env() {
        assert_eq!(config_path_from_env(Err(VarError::NotPresent)).unwrap(), None);
        assert_eq!(config_path_from_env(Ok("  ".to_string())).unwrap(), None);
        assert_eq!(
            config_path_from_env(Ok("conf/pipeline.toml".to_string())).unwrap(),
            Some(PathBuf::from("conf/pipeline.toml"))
        );
        let err = config_path_from_env(Err(VarError::NotUnicode("bad".into()))).unwrap_err();
        assert!(matches!(err, PipelineError::Env(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
