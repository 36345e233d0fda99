use crate::catalog::ContractingBodyCatalog;
use crate::error::{ProcurementError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_LOOKBACK_YEARS: u32 = 5;
pub const DEFAULT_RECURRENT_WINDOW_YEARS: u32 = 5;
/// Upper bound for `lookback_years` and `recurrent_window_years`.
pub const MAX_YEAR_SPAN: u32 = 200;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum EmptyPrefixPolicy {
    #[default]
    #[schemars(
        description = "A target without CPV digits matches no record. The escalation probe is skipped."
    )]
    MatchNone,

    #[schemars(description = "A target without CPV digits matches every record that has a CPV code.")]
    MatchAll,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzerConfig {
    #[serde(default = "default_lookback_years")]
    #[schemars(
        description = "Fiscal years before the query year whose credits are read as candidates."
    )]
    pub lookback_years: u32,

    #[serde(default = "default_recurrent_window_years")]
    #[schemars(description = "Length in years of the window applied to Recurrent needs.")]
    pub recurrent_window_years: u32,

    #[serde(default)]
    #[schemars(description = "What an empty significant CPV prefix matches.")]
    pub empty_prefix_policy: EmptyPrefixPolicy,

    #[serde(default)]
    #[schemars(
        description = "Catalog of valid contracting bodies. Requested bodies outside it are rejected. Empty means unrestricted."
    )]
    pub contracting_bodies: Vec<String>,

    #[serde(default)]
    #[schemars(
        description = "Optional minor-contract threshold. Bodies whose windowed total reaches it are flagged."
    )]
    pub minor_contract_threshold: Option<f64>,
}

fn default_lookback_years() -> u32 {
    DEFAULT_LOOKBACK_YEARS
}

fn default_recurrent_window_years() -> u32 {
    DEFAULT_RECURRENT_WINDOW_YEARS
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            lookback_years: DEFAULT_LOOKBACK_YEARS,
            recurrent_window_years: DEFAULT_RECURRENT_WINDOW_YEARS,
            empty_prefix_policy: EmptyPrefixPolicy::default(),
            contracting_bodies: Vec::new(),
            minor_contract_threshold: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.recurrent_window_years == 0 {
            return Err(ProcurementError::ConfigurationError(
                "recurrent_window_years must be at least 1".to_string(),
            ));
        }

        for (name, years) in [
            ("lookback_years", self.lookback_years),
            ("recurrent_window_years", self.recurrent_window_years),
        ] {
            if years > MAX_YEAR_SPAN {
                return Err(ProcurementError::ConfigurationError(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_YEAR_SPAN, years
                )));
            }
        }

        if let Some(threshold) = self.minor_contract_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(ProcurementError::ConfigurationError(format!(
                    "minor_contract_threshold must be a non-negative amount, got {}",
                    threshold
                )));
            }
        }

        Ok(())
    }

    pub fn catalog(&self) -> ContractingBodyCatalog {
        ContractingBodyCatalog::new(&self.contracting_bodies)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalyzerConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
