use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum NeedType {
    #[serde(alias = "Puntual", alias = "puntual", alias = "punctual")]
    #[schemars(
        description = "One-off need. Spending is compared within the current calendar year, from January 1 up to the query date."
    )]
    Punctual,

    #[serde(alias = "Recurrente", alias = "recurrent", alias = "recurrente")]
    #[schemars(
        description = "Ongoing need. Spending is compared within the rolling window ending on the query date (5 years by default)."
    )]
    Recurrent,
}

impl NeedType {
    /// Lenient parse used at the ingestion boundary.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "puntual" | "punctual" => Some(Self::Punctual),
            "recurrent" | "recurrente" => Some(Self::Recurrent),
            _ => None,
        }
    }
}

impl fmt::Display for NeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Punctual => write!(f, "Punctual"),
            Self::Recurrent => write!(f, "Recurrent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: RecordId,
    pub contracting_body: String,
    pub need_type: Option<NeedType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: RecordId,
    pub contract_id: RecordId,
    /// Date the lot's award was signed. Lots without one never enter a splitting window.
    pub formalization_date: Option<NaiveDate>,
    pub cpv_code: Option<String>,
}

/// A credit line after boundary defaulting: amounts are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub id: RecordId,
    pub lot_id: RecordId,
    pub year: Option<i32>,
    pub committed: f64,
    pub recognized: f64,
}

impl Credit {
    pub fn real(&self) -> f64 {
        crate::rollup::credit_real(self.committed, self.recognized)
    }

    pub fn execution_percentage_precise(&self) -> f64 {
        crate::rollup::execution_percentage_precise(self.recognized, self.committed)
    }
}

/// Input of a splitting analysis. Missing values are checked (or defaulted) when the
/// analysis is invoked, not at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SplittingQuery {
    #[serde(default)]
    #[schemars(
        description = "CPV code of the prospective contract, e.g. '45210000-3'. Only the numeric body before the check digit is used."
    )]
    pub target_cpv: Option<String>,

    #[serde(default)]
    #[schemars(description = "Need type governing the time window. Required.")]
    pub need_type: Option<NeedType>,

    #[serde(default)]
    #[schemars(
        description = "Reference date in YYYY-MM-DD format. Defaults to today when absent."
    )]
    pub query_date: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(
        description = "Contracting bodies to report on, in output order. Must not be empty."
    )]
    pub contracting_bodies: Vec<String>,
}

impl SplittingQuery {
    pub fn new(
        target_cpv: impl Into<String>,
        need_type: NeedType,
        query_date: NaiveDate,
        contracting_bodies: Vec<String>,
    ) -> Self {
        Self {
            target_cpv: Some(target_cpv.into()),
            need_type: Some(need_type),
            query_date: Some(query_date),
            contracting_bodies,
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SplittingQuery)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
