//! # Procurement Execution
//!
//! Financial execution rollups and contract-splitting diagnostics for public-procurement
//! records organised as contract → lot → credit.
//!
//! ## Core Concepts
//!
//! - **Committed / Recognized**: the authorised ceiling of a credit line and the part of it
//!   formally booked as spent
//! - **Real amount**: committed minus recognized; negative on over-execution
//! - **Execution percentage**: recognized over committed, never clamped
//! - **Rollup**: per-credit figures averaged per lot, then lot averages averaged per contract
//! - **Splitting analysis**: committed spend per contracting body on the same CPV category
//!   inside the window implied by the need type, with match/mismatch diagnostics
//!
//! ## Example
//!
//! ```rust,ignore
//! use procurement_execution::*;
//! use chrono::NaiveDate;
//!
//! let (dataset, _report) = ProcurementDataset::from_path(
//!     "snapshot.json",
//!     &ContractingBodyCatalog::default(),
//! )?;
//!
//! let query = SplittingQuery::new(
//!     "45210000-3",
//!     NeedType::Punctual,
//!     NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
//!     vec!["Ajuntament".to_string()],
//! );
//!
//! let result = analyze_splitting(&dataset, &query)?;
//! println!("{}", result.to_markdown());
//! ```

pub mod catalog;
pub mod config;
pub mod cpv;
pub mod error;
pub mod ingestion;
pub mod report;
pub mod rollup;
pub mod schema;
pub mod source;
pub mod splitting;

pub use catalog::ContractingBodyCatalog;
pub use config::{AnalyzerConfig, EmptyPrefixPolicy};
pub use cpv::{cpv_depth, normalize_body, significant_prefix, CpvCode, CpvLevel};
pub use error::{ProcurementError, Result};
pub use ingestion::{IngestionReport, RawContract, RawCredit, RawLot, RawSnapshot};
pub use report::SplittingReport;
pub use rollup::{
    aggregate_contract, aggregate_contract_from_credits, aggregate_lot, ContractRollup,
    ContractSummary, LotRollup, LotSummary,
};
pub use schema::*;
pub use source::{CandidateRecord, ProcurementDataset, ProcurementSource};
pub use splitting::{
    BodyTotal, DateWindow, SplittingAnalyzer, SplittingDiagnostics, SplittingResult,
};

use chrono::{Local, NaiveDate};
use log::debug;
use std::path::Path;

pub struct ProcurementAnalyzer {
    splitting: SplittingAnalyzer,
}

impl ProcurementAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        debug!(
            "Analyzer configured: lookback {} years, recurrent window {} years, {:?}, {} catalogued bodies",
            config.lookback_years,
            config.recurrent_window_years,
            config.empty_prefix_policy,
            config.contracting_bodies.len()
        );
        Ok(Self {
            splitting: SplittingAnalyzer::new(config)?,
        })
    }

    pub fn from_config_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(AnalyzerConfig::from_path(path)?)
    }

    /// Analyzes against today's local date when the query carries none.
    pub fn analyze_splitting<S: ProcurementSource + ?Sized>(
        &self,
        source: &S,
        query: &SplittingQuery,
    ) -> Result<SplittingResult> {
        self.analyze_splitting_at(source, query, Local::now().date_naive())
    }

    pub fn analyze_splitting_at<S: ProcurementSource + ?Sized>(
        &self,
        source: &S,
        query: &SplittingQuery,
        today: NaiveDate,
    ) -> Result<SplittingResult> {
        self.splitting.analyze(source, query, today)
    }
}

pub fn compute_credit_real(committed: f64, recognized: f64) -> f64 {
    rollup::credit_real(committed, recognized)
}

pub fn compute_execution_percentage(recognized: f64, committed: f64) -> f64 {
    rollup::execution_percentage(recognized, committed)
}

pub fn compute_execution_percentage_precise(recognized: f64, committed: f64) -> f64 {
    rollup::execution_percentage_precise(recognized, committed)
}

/// Splitting analysis with the default configuration.
pub fn analyze_splitting<S: ProcurementSource + ?Sized>(
    source: &S,
    query: &SplittingQuery,
) -> Result<SplittingResult> {
    ProcurementAnalyzer::new(AnalyzerConfig::default())?.analyze_splitting(source, query)
}
