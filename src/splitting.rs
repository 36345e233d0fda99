//! Contract-splitting diagnostics.
//!
//! For a prospective contract (CPV category, need type, reference date) the analyzer
//! totals the committed budget each contracting body has already spent on the same
//! category inside the applicable window. Each candidate record is run through three
//! independent checks (window, CPV, body); all three are counted separately so the
//! diagnostics still explain a zero total.

use crate::catalog::ContractingBodyCatalog;
use crate::config::{AnalyzerConfig, EmptyPrefixPolicy};
use crate::cpv::{significant_prefix, CpvCode};
use crate::error::{ProcurementError, Result};
use crate::schema::{NeedType, SplittingQuery};
use crate::source::{CandidateRecord, ProcurementSource};
use chrono::{Datelike, Months, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window applied to lots for the given need type, both ends inclusive.
    pub fn for_need(need_type: NeedType, query_date: NaiveDate, recurrent_years: u32) -> Self {
        let start = match need_type {
            NeedType::Punctual => query_date.with_ordinal(1).unwrap_or(query_date),
            NeedType::Recurrent => query_date
                .checked_sub_months(Months::new(recurrent_years.saturating_mul(12)))
                .unwrap_or(NaiveDate::MIN),
        };
        Self {
            start,
            end: query_date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyTotal {
    pub contracting_body: String,
    pub total_committed: f64,
    pub matched_records: usize,
    /// Present only when a minor-contract threshold is configured.
    pub exceeds_threshold: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplittingDiagnostics {
    pub total_records: usize,
    pub window_matches: usize,
    pub cpv_matches: usize,
    pub body_matches: usize,
    pub final_matches: usize,
    /// Records that failed the window check (including lots without a formalization date).
    pub year_mismatch: usize,
    pub cpv_mismatch: usize,
    pub body_mismatch: usize,
    pub prefix_used: String,
    pub sample_cpv: Option<String>,
    pub distinct_cpvs: BTreeSet<String>,
    pub lot_exists_without_credit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplittingResult {
    pub target_cpv: Option<String>,
    pub need_type: NeedType,
    pub query_date: NaiveDate,
    pub window: DateWindow,
    pub per_body_totals: Vec<BodyTotal>,
    pub diagnostics: SplittingDiagnostics,
}

impl SplittingResult {
    pub fn total_for(&self, body: &str) -> Option<f64> {
        self.per_body_totals
            .iter()
            .find(|t| t.contracting_body == body)
            .map(|t| t.total_committed)
    }

    pub fn grand_total(&self) -> f64 {
        self.per_body_totals.iter().map(|t| t.total_committed).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Checks {
    window: bool,
    cpv: bool,
    body: bool,
}

impl Checks {
    fn all(self) -> bool {
        self.window && self.cpv && self.body
    }
}

/// Query inputs after validation and defaulting.
#[derive(Debug, Clone)]
struct ResolvedQuery {
    prefix: String,
    need_type: NeedType,
    query_date: NaiveDate,
    window: DateWindow,
    bodies: Vec<String>,
}

pub struct SplittingAnalyzer {
    config: AnalyzerConfig,
    catalog: ContractingBodyCatalog,
}

impl SplittingAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        let catalog = config.catalog();
        Ok(Self { config, catalog })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Runs one analysis. `today` stands in for a missing `query.query_date`.
    ///
    /// Fails with a configuration error before touching `source` when the need type is
    /// unset, no contracting body is requested, or a body is outside the catalog. A read
    /// failure is returned as is and no totals are produced.
    pub fn analyze<S: ProcurementSource + ?Sized>(
        &self,
        source: &S,
        query: &SplittingQuery,
        today: NaiveDate,
    ) -> Result<SplittingResult> {
        let resolved = self.resolve(query, today)?;

        info!(
            "Splitting analysis: prefix '{}', need {}, query date {}, {} bodies",
            resolved.prefix,
            resolved.need_type,
            resolved.query_date,
            resolved.bodies.len()
        );

        let min_year = self.min_candidate_year(resolved.query_date)?;
        let records = source.candidate_credits(min_year)?;

        let (per_body_totals, mut diagnostics) = self.aggregate(&resolved, &records);

        if diagnostics.final_matches == 0 && !resolved.prefix.is_empty() {
            debug!(
                "No matching spend, probing for lots under prefix '{}'",
                resolved.prefix
            );
            diagnostics.lot_exists_without_credit =
                source.lot_exists_with_cpv_prefix(&resolved.prefix)?;
        }

        info!(
            "Splitting analysis done: {} of {} records matched",
            diagnostics.final_matches, diagnostics.total_records
        );

        Ok(SplittingResult {
            target_cpv: query.target_cpv.clone(),
            need_type: resolved.need_type,
            query_date: resolved.query_date,
            window: resolved.window,
            per_body_totals,
            diagnostics,
        })
    }

    /// Oldest fiscal year read as a candidate.
    fn min_candidate_year(&self, query_date: NaiveDate) -> Result<i32> {
        i32::try_from(self.config.lookback_years)
            .ok()
            .and_then(|years| query_date.year().checked_sub(years))
            .ok_or_else(|| {
                ProcurementError::ConfigurationError(format!(
                    "lookback_years {} cannot be applied to query year {}",
                    self.config.lookback_years,
                    query_date.year()
                ))
            })
    }

    fn resolve(&self, query: &SplittingQuery, today: NaiveDate) -> Result<ResolvedQuery> {
        let need_type = query.need_type.ok_or_else(|| {
            ProcurementError::ConfigurationError(
                "need type is required for a splitting analysis".to_string(),
            )
        })?;

        let mut bodies: Vec<String> = Vec::new();
        for body in &query.contracting_bodies {
            let body = body.trim();
            if body.is_empty() || bodies.iter().any(|b| b == body) {
                continue;
            }
            self.catalog.validate(body)?;
            bodies.push(body.to_string());
        }

        if bodies.is_empty() {
            return Err(ProcurementError::ConfigurationError(
                "at least one contracting body must be requested".to_string(),
            ));
        }

        let query_date = query.query_date.unwrap_or(today);
        let prefix = query
            .target_cpv
            .as_deref()
            .map(significant_prefix)
            .unwrap_or_default();

        Ok(ResolvedQuery {
            prefix,
            need_type,
            query_date,
            window: DateWindow::for_need(
                need_type,
                query_date,
                self.config.recurrent_window_years,
            ),
            bodies,
        })
    }

    fn aggregate(
        &self,
        query: &ResolvedQuery,
        records: &[CandidateRecord],
    ) -> (Vec<BodyTotal>, SplittingDiagnostics) {
        let mut totals: Vec<BodyTotal> = query
            .bodies
            .iter()
            .map(|body| BodyTotal {
                contracting_body: body.clone(),
                total_committed: 0.0,
                matched_records: 0,
                exceeds_threshold: None,
            })
            .collect();
        let index: HashMap<&str, usize> = query
            .bodies
            .iter()
            .enumerate()
            .map(|(i, body)| (body.as_str(), i))
            .collect();

        let mut diagnostics = SplittingDiagnostics {
            total_records: records.len(),
            prefix_used: query.prefix.clone(),
            ..SplittingDiagnostics::default()
        };

        for record in records {
            if let Some(code) = record.cpv_code.as_deref() {
                if diagnostics.sample_cpv.is_none() {
                    diagnostics.sample_cpv = Some(code.to_string());
                }
                diagnostics.distinct_cpvs.insert(code.to_string());
            }

            let body_slot = index.get(record.contracting_body.trim()).copied();
            let checks = Checks {
                window: record
                    .formalization_date
                    .map(|date| query.window.contains(date))
                    .unwrap_or(false),
                cpv: self.cpv_matches(record.cpv_code.as_deref(), &query.prefix),
                body: body_slot.is_some(),
            };

            if checks.window {
                diagnostics.window_matches += 1;
            } else {
                diagnostics.year_mismatch += 1;
            }
            if checks.cpv {
                diagnostics.cpv_matches += 1;
            } else {
                diagnostics.cpv_mismatch += 1;
            }
            if checks.body {
                diagnostics.body_matches += 1;
            } else {
                diagnostics.body_mismatch += 1;
            }

            if let (true, Some(slot)) = (checks.all(), body_slot) {
                diagnostics.final_matches += 1;
                totals[slot].total_committed += record.committed;
                totals[slot].matched_records += 1;
            }
        }

        if let Some(threshold) = self.config.minor_contract_threshold {
            for total in &mut totals {
                total.exceeds_threshold = Some(total.total_committed >= threshold);
            }
        }

        debug!(
            "Checks passed: window {}, cpv {}, body {}; failed: window {}, cpv {}, body {}",
            diagnostics.window_matches,
            diagnostics.cpv_matches,
            diagnostics.body_matches,
            diagnostics.year_mismatch,
            diagnostics.cpv_mismatch,
            diagnostics.body_mismatch
        );

        (totals, diagnostics)
    }

    fn cpv_matches(&self, code: Option<&str>, prefix: &str) -> bool {
        let Some(code) = code else {
            return false;
        };

        if prefix.is_empty() {
            return self.config.empty_prefix_policy == EmptyPrefixPolicy::MatchAll;
        }

        CpvCode::parse(code)
            .map(|cpv| cpv.is_within(prefix))
            .unwrap_or(false)
    }
}
