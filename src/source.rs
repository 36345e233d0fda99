use crate::catalog::ContractingBodyCatalog;
use crate::cpv::CpvCode;
use crate::error::Result;
use crate::ingestion::{drop_row, IngestionReport, RawSnapshot};
use crate::rollup::{aggregate_contract, aggregate_lot, ContractRollup, LotRollup};
use crate::schema::{Contract, Credit, Lot, RecordId};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A credit joined with its lot and contract, as returned by the bulk read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub credit_id: RecordId,
    pub year: i32,
    pub committed: f64,
    pub lot_id: RecordId,
    pub formalization_date: Option<NaiveDate>,
    pub cpv_code: Option<String>,
    pub contract_id: RecordId,
    pub contracting_body: String,
}

/// Read side of the relational store, as the analyzer consumes it.
pub trait ProcurementSource {
    /// Every credit with a fiscal year of at least `min_year`, joined through its lot
    /// and contract. Credits whose lot or contract is missing are not returned.
    fn candidate_credits(&self, min_year: i32) -> Result<Vec<CandidateRecord>>;

    /// Whether any lot, with or without credits, has a CPV code starting with `prefix`.
    fn lot_exists_with_cpv_prefix(&self, prefix: &str) -> Result<bool>;
}

/// Validated, in-memory copy of the contract → lot → credit hierarchy.
#[derive(Debug, Clone, Default)]
pub struct ProcurementDataset {
    contracts: BTreeMap<RecordId, Contract>,
    lots: BTreeMap<RecordId, Lot>,
    credits: Vec<Credit>,
}

impl ProcurementDataset {
    pub fn new(contracts: Vec<Contract>, lots: Vec<Lot>, credits: Vec<Credit>) -> Self {
        Self {
            contracts: contracts.into_iter().map(|c| (c.id.clone(), c)).collect(),
            lots: lots.into_iter().map(|l| (l.id.clone(), l)).collect(),
            credits,
        }
    }

    pub fn from_raw(
        snapshot: RawSnapshot,
        catalog: &ContractingBodyCatalog,
    ) -> (Self, IngestionReport) {
        let mut report = IngestionReport::default();
        let mut dataset = Self::default();

        for raw in snapshot.contracts {
            match raw.clone().into_contract() {
                Some(contract) => {
                    if !catalog.contains(&contract.contracting_body) {
                        warn!(
                            "Contract {} names contracting body '{}' outside the catalog",
                            contract.id, contract.contracting_body
                        );
                        report.unknown_bodies.push(contract.id.clone());
                    }
                    dataset.contracts.insert(contract.id.clone(), contract);
                    report.contracts_accepted += 1;
                }
                None => drop_row(&mut report, "contract", &raw),
            }
        }

        for raw in snapshot.lots {
            match raw.clone().into_lot() {
                Some(lot) => {
                    dataset.lots.insert(lot.id.clone(), lot);
                    report.lots_accepted += 1;
                }
                None => drop_row(&mut report, "lot", &raw),
            }
        }

        for raw in snapshot.credits {
            match raw.clone().into_credit() {
                Some(credit) => {
                    dataset.credits.push(credit);
                    report.credits_accepted += 1;
                }
                None => drop_row(&mut report, "credit", &raw),
            }
        }

        for lot in dataset.lots.values() {
            if !dataset.contracts.contains_key(&lot.contract_id) {
                warn!("Lot {} references missing contract {}", lot.id, lot.contract_id);
                report.orphaned.push(lot.id.clone());
            }
        }
        for credit in &dataset.credits {
            if !dataset.lots.contains_key(&credit.lot_id) {
                warn!("Credit {} references missing lot {}", credit.id, credit.lot_id);
                report.orphaned.push(credit.id.clone());
            }
        }

        info!(
            "Ingested {} contracts, {} lots, {} credits ({} rows dropped, {} orphaned)",
            report.contracts_accepted,
            report.lots_accepted,
            report.credits_accepted,
            report.dropped.len(),
            report.orphaned.len()
        );

        (dataset, report)
    }

    pub fn from_json_str(
        json: &str,
        catalog: &ContractingBodyCatalog,
    ) -> Result<(Self, IngestionReport)> {
        let snapshot: RawSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_raw(snapshot, catalog))
    }

    pub fn from_path(
        path: impl AsRef<Path>,
        catalog: &ContractingBodyCatalog,
    ) -> Result<(Self, IngestionReport)> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents, catalog)
    }

    pub fn contract(&self, id: &RecordId) -> Option<&Contract> {
        self.contracts.get(id)
    }

    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.contracts.values()
    }

    pub fn lots_of<'a>(
        &'a self,
        contract_id: &'a RecordId,
    ) -> impl Iterator<Item = &'a Lot> + 'a {
        self.lots
            .values()
            .filter(move |lot| &lot.contract_id == contract_id)
    }

    pub fn credits_of(&self, lot_id: &RecordId) -> Vec<Credit> {
        self.credits
            .iter()
            .filter(|credit| &credit.lot_id == lot_id)
            .cloned()
            .collect()
    }

    /// Financial rollup of one contract: a summary per lot, then the contract summary
    /// built from those lot summaries.
    pub fn rollup_contract(&self, contract_id: &RecordId) -> Option<ContractRollup> {
        let contract = self.contracts.get(contract_id)?;

        let lots: Vec<LotRollup> = self
            .lots_of(contract_id)
            .map(|lot| LotRollup {
                lot_id: lot.id.clone(),
                cpv_code: lot.cpv_code.clone(),
                summary: aggregate_lot(&self.credits_of(&lot.id)),
            })
            .collect();

        let summaries: Vec<_> = lots.iter().map(|l| l.summary).collect();
        let summary = aggregate_contract(&summaries);

        Some(ContractRollup {
            contract_id: contract.id.clone(),
            contracting_body: contract.contracting_body.clone(),
            lots,
            summary,
        })
    }
}

impl ProcurementSource for ProcurementDataset {
    fn candidate_credits(&self, min_year: i32) -> Result<Vec<CandidateRecord>> {
        let mut records = Vec::new();
        let mut orphaned = 0usize;

        for credit in &self.credits {
            let year = match credit.year {
                Some(year) if year >= min_year => year,
                _ => continue,
            };

            let joined = self.lots.get(&credit.lot_id).and_then(|lot| {
                self.contracts
                    .get(&lot.contract_id)
                    .map(|contract| (lot, contract))
            });

            let Some((lot, contract)) = joined else {
                orphaned += 1;
                continue;
            };

            records.push(CandidateRecord {
                credit_id: credit.id.clone(),
                year,
                committed: credit.committed,
                lot_id: lot.id.clone(),
                formalization_date: lot.formalization_date,
                cpv_code: lot.cpv_code.clone(),
                contract_id: contract.id.clone(),
                contracting_body: contract.contracting_body.clone(),
            });
        }

        if orphaned > 0 {
            debug!(
                "Skipped {} credits whose lot or contract could not be joined",
                orphaned
            );
        }

        Ok(records)
    }

    fn lot_exists_with_cpv_prefix(&self, prefix: &str) -> Result<bool> {
        Ok(self.lots.values().any(|lot| {
            lot.cpv_code
                .as_deref()
                .and_then(CpvCode::parse)
                .map(|cpv| cpv.is_within(prefix))
                .unwrap_or(false)
        }))
    }
}
