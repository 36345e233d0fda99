//! Boundary between the relational store's loosely-typed rows and the validated records.
//!
//! Every defaulting rule lives here and runs once: amounts fall back to `0`, dates and
//! years to absent. Nothing downstream re-applies them.

use crate::schema::{Contract, Credit, Lot, NeedType, RecordId};
use chrono::{DateTime, NaiveDate};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawContract {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub contracting_body: Value,
    #[serde(default)]
    pub tipus_necessitat: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLot {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub contract_id: Value,
    #[serde(default)]
    pub formalization_date: Value,
    #[serde(default)]
    pub cpv_code: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCredit {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub lot_id: Value,
    #[serde(default, rename = "any")]
    pub year: Value,
    #[serde(default)]
    pub credit_committed_d: Value,
    #[serde(default)]
    pub credit_recognized_o: Value,
}

/// One read of the store: the three tables as they arrive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub contracts: Vec<RawContract>,
    #[serde(default)]
    pub lots: Vec<RawLot>,
    #[serde(default)]
    pub credits: Vec<RawCredit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub contracts_accepted: usize,
    pub lots_accepted: usize,
    pub credits_accepted: usize,
    /// Human-readable reason for every row that was dropped.
    pub dropped: Vec<String>,
    /// Contracts whose contracting body is outside the configured catalog.
    pub unknown_bodies: Vec<RecordId>,
    /// Lots and credits kept whose parent contract or lot is missing. The candidate
    /// join never returns them.
    pub orphaned: Vec<RecordId>,
}

impl RawContract {
    pub fn into_contract(self) -> Option<Contract> {
        let id = coerce_id(&self.id)?;
        Some(Contract {
            id,
            contracting_body: coerce_text(&self.contracting_body).unwrap_or_default(),
            need_type: coerce_text(&self.tipus_necessitat)
                .as_deref()
                .and_then(NeedType::parse_lenient),
        })
    }
}

impl RawLot {
    pub fn into_lot(self) -> Option<Lot> {
        let id = coerce_id(&self.id)?;
        let contract_id = coerce_id(&self.contract_id)?;
        Some(Lot {
            id,
            contract_id,
            formalization_date: coerce_date(&self.formalization_date),
            cpv_code: coerce_text(&self.cpv_code),
        })
    }
}

impl RawCredit {
    pub fn into_credit(self) -> Option<Credit> {
        let id = coerce_id(&self.id)?;
        let lot_id = coerce_id(&self.lot_id)?;
        Some(Credit {
            id,
            lot_id,
            year: coerce_year(&self.year),
            committed: coerce_amount(&self.credit_committed_d),
            recognized: coerce_amount(&self.credit_recognized_o),
        })
    }
}

pub fn coerce_amount(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount_str(s),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn parse_amount_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<f64>() {
        return Some(v);
    }

    // "1234,56"
    if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
        return trimmed.replace(',', ".").parse::<f64>().ok();
    }

    None
}

pub fn coerce_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

pub fn coerce_date(value: &Value) -> Option<NaiveDate> {
    let raw = value.as_str()?.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}

pub fn coerce_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(RecordId::new(s.trim())),
        Value::Number(n) => Some(RecordId::new(n.to_string())),
        _ => None,
    }
}

pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn drop_row(report: &mut IngestionReport, kind: &str, row: &impl Serialize) {
    let rendered = serde_json::to_string(row).unwrap_or_else(|_| "<unprintable>".to_string());
    warn!("Dropping {} row without usable identifiers: {}", kind, rendered);
    report
        .dropped
        .push(format!("{} row missing id or parent id: {}", kind, rendered));
}
