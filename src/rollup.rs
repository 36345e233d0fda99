use crate::schema::{Credit, RecordId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LotSummary {
    pub credit_count: usize,
    pub real_total: f64,
    pub committed_total: f64,
    pub recognized_total: f64,
    /// Arithmetic mean of each credit's own execution percentage.
    pub avg_execution_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContractSummary {
    pub lot_count: usize,
    pub real_total: f64,
    pub committed_total: f64,
    pub recognized_total: f64,
    /// Mean of the lot-level means, see [`aggregate_contract`].
    pub execution_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotRollup {
    pub lot_id: RecordId,
    pub cpv_code: Option<String>,
    pub summary: LotSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRollup {
    pub contract_id: RecordId,
    pub contracting_body: String,
    pub lots: Vec<LotRollup>,
    pub summary: ContractSummary,
}

impl ContractSummary {
    /// Integer form shown on summary cards.
    pub fn execution_pct_rounded(&self) -> f64 {
        round_half_up(self.execution_pct)
    }
}

/// Remaining budget of a credit line. Negative when more was recognized than committed.
pub fn credit_real(committed: f64, recognized: f64) -> f64 {
    committed - recognized
}

/// `1 - real/committed`, which reduces to `recognized/committed`. Zero when nothing
/// was committed.
fn executed_percentage_raw(recognized: f64, committed: f64) -> f64 {
    if committed == 0.0 {
        return 0.0;
    }
    recognized * 100.0 / committed
}

/// Execution percentage rounded half-up to an integer value. Not clamped.
pub fn execution_percentage(recognized: f64, committed: f64) -> f64 {
    round_half_up(executed_percentage_raw(recognized, committed))
}

/// Execution percentage kept to two decimals, truncated rather than rounded.
pub fn execution_percentage_precise(recognized: f64, committed: f64) -> f64 {
    truncate_to_hundredths(executed_percentage_raw(recognized, committed))
}

pub fn aggregate_lot(credits: &[Credit]) -> LotSummary {
    let mut summary = LotSummary {
        credit_count: credits.len(),
        ..LotSummary::default()
    };

    let mut pct_sum = 0.0;
    for credit in credits {
        summary.real_total += credit_real(credit.committed, credit.recognized);
        summary.committed_total += credit.committed;
        summary.recognized_total += credit.recognized;
        pct_sum += executed_percentage_raw(credit.recognized, credit.committed);
    }

    if !credits.is_empty() {
        summary.avg_execution_pct = pct_sum / credits.len() as f64;
    }

    summary
}

/// Second reduction pass: lot summaries into a contract summary.
///
/// Amount totals are plain sums. The execution percentage is a mean of means: every
/// lot contributes its own `avg_execution_pct` with equal weight, regardless of how
/// many credits it holds or how large they are. This is neither the percentage of the
/// totals nor a flat mean over all credits, and the figures already shown to users
/// depend on it. Lots without credits count as 0%.
pub fn aggregate_contract(lots: &[LotSummary]) -> ContractSummary {
    let mut summary = ContractSummary {
        lot_count: lots.len(),
        ..ContractSummary::default()
    };

    let mut pct_sum = 0.0;
    for lot in lots {
        summary.real_total += lot.real_total;
        summary.committed_total += lot.committed_total;
        summary.recognized_total += lot.recognized_total;
        pct_sum += lot.avg_execution_pct;
    }

    if !lots.is_empty() {
        summary.execution_pct = pct_sum / lots.len() as f64;
    }

    summary
}

/// Runs both passes over lots given as credit lists.
pub fn aggregate_contract_from_credits<L: AsRef<[Credit]>>(lots: &[L]) -> ContractSummary {
    let summaries: Vec<LotSummary> = lots.iter().map(|l| aggregate_lot(l.as_ref())).collect();
    aggregate_contract(&summaries)
}

pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn truncate_to_hundredths(value: f64) -> f64 {
    // Nudge past representation error so 29.0 does not come out as 28.99.
    let scaled = value * 100.0;
    let nudged = scaled + scaled.signum() * 1e-7;
    nudged.trunc() / 100.0
}
