use crate::rollup::ContractRollup;
use crate::splitting::SplittingResult;

pub trait SplittingReport {
    fn to_json(&self) -> Result<String, serde_json::Error>;
    fn to_csv(&self) -> String;
    fn to_markdown(&self) -> String;
}

impl SplittingReport for SplittingResult {
    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Contracting Body,Total Committed,Matched Records,Exceeds Threshold\n");

        for total in &self.per_body_totals {
            let flag = match total.exceeds_threshold {
                Some(true) => "true",
                Some(false) => "false",
                None => "",
            };
            output.push_str(&format!(
                "{},{:.2},{},{}\n",
                csv_field(&total.contracting_body),
                total.total_committed,
                total.matched_records,
                flag
            ));
        }

        output
    }

    fn to_markdown(&self) -> String {
        let mut output = String::new();
        let diag = &self.diagnostics;

        output.push_str("# Contract Splitting Analysis\n\n");
        output.push_str(&format!(
            "**Target CPV:** {}\n\n",
            self.target_cpv.as_deref().unwrap_or("(none)")
        ));
        output.push_str(&format!("**Need Type:** {}\n\n", self.need_type));
        output.push_str(&format!(
            "**Window:** {} to {} (query date {})\n\n",
            self.window.start, self.window.end, self.query_date
        ));

        output.push_str("## Committed Spend by Contracting Body\n\n");
        output.push_str("| Contracting Body | Total Committed | Records |\n");
        output.push_str("|---|---:|---:|\n");
        for total in &self.per_body_totals {
            let marker = if total.exceeds_threshold == Some(true) {
                " ⚠️ **[THRESHOLD]**"
            } else {
                ""
            };
            output.push_str(&format!(
                "| {}{} | {:.2} | {} |\n",
                total.contracting_body, marker, total.total_committed, total.matched_records
            ));
        }
        output.push('\n');

        output.push_str("## Diagnostics\n\n");
        output.push_str(&format!("- Prefix used: `{}`\n", diag.prefix_used));
        output.push_str(&format!("- Records fetched: {}\n", diag.total_records));
        output.push_str(&format!(
            "- Window matches: {} (mismatches: {})\n",
            diag.window_matches, diag.year_mismatch
        ));
        output.push_str(&format!(
            "- CPV matches: {} (mismatches: {})\n",
            diag.cpv_matches, diag.cpv_mismatch
        ));
        output.push_str(&format!(
            "- Body matches: {} (mismatches: {})\n",
            diag.body_matches, diag.body_mismatch
        ));
        output.push_str(&format!("- Final matches: {}\n", diag.final_matches));
        if let Some(sample) = &diag.sample_cpv {
            output.push_str(&format!("- Sample CPV: `{}`\n", sample));
        }
        output.push_str(&format!(
            "- Distinct CPVs observed: {}\n",
            diag.distinct_cpvs.len()
        ));
        if diag.lot_exists_without_credit {
            output.push_str(
                "- Lots exist under this CPV prefix but none carries matching credits\n",
            );
        }

        output
    }
}

impl ContractRollup {
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "# Contract {} - {}\n\n",
            self.contract_id, self.contracting_body
        ));
        output.push_str(&format!(
            "**Committed:** {:.2} | **Recognized:** {:.2} | **Real:** {:.2} | **Executed:** {}%\n\n",
            self.summary.committed_total,
            self.summary.recognized_total,
            self.summary.real_total,
            self.summary.execution_pct_rounded()
        ));

        output.push_str("| Lot | CPV | Credits | Committed | Recognized | Real | Executed % |\n");
        output.push_str("|---|---|---:|---:|---:|---:|---:|\n");
        for lot in &self.lots {
            output.push_str(&format!(
                "| {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
                lot.lot_id,
                lot.cpv_code.as_deref().unwrap_or("-"),
                lot.summary.credit_count,
                lot.summary.committed_total,
                lot.summary.recognized_total,
                lot.summary.real_total,
                lot.summary.avg_execution_pct
            ));
        }

        output
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
