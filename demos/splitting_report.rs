use chrono::NaiveDate;
use procurement_execution::*;
use serde_json::json;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let snapshot: RawSnapshot = serde_json::from_value(json!({
        "contracts": [
            {"id": "2024-001", "contracting_body": "Ajuntament", "tipus_necessitat": "Puntual"},
            {"id": "2024-002", "contracting_body": "Ajuntament", "tipus_necessitat": "Puntual"},
            {"id": "2023-017", "contracting_body": "Consell Comarcal", "tipus_necessitat": "Recurrent"}
        ],
        "lots": [
            {"id": "L1", "contract_id": "2024-001", "formalization_date": "2024-02-12", "cpv_code": "45210000-3"},
            {"id": "L2", "contract_id": "2024-002", "formalization_date": "2024-04-03", "cpv_code": "45213000-3"},
            {"id": "L3", "contract_id": "2023-017", "formalization_date": "2023-09-20", "cpv_code": "90910000-9"}
        ],
        "credits": [
            {"id": 1, "lot_id": "L1", "any": 2024, "credit_committed_d": 9800, "credit_recognized_o": 9800},
            {"id": 2, "lot_id": "L2", "any": 2024, "credit_committed_d": "7250.50", "credit_recognized_o": 1200},
            {"id": 3, "lot_id": "L3", "any": 2023, "credit_committed_d": 14000, "credit_recognized_o": 15500}
        ]
    }))?;

    let config = AnalyzerConfig {
        minor_contract_threshold: Some(15_000.0),
        ..AnalyzerConfig::default()
    };
    let analyzer = ProcurementAnalyzer::new(config)?;
    let (dataset, _) = ProcurementDataset::from_raw(snapshot, &ContractingBodyCatalog::default());

    let query = SplittingQuery::new(
        "45210000-3",
        NeedType::Punctual,
        NaiveDate::from_ymd_opt(2024, 6, 1).ok_or("invalid date")?,
        vec!["Ajuntament".to_string(), "Consell Comarcal".to_string()],
    );
    let result = analyzer.analyze_splitting(&dataset, &query)?;
    println!("{}", result.to_markdown());

    for contract in dataset.contracts() {
        if let Some(rollup) = dataset.rollup_contract(&contract.id) {
            println!("{}", rollup.to_markdown());
        }
    }

    Ok(())
}
