use chrono::NaiveDate;
use procurement_execution::*;
use serde_json::json;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn credit(id: &str, lot: &str, committed: f64, recognized: f64) -> Credit {
    Credit {
        id: RecordId::from(id),
        lot_id: RecordId::from(lot),
        year: Some(2024),
        committed,
        recognized,
    }
}

/// Contract C1 (Ajuntament) with one lot formalized 2024-03-15 under 45210000-3 and one
/// credit of 1000 committed / 250 recognized.
fn scenario_snapshot(formalization_date: serde_json::Value) -> RawSnapshot {
    serde_json::from_value(json!({
        "contracts": [
            {"id": "C1", "contracting_body": "Ajuntament", "tipus_necessitat": "Puntual"}
        ],
        "lots": [
            {"id": "L1", "contract_id": "C1", "formalization_date": formalization_date, "cpv_code": "45210000-3"}
        ],
        "credits": [
            {"id": "K1", "lot_id": "L1", "any": 2024, "credit_committed_d": "1000", "credit_recognized_o": 250}
        ]
    }))
    .unwrap()
}

fn scenario_query(need_type: NeedType) -> SplittingQuery {
    SplittingQuery::new(
        "45210000-3",
        need_type,
        date(2024, 6, 1),
        vec!["Ajuntament".to_string(), "Consell Comarcal".to_string()],
    )
}

#[test]
fn test_punctual_scenario_contributes_committed_amount() {
    let (dataset, _) = ProcurementDataset::from_raw(
        scenario_snapshot(json!("2024-03-15")),
        &ContractingBodyCatalog::default(),
    );

    let result = analyze_splitting(&dataset, &scenario_query(NeedType::Punctual)).unwrap();

    assert_eq!(result.diagnostics.prefix_used, "4521");
    assert_eq!(result.diagnostics.window_matches, 1);
    assert_eq!(result.diagnostics.cpv_matches, 1);
    assert_eq!(result.diagnostics.body_matches, 1);
    assert_eq!(result.diagnostics.final_matches, 1);
    assert!(!result.diagnostics.lot_exists_without_credit);

    assert_eq!(result.per_body_totals.len(), 2);
    assert_eq!(result.per_body_totals[0].contracting_body, "Ajuntament");
    assert_eq!(result.per_body_totals[0].total_committed, 1000.0);
    assert_eq!(result.per_body_totals[1].contracting_body, "Consell Comarcal");
    assert_eq!(result.per_body_totals[1].total_committed, 0.0);
}

#[test]
fn test_recurrent_scenario_matches_identically() {
    let (dataset, _) = ProcurementDataset::from_raw(
        scenario_snapshot(json!("2024-03-15")),
        &ContractingBodyCatalog::default(),
    );

    let punctual = analyze_splitting(&dataset, &scenario_query(NeedType::Punctual)).unwrap();
    let recurrent = analyze_splitting(&dataset, &scenario_query(NeedType::Recurrent)).unwrap();

    assert_eq!(recurrent.diagnostics.final_matches, 1);
    assert_eq!(recurrent.total_for("Ajuntament"), punctual.total_for("Ajuntament"));
    assert_eq!(recurrent.window.start, date(2019, 6, 1));
}

#[test]
fn test_recurrent_window_reaches_previous_years() {
    let (dataset, _) = ProcurementDataset::from_raw(
        scenario_snapshot(json!("2021-11-30")),
        &ContractingBodyCatalog::default(),
    );

    let punctual = analyze_splitting(&dataset, &scenario_query(NeedType::Punctual)).unwrap();
    assert_eq!(punctual.diagnostics.final_matches, 0);
    assert_eq!(punctual.diagnostics.year_mismatch, 1);

    let recurrent = analyze_splitting(&dataset, &scenario_query(NeedType::Recurrent)).unwrap();
    assert_eq!(recurrent.total_for("Ajuntament"), Some(1000.0));
}

#[test]
fn test_missing_formalization_date_never_matches() {
    let (dataset, _) = ProcurementDataset::from_raw(
        scenario_snapshot(json!(null)),
        &ContractingBodyCatalog::default(),
    );

    let result = analyze_splitting(&dataset, &scenario_query(NeedType::Recurrent)).unwrap();

    assert_eq!(result.diagnostics.year_mismatch, 1);
    assert_eq!(result.diagnostics.cpv_matches, 1);
    assert_eq!(result.diagnostics.body_matches, 1);
    assert_eq!(result.diagnostics.final_matches, 0);
    assert_eq!(result.total_for("Ajuntament"), Some(0.0));
}

#[test]
fn test_lot_without_credit_is_flagged() {
    let snapshot: RawSnapshot = serde_json::from_value(json!({
        "contracts": [
            {"id": "C1", "contracting_body": "Ajuntament"},
            {"id": "C2", "contracting_body": "Consell Comarcal"}
        ],
        "lots": [
            {"id": "L1", "contract_id": "C1", "formalization_date": "2024-02-01", "cpv_code": "45210000-3"},
            {"id": "L2", "contract_id": "C2", "formalization_date": "2024-02-01", "cpv_code": "90910000-9"}
        ],
        "credits": [
            {"id": "K1", "lot_id": "L2", "any": 2024, "credit_committed_d": 300}
        ]
    }))
    .unwrap();
    let (dataset, _) = ProcurementDataset::from_raw(snapshot, &ContractingBodyCatalog::default());

    let result = analyze_splitting(&dataset, &scenario_query(NeedType::Punctual)).unwrap();

    assert_eq!(result.diagnostics.total_records, 1);
    assert_eq!(result.diagnostics.final_matches, 0);
    assert!(result.diagnostics.lot_exists_without_credit);
    assert_eq!(result.diagnostics.sample_cpv.as_deref(), Some("90910000-9"));

    let unused = SplittingQuery::new(
        "33600000-6",
        NeedType::Punctual,
        date(2024, 6, 1),
        vec!["Ajuntament".to_string()],
    );
    let result = analyze_splitting(&dataset, &unused).unwrap();
    assert!(!result.diagnostics.lot_exists_without_credit);
}

#[test]
fn test_lookback_horizon_limits_candidates() {
    let snapshot: RawSnapshot = serde_json::from_value(json!({
        "contracts": [{"id": "C1", "contracting_body": "Ajuntament"}],
        "lots": [{"id": "L1", "contract_id": "C1", "formalization_date": "2024-02-01", "cpv_code": "45210000"}],
        "credits": [
            {"id": "K1", "lot_id": "L1", "any": 2018, "credit_committed_d": 10},
            {"id": "K2", "lot_id": "L1", "any": 2019, "credit_committed_d": 20},
            {"id": "K3", "lot_id": "L1", "any": "2025", "credit_committed_d": 40}
        ]
    }))
    .unwrap();
    let (dataset, _) = ProcurementDataset::from_raw(snapshot, &ContractingBodyCatalog::default());

    let result = analyze_splitting(&dataset, &scenario_query(NeedType::Punctual)).unwrap();
    assert_eq!(result.diagnostics.total_records, 2);
    assert_eq!(result.total_for("Ajuntament"), Some(60.0));
}

#[test]
fn test_configured_analyzer_and_csv_report() -> anyhow::Result<()> {
    let config = AnalyzerConfig::from_json_str(
        r#"{
            "contracting_bodies": ["Ajuntament", "Consell Comarcal"],
            "minor_contract_threshold": 1000.0
        }"#,
    )?;
    let analyzer = ProcurementAnalyzer::new(config)?;
    let (dataset, report) = ProcurementDataset::from_raw(
        scenario_snapshot(json!("2024-03-15")),
        &ContractingBodyCatalog::new(["Ajuntament", "Consell Comarcal"]),
    );
    assert!(report.unknown_bodies.is_empty());

    let result = analyzer.analyze_splitting(&dataset, &scenario_query(NeedType::Punctual))?;
    let csv_text = result.to_csv();

    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let rows: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "Ajuntament");
    assert_eq!(rows[0][1].parse::<f64>()?, 1000.0);
    assert_eq!(&rows[0][3], "true");
    assert_eq!(&rows[1][0], "Consell Comarcal");
    assert_eq!(&rows[1][3], "false");

    Ok(())
}

#[test]
fn test_unknown_body_rejected_with_catalog() -> anyhow::Result<()> {
    let analyzer = ProcurementAnalyzer::new(AnalyzerConfig {
        contracting_bodies: vec!["Ajuntament".to_string()],
        ..AnalyzerConfig::default()
    })?;
    let dataset = ProcurementDataset::default();

    let err = analyzer
        .analyze_splitting(&dataset, &scenario_query(NeedType::Punctual))
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("Consell Comarcal"));
    Ok(())
}

#[test]
fn test_contract_rollup_from_raw_rows() {
    let snapshot: RawSnapshot = serde_json::from_value(json!({
        "contracts": [{"id": 1, "contracting_body": "Ajuntament"}],
        "lots": [
            {"id": 10, "contract_id": 1},
            {"id": 11, "contract_id": 1}
        ],
        "credits": [
            {"id": 100, "lot_id": 10, "any": 2023, "credit_committed_d": 100, "credit_recognized_o": 200},
            {"id": 101, "lot_id": 10, "any": 2024, "credit_committed_d": "not a number", "credit_recognized_o": 50},
            {"id": 102, "lot_id": 11, "any": 2024, "credit_committed_d": 400, "credit_recognized_o": "100"}
        ]
    }))
    .unwrap();
    let (dataset, _) = ProcurementDataset::from_raw(snapshot, &ContractingBodyCatalog::default());

    let rollup = dataset.rollup_contract(&RecordId::from("1")).unwrap();

    // lot 10: real -100 and -50; pct 200% and 0% (nothing committed) -> 100%
    // lot 11: real 300; pct 25%
    assert_eq!(rollup.lots[0].summary.real_total, -150.0);
    assert!((rollup.lots[0].summary.avg_execution_pct - 100.0).abs() < 1e-9);
    assert_eq!(rollup.lots[1].summary.real_total, 300.0);
    assert_eq!(rollup.summary.real_total, 150.0);
    assert_eq!(rollup.summary.committed_total, 500.0);
    assert!((rollup.summary.execution_pct - 62.5).abs() < 1e-9);
    assert_eq!(rollup.summary.execution_pct_rounded(), 63.0);

    let markdown = rollup.to_markdown();
    assert!(markdown.contains("**Executed:** 63%"));
}

#[test]
fn test_contract_rollup_is_order_invariant_but_not_flat() {
    let lots = vec![
        vec![credit("a", "L1", 100.0, 90.0)],
        vec![credit("b", "L2", 100.0, 10.0), credit("c", "L2", 200.0, 20.0)],
        vec![
            credit("d", "L3", 50.0, 75.0),
            credit("e", "L3", 80.0, 0.0),
            credit("f", "L3", 10.0, 10.0),
        ],
    ];

    let reference = aggregate_contract_from_credits(&lots);

    let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    for order in orders {
        let permuted: Vec<Vec<Credit>> = order.iter().map(|&i| lots[i].clone()).collect();
        let summary = aggregate_contract_from_credits(&permuted);
        assert!((summary.execution_pct - reference.execution_pct).abs() < 1e-9);
        assert!((summary.real_total - reference.real_total).abs() < 1e-9);
        assert!((summary.committed_total - reference.committed_total).abs() < 1e-9);
    }

    let flat: Vec<Credit> = lots.into_iter().flatten().collect();
    let flattened = aggregate_contract_from_credits(&[flat]);
    assert!((flattened.real_total - reference.real_total).abs() < 1e-9);
    assert!((flattened.execution_pct - reference.execution_pct).abs() > 1e-6);
}

#[test]
fn test_percentage_properties() {
    for committed in [-300.0, -1.0, 1.0, 3.0, 100.0, 12_345.67] {
        for recognized in [-50.0, 0.0, 1.0, 99.5, 250.0] {
            assert_eq!(compute_credit_real(committed, recognized), committed - recognized);
            assert_eq!(compute_execution_percentage(recognized, 0.0), 0.0);
            let rounded = compute_execution_percentage(recognized, committed);
            assert_eq!(rounded, rounded.trunc());
        }
    }
    assert_eq!(compute_execution_percentage(50.0, 100.0), 50.0);
    assert_eq!(compute_execution_percentage(150.0, 100.0), 150.0);
}

#[test]
fn test_cpv_rules() {
    assert_eq!(significant_prefix("90910000"), "9091");
    assert_eq!(significant_prefix("45000000"), "45");
    assert_eq!(significant_prefix("00000000"), "00000000");

    let depths: Vec<u8> = ["03000000", "03100000", "03110000", "03111000", "03111100"]
        .iter()
        .map(|body| cpv_depth(body).unwrap())
        .collect();
    assert_eq!(depths, vec![1, 2, 3, 4, 5]);

    assert_eq!(CpvCode::parse("03111100-3").unwrap().level().unwrap(), CpvLevel::Subcategory);
}
