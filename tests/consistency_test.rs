// ==========================================
// 一致性契约集成测试
// ==========================================
// 测试目标:
//   - 逐行求值与批量聚合结果一致（共用求值函数）
//   - 降级上下文的分歧可被度量，阈值控制告警
//   - 字面量正则物化后行为与原规则一致
// ==========================================

mod test_helpers;

use sku_resolution::consistency::{
    compare_cascades, materialize_regex_rules, AggregateBuilder, DivergenceThresholds,
    ReconciliationCheck, ReconciliationSample,
};
use sku_resolution::domain::{MappingRule, PatternType, RawOrderLine};
use sku_resolution::engine::{
    evaluate_lines, CascadeProfile, ReferenceSnapshot, ResolutionEngine, SnapshotOptions,
};
use std::sync::Arc;
use test_helpers::{fixture_catalog, fixture_rules, fixture_snapshot, CollectingEventPublisher};

fn order_lines() -> Vec<RawOrderLine> {
    vec![
        RawOrderLine::new("BAKC_U04010", "relbase", 10),
        RawOrderLine::new("BAKC_U20010", "relbase", 10),
        RawOrderLine::new("BAKC_C02810", "mercadolibre", 2),
        RawOrderLine::new("KEEPERPACK", "shopify", 7),
        RawOrderLine::new("ANU-BAKC_U04010", "relbase", 3),
        RawOrderLine::new("UNKNOWN_SKU_XYZ", "shopify", 5),
    ]
}

#[test]
fn test_aggregate_matches_per_line_engine() {
    let snapshot = Arc::new(fixture_snapshot());
    let engine = ResolutionEngine::new(snapshot.clone());
    let lines = order_lines();

    let aggregate = AggregateBuilder::full().build(&snapshot, &lines);

    // 逐行求值后手工汇总，必须与聚合完全一致
    let mut expected_total = 0u64;
    for line in &lines {
        let result = engine.resolve(&line.raw_sku, &line.source);
        if result.is_resolved() {
            expected_total += engine.convert(&result, line.quantity);
        }
    }
    assert_eq!(aggregate.total_base_units(), expected_total);

    assert_eq!(aggregate.base_units_for("BAKC_U04010"), 13);
    assert_eq!(aggregate.base_units_for("BAKC_U20010"), 50);
    assert_eq!(aggregate.base_units_for("BAKC_C02810"), 280);
    assert_eq!(aggregate.base_units_for("KSMC_U03010"), 35);
    assert_eq!(aggregate.unresolved.len(), 1);
    assert_eq!(aggregate.unresolved_quantity(), 5);
    assert_eq!(aggregate.match_type_counts["caja_master"], 1);
    assert_eq!(aggregate.match_type_counts["rule_exact"], 1);
    assert_eq!(aggregate.match_type_counts["rule_prefix"], 1);
}

#[test]
fn test_evaluate_lines_flags_review_rows() {
    let snapshot = fixture_snapshot();
    let evaluated = evaluate_lines(&snapshot, &CascadeProfile::full(), &order_lines());

    let review: Vec<&str> = evaluated
        .iter()
        .filter(|e| e.needs_review())
        .map(|e| e.line.raw_sku.as_str())
        .collect();
    assert_eq!(review, vec!["UNKNOWN_SKU_XYZ"]);
}

#[test]
fn test_degraded_aggregate_diff_names_affected_targets() {
    let snapshot = fixture_snapshot();
    let lines = order_lines();
    let full = AggregateBuilder::full().build(&snapshot, &lines);
    let degraded = AggregateBuilder::with_profile(CascadeProfile::degraded(
        "declarative",
        [
            PatternType::Exact,
            PatternType::Prefix,
            PatternType::Suffix,
            PatternType::Contains,
        ],
    ))
    .build(&snapshot, &lines);

    // 声明式上下文支持前缀改写，只丢弃正则；本批数据无差异
    assert!(full.diff(&degraded).is_empty());

    let exact_only = AggregateBuilder::with_profile(CascadeProfile::degraded("exact", [PatternType::Exact]))
        .build(&snapshot, &lines);
    let diff = full.diff(&exact_only);
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].target_sku, "BAKC_U04010");
    assert_eq!(diff[0].left_base_units, 13);
    assert_eq!(diff[0].right_base_units, 10);
}

#[test]
fn test_reconciliation_thresholds_gate_alert() {
    let snapshot = fixture_snapshot();
    let samples: Vec<ReconciliationSample> = order_lines()
        .into_iter()
        .map(|line| {
            let revenue = line.quantity as f64 * 100.0;
            ReconciliationSample::new(line, Some(revenue))
        })
        .collect();
    let degraded = CascadeProfile::degraded("exact", [PatternType::Exact]);

    // 1/6 行分歧；阈值 0.5 不告警
    let publisher = Arc::new(CollectingEventPublisher::default());
    let lenient = ReconciliationCheck::new(
        degraded.clone(),
        DivergenceThresholds {
            max_row_rate: 0.5,
            max_revenue_share: 0.5,
        },
        publisher.clone(),
    );
    let report = lenient.run(&snapshot, &samples);
    assert_eq!(report.divergent_count(), 1);
    assert!((report.divergence_rate() - 1.0 / 6.0).abs() < 1e-9);
    assert_eq!(publisher.count("DivergenceThresholdExceeded"), 0);

    // 默认阈值 0：任何分歧都告警
    let strict = ReconciliationCheck::new(degraded, DivergenceThresholds::default(), publisher.clone());
    let report = strict.run(&snapshot, &samples);
    assert!(!report.is_consistent());
    assert_eq!(
        report.dropped_pattern_types,
        vec![
            PatternType::Prefix,
            PatternType::Suffix,
            PatternType::Contains,
            PatternType::Regex
        ]
    );
    assert_eq!(publisher.count("DivergenceThresholdExceeded"), 1);
}

#[test]
fn test_materialized_rules_behave_like_regex_rules() {
    let catalog = fixture_catalog();
    let regex_rules = vec![
        MappingRule::new("re_keeper", "^KEEPERPACK$", PatternType::Regex, Some("KSMC_U03010"))
            .with_multiplier(5),
        MappingRule::new("re_anu", "^ANU-", PatternType::Regex, None),
        MappingRule::new("re_digits", "^BAKC_U0\\d{4}X$", PatternType::Regex, Some("BAKC_U04010")),
    ];
    let outcome = materialize_regex_rules(&regex_rules);
    assert_eq!(outcome.rules.len(), 2);
    assert_eq!(outcome.unmaterialized.len(), 1);
    assert_eq!(outcome.unmaterialized[0].rule.rule_id, "re_digits");

    let with_regex = ReferenceSnapshot::build(catalog.clone(), regex_rules, SnapshotOptions::default());
    let materialized = ReferenceSnapshot::build(catalog, outcome.rules, SnapshotOptions::default());
    let declarative = CascadeProfile::degraded(
        "declarative",
        [
            PatternType::Exact,
            PatternType::Prefix,
            PatternType::Suffix,
            PatternType::Contains,
        ],
    );

    for raw in ["KEEPERPACK", "ANU-BAKC_U04010", "ANU-ANU-BAKC_U20010"] {
        let full = ResolutionEngine::new(Arc::new(with_regex.clone())).resolve(raw, "relbase");
        let mat = ResolutionEngine::with_profile(Arc::new(materialized.clone()), declarative.clone())
            .resolve(raw, "relbase");
        assert_eq!(full.target_sku, mat.target_sku, "raw={}", raw);
        assert_eq!(full.quantity_multiplier, mat.quantity_multiplier, "raw={}", raw);
    }

    // 剩余的不可物化规则仍需对账检查兜底
    let report = compare_cascades(
        &with_regex,
        &declarative,
        &[ReconciliationSample::from(RawOrderLine::new("BAKC_U04019X", "relbase", 1))],
    );
    assert_eq!(report.divergent_count(), 1);
}

#[test]
fn test_fixture_rules_have_no_regex() {
    assert!(fixture_rules().iter().all(|r| r.pattern_type != PatternType::Regex));
}
