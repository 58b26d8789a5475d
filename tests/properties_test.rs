// ==========================================
// 解析引擎性质测试
// ==========================================
// 工具: proptest
// 性质:
//   - 同一快照 + 同一输入 ⇒ 同一输出
//   - 大小写与首尾空白不影响结果
//   - 换算对数量可加
//   - 规则按 priority 降序求值
//   - 命中结果的目标必在目录中
// ==========================================

mod test_helpers;

use proptest::prelude::*;
use sku_resolution::domain::{CatalogEntry, MappingRule, PatternType};
use sku_resolution::engine::{ReferenceSnapshot, ResolutionEngine, SnapshotOptions};
use std::sync::Arc;
use test_helpers::fixture_snapshot;

fn raw_sku_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9_\\- ]{0,24}",
        Just("BAKC_U04010".to_string()),
        Just("bakc-u20010".to_string()),
        Just("ANU-BAKC_U04010".to_string()),
        Just("KeeperPack".to_string()),
        "(ANU-){0,4}BAKC_U0401[0-9]",
    ]
}

fn source_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("relbase".to_string()),
        Just("shopify".to_string()),
        Just("mercadolibre".to_string()),
    ]
}

proptest! {
    #[test]
    fn prop_resolution_is_deterministic(raw in raw_sku_strategy(), source in source_strategy()) {
        let engine = ResolutionEngine::new(Arc::new(fixture_snapshot()));
        let first = engine.resolve(&raw, &source);
        let second = engine.resolve(&raw, &source);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_case_and_whitespace_insensitive(raw in raw_sku_strategy(), source in source_strategy()) {
        let engine = ResolutionEngine::new(Arc::new(fixture_snapshot()));
        let base = engine.resolve(&raw, &source);
        let lowered = engine.resolve(&format!("  {}\t", raw.to_lowercase()), &source.to_uppercase());
        prop_assert_eq!(base, lowered);
    }

    #[test]
    fn prop_conversion_is_additive(
        raw in raw_sku_strategy(),
        a in 0u64..1_000_000,
        b in 0u64..1_000_000,
    ) {
        let engine = ResolutionEngine::new(Arc::new(fixture_snapshot()));
        let result = engine.resolve(&raw, "relbase");
        prop_assert_eq!(
            engine.convert(&result, a + b),
            engine.convert(&result, a) + engine.convert(&result, b)
        );
        prop_assert_eq!(engine.convert(&result, 0), 0);
    }

    #[test]
    fn prop_higher_priority_rule_wins(
        p1 in -50i32..50,
        p2 in -50i32..50,
        pattern_type in prop_oneof![
            Just(PatternType::Exact),
            Just(PatternType::Prefix),
            Just(PatternType::Suffix),
            Just(PatternType::Contains),
            Just(PatternType::Regex),
        ],
        reversed in any::<bool>(),
    ) {
        prop_assume!(p1 != p2);
        let pattern = match pattern_type {
            PatternType::Regex => "^PROMO-SKU$",
            _ => "PROMO-SKU",
        };
        let mut rules = vec![
            MappingRule::new("one", pattern, pattern_type, Some("TARGET_ONE")).with_priority(p1),
            MappingRule::new("two", pattern, pattern_type, Some("TARGET_TWO")).with_priority(p2),
        ];
        if reversed {
            rules.reverse();
        }
        let snapshot = ReferenceSnapshot::build(
            vec![CatalogEntry::new("TARGET_ONE", 1), CatalogEntry::new("TARGET_TWO", 2)],
            rules,
            SnapshotOptions::default(),
        );
        let result = ResolutionEngine::new(Arc::new(snapshot)).resolve("PROMO-SKU", "relbase");
        let expected = if p1 > p2 { "TARGET_ONE" } else { "TARGET_TWO" };
        prop_assert_eq!(result.target_sku.as_deref(), Some(expected));
    }

    #[test]
    fn prop_resolved_target_is_in_catalog(raw in raw_sku_strategy(), source in source_strategy()) {
        let snapshot = fixture_snapshot();
        let engine = ResolutionEngine::new(Arc::new(snapshot.clone()));
        let result = engine.resolve(&raw, &source);
        if let Some(target) = result.target_sku.as_deref() {
            let catalog = snapshot.catalog();
            prop_assert!(catalog.lookup_direct(target).is_some() || catalog.lookup_master(target).is_some());
        } else {
            prop_assert_eq!(result.confidence, 0);
        }
    }
}
