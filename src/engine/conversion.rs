// ==========================================
// 销售报表平台 - 单位换算
// ==========================================
// 公式: base_units = quantity × quantity_multiplier × conversion_factor
// 系数: 针对“最终目标”查目录（规则命中需两跳: 规则 → target_sku → 目标条目）
//   - 目标经 master_box_sku 命中 → items_per_master_box
//   - 目标直接命中 sku           → units_per_display
//   - 未匹配 / 目标不在目录 / 系数缺失 → 1
// 红线: 系数缺失按 1 处理，不报错
// ==========================================

use crate::domain::MappingResult;
use crate::engine::catalog_index::{CatalogIndex, FactorSource};
use serde::Serialize;

/// 换算明细
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionBreakdown {
    pub quantity: u64,
    pub quantity_multiplier: u32,
    pub conversion_factor: u32,
    #[serde(serialize_with = "serialize_factor_source")]
    pub factor_source: FactorSource,
    pub base_units: u64,
}

fn serialize_factor_source<S: serde::Serializer>(
    source: &FactorSource,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(match source {
        FactorSource::Display => "units_per_display",
        FactorSource::MasterBox => "items_per_master_box",
        FactorSource::Default => "default",
    })
}

/// UnitConversionCalculator - 单位换算器
pub struct UnitConversionCalculator<'a> {
    catalog: &'a CatalogIndex,
}

impl<'a> UnitConversionCalculator<'a> {
    pub fn new(catalog: &'a CatalogIndex) -> Self {
        Self { catalog }
    }

    /// 解析结果对应的换算系数
    pub fn conversion_factor(&self, result: &MappingResult) -> (u32, FactorSource) {
        match result.target_sku.as_deref() {
            Some(target) => self.catalog.conversion_factor(target),
            None => (1, FactorSource::Default),
        }
    }

    /// 换算为基础单位
    ///
    /// 对固定 result 满足可加性: convert(q1) + convert(q2) == convert(q1 + q2)
    /// （溢出时饱和，正常业务量级不会触及）
    pub fn convert(&self, result: &MappingResult, quantity: u64) -> u64 {
        self.breakdown(result, quantity).base_units
    }

    pub fn breakdown(&self, result: &MappingResult, quantity: u64) -> ConversionBreakdown {
        let (factor, factor_source) = self.conversion_factor(result);
        let multiplier = result.quantity_multiplier.max(1);
        let per_unit = u64::from(multiplier) * u64::from(factor);

        ConversionBreakdown {
            quantity,
            quantity_multiplier: multiplier,
            conversion_factor: factor,
            factor_source,
            base_units: quantity.saturating_mul(per_unit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CatalogEntry, MatchType, PatternType};
    use crate::engine::catalog_index::DEFAULT_SUBSTRING_MIN_LEN;

    fn catalog() -> CatalogIndex {
        CatalogIndex::build(
            vec![
                CatalogEntry::new("BAKC_U04010", 1).with_master_box("BAKC_C02810", 140),
                CatalogEntry::new("BAKC_U20010", 5),
                CatalogEntry {
                    units_per_display: None,
                    ..CatalogEntry::new("NOFACTOR_01", 1)
                },
            ],
            DEFAULT_SUBSTRING_MIN_LEN,
        )
    }

    #[test]
    fn test_display_and_master_box_factors() {
        let idx = catalog();
        let calc = UnitConversionCalculator::new(&idx);

        let display = MappingResult::catalog_hit("BAKC_U20010".into(), MatchType::ExactMatch, 100);
        assert_eq!(calc.convert(&display, 10), 50);

        let master = MappingResult::catalog_hit("BAKC_C02810".into(), MatchType::CajaMaster, 100);
        let b = calc.breakdown(&master, 2);
        assert_eq!(b.base_units, 280);
        assert_eq!(b.factor_source, FactorSource::MasterBox);
    }

    #[test]
    fn test_rule_target_uses_two_hop_lookup() {
        let idx = catalog();
        let calc = UnitConversionCalculator::new(&idx);
        // 规则目标为整箱标识: 倍数 × 每箱数量
        let result = MappingResult {
            target_sku: Some("BAKC_C02810".into()),
            match_type: MatchType::Rule(PatternType::Exact),
            confidence: 90,
            quantity_multiplier: 2,
            matched_rule_id: Some("r1".into()),
        };
        assert_eq!(calc.convert(&result, 3), 3 * 2 * 140);
    }

    #[test]
    fn test_missing_factor_and_unmatched_default_to_one() {
        let idx = catalog();
        let calc = UnitConversionCalculator::new(&idx);
        let no_factor = MappingResult::catalog_hit("NOFACTOR_01".into(), MatchType::ExactMatch, 100);
        assert_eq!(calc.convert(&no_factor, 4), 4);
        assert_eq!(calc.convert(&MappingResult::unmatched(), 5), 5);

        let outside = MappingResult::catalog_hit("NOT_IN_CATALOG".into(), MatchType::Rule(PatternType::Prefix), 80);
        assert_eq!(calc.breakdown(&outside, 7).factor_source, FactorSource::Default);
    }
}
