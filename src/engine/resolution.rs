// ==========================================
// 销售报表平台 - SKU 解析引擎
// ==========================================
// 级联 (严格按序，首个成功即停止):
//   1. 目录直接命中   exact_match      100
//   2. 整箱标识命中   caja_master      100
//   3. 声明式规则     rule_<type>      规则置信度
//   4. 启发式兜底     heuristic_<name> 85-90
//   5. 目录子串       substring_match  85
//   6. 未匹配         unmatched        0
// 红线: 纯函数；同一快照 + 同一输入 ⇒ 同一输出
// 红线: 逐行求值与批量聚合共用 resolve_with_profile，不允许第二套实现
// ==========================================

use crate::domain::{MappingResult, MatchType};
use crate::engine::conversion::{ConversionBreakdown, UnitConversionCalculator};
use crate::engine::heuristics::apply_heuristics;
use crate::engine::normalize::{normalize_sku, normalize_source};
use crate::engine::profile::CascadeProfile;
use crate::engine::snapshot::ReferenceSnapshot;
use std::sync::Arc;

/// 子串层级置信度
pub const SUBSTRING_CONFIDENCE: u8 = 85;
/// 目录命中置信度
pub const CATALOG_CONFIDENCE: u8 = 100;

/// 按指定级联能力解析一个原始标识
///
/// 归一化在入口处执行一次，之后所有比较均基于归一化结果。
pub fn resolve_with_profile(
    snapshot: &ReferenceSnapshot,
    raw_sku: &str,
    source: &str,
    profile: &CascadeProfile,
) -> MappingResult {
    let sku = normalize_sku(raw_sku);
    let source = normalize_source(source);
    if sku.is_empty() {
        return MappingResult::unmatched();
    }

    let result = cascade(snapshot, &sku, &source, profile, 0);
    tracing::trace!(
        raw_sku = %sku,
        source = %source,
        profile = profile.name(),
        match_type = %result.match_type,
        target = ?result.target_sku,
        "SKU 解析完成"
    );
    result
}

/// 完整级联解析
pub fn resolve(snapshot: &ReferenceSnapshot, raw_sku: &str, source: &str) -> MappingResult {
    resolve_with_profile(snapshot, raw_sku, source, &CascadeProfile::full())
}

fn cascade(
    snapshot: &ReferenceSnapshot,
    sku: &str,
    source: &str,
    profile: &CascadeProfile,
    depth: usize,
) -> MappingResult {
    let catalog = snapshot.catalog();

    // 1) 目录直接命中
    if catalog.get_direct(sku).is_some() {
        return MappingResult::catalog_hit(sku.to_string(), MatchType::ExactMatch, CATALOG_CONFIDENCE);
    }

    // 2) 整箱标识命中（目标保留原始标识，换算时按 items_per_master_box）
    if catalog.get_master(sku).is_some() {
        return MappingResult::catalog_hit(sku.to_string(), MatchType::CajaMaster, CATALOG_CONFIDENCE);
    }

    // 3) 声明式规则（首个命中规则即定局；改写失败则落入第 4 层）
    if let Some(compiled) = snapshot
        .rules()
        .find_compiled(sku, source, profile.pattern_types())
    {
        let rule = compiled.rule();
        let match_type = MatchType::Rule(rule.pattern_type);

        match rule.target_sku.as_deref() {
            Some(target) => {
                return MappingResult {
                    target_sku: Some(target.to_string()),
                    match_type,
                    confidence: rule.confidence.min(100),
                    quantity_multiplier: rule.quantity_multiplier.max(1),
                    matched_rule_id: Some(rule.rule_id.clone()),
                };
            }
            None if depth < snapshot.options().max_rewrite_depth => {
                if let Some(remainder) = compiled.strip(sku) {
                    let inner = cascade(snapshot, &remainder, source, profile, depth + 1);
                    if inner.is_resolved() {
                        return MappingResult {
                            target_sku: inner.target_sku,
                            match_type,
                            confidence: rule.confidence.min(inner.confidence).min(100),
                            quantity_multiplier: rule
                                .quantity_multiplier
                                .max(1)
                                .saturating_mul(inner.quantity_multiplier),
                            matched_rule_id: Some(rule.rule_id.clone()),
                        };
                    }
                }
                tracing::debug!(rule_id = %rule.rule_id, raw_sku = %sku, "改写规则命中但剩余标识未解析");
            }
            None => {
                tracing::debug!(rule_id = %rule.rule_id, depth, "改写深度已达上限");
            }
        }
    }

    // 4) 启发式兜底
    if profile.heuristics_enabled() {
        if let Some((kind, target)) = apply_heuristics(catalog, sku) {
            return MappingResult::catalog_hit(target, MatchType::Heuristic(kind), kind.confidence());
        }
    }

    // 5) 目录子串（最长优先）
    if profile.substring_enabled() {
        if let Some(target) = catalog.longest_contained_sku(sku) {
            return MappingResult::catalog_hit(
                target.to_string(),
                MatchType::SubstringMatch,
                SUBSTRING_CONFIDENCE,
            );
        }
    }

    // 6) 未匹配
    MappingResult::unmatched()
}

// ==========================================
// ResolutionEngine - 绑定快照与级联能力
// ==========================================
// 用法: 每次请求从 SnapshotStore 取当前快照构造，不跨刷新周期持有
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    snapshot: Arc<ReferenceSnapshot>,
    profile: CascadeProfile,
}

impl ResolutionEngine {
    pub fn new(snapshot: Arc<ReferenceSnapshot>) -> Self {
        Self {
            snapshot,
            profile: CascadeProfile::full(),
        }
    }

    pub fn with_profile(snapshot: Arc<ReferenceSnapshot>, profile: CascadeProfile) -> Self {
        Self { snapshot, profile }
    }

    pub fn snapshot(&self) -> &ReferenceSnapshot {
        &self.snapshot
    }

    pub fn profile(&self) -> &CascadeProfile {
        &self.profile
    }

    /// 解析原始标识
    pub fn resolve(&self, raw_sku: &str, source: &str) -> MappingResult {
        resolve_with_profile(&self.snapshot, raw_sku, source, &self.profile)
    }

    /// 换算为基础单位
    pub fn convert(&self, result: &MappingResult, quantity: u64) -> u64 {
        UnitConversionCalculator::new(self.snapshot.catalog()).convert(result, quantity)
    }

    /// 换算明细（可解释性）
    pub fn explain_conversion(&self, result: &MappingResult, quantity: u64) -> ConversionBreakdown {
        UnitConversionCalculator::new(self.snapshot.catalog()).breakdown(result, quantity)
    }
}
