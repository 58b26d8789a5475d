// ==========================================
// 销售报表平台 - 订单行求值器（共享入口）
// ==========================================
// 职责: 解析 + 换算 的单一纯函数
// 调用方: 交互式逐行报表、批量聚合构建、对账检查
// ==========================================

use crate::domain::{MappingResult, RawOrderLine};
use crate::engine::conversion::UnitConversionCalculator;
use crate::engine::profile::CascadeProfile;
use crate::engine::resolution::resolve_with_profile;
use crate::engine::snapshot::ReferenceSnapshot;
use serde::Serialize;

/// 单行求值结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluatedLine {
    pub line: RawOrderLine,
    pub result: MappingResult,
    pub base_units: u64,
}

impl EvaluatedLine {
    /// 是否需要人工复核（未匹配）
    pub fn needs_review(&self) -> bool {
        !self.result.is_resolved()
    }
}

/// 求值单个订单行
pub fn evaluate_line(
    snapshot: &ReferenceSnapshot,
    profile: &CascadeProfile,
    line: &RawOrderLine,
) -> EvaluatedLine {
    let result = resolve_with_profile(snapshot, &line.raw_sku, &line.source, profile);
    let base_units = UnitConversionCalculator::new(snapshot.catalog()).convert(&result, line.quantity);
    EvaluatedLine {
        line: line.clone(),
        result,
        base_units,
    }
}

/// 批量求值（逐行调用 evaluate_line，保持输入顺序）
pub fn evaluate_lines<'a, I>(
    snapshot: &ReferenceSnapshot,
    profile: &CascadeProfile,
    lines: I,
) -> Vec<EvaluatedLine>
where
    I: IntoIterator<Item = &'a RawOrderLine>,
{
    lines
        .into_iter()
        .map(|line| evaluate_line(snapshot, profile, line))
        .collect()
}
