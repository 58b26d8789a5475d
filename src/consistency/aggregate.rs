// ==========================================
// 销售报表平台 - 预计算聚合契约
// ==========================================
// 职责: 规定周期性预计算聚合必须算出的内容
//   - 按目标 SKU 汇总基础单位 / 原始数量 / 行数
//   - 按 match_type 统计行数
//   - 未匹配行清单（人工复核）
// 红线: 聚合只能通过 evaluate_line 求值，不得另写解析逻辑
// 说明: 存储与刷新机制属于外部协作方，不在此处
// ==========================================

use crate::domain::RawOrderLine;
use crate::engine::evaluator::evaluate_line;
use crate::engine::profile::CascadeProfile;
use crate::engine::snapshot::ReferenceSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// 单个目标 SKU 的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkuAggregateRow {
    pub target_sku: String,
    pub base_units: u64,
    pub raw_quantity: u64,
    pub line_count: usize,
}

/// 聚合结果
#[derive(Debug, Clone, Serialize)]
pub struct SalesAggregate {
    pub snapshot_id: String,
    pub profile: String,
    pub rows: BTreeMap<String, SkuAggregateRow>,
    pub match_type_counts: BTreeMap<String, usize>,
    pub unresolved: Vec<RawOrderLine>,
    pub built_at: DateTime<Utc>,
}

/// 两份聚合之间的单 SKU 差异
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateDelta {
    pub target_sku: String,
    pub left_base_units: u64,
    pub right_base_units: u64,
}

impl SalesAggregate {
    pub fn base_units_for(&self, target_sku: &str) -> u64 {
        self.rows.get(target_sku).map(|r| r.base_units).unwrap_or(0)
    }

    pub fn total_base_units(&self) -> u64 {
        self.rows.values().map(|r| r.base_units).sum()
    }

    /// 未匹配原始数量合计
    pub fn unresolved_quantity(&self) -> u64 {
        self.unresolved.iter().map(|l| l.quantity).sum()
    }

    /// 与另一份聚合逐 SKU 比较（如完整级联 vs 降级级联）
    pub fn diff(&self, other: &SalesAggregate) -> Vec<AggregateDelta> {
        let keys: BTreeSet<&String> = self.rows.keys().chain(other.rows.keys()).collect();
        keys.into_iter()
            .filter_map(|sku| {
                let left = self.base_units_for(sku);
                let right = other.base_units_for(sku);
                (left != right).then(|| AggregateDelta {
                    target_sku: sku.clone(),
                    left_base_units: left,
                    right_base_units: right,
                })
            })
            .collect()
    }
}

/// AggregateBuilder - 聚合构建器
pub struct AggregateBuilder {
    profile: CascadeProfile,
}

impl AggregateBuilder {
    /// 完整级联聚合（推荐: 批量路径与交互路径共用同一求值函数）
    pub fn full() -> Self {
        Self {
            profile: CascadeProfile::full(),
        }
    }

    /// 受限上下文的聚合（必须同时部署对账检查）
    pub fn with_profile(profile: CascadeProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &CascadeProfile {
        &self.profile
    }

    pub fn build<'a, I>(&self, snapshot: &ReferenceSnapshot, lines: I) -> SalesAggregate
    where
        I: IntoIterator<Item = &'a RawOrderLine>,
    {
        let mut rows: BTreeMap<String, SkuAggregateRow> = BTreeMap::new();
        let mut match_type_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut unresolved = Vec::new();

        for line in lines {
            let evaluated = evaluate_line(snapshot, &self.profile, line);
            *match_type_counts
                .entry(evaluated.result.match_type.to_string())
                .or_insert(0) += 1;

            match evaluated.result.target_sku.as_deref() {
                Some(target) => {
                    let row = rows.entry(target.to_string()).or_insert_with(|| SkuAggregateRow {
                        target_sku: target.to_string(),
                        ..SkuAggregateRow::default()
                    });
                    row.base_units = row.base_units.saturating_add(evaluated.base_units);
                    row.raw_quantity = row.raw_quantity.saturating_add(line.quantity);
                    row.line_count += 1;
                }
                None => unresolved.push(line.clone()),
            }
        }

        if !unresolved.is_empty() {
            tracing::info!(
                profile = self.profile.name(),
                unresolved = unresolved.len(),
                "聚合中存在未匹配行，需人工复核"
            );
        }

        SalesAggregate {
            snapshot_id: snapshot.snapshot_id().to_string(),
            profile: self.profile.name().to_string(),
            rows,
            match_type_counts,
            unresolved,
            built_at: Utc::now(),
        }
    }
}
