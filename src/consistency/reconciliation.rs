// ==========================================
// 销售报表平台 - 完整/降级级联对账
// ==========================================
// 职责: 对样本行分别按完整级联与降级级联求值，找出分歧
// 分歧口径: target_sku 不同 或 base_units 不同
//   （仅 match_type/confidence 不同但报表数量一致，不计为分歧）
// 输出: 分歧行 + 行数比例 + 收入加权占比 + 基础单位差
// 红线: 分歧是可度量、可告警的数据质量指标，不是运行时异常
// ==========================================

use crate::domain::{MappingResult, PatternType, RawOrderLine};
use crate::engine::events::{publish_or_log, ResolutionEvent, ResolutionEventPublisher};
use crate::engine::evaluator::evaluate_line;
use crate::engine::profile::CascadeProfile;
use crate::engine::snapshot::ReferenceSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 对账样本行（收入用于加权，可缺省）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSample {
    pub line: RawOrderLine,
    pub revenue: Option<f64>,
}

impl ReconciliationSample {
    pub fn new(line: RawOrderLine, revenue: Option<f64>) -> Self {
        Self { line, revenue }
    }
}

impl From<RawOrderLine> for ReconciliationSample {
    fn from(line: RawOrderLine) -> Self {
        Self { line, revenue: None }
    }
}

/// 分歧行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergentRow {
    pub raw_sku: String,
    pub source: String,
    pub quantity: u64,
    pub revenue: f64,
    pub full_result: MappingResult,
    pub degraded_result: MappingResult,
    pub full_base_units: u64,
    pub degraded_base_units: u64,
}

/// 告警阈值（超过即告警；0.0 表示任何分歧都告警）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DivergenceThresholds {
    pub max_row_rate: f64,
    pub max_revenue_share: f64,
}

impl Default for DivergenceThresholds {
    fn default() -> Self {
        Self {
            max_row_rate: 0.0,
            max_revenue_share: 0.0,
        }
    }
}

/// 对账报告
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub snapshot_id: String,
    pub profile: String,
    pub dropped_pattern_types: Vec<PatternType>,
    pub total_rows: usize,
    pub divergent_rows: Vec<DivergentRow>,
    pub total_revenue: f64,
    pub divergent_revenue: f64,
    /// 分歧行的基础单位绝对差之和
    pub base_unit_delta: u64,
    pub checked_at: DateTime<Utc>,
}

impl ReconciliationReport {
    pub fn divergent_count(&self) -> usize {
        self.divergent_rows.len()
    }

    pub fn divergence_rate(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.divergent_rows.len() as f64 / self.total_rows as f64
        }
    }

    pub fn revenue_share(&self) -> f64 {
        if self.total_revenue <= 0.0 {
            0.0
        } else {
            self.divergent_revenue / self.total_revenue
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.divergent_rows.is_empty()
    }

    /// 是否超过告警阈值
    pub fn exceeds(&self, thresholds: &DivergenceThresholds) -> bool {
        !self.is_consistent()
            && (self.divergence_rate() > thresholds.max_row_rate
                || self.revenue_share() > thresholds.max_revenue_share)
    }
}

// ==========================================
// ReconciliationCheck - 常驻对账检查
// ==========================================
pub struct ReconciliationCheck {
    degraded: CascadeProfile,
    thresholds: DivergenceThresholds,
    publisher: Arc<dyn ResolutionEventPublisher>,
}

impl ReconciliationCheck {
    pub fn new(
        degraded: CascadeProfile,
        thresholds: DivergenceThresholds,
        publisher: Arc<dyn ResolutionEventPublisher>,
    ) -> Self {
        Self {
            degraded,
            thresholds,
            publisher,
        }
    }

    pub fn degraded_profile(&self) -> &CascadeProfile {
        &self.degraded
    }

    /// 执行对账；超过阈值时发布数据质量告警
    pub fn run(&self, snapshot: &ReferenceSnapshot, samples: &[ReconciliationSample]) -> ReconciliationReport {
        let report = compare_cascades(snapshot, &self.degraded, samples);

        tracing::info!(
            profile = %report.profile,
            total_rows = report.total_rows,
            divergent_rows = report.divergent_count(),
            divergence_rate = report.divergence_rate(),
            revenue_share = report.revenue_share(),
            "级联对账完成"
        );

        if report.exceeds(&self.thresholds) {
            tracing::warn!(
                profile = %report.profile,
                divergent_rows = report.divergent_count(),
                "降级级联分歧超出阈值"
            );
            publish_or_log(
                self.publisher.as_ref(),
                ResolutionEvent::DivergenceThresholdExceeded {
                    profile: report.profile.clone(),
                    divergent_rows: report.divergent_count(),
                    total_rows: report.total_rows,
                    divergence_rate: report.divergence_rate(),
                    divergent_revenue: report.divergent_revenue,
                    revenue_share: report.revenue_share(),
                },
            );
        }

        report
    }
}

/// 完整级联 vs 指定降级级联（纯函数，不发布事件）
pub fn compare_cascades(
    snapshot: &ReferenceSnapshot,
    degraded: &CascadeProfile,
    samples: &[ReconciliationSample],
) -> ReconciliationReport {
    let full = CascadeProfile::full();
    let mut divergent_rows = Vec::new();
    let mut total_revenue = 0.0;
    let mut divergent_revenue = 0.0;
    let mut base_unit_delta: u64 = 0;

    for sample in samples {
        let revenue = sample.revenue.filter(|r| r.is_finite()).unwrap_or(0.0);
        total_revenue += revenue;

        let a = evaluate_line(snapshot, &full, &sample.line);
        let b = evaluate_line(snapshot, degraded, &sample.line);

        if a.result.target_sku != b.result.target_sku || a.base_units != b.base_units {
            divergent_revenue += revenue;
            base_unit_delta = base_unit_delta.saturating_add(a.base_units.abs_diff(b.base_units));
            divergent_rows.push(DivergentRow {
                raw_sku: sample.line.raw_sku.clone(),
                source: sample.line.source.clone(),
                quantity: sample.line.quantity,
                revenue,
                full_result: a.result,
                degraded_result: b.result,
                full_base_units: a.base_units,
                degraded_base_units: b.base_units,
            });
        }
    }

    ReconciliationReport {
        snapshot_id: snapshot.snapshot_id().to_string(),
        profile: degraded.name().to_string(),
        dropped_pattern_types: degraded.dropped_pattern_types(),
        total_rows: samples.len(),
        divergent_rows,
        total_revenue,
        divergent_revenue,
        base_unit_delta,
        checked_at: Utc::now(),
    }
}
