// ==========================================
// 销售报表平台 - 引擎层事件发布
// ==========================================
// 职责: 定义监控事件发布 trait，实现依赖倒置
// 说明: 引擎只发布事件，告警/监控渠道由外部实现
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;

// ==========================================
// 事件类型
// ==========================================

/// 解析引擎事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionEvent {
    /// 快照已替换
    SnapshotReloaded {
        snapshot_id: String,
        catalog_entries: usize,
        active_rules: usize,
        skipped_invalid_rules: usize,
        loaded_at: DateTime<Utc>,
    },
    /// 快照刷新失败（继续使用上一份快照）
    SnapshotReloadFailed {
        retained_snapshot_id: String,
        error: String,
        occurred_at: DateTime<Utc>,
    },
    /// 降级级联与完整级联的分歧超出阈值（数据质量告警）
    DivergenceThresholdExceeded {
        profile: String,
        divergent_rows: usize,
        total_rows: usize,
        divergence_rate: f64,
        divergent_revenue: f64,
        revenue_share: f64,
    },
}

impl ResolutionEvent {
    pub fn as_str(&self) -> &str {
        match self {
            ResolutionEvent::SnapshotReloaded { .. } => "SnapshotReloaded",
            ResolutionEvent::SnapshotReloadFailed { .. } => "SnapshotReloadFailed",
            ResolutionEvent::DivergenceThresholdExceeded { .. } => "DivergenceThresholdExceeded",
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 事件发布者（监控协作方实现）
pub trait ResolutionEventPublisher: Send + Sync {
    /// 发布事件
    ///
    /// 发布失败由调用方记录日志，不影响解析流程。
    fn publish(&self, event: ResolutionEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要监控的场景（如单元测试、离线工具）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl ResolutionEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: ResolutionEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!("NoOpEventPublisher: 跳过事件发布 - event_type={}", event.as_str());
        Ok(())
    }
}

/// 发布事件并吞掉发布失败（仅记录日志）
pub fn publish_or_log(publisher: &dyn ResolutionEventPublisher, event: ResolutionEvent) {
    let event_type = event.as_str().to_string();
    if let Err(e) = publisher.publish(event) {
        tracing::warn!(event_type = %event_type, error = %e, "事件发布失败");
    }
}
