// ==========================================
// 销售报表平台 - 解析引擎配置
// ==========================================
// 职责: 解析引擎所需配置项（值对象 + 读取接口）
// 红线: 不包含配置写入、不包含解析逻辑
// ==========================================

use crate::consistency::DivergenceThresholds;
use crate::engine::snapshot::SnapshotOptions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;

// ==========================================
// ResolverConfig - 配置值对象
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub snapshot_ttl_secs: u64,                  // 快照有效期（秒）
    pub substring_min_len: usize,                // 子串兜底的最小目录 SKU 长度
    pub max_rewrite_depth: usize,                // 改写规则最大递归深度
    pub divergence_row_rate_threshold: f64,      // 分歧行占比阈值
    pub divergence_revenue_share_threshold: f64, // 分歧收入占比阈值
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let options = SnapshotOptions::default();
        Self {
            snapshot_ttl_secs: 300,
            substring_min_len: options.substring_min_len,
            max_rewrite_depth: options.max_rewrite_depth,
            divergence_row_rate_threshold: 0.0,
            divergence_revenue_share_threshold: 0.0,
        }
    }
}

impl ResolverConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    pub fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            substring_min_len: self.substring_min_len,
            max_rewrite_depth: self.max_rewrite_depth,
        }
    }

    pub fn thresholds(&self) -> DivergenceThresholds {
        DivergenceThresholds {
            max_row_rate: self.divergence_row_rate_threshold,
            max_revenue_share: self.divergence_revenue_share_threshold,
        }
    }
}

// ==========================================
// ResolverConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ResolverConfigReader: Send + Sync {
    /// 快照有效期（秒）
    ///
    /// # 默认值
    /// - 300
    async fn get_snapshot_ttl_secs(&self) -> Result<u64, Box<dyn Error>>;

    /// 子串兜底最小长度
    ///
    /// # 默认值
    /// - 8
    async fn get_substring_min_len(&self) -> Result<usize, Box<dyn Error>>;

    /// 改写规则最大递归深度
    ///
    /// # 默认值
    /// - 3
    async fn get_max_rewrite_depth(&self) -> Result<usize, Box<dyn Error>>;

    /// 分歧行占比阈值（0.0 表示任何分歧都告警）
    async fn get_divergence_row_rate_threshold(&self) -> Result<f64, Box<dyn Error>>;

    /// 分歧收入占比阈值
    async fn get_divergence_revenue_share_threshold(&self) -> Result<f64, Box<dyn Error>>;
}
