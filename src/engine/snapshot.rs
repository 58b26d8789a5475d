// ==========================================
// 销售报表平台 - 参考数据快照
// ==========================================
// 职责: 目录索引 + 规则库 的不可变、带时间戳的组合
// 红线: 快照构建完成后不再修改；刷新 = 整体替换
// ==========================================

use crate::domain::{CatalogEntry, MappingRule};
use crate::engine::catalog_index::{CatalogIndex, DEFAULT_SUBSTRING_MIN_LEN};
use crate::engine::rule_store::RuleStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// 快照构建选项（影响求值结果，因此随快照固定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotOptions {
    /// 子串层级的最小 SKU 长度
    pub substring_min_len: usize,
    /// 改写规则的最大递归深度
    pub max_rewrite_depth: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            substring_min_len: DEFAULT_SUBSTRING_MIN_LEN,
            max_rewrite_depth: 3,
        }
    }
}

/// 快照统计（用于日志与监控）
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStats {
    pub catalog_entries: usize,
    pub active_rules: usize,
    pub skipped_invalid_rules: usize,
}

/// ReferenceSnapshot - 一个求值周期内的参考数据
#[derive(Debug, Clone)]
pub struct ReferenceSnapshot {
    snapshot_id: String,
    loaded_at: DateTime<Utc>,
    options: SnapshotOptions,
    catalog: CatalogIndex,
    rules: RuleStore,
}

impl ReferenceSnapshot {
    /// 从参考数据行构建快照
    pub fn build(
        catalog: Vec<CatalogEntry>,
        rules: Vec<MappingRule>,
        options: SnapshotOptions,
    ) -> Self {
        let catalog = CatalogIndex::build(catalog, options.substring_min_len);
        let rules = RuleStore::build(rules);
        Self {
            snapshot_id: Uuid::new_v4().to_string(),
            loaded_at: Utc::now(),
            options,
            catalog,
            rules,
        }
    }

    /// 空快照（首次加载前使用，全部解析为 unmatched）
    pub fn empty() -> Self {
        Self::build(Vec::new(), Vec::new(), SnapshotOptions::default())
    }

    pub fn snapshot_id(&self) -> &str {
        &self.snapshot_id
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn options(&self) -> SnapshotOptions {
        self.options
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            catalog_entries: self.catalog.len(),
            active_rules: self.rules.len(),
            skipped_invalid_rules: self.rules.skipped_invalid(),
        }
    }

    /// 快照年龄（时钟回拨时为负）
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.loaded_at
    }
}
