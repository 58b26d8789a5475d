// ==========================================
// 销售报表平台 - 产品目录索引
// ==========================================
// 职责: 只读内存索引（每个刷新周期构建一次）
// 结构: sku → 条目 / master_box_sku → 条目 两张哈希表
// 红线: 同一键同时出现在两张表时，直接命中优先
// ==========================================

use crate::domain::CatalogEntry;
use crate::engine::normalize::normalize_sku;
use std::collections::HashMap;

/// 子串匹配的默认最小长度
pub const DEFAULT_SUBSTRING_MIN_LEN: usize = 8;

/// 换算系数来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorSource {
    /// 直接命中 sku，使用 units_per_display
    Display,
    /// 经 master_box_sku 命中，使用 items_per_master_box
    MasterBox,
    /// 未匹配或目标不在目录中
    Default,
}

/// CatalogIndex - 产品目录索引
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<CatalogEntry>,
    by_sku: HashMap<String, usize>,
    by_master: HashMap<String, usize>,
    // 子串候选: 按长度降序、同长按字典序，保证结果确定
    substring_candidates: Vec<String>,
}

impl CatalogIndex {
    /// 从目录条目构建索引（仅 is_active 条目）
    ///
    /// 重复 sku 以先出现者为准。
    pub fn build<I>(entries: I, substring_min_len: usize) -> Self
    where
        I: IntoIterator<Item = CatalogEntry>,
    {
        let mut index = CatalogIndex::default();

        for mut entry in entries.into_iter().filter(|e| e.is_active) {
            let key = normalize_sku(&entry.sku);
            if key.is_empty() {
                continue;
            }
            if index.by_sku.contains_key(&key) {
                tracing::warn!(sku = %key, "目录存在重复 SKU，忽略后出现的条目");
                continue;
            }
            entry.sku = key.clone();
            entry.master_box_sku = entry
                .master_box_sku
                .as_deref()
                .map(normalize_sku)
                .filter(|s| !s.is_empty());

            let pos = index.entries.len();
            if let Some(master) = entry.master_box_sku.clone() {
                if index.by_master.contains_key(&master) {
                    tracing::warn!(master_box_sku = %master, "整箱标识重复，忽略后出现的条目");
                } else {
                    index.by_master.insert(master, pos);
                }
            }
            index.by_sku.insert(key, pos);
            index.entries.push(entry);
        }

        for master in index.by_master.keys() {
            if index.by_sku.contains_key(master) {
                tracing::debug!(sku = %master, "整箱标识与规范 SKU 重名，按直接命中处理");
            }
        }

        let mut candidates: Vec<String> = index
            .by_sku
            .keys()
            .filter(|k| k.chars().count() >= substring_min_len)
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        index.substring_candidates = candidates;

        index
    }

    /// 按 sku 精确查找（大小写不敏感）
    pub fn lookup_direct(&self, sku: &str) -> Option<&CatalogEntry> {
        self.get_direct(&normalize_sku(sku))
    }

    /// 按 master_box_sku 精确查找（大小写不敏感）
    pub fn lookup_master(&self, sku: &str) -> Option<&CatalogEntry> {
        self.get_master(&normalize_sku(sku))
    }

    /// 已归一化键的直接查找（引擎内部使用）
    pub(crate) fn get_direct(&self, key: &str) -> Option<&CatalogEntry> {
        self.by_sku.get(key).map(|&i| &self.entries[i])
    }

    pub(crate) fn get_master(&self, key: &str) -> Option<&CatalogEntry> {
        self.by_master.get(key).map(|&i| &self.entries[i])
    }

    /// 是否命中目录（直接或整箱）
    pub(crate) fn contains_key(&self, key: &str) -> bool {
        self.by_sku.contains_key(key) || self.by_master.contains_key(key)
    }

    /// 在 haystack 中查找最长的目录 SKU 子串
    pub fn longest_contained_sku(&self, haystack: &str) -> Option<&str> {
        self.substring_candidates
            .iter()
            .find(|sku| haystack.contains(sku.as_str()))
            .map(|s| s.as_str())
    }

    /// 解析最终目标的换算系数（两跳: 目标 SKU → 目标自身的目录条目）
    pub fn conversion_factor(&self, target_sku: &str) -> (u32, FactorSource) {
        let key = normalize_sku(target_sku);
        if let Some(entry) = self.get_direct(&key) {
            return (entry.display_factor(), FactorSource::Display);
        }
        if let Some(entry) = self.get_master(&key) {
            return (entry.master_box_factor(), FactorSource::MasterBox);
        }
        (1, FactorSource::Default)
    }

    /// 有效条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}
