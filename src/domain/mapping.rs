// ==========================================
// 销售报表平台 - 映射规则与解析结果
// ==========================================
// MappingRule:  参考数据（声明式规则）
// RawOrderLine: 每次求值的输入（不持久化）
// MappingResult: 每次求值的输出（不持久化）
// ==========================================

use crate::domain::types::{MatchType, PatternType};
use serde::{Deserialize, Serialize};

// ==========================================
// MappingRule - 声明式映射规则
// ==========================================
// 红线: 仅 is_active 规则参与匹配
// 说明: target_sku 为空表示改写规则（剥离命中部分后继续解析）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub rule_id: String,                 // 规则ID（审计用）
    pub source_pattern: String,          // 匹配模式
    pub pattern_type: PatternType,       // 匹配类型
    pub source_filter: Option<String>,   // 仅对指定来源生效（None = 全部来源）
    pub target_sku: Option<String>,      // 目标规范 SKU（None = 改写规则）
    pub quantity_multiplier: u32,        // 组合装倍数（≥1，默认 1）
    pub confidence: u8,                  // 置信度 0-100
    pub priority: i32,                   // 优先级（越大越先求值）
    pub is_active: bool,
}

impl MappingRule {
    /// 创建映射规则（默认: 倍数 1，置信度 95，优先级 0，全部来源）
    pub fn new(
        rule_id: impl Into<String>,
        source_pattern: impl Into<String>,
        pattern_type: PatternType,
        target_sku: Option<&str>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            source_pattern: source_pattern.into(),
            pattern_type,
            source_filter: None,
            target_sku: target_sku.map(|s| s.to_string()),
            quantity_multiplier: 1,
            confidence: 95,
            priority: 0,
            is_active: true,
        }
    }

    pub fn with_multiplier(mut self, quantity_multiplier: u32) -> Self {
        self.quantity_multiplier = quantity_multiplier;
        self
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source_filter(mut self, source: impl Into<String>) -> Self {
        self.source_filter = Some(source.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// 是否为改写规则（无目标 SKU）
    pub fn is_rewrite(&self) -> bool {
        self.target_sku
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
    }
}

// ==========================================
// RawOrderLine - 原始订单行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOrderLine {
    pub raw_sku: String, // 来源系统原样 SKU
    pub source: String,  // 来源系统标识（如 relbase/shopify）
    pub quantity: u64,   // 原始数量
}

impl RawOrderLine {
    pub fn new(raw_sku: impl Into<String>, source: impl Into<String>, quantity: u64) -> Self {
        Self {
            raw_sku: raw_sku.into(),
            source: source.into(),
            quantity,
        }
    }
}

// ==========================================
// MappingResult - 解析结果
// ==========================================
// 红线: unmatched 是合法终态（confidence=0，multiplier=1），不是错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingResult {
    pub target_sku: Option<String>,
    pub match_type: MatchType,
    pub confidence: u8,
    pub quantity_multiplier: u32,

    /// 命中的规则（仅 rule_* 层级）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule_id: Option<String>,
}

impl MappingResult {
    /// 未匹配
    pub fn unmatched() -> Self {
        Self {
            target_sku: None,
            match_type: MatchType::Unmatched,
            confidence: 0,
            quantity_multiplier: 1,
            matched_rule_id: None,
        }
    }

    /// 目录类命中（非规则层级，倍数固定为 1）
    pub fn catalog_hit(target_sku: String, match_type: MatchType, confidence: u8) -> Self {
        Self {
            target_sku: Some(target_sku),
            match_type,
            confidence,
            quantity_multiplier: 1,
            matched_rule_id: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.target_sku.is_some()
    }
}
