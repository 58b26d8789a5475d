// ==========================================
// 销售报表平台 - 级联能力声明
// ==========================================
// 职责: 描述一个求值上下文能执行的级联子集
// 约束 (降级级联):
//   - 层级 1-2 与完整级联一致
//   - 层级 3 仅限声明支持的匹配类型
//   - 不执行层级 4-5
// ==========================================

use crate::domain::PatternType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// CascadeProfile - 级联能力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeProfile {
    name: String,
    pattern_types: BTreeSet<PatternType>,
    heuristics_enabled: bool,
    substring_enabled: bool,
}

impl CascadeProfile {
    /// 完整级联（交互式逐行求值使用）
    pub fn full() -> Self {
        Self {
            name: "full".to_string(),
            pattern_types: PatternType::ALL.into_iter().collect(),
            heuristics_enabled: true,
            substring_enabled: true,
        }
    }

    /// 降级级联: 仅支持给定匹配类型，省略启发式与子串层级
    pub fn degraded<I>(name: impl Into<String>, pattern_types: I) -> Self
    where
        I: IntoIterator<Item = PatternType>,
    {
        Self {
            name: name.into(),
            pattern_types: pattern_types.into_iter().collect(),
            heuristics_enabled: false,
            substring_enabled: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern_types(&self) -> &BTreeSet<PatternType> {
        &self.pattern_types
    }

    pub fn supports(&self, pattern_type: PatternType) -> bool {
        self.pattern_types.contains(&pattern_type)
    }

    pub fn heuristics_enabled(&self) -> bool {
        self.heuristics_enabled
    }

    pub fn substring_enabled(&self) -> bool {
        self.substring_enabled
    }

    /// 相对完整级联被丢弃的匹配类型
    pub fn dropped_pattern_types(&self) -> Vec<PatternType> {
        PatternType::ALL
            .into_iter()
            .filter(|t| !self.pattern_types.contains(t))
            .collect()
    }

    pub fn is_full(&self) -> bool {
        self.dropped_pattern_types().is_empty() && self.heuristics_enabled && self.substring_enabled
    }
}

impl Default for CascadeProfile {
    fn default() -> Self {
        Self::full()
    }
}
