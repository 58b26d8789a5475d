// ==========================================
// 销售报表平台 - 领域类型定义
// ==========================================
// 职责: 规则匹配类型、解析层级、启发式名称
// 红线: 字符串口径与下游报表一致 (snake_case)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 规则匹配类型 (Pattern Type)
// ==========================================
// 同优先级下的求值顺序: exact < prefix < suffix < contains < regex
// (越精确越靠前，derive(Ord) 即为该顺序)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Exact,    // 完全相等
    Prefix,   // 前缀
    Suffix,   // 后缀
    Contains, // 包含
    Regex,    // 正则（非锚定搜索）
}

impl PatternType {
    /// 全部类型（按同优先级求值顺序）
    pub const ALL: [PatternType; 5] = [
        PatternType::Exact,
        PatternType::Prefix,
        PatternType::Suffix,
        PatternType::Contains,
        PatternType::Regex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Exact => "exact",
            PatternType::Prefix => "prefix",
            PatternType::Suffix => "suffix",
            PatternType::Contains => "contains",
            PatternType::Regex => "regex",
        }
    }

    /// 从字符串解析（大小写不敏感，未知类型返回 None）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Some(PatternType::Exact),
            "prefix" => Some(PatternType::Prefix),
            "suffix" => Some(PatternType::Suffix),
            "contains" => Some(PatternType::Contains),
            "regex" => Some(PatternType::Regex),
            _ => None,
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 启发式兜底 (Heuristic)
// ==========================================
// 固定顺序，见 engine::heuristics::HEURISTIC_ORDER
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    Separator,        // 分隔符统一为 '_'
    MissingSeparator, // 品牌前缀后缺少 '_'
    TrailingDigit,    // 尾部数字多一位/少一位
    DigitLookalike,   // 数字段中 O/I/L 误录
}

impl HeuristicKind {
    pub fn name(&self) -> &'static str {
        match self {
            HeuristicKind::Separator => "separator",
            HeuristicKind::MissingSeparator => "missing_separator",
            HeuristicKind::TrailingDigit => "trailing_digit",
            HeuristicKind::DigitLookalike => "digit_lookalike",
        }
    }

    /// 置信度（85-90 区间）
    pub fn confidence(&self) -> u8 {
        match self {
            HeuristicKind::Separator => 90,
            HeuristicKind::MissingSeparator => 90,
            HeuristicKind::TrailingDigit => 88,
            HeuristicKind::DigitLookalike => 85,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "separator" => Some(HeuristicKind::Separator),
            "missing_separator" => Some(HeuristicKind::MissingSeparator),
            "trailing_digit" => Some(HeuristicKind::TrailingDigit),
            "digit_lookalike" => Some(HeuristicKind::DigitLookalike),
            _ => None,
        }
    }
}

// ==========================================
// 解析层级 (Match Type)
// ==========================================
// 序列化格式: exact_match / caja_master / rule_<type> /
//             heuristic_<name> / substring_match / unmatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MatchType {
    ExactMatch,
    CajaMaster,
    Rule(PatternType),
    Heuristic(HeuristicKind),
    SubstringMatch,
    Unmatched,
}

impl MatchType {
    /// 级联层级序号（1-6）
    pub fn tier(&self) -> u8 {
        match self {
            MatchType::ExactMatch => 1,
            MatchType::CajaMaster => 2,
            MatchType::Rule(_) => 3,
            MatchType::Heuristic(_) => 4,
            MatchType::SubstringMatch => 5,
            MatchType::Unmatched => 6,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exact_match" => Some(MatchType::ExactMatch),
            "caja_master" => Some(MatchType::CajaMaster),
            "substring_match" => Some(MatchType::SubstringMatch),
            "unmatched" => Some(MatchType::Unmatched),
            other => {
                if let Some(t) = other.strip_prefix("rule_") {
                    PatternType::parse(t).map(MatchType::Rule)
                } else if let Some(h) = other.strip_prefix("heuristic_") {
                    HeuristicKind::parse(h).map(MatchType::Heuristic)
                } else {
                    None
                }
            }
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::ExactMatch => write!(f, "exact_match"),
            MatchType::CajaMaster => write!(f, "caja_master"),
            MatchType::Rule(t) => write!(f, "rule_{}", t.as_str()),
            MatchType::Heuristic(h) => write!(f, "heuristic_{}", h.name()),
            MatchType::SubstringMatch => write!(f, "substring_match"),
            MatchType::Unmatched => write!(f, "unmatched"),
        }
    }
}

impl From<MatchType> for String {
    fn from(value: MatchType) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for MatchType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MatchType::parse(&value).ok_or_else(|| format!("未知的 match_type: {}", value))
    }
}
