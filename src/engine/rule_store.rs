// ==========================================
// 销售报表平台 - 映射规则库
// ==========================================
// 职责: 声明式规则的过滤、排序、匹配
// 求值顺序 (全序):
//   1. priority 降序
//   2. 同优先级: exact → prefix → suffix → contains → regex
//   3. 仍相同: 规则录入顺序
// 红线: 首个命中即返回，不再继续搜索低优先级规则
// 红线: 非法正则在构建时跳过并记录，绝不中断解析
// ==========================================

use crate::domain::{MappingRule, PatternType};
use crate::engine::normalize::{normalize_sku, normalize_source};
use regex::{Regex, RegexBuilder};
use std::cmp::Reverse;
use std::collections::BTreeSet;

/// CompiledRule - 预处理后的规则
///
/// 模式与来源过滤已归一化；regex 类型已编译。
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: MappingRule,
    pattern: String,
    source_filter: Option<String>,
    regex: Option<Regex>,
}

impl CompiledRule {
    fn compile(mut rule: MappingRule) -> Result<Self, String> {
        let trimmed = rule.source_pattern.trim().to_string();
        if trimmed.is_empty() {
            return Err("模式为空".to_string());
        }

        // 正则保持原样（大写会改变 \d 等转义的语义），改用大小写不敏感编译
        let (pattern, regex) = match rule.pattern_type {
            PatternType::Regex => {
                let re = RegexBuilder::new(&trimmed)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| e.to_string())?;
                (trimmed, Some(re))
            }
            _ => (normalize_sku(&trimmed), None),
        };

        rule.target_sku = rule
            .target_sku
            .as_deref()
            .map(normalize_sku)
            .filter(|s| !s.is_empty());

        let source_filter = rule
            .source_filter
            .as_deref()
            .map(normalize_source)
            .filter(|s| !s.is_empty());

        Ok(Self {
            rule,
            pattern,
            source_filter,
            regex,
        })
    }

    pub fn rule(&self) -> &MappingRule {
        &self.rule
    }

    pub fn pattern_type(&self) -> PatternType {
        self.rule.pattern_type
    }

    /// 来源过滤（None 表示适用全部来源）
    fn applies_to_source(&self, normalized_source: &str) -> bool {
        match &self.source_filter {
            Some(filter) => filter == normalized_source,
            None => true,
        }
    }

    /// 模式是否命中（raw 需已归一化）
    pub fn matches(&self, raw: &str) -> bool {
        match self.rule.pattern_type {
            PatternType::Exact => raw == self.pattern,
            PatternType::Prefix => raw.starts_with(&self.pattern),
            PatternType::Suffix => raw.ends_with(&self.pattern),
            PatternType::Contains => raw.contains(&self.pattern),
            PatternType::Regex => self.regex.as_ref().map(|re| re.is_match(raw)).unwrap_or(false),
        }
    }

    /// 改写语义: 剥离命中部分，返回剩余标识
    ///
    /// - prefix: 去掉开头  - suffix: 去掉结尾
    /// - contains/regex: 去掉第一处命中  - exact: 无剩余
    pub fn strip(&self, raw: &str) -> Option<String> {
        let remainder = match self.rule.pattern_type {
            PatternType::Exact => return None,
            PatternType::Prefix => raw.strip_prefix(self.pattern.as_str())?.to_string(),
            PatternType::Suffix => raw.strip_suffix(self.pattern.as_str())?.to_string(),
            PatternType::Contains => raw.replacen(self.pattern.as_str(), "", 1),
            PatternType::Regex => {
                let m = self.regex.as_ref()?.find(raw)?;
                format!("{}{}", &raw[..m.start()], &raw[m.end()..])
            }
        };
        let remainder = remainder.trim().to_string();
        if remainder.is_empty() || remainder == raw {
            None
        } else {
            Some(remainder)
        }
    }
}

/// RuleStore - 映射规则库（快照内不可变）
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    rules: Vec<CompiledRule>,
    skipped_invalid: usize,
}

impl RuleStore {
    /// 构建规则库: 过滤 is_active，编译并排序
    pub fn build<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = MappingRule>,
    {
        let mut compiled: Vec<(usize, CompiledRule)> = Vec::new();
        let mut skipped_invalid = 0;

        for (order, rule) in rules.into_iter().filter(|r| r.is_active).enumerate() {
            let rule_id = rule.rule_id.clone();
            let pattern = rule.source_pattern.clone();
            match CompiledRule::compile(rule) {
                Ok(c) => compiled.push((order, c)),
                Err(reason) => {
                    skipped_invalid += 1;
                    tracing::warn!(
                        rule_id = %rule_id,
                        pattern = %pattern,
                        reason = %reason,
                        "映射规则无效，已跳过"
                    );
                }
            }
        }

        compiled.sort_by_key(|(order, c)| (Reverse(c.rule.priority), c.rule.pattern_type, *order));

        Self {
            rules: compiled.into_iter().map(|(_, c)| c).collect(),
            skipped_invalid,
        }
    }

    /// 查找首个命中规则（全部匹配类型）
    pub fn find_matching_rule(&self, raw_sku: &str, source: &str) -> Option<&MappingRule> {
        let all: BTreeSet<PatternType> = PatternType::ALL.into_iter().collect();
        self.find_compiled(&normalize_sku(raw_sku), &normalize_source(source), &all)
            .map(|c| c.rule())
    }

    /// 查找首个命中规则，限定可用的匹配类型
    ///
    /// raw / source 需已归一化。不支持的类型视同不存在。
    pub fn find_compiled(
        &self,
        raw: &str,
        source: &str,
        allowed: &BTreeSet<PatternType>,
    ) -> Option<&CompiledRule> {
        self.rules
            .iter()
            .filter(|c| allowed.contains(&c.rule.pattern_type))
            .filter(|c| c.applies_to_source(source))
            .find(|c| c.matches(raw))
    }

    /// 参与匹配的规则（已排序）
    pub fn rules(&self) -> impl Iterator<Item = &MappingRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 构建时被跳过的非法规则数
    pub fn skipped_invalid(&self) -> usize {
        self.skipped_invalid
    }
}
