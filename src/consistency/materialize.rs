// ==========================================
// 销售报表平台 - 正则规则物化
// ==========================================
// 用途: 声明式联接（只支持 exact/prefix/suffix/contains）的上下文
//       预先把“字面量正则”改写为等价的普通规则
// 映射: ^LIT$ → exact | ^LIT → prefix | LIT$ → suffix | LIT → contains
// 约束: 含字符类/量词/分组/转义类等的正则不可物化，原样返回给调用方
// 注意: 物化后同优先级内的类型次序会前移，残余分歧由对账检查度量
// ==========================================

use crate::domain::{MappingRule, PatternType};
use serde::Serialize;

/// 不可物化的规则
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmaterializedRule {
    pub rule: MappingRule,
    pub reason: String,
}

/// 物化结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaterializeOutcome {
    /// 可在声明式上下文使用的规则（非正则规则原样保留）
    pub rules: Vec<MappingRule>,
    /// 仍需走共享求值函数的正则规则
    pub unmaterialized: Vec<UnmaterializedRule>,
}

/// 物化规则集中的正则规则
pub fn materialize_regex_rules(rules: &[MappingRule]) -> MaterializeOutcome {
    let mut outcome = MaterializeOutcome::default();
    for rule in rules {
        if rule.pattern_type != PatternType::Regex {
            outcome.rules.push(rule.clone());
            continue;
        }
        match materialize_regex_rule(rule) {
            Ok(converted) => outcome.rules.push(converted),
            Err(reason) => {
                tracing::debug!(rule_id = %rule.rule_id, reason = %reason, "正则规则无法物化");
                outcome.unmaterialized.push(UnmaterializedRule {
                    rule: rule.clone(),
                    reason,
                })
            }
        }
    }
    outcome
}

/// 物化单条正则规则
pub fn materialize_regex_rule(rule: &MappingRule) -> Result<MappingRule, String> {
    if rule.pattern_type != PatternType::Regex {
        return Err(format!("不是正则规则: {}", rule.pattern_type));
    }

    let mut body = rule.source_pattern.trim();
    let anchored_start = body.starts_with('^');
    if anchored_start {
        body = &body[1..];
    }
    let anchored_end = body.ends_with('$') && !ends_with_escaped_dollar(body);
    if anchored_end {
        body = &body[..body.len() - 1];
    }

    let literal = unescape_literal(body)?;
    if literal.is_empty() {
        return Err("字面量为空".to_string());
    }

    let pattern_type = match (anchored_start, anchored_end) {
        (true, true) => PatternType::Exact,
        (true, false) => PatternType::Prefix,
        (false, true) => PatternType::Suffix,
        (false, false) => PatternType::Contains,
    };

    Ok(MappingRule {
        source_pattern: literal,
        pattern_type,
        ..rule.clone()
    })
}

fn ends_with_escaped_dollar(body: &str) -> bool {
    let backslashes = body[..body.len() - 1]
        .chars()
        .rev()
        .take_while(|&c| c == '\\')
        .count();
    backslashes % 2 == 1
}

/// 正则元字符
const META: &[char] = &['\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$'];

/// 字面量正则 → 字符串；遇到任何非字面量构造返回 Err
fn unescape_literal(body: &str) -> Result<String, String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) if META.contains(&next) || next == '-' || next == '/' || next == ' ' => {
                    out.push(next)
                }
                Some(next) => return Err(format!("转义类 \\{} 不是字面量", next)),
                None => return Err("末尾悬空的转义符".to_string()),
            }
        } else if META.contains(&c) {
            return Err(format!("包含元字符 '{}'", c));
        } else {
            out.push(c);
        }
    }
    Ok(out)
}
