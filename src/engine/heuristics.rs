// ==========================================
// 销售报表平台 - 启发式兜底集
// ==========================================
// 职责: 规则库尚未覆盖的常见录入错误（级联第 4 层）
// 顺序: separator → missing_separator → trailing_digit → digit_lookalike
// 红线: 每个候选都必须命中目录（直接或整箱）才算成功
// ==========================================

use crate::domain::HeuristicKind;
use crate::engine::catalog_index::CatalogIndex;

/// 固定求值顺序
pub const HEURISTIC_ORDER: [HeuristicKind; 4] = [
    HeuristicKind::Separator,
    HeuristicKind::MissingSeparator,
    HeuristicKind::TrailingDigit,
    HeuristicKind::DigitLookalike,
];

/// 品牌前缀长度（如 BAKC_ / KSMC_）
const BRAND_PREFIX_LEN: usize = 4;

/// 依次尝试启发式，返回首个命中目录的候选
///
/// sku 需已归一化。
pub fn apply_heuristics(index: &CatalogIndex, sku: &str) -> Option<(HeuristicKind, String)> {
    for kind in HEURISTIC_ORDER {
        for candidate in candidates(kind, sku) {
            if candidate != sku && index.contains_key(&candidate) {
                return Some((kind, candidate));
            }
        }
    }
    None
}

/// 生成某一启发式的候选标识（按尝试顺序）
pub fn candidates(kind: HeuristicKind, sku: &str) -> Vec<String> {
    match kind {
        HeuristicKind::Separator => separator_candidate(sku).into_iter().collect(),
        HeuristicKind::MissingSeparator => missing_separator_candidate(sku).into_iter().collect(),
        HeuristicKind::TrailingDigit => trailing_digit_candidates(sku),
        HeuristicKind::DigitLookalike => digit_lookalike_candidate(sku).into_iter().collect(),
    }
}

/// '-', '.', '/', 空格 统一为 '_'，合并连续 '_'
fn separator_candidate(sku: &str) -> Option<String> {
    let replaced: String = sku
        .chars()
        .map(|c| match c {
            '-' | '.' | '/' | ' ' => '_',
            other => other,
        })
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }
    let candidate = collapsed.trim_matches('_').to_string();

    (candidate != sku && !candidate.is_empty()).then_some(candidate)
}

/// BAKCU04010 → BAKC_U04010
fn missing_separator_candidate(sku: &str) -> Option<String> {
    if !sku.is_ascii() || sku.contains('_') || sku.len() <= BRAND_PREFIX_LEN {
        return None;
    }
    let (brand, rest) = sku.split_at(BRAND_PREFIX_LEN);
    if !brand.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(format!("{}_{}", brand, rest))
}

/// 多一位尾数 → 去掉；少一位尾数 → 补 0
fn trailing_digit_candidates(sku: &str) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(last) = sku.chars().last() {
        if last.is_ascii_digit() {
            let trimmed = &sku[..sku.len() - 1];
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
            out.push(format!("{}0", sku));
        }
    }
    out
}

/// 末段（最后一个 '_' 之后）首字符为包装字母，其余应为数字: O→0, I/L→1
fn digit_lookalike_candidate(sku: &str) -> Option<String> {
    let (head, tail) = sku.rsplit_once('_')?;
    let mut chars = tail.chars();
    let lead = chars.next()?;
    let body: Vec<char> = chars.collect();

    if body.is_empty() {
        return None;
    }
    let lookalike = |c: &char| matches!(c, 'O' | 'I' | 'L');
    if !body.iter().all(|c| c.is_ascii_digit() || lookalike(c)) || !body.iter().any(lookalike) {
        return None;
    }

    let fixed: String = body
        .iter()
        .map(|c| match c {
            'O' => '0',
            'I' | 'L' => '1',
            other => *other,
        })
        .collect();
    Some(format!("{}_{}{}", head, lead, fixed))
}
