// ==========================================
// 销售报表平台 - 标识符归一化
// ==========================================
// 红线: 全引擎唯一的归一化口径（去首尾空白 + 大写）
// ==========================================

/// 归一化 SKU / 规则模式
///
/// 幂等: normalize_sku(normalize_sku(x)) == normalize_sku(x)
pub fn normalize_sku(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// 归一化来源标识（来源过滤同样大小写不敏感）
pub fn normalize_source(source: &str) -> String {
    source.trim().to_uppercase()
}
