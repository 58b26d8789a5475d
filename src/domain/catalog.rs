// ==========================================
// 销售报表平台 - 产品目录领域模型
// ==========================================
// 用途: 参考数据（管理端写入，引擎层只读）
// 对齐: product_catalog 表
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// CatalogEntry - 规范产品条目
// ==========================================
// 红线: 一个条目只按一种换算系数解释
//   - 直接命中 sku          → units_per_display
//   - 经 master_box_sku 命中 → items_per_master_box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    // ===== 主键 =====
    pub sku: String, // 规范 SKU（唯一）

    // ===== 包装层级 =====
    pub master_box_sku: Option<String>, // 整箱（caja master）标识
    pub primary_sku: Option<String>,    // 单品 SKU（家族分组用）
    pub category: Option<String>,       // 品类

    // ===== 换算系数 =====
    pub units_per_display: Option<u32>,    // 一个展示装 = N 个基础单位（≥1）
    pub items_per_master_box: Option<u32>, // 一个整箱 = N 个基础单位（≥1，仅整箱条目）

    pub is_active: bool,
}

impl CatalogEntry {
    /// 创建单品/展示装条目（无整箱信息）
    pub fn new(sku: impl Into<String>, units_per_display: u32) -> Self {
        Self {
            sku: sku.into(),
            master_box_sku: None,
            primary_sku: None,
            category: None,
            units_per_display: Some(units_per_display),
            items_per_master_box: None,
            is_active: true,
        }
    }

    /// 挂接整箱标识及每箱数量
    pub fn with_master_box(mut self, master_box_sku: impl Into<String>, items: u32) -> Self {
        self.master_box_sku = Some(master_box_sku.into());
        self.items_per_master_box = Some(items);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_primary_sku(mut self, primary_sku: impl Into<String>) -> Self {
        self.primary_sku = Some(primary_sku.into());
        self
    }

    /// 展示装系数（缺失或为 0 时按 1）
    pub fn display_factor(&self) -> u32 {
        self.units_per_display.filter(|&n| n >= 1).unwrap_or(1)
    }

    /// 整箱系数（缺失或为 0 时按 1）
    pub fn master_box_factor(&self) -> u32 {
        self.items_per_master_box.filter(|&n| n >= 1).unwrap_or(1)
    }
}
