// ==========================================
// 销售报表平台 - 领域模型层
// ==========================================
// 职责: 定义参考数据实体、求值输入输出、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod catalog;
pub mod mapping;
pub mod types;

// 重导出核心类型
pub use catalog::CatalogEntry;
pub use mapping::{MappingResult, MappingRule, RawOrderLine};
pub use types::{HeuristicKind, MatchType, PatternType};
