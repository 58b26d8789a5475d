// ==========================================
// 销售报表平台 - 数据仓储层
// ==========================================
// 红线: Repository 不含解析逻辑
// ==========================================
// 职责: 提供参考数据（目录/规则）的持久化访问
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod catalog_repo;
pub mod error;
pub mod mapping_rule_repo;
pub mod reference_source;

// 重导出核心仓储
pub use catalog_repo::ProductCatalogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use mapping_rule_repo::SkuMappingRuleRepository;
pub use reference_source::SqliteReferenceSource;
