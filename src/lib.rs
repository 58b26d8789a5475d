// ==========================================
// 销售报表平台 - SKU 解析与单位换算核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 把渠道原始 SKU 标识解析为目录 SKU，并换算为基础单位
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 参考数据访问
pub mod repository;

// 引擎层 - 解析级联与单位换算
pub mod engine;

// 一致性契约层 - 第二求值上下文与对账
pub mod consistency;

// 导入层 - CSV 参考数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CatalogEntry, HeuristicKind, MappingResult, MappingRule, MatchType, PatternType,
    RawOrderLine,
};

// 引擎
pub use engine::{
    CascadeProfile, CatalogIndex, ReferenceSnapshot, ReferenceSource, ResolutionEngine,
    RuleStore, SnapshotStore, UnitConversionCalculator,
};

// 一致性
pub use consistency::{AggregateBuilder, ReconciliationCheck, ReconciliationReport};

// 配置
pub use config::{ConfigManager, ResolverConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "SKU 解析引擎";
