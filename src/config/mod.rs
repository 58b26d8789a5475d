// ==========================================
// 销售报表平台 - 配置层
// ==========================================
// 职责: 解析引擎配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod resolver_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use resolver_config::{ResolverConfig, ResolverConfigReader};
