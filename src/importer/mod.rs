// ==========================================
// 销售报表平台 - 导入层
// ==========================================
// 职责: 外部参考数据（目录/规则）与对账样本的导入
// 支持: CSV
// ==========================================

// 模块声明
pub mod csv_source;
pub mod error;
pub mod reference_parser;

// 重导出核心类型
pub use csv_source::CsvReferenceSource;
pub use error::{ImportError, ImportResult};
pub use reference_parser::{
    parse_catalog_csv, parse_catalog_records, parse_rule_records, parse_rules_csv,
    parse_sample_records, parse_samples_csv, read_csv, read_csv_file, ImportIssue, ImportReport,
    CsvTable, Parsed, RawRecord,
};
