// ==========================================
// 销售报表平台 - 一致性契约层
// ==========================================
// 职责: 第二求值上下文（预计算聚合等）相对解析引擎的约束
//   - 首选: 共用 engine::evaluate_line（一致性由构造保证）
//   - 受限上下文: 以 CascadeProfile 声明丢弃的匹配类型，
//     并部署 ReconciliationCheck 常驻度量分歧
// ==========================================

pub mod aggregate;
pub mod materialize;
pub mod reconciliation;

pub use crate::engine::profile::CascadeProfile;
pub use aggregate::{AggregateBuilder, AggregateDelta, SalesAggregate, SkuAggregateRow};
pub use materialize::{
    materialize_regex_rule, materialize_regex_rules, MaterializeOutcome, UnmaterializedRule,
};
pub use reconciliation::{
    compare_cascades, DivergenceThresholds, DivergentRow, ReconciliationCheck,
    ReconciliationReport, ReconciliationSample,
};
