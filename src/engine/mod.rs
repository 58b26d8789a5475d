// ==========================================
// 销售报表平台 - 引擎层
// ==========================================
// 职责: SKU 规范化解析与单位换算
// 红线: Engine 不拼 SQL，所有结果必须可解释（match_type + confidence）
// 红线: 解析是快照上的纯函数，不做网络 I/O（刷新除外）
// ==========================================

pub mod catalog_index;
pub mod conversion;
pub mod evaluator;
pub mod events;
pub mod heuristics;
pub mod normalize;
pub mod profile;
pub mod resolution;
pub mod rule_store;
pub mod snapshot;
pub mod snapshot_store;

// 重导出核心引擎
pub use catalog_index::{CatalogIndex, FactorSource, DEFAULT_SUBSTRING_MIN_LEN};
pub use conversion::{ConversionBreakdown, UnitConversionCalculator};
pub use evaluator::{evaluate_line, evaluate_lines, EvaluatedLine};
pub use events::{NoOpEventPublisher, ResolutionEvent, ResolutionEventPublisher};
pub use heuristics::{apply_heuristics, HEURISTIC_ORDER};
pub use normalize::normalize_sku;
pub use profile::CascadeProfile;
pub use resolution::{resolve, resolve_with_profile, ResolutionEngine};
pub use rule_store::{CompiledRule, RuleStore};
pub use snapshot::{ReferenceSnapshot, SnapshotOptions, SnapshotStats};
pub use snapshot_store::{
    spawn_refresh_loop, ReferenceSource, SnapshotError, SnapshotStore, DEFAULT_SNAPSHOT_TTL,
};
