// ==========================================
// 销售报表平台 - 快照仓（单写多读）
// ==========================================
// 职责: 持有“当前快照”引用，按 TTL 或显式失效刷新
// 红线: 新快照在锁外完整构建，再原子替换引用
// 红线: 刷新失败保留上一份快照，上报监控，不使用半加载数据
// ==========================================

use crate::domain::{CatalogEntry, MappingRule};
use crate::engine::events::{publish_or_log, ResolutionEvent, ResolutionEventPublisher};
use crate::engine::resolution::ResolutionEngine;
use crate::engine::snapshot::{ReferenceSnapshot, SnapshotOptions};
use chrono::Utc;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use thiserror::Error;

/// 默认快照有效期（5 分钟）
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(300);

// ==========================================
// 参考数据来源
// ==========================================

/// 参考数据来源（目录流 + 规则流）
///
/// 实现者: SqliteReferenceSource（仓储层）、CsvReferenceSource（导入层）
pub trait ReferenceSource: Send + Sync {
    /// 来源描述（日志用）
    fn describe(&self) -> String;

    fn load_catalog(&self) -> Result<Vec<CatalogEntry>, Box<dyn Error + Send + Sync>>;

    fn load_rules(&self) -> Result<Vec<MappingRule>, Box<dyn Error + Send + Sync>>;
}

/// 快照刷新错误
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("参考数据加载失败 (source={source_name}, stream={stream}): {message}")]
    SourceError {
        source_name: String,
        stream: String,
        message: String,
    },

    #[error("目录为空，拒绝替换快照 (source={0})")]
    EmptyCatalog(String),

    #[error("快照锁获取失败: {0}")]
    LockError(String),
}

// ==========================================
// SnapshotStore
// ==========================================
pub struct SnapshotStore {
    current: RwLock<Arc<ReferenceSnapshot>>,
    source: Arc<dyn ReferenceSource>,
    publisher: Arc<dyn ResolutionEventPublisher>,
    options: SnapshotOptions,
    ttl: Duration,
    invalidated: AtomicBool,
    // 单写: 同一时刻只允许一个刷新
    reload_guard: Mutex<()>,
}

impl SnapshotStore {
    /// 创建快照仓并同步加载首份快照
    ///
    /// 首次加载失败直接返回错误，不对外提供未加载的快照仓。
    pub fn load(
        source: Arc<dyn ReferenceSource>,
        publisher: Arc<dyn ResolutionEventPublisher>,
        options: SnapshotOptions,
        ttl: Duration,
    ) -> Result<Self, SnapshotError> {
        let store = Self {
            // 占位，reload 成功前不会返回给调用方
            current: RwLock::new(Arc::new(ReferenceSnapshot::empty())),
            source,
            publisher,
            options,
            ttl,
            invalidated: AtomicBool::new(true),
            reload_guard: Mutex::new(()),
        };
        store.reload()?;
        Ok(store)
    }

    /// 当前快照（读取方持有 Arc，刷新不影响正在进行的求值）
    pub fn current(&self) -> Arc<ReferenceSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// 基于当前快照的完整级联引擎
    pub fn engine(&self) -> ResolutionEngine {
        ResolutionEngine::new(self.current())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 管理端写入目录/规则后调用，下一次检查时强制刷新
    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
        tracing::info!("参考数据快照已标记失效");
    }

    /// 是否需要刷新（显式失效或超过 TTL）
    pub fn is_stale(&self) -> bool {
        if self.invalidated.load(Ordering::SeqCst) {
            return true;
        }
        let age = self.current().age(Utc::now());
        if age < chrono::Duration::zero() {
            return true;
        }
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => age >= ttl,
            // TTL 超出 chrono 表示范围，视为永不过期
            Err(_) => false,
        }
    }

    /// 需要时刷新；返回是否发生了替换
    pub fn reload_if_stale(&self) -> Result<bool, SnapshotError> {
        if !self.is_stale() {
            return Ok(false);
        }
        self.reload().map(|_| true)
    }

    /// 从来源重新加载并原子替换
    pub fn reload(&self) -> Result<Arc<ReferenceSnapshot>, SnapshotError> {
        let _guard = self
            .reload_guard
            .lock()
            .map_err(|e| SnapshotError::LockError(e.to_string()))?;

        let built = match self.build_from_source() {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                let retained = self.current();
                tracing::warn!(
                    retained_snapshot_id = %retained.snapshot_id(),
                    error = %err,
                    "参考数据刷新失败，继续使用上一份快照"
                );
                publish_or_log(
                    self.publisher.as_ref(),
                    ResolutionEvent::SnapshotReloadFailed {
                        retained_snapshot_id: retained.snapshot_id().to_string(),
                        error: err.to_string(),
                        occurred_at: Utc::now(),
                    },
                );
                return Err(err);
            }
        };

        {
            let mut slot = self
                .current
                .write()
                .map_err(|e| SnapshotError::LockError(e.to_string()))?;
            *slot = Arc::clone(&built);
        }
        self.invalidated.store(false, Ordering::SeqCst);

        let stats = built.stats();
        tracing::info!(
            snapshot_id = %built.snapshot_id(),
            catalog_entries = stats.catalog_entries,
            active_rules = stats.active_rules,
            skipped_invalid_rules = stats.skipped_invalid_rules,
            "参考数据快照已替换"
        );
        publish_or_log(
            self.publisher.as_ref(),
            ResolutionEvent::SnapshotReloaded {
                snapshot_id: built.snapshot_id().to_string(),
                catalog_entries: stats.catalog_entries,
                active_rules: stats.active_rules,
                skipped_invalid_rules: stats.skipped_invalid_rules,
                loaded_at: built.loaded_at(),
            },
        );

        Ok(built)
    }

    fn build_from_source(&self) -> Result<ReferenceSnapshot, SnapshotError> {
        let source_name = self.source.describe();

        let catalog = self
            .source
            .load_catalog()
            .map_err(|e| SnapshotError::SourceError {
                source_name: source_name.clone(),
                stream: "catalog".to_string(),
                message: e.to_string(),
            })?;
        let rules = self
            .source
            .load_rules()
            .map_err(|e| SnapshotError::SourceError {
                source_name: source_name.clone(),
                stream: "rules".to_string(),
                message: e.to_string(),
            })?;

        if !catalog.iter().any(|e| e.is_active) {
            return Err(SnapshotError::EmptyCatalog(source_name));
        }

        Ok(ReferenceSnapshot::build(catalog, rules, self.options))
    }
}

/// 启动后台刷新任务（按固定间隔检查 TTL / 失效标记）
///
/// 刷新涉及阻塞 I/O，放到 spawn_blocking 中执行。
pub fn spawn_refresh_loop(
    store: Arc<SnapshotStore>,
    check_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(check_interval);
        loop {
            ticker.tick().await;
            let s = Arc::clone(&store);
            match tokio::task::spawn_blocking(move || s.reload_if_stale()).await {
                Ok(Ok(true)) => tracing::debug!("后台刷新: 快照已替换"),
                Ok(Ok(false)) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "后台刷新失败"),
                Err(e) => tracing::error!(error = %e, "后台刷新任务异常"),
            }
        }
    })
}
