// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、参考数据夹具、事件收集器
// ==========================================
#![allow(dead_code)]

use rusqlite::Connection;
use sku_resolution::db::{configure_sqlite_connection, init_base_schema};
use sku_resolution::domain::{CatalogEntry, MappingRule, PatternType};
use sku_resolution::engine::{
    ReferenceSnapshot, ReferenceSource, ResolutionEvent, ResolutionEventPublisher, SnapshotOptions,
};
use sku_resolution::repository::SqliteReferenceSource;
use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();

    let conn = open_test_connection(&db_path)?;
    init_base_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库连接（与生产代码相同的 PRAGMA）
pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 插入 global 配置
pub fn insert_test_config(conn: &Connection, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    conn.execute(
        "INSERT OR REPLACE INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

// ==========================================
// 参考数据夹具
// ==========================================

/// 标准目录:
/// - BAKC_U04010 单品（整箱 BAKC_C02810 = 140 件）
/// - BAKC_U20010 展示盒 5 件
/// - KSMC_U03010 单品
pub fn fixture_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry::new("BAKC_U04010", 1)
            .with_master_box("BAKC_C02810", 140)
            .with_category("crackers"),
        CatalogEntry::new("BAKC_U20010", 5).with_category("crackers"),
        CatalogEntry::new("KSMC_U03010", 1).with_category("snacks"),
    ]
}

/// 标准规则:
/// - KEEPERPACK 精确 → KSMC_U03010 × 5
/// - ANU- 前缀改写（剥离后继续解析）
pub fn fixture_rules() -> Vec<MappingRule> {
    vec![
        MappingRule::new("r_keeperpack", "KEEPERPACK", PatternType::Exact, Some("KSMC_U03010"))
            .with_multiplier(5)
            .with_priority(10),
        MappingRule::new("r_anu_prefix", "ANU-", PatternType::Prefix, None),
    ]
}

pub fn fixture_snapshot() -> ReferenceSnapshot {
    ReferenceSnapshot::build(fixture_catalog(), fixture_rules(), SnapshotOptions::default())
}

/// 把标准参考数据写入测试库
pub fn seed_reference_data(db_path: &str) -> Result<SqliteReferenceSource, Box<dyn Error>> {
    let source = SqliteReferenceSource::new(db_path)?;
    source.catalog_repo().upsert_batch(&fixture_catalog())?;
    for rule in fixture_rules() {
        source.rule_repo().upsert(&rule)?;
    }
    Ok(source)
}

// ==========================================
// 事件收集器
// ==========================================

#[derive(Default)]
pub struct CollectingEventPublisher {
    events: Mutex<Vec<ResolutionEvent>>,
}

impl CollectingEventPublisher {
    pub fn events(&self) -> Vec<ResolutionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.as_str() == event_type)
            .count()
    }
}

impl ResolutionEventPublisher for CollectingEventPublisher {
    fn publish(&self, event: ResolutionEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

// ==========================================
// 可控的参考数据来源
// ==========================================

/// 内存来源: 可切换为失败状态，统计加载次数
pub struct ToggleSource {
    catalog: Mutex<Vec<CatalogEntry>>,
    rules: Mutex<Vec<MappingRule>>,
    failing: AtomicBool,
    loads: AtomicUsize,
}

impl ToggleSource {
    pub fn new(catalog: Vec<CatalogEntry>, rules: Vec<MappingRule>) -> Self {
        Self {
            catalog: Mutex::new(catalog),
            rules: Mutex::new(rules),
            failing: AtomicBool::new(false),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_catalog(&self, catalog: Vec<CatalogEntry>) {
        *self.catalog.lock().unwrap() = catalog;
    }

    pub fn set_rules(&self, rules: Vec<MappingRule>) {
        *self.rules.lock().unwrap() = rules;
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ReferenceSource for ToggleSource {
    fn describe(&self) -> String {
        "memory:toggle".to_string()
    }

    fn load_catalog(&self) -> Result<Vec<CatalogEntry>, Box<dyn Error + Send + Sync>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err("catalog stream unavailable".into());
        }
        Ok(self.catalog.lock().unwrap().clone())
    }

    fn load_rules(&self) -> Result<Vec<MappingRule>, Box<dyn Error + Send + Sync>> {
        Ok(self.rules.lock().unwrap().clone())
    }
}
