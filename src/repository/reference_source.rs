// ==========================================
// 销售报表平台 - SQLite 参考数据来源
// ==========================================
// 职责: 把 product_catalog / sku_mapping_rule 两张表暴露为 ReferenceSource
// 说明: 两个流共享同一连接，快照刷新在 spawn_blocking 中调用
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::{CatalogEntry, MappingRule};
use crate::engine::snapshot_store::ReferenceSource;
use crate::repository::catalog_repo::ProductCatalogRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::mapping_rule_repo::SkuMappingRuleRepository;
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};

pub struct SqliteReferenceSource {
    db_label: String,
    catalog_repo: ProductCatalogRepository,
    rule_repo: SkuMappingRuleRepository,
}

impl SqliteReferenceSource {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = Arc::new(Mutex::new(open_sqlite_connection(db_path)?));
        Self::from_connection(db_path, conn)
    }

    pub fn from_connection(db_label: &str, conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        Ok(Self {
            db_label: db_label.to_string(),
            catalog_repo: ProductCatalogRepository::from_connection(conn.clone())?,
            rule_repo: SkuMappingRuleRepository::from_connection(conn)?,
        })
    }

    pub fn catalog_repo(&self) -> &ProductCatalogRepository {
        &self.catalog_repo
    }

    pub fn rule_repo(&self) -> &SkuMappingRuleRepository {
        &self.rule_repo
    }
}

impl ReferenceSource for SqliteReferenceSource {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.db_label)
    }

    fn load_catalog(&self) -> Result<Vec<CatalogEntry>, Box<dyn Error + Send + Sync>> {
        Ok(self.catalog_repo.list_active()?)
    }

    fn load_rules(&self) -> Result<Vec<MappingRule>, Box<dyn Error + Send + Sync>> {
        Ok(self.rule_repo.list_active()?)
    }
}
