// ==========================================
// 销售报表平台 - 产品目录仓储
// ==========================================
// 职责: 管理 product_catalog 表（目录参考流）
// 说明: 管理端写入；引擎仅通过快照只读
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::CatalogEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct ProductCatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductCatalogRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_table()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 确保表存在（如果不存在则创建）
    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS product_catalog (
              sku TEXT PRIMARY KEY,
              master_box_sku TEXT,
              primary_sku TEXT,
              category TEXT,
              units_per_display INTEGER CHECK (units_per_display IS NULL OR units_per_display >= 1),
              items_per_master_box INTEGER CHECK (items_per_master_box IS NULL OR items_per_master_box >= 1),
              is_active INTEGER NOT NULL DEFAULT 1,
              updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_product_catalog_master
              ON product_catalog(master_box_sku);
            CREATE INDEX IF NOT EXISTS idx_product_catalog_active
              ON product_catalog(is_active);
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<CatalogEntry> {
        Ok(CatalogEntry {
            sku: row.get(0)?,
            master_box_sku: row.get(1)?,
            primary_sku: row.get(2)?,
            category: row.get(3)?,
            units_per_display: row.get(4)?,
            items_per_master_box: row.get(5)?,
            is_active: row.get::<_, i64>(6)? != 0,
        })
    }

    /// 创建或更新条目（Upsert，按 sku）
    pub fn upsert(&self, entry: &CatalogEntry) -> RepositoryResult<()> {
        if entry.sku.trim().is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "sku".to_string(),
                message: "sku 不能为空".to_string(),
            });
        }
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product_catalog (
                sku,
                master_box_sku,
                primary_sku,
                category,
                units_per_display,
                items_per_master_box,
                is_active,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))
            ON CONFLICT(sku) DO UPDATE SET
                master_box_sku = excluded.master_box_sku,
                primary_sku = excluded.primary_sku,
                category = excluded.category,
                units_per_display = excluded.units_per_display,
                items_per_master_box = excluded.items_per_master_box,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
            params![
                entry.sku,
                entry.master_box_sku,
                entry.primary_sku,
                entry.category,
                entry.units_per_display,
                entry.items_per_master_box,
                entry.is_active as i64,
            ],
        )?;
        Ok(())
    }

    /// 批量写入（单事务）
    pub fn upsert_batch(&self, entries: &[CatalogEntry]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO product_catalog (
                    sku, master_box_sku, primary_sku, category,
                    units_per_display, items_per_master_box, is_active, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))
                ON CONFLICT(sku) DO UPDATE SET
                    master_box_sku = excluded.master_box_sku,
                    primary_sku = excluded.primary_sku,
                    category = excluded.category,
                    units_per_display = excluded.units_per_display,
                    items_per_master_box = excluded.items_per_master_box,
                    is_active = excluded.is_active,
                    updated_at = excluded.updated_at
                "#,
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.sku,
                    entry.master_box_sku,
                    entry.primary_sku,
                    entry.category,
                    entry.units_per_display,
                    entry.items_per_master_box,
                    entry.is_active as i64,
                ])?;
            }
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(entries.len())
    }

    pub fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<CatalogEntry>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"
            SELECT sku, master_box_sku, primary_sku, category,
                   units_per_display, items_per_master_box, is_active
            FROM product_catalog
            WHERE sku = ?1
            "#,
            params![sku],
            Self::map_row,
        );

        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 全部有效条目（按 sku 排序，保证快照构建顺序稳定）
    pub fn list_active(&self) -> RepositoryResult<Vec<CatalogEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku, master_box_sku, primary_sku, category,
                   units_per_display, items_per_master_box, is_active
            FROM product_catalog
            WHERE is_active = 1
            ORDER BY sku ASC
            "#,
        )?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<CatalogEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku, master_box_sku, primary_sku, category,
                   units_per_display, items_per_master_box, is_active
            FROM product_catalog
            ORDER BY sku ASC
            "#,
        )?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 停用条目（不物理删除）
    pub fn deactivate(&self, sku: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE product_catalog SET is_active = 0, updated_at = datetime('now') WHERE sku = ?1",
            params![sku],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "product_catalog".to_string(),
                id: sku.to_string(),
            });
        }
        Ok(())
    }
}
