// ==========================================
// 销售报表平台 - SKU 映射规则仓储
// ==========================================
// 职责: 管理 sku_mapping_rule 表（规则参考流）
// 说明: pattern_type 以文本存储；未知类型的行在读取时跳过并告警
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::{MappingRule, PatternType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

pub struct SkuMappingRuleRepository {
    conn: Arc<Mutex<Connection>>,
}

/// 数据库行（pattern_type 尚未解析）
struct RuleRow {
    rule_id: String,
    source_pattern: String,
    pattern_type: String,
    source_filter: Option<String>,
    target_sku: Option<String>,
    quantity_multiplier: u32,
    confidence: u8,
    priority: i32,
    is_active: bool,
}

impl RuleRow {
    fn into_rule(self) -> Option<MappingRule> {
        let pattern_type = match PatternType::parse(&self.pattern_type) {
            Some(t) => t,
            None => {
                tracing::warn!(
                    rule_id = %self.rule_id,
                    pattern_type = %self.pattern_type,
                    "未知的 pattern_type，跳过该规则"
                );
                return None;
            }
        };
        Some(MappingRule {
            rule_id: self.rule_id,
            source_pattern: self.source_pattern,
            pattern_type,
            source_filter: self.source_filter,
            target_sku: self.target_sku,
            quantity_multiplier: self.quantity_multiplier,
            confidence: self.confidence,
            priority: self.priority,
            is_active: self.is_active,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT rule_id, source_pattern, pattern_type, source_filter, target_sku,
           quantity_multiplier, confidence, priority, is_active
    FROM sku_mapping_rule
"#;

impl SkuMappingRuleRepository {
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

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sku_mapping_rule (
              rule_id TEXT PRIMARY KEY,
              source_pattern TEXT NOT NULL,
              pattern_type TEXT NOT NULL,
              source_filter TEXT,
              target_sku TEXT,
              quantity_multiplier INTEGER NOT NULL DEFAULT 1 CHECK (quantity_multiplier >= 1),
              confidence INTEGER NOT NULL DEFAULT 95 CHECK (confidence BETWEEN 0 AND 100),
              priority INTEGER NOT NULL DEFAULT 0,
              is_active INTEGER NOT NULL DEFAULT 1,
              updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_sku_mapping_rule_active
              ON sku_mapping_rule(is_active, priority);
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<RuleRow> {
        Ok(RuleRow {
            rule_id: row.get(0)?,
            source_pattern: row.get(1)?,
            pattern_type: row.get(2)?,
            source_filter: row.get(3)?,
            target_sku: row.get(4)?,
            quantity_multiplier: row.get(5)?,
            confidence: row.get(6)?,
            priority: row.get(7)?,
            is_active: row.get::<_, i64>(8)? != 0,
        })
    }

    fn validate(rule: &MappingRule) -> RepositoryResult<()> {
        if rule.rule_id.trim().is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "rule_id".to_string(),
                message: "rule_id 不能为空".to_string(),
            });
        }
        if rule.source_pattern.trim().is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "source_pattern".to_string(),
                message: "source_pattern 不能为空".to_string(),
            });
        }
        if rule.quantity_multiplier == 0 {
            return Err(RepositoryError::FieldValueError {
                field: "quantity_multiplier".to_string(),
                message: "quantity_multiplier 必须 >= 1".to_string(),
            });
        }
        if rule.confidence > 100 {
            return Err(RepositoryError::FieldValueError {
                field: "confidence".to_string(),
                message: format!("confidence 超出范围: {}", rule.confidence),
            });
        }
        Ok(())
    }

    /// 创建或更新规则（Upsert，按 rule_id）
    ///
    /// 说明：正则能否编译不在此处校验，快照构建时编译失败的规则会被跳过并告警
    pub fn upsert(&self, rule: &MappingRule) -> RepositoryResult<()> {
        Self::validate(rule)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO sku_mapping_rule (
                rule_id, source_pattern, pattern_type, source_filter, target_sku,
                quantity_multiplier, confidence, priority, is_active, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))
            ON CONFLICT(rule_id) DO UPDATE SET
                source_pattern = excluded.source_pattern,
                pattern_type = excluded.pattern_type,
                source_filter = excluded.source_filter,
                target_sku = excluded.target_sku,
                quantity_multiplier = excluded.quantity_multiplier,
                confidence = excluded.confidence,
                priority = excluded.priority,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
            params![
                rule.rule_id,
                rule.source_pattern,
                rule.pattern_type.as_str(),
                rule.source_filter,
                rule.target_sku,
                rule.quantity_multiplier,
                rule.confidence,
                rule.priority,
                rule.is_active as i64,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, rule_id: &str) -> RepositoryResult<Option<MappingRule>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE rule_id = ?1", SELECT_COLUMNS);
        let result = conn.query_row(&sql, params![rule_id], Self::map_row);

        match result {
            Ok(row) => Ok(row.into_rule()),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 全部有效规则（按 priority 降序、rule_id 升序，保证加载顺序稳定）
    pub fn list_active(&self) -> RepositoryResult<Vec<MappingRule>> {
        self.query_rules(&format!(
            "{} WHERE is_active = 1 ORDER BY priority DESC, rule_id ASC",
            SELECT_COLUMNS
        ))
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<MappingRule>> {
        self.query_rules(&format!(
            "{} ORDER BY priority DESC, rule_id ASC",
            SELECT_COLUMNS
        ))
    }

    fn query_rules(&self, sql: &str) -> RepositoryResult<Vec<MappingRule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().filter_map(RuleRow::into_rule).collect())
    }

    /// 停用规则（不物理删除）
    pub fn deactivate(&self, rule_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE sku_mapping_rule SET is_active = 0, updated_at = datetime('now') WHERE rule_id = ?1",
            params![rule_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "sku_mapping_rule".to_string(),
                id: rule_id.to_string(),
            });
        }
        Ok(())
    }
}
