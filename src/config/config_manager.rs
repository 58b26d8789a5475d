// ==========================================
// 销售报表平台 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::resolver_config::{ResolverConfig, ResolverConfigReader};
use crate::db::{check_schema_version, init_base_schema, open_sqlite_connection};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        init_base_schema(&conn)?;
        check_schema_version(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            init_base_schema(&conn_guard)?;
            check_schema_version(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（Upsert）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析数值配置；缺失用默认值，格式错误告警后用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式，key 有序）
    ///
    /// # 用途
    /// - 对账报告中记录当时生效的阈值
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 组装完整的解析引擎配置
    pub async fn load_resolver_config(&self) -> Result<ResolverConfig, Box<dyn Error>> {
        let config = ResolverConfig {
            snapshot_ttl_secs: self.get_snapshot_ttl_secs().await?,
            substring_min_len: self.get_substring_min_len().await?,
            max_rewrite_depth: self.get_max_rewrite_depth().await?,
            divergence_row_rate_threshold: self.get_divergence_row_rate_threshold().await?,
            divergence_revenue_share_threshold: self
                .get_divergence_revenue_share_threshold()
                .await?,
        };
        tracing::debug!(?config, "解析引擎配置已加载");
        Ok(config)
    }
}

// ==========================================
// ResolverConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ResolverConfigReader for ConfigManager {
    async fn get_snapshot_ttl_secs(&self) -> Result<u64, Box<dyn Error>> {
        let defaults = ResolverConfig::default();
        self.get_parsed_or_default(config_keys::SNAPSHOT_TTL_SECS, defaults.snapshot_ttl_secs)
    }

    async fn get_substring_min_len(&self) -> Result<usize, Box<dyn Error>> {
        let defaults = ResolverConfig::default();
        let value =
            self.get_parsed_or_default(config_keys::SUBSTRING_MIN_LEN, defaults.substring_min_len)?;
        if value == 0 {
            tracing::warn!(config_key = config_keys::SUBSTRING_MIN_LEN, "最小长度不能为 0，使用默认值");
            return Ok(defaults.substring_min_len);
        }
        Ok(value)
    }

    async fn get_max_rewrite_depth(&self) -> Result<usize, Box<dyn Error>> {
        let defaults = ResolverConfig::default();
        self.get_parsed_or_default(config_keys::MAX_REWRITE_DEPTH, defaults.max_rewrite_depth)
    }

    async fn get_divergence_row_rate_threshold(&self) -> Result<f64, Box<dyn Error>> {
        let defaults = ResolverConfig::default();
        let value = self.get_parsed_or_default(
            config_keys::DIVERGENCE_ROW_RATE_THRESHOLD,
            defaults.divergence_row_rate_threshold,
        )?;
        Ok(clamp_ratio(config_keys::DIVERGENCE_ROW_RATE_THRESHOLD, value, defaults.divergence_row_rate_threshold))
    }

    async fn get_divergence_revenue_share_threshold(&self) -> Result<f64, Box<dyn Error>> {
        let defaults = ResolverConfig::default();
        let value = self.get_parsed_or_default(
            config_keys::DIVERGENCE_REVENUE_SHARE_THRESHOLD,
            defaults.divergence_revenue_share_threshold,
        )?;
        Ok(clamp_ratio(
            config_keys::DIVERGENCE_REVENUE_SHARE_THRESHOLD,
            value,
            defaults.divergence_revenue_share_threshold,
        ))
    }
}

/// 比例类阈值必须落在 [0, 1]
fn clamp_ratio(key: &str, value: f64, default: f64) -> f64 {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        value
    } else {
        tracing::warn!(config_key = key, value, "比例阈值超出 [0, 1]，使用默认值");
        default
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 快照
    pub const SNAPSHOT_TTL_SECS: &str = "sku_resolution.snapshot_ttl_secs";

    // 级联
    pub const SUBSTRING_MIN_LEN: &str = "sku_resolution.substring_min_len";
    pub const MAX_REWRITE_DEPTH: &str = "sku_resolution.max_rewrite_depth";

    // 对账
    pub const DIVERGENCE_ROW_RATE_THRESHOLD: &str = "sku_resolution.divergence_row_rate_threshold";
    pub const DIVERGENCE_REVENUE_SHARE_THRESHOLD: &str =
        "sku_resolution.divergence_revenue_share_threshold";
}
