// ==========================================
// 巡店路线校验系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::validation_config::ValidationConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::{DuplicateKeyPolicy, ValidityPolicy};
use crate::engine::duration::DEFAULT_DWELL_CAP_SECONDS;
use crate::engine::per_diem::{
    PerDiemThresholds, DEFAULT_CHECKIN_BEFORE_SECONDS, DEFAULT_CHECKOUT_AFTER_SECONDS,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

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
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager（重新应用统一 PRAGMA，幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> ConfigResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        debug!(key, value, "配置已更新");
        Ok(())
    }

    /// 读取并解析配置，不存在时返回默认值，格式错误时报错
    fn get_parsed<T, F>(&self, key: &str, default: T, parse: F) -> ConfigResult<T>
    where
        F: Fn(&str) -> Option<T>,
    {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => parse(raw.trim()).ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                message: "无法解析".to_string(),
            }),
        }
    }

    fn get_seconds(&self, key: &str, default: i64) -> ConfigResult<i64> {
        self.get_parsed(key, default, |v| v.parse::<i64>().ok().filter(|s| *s >= 0))
    }

    /// 获取所有 global 配置的快照（JSON，键有序）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.get_conn()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&config_map)?)
    }

    /// 从配置快照恢复配置（覆盖同名 global 配置）
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// ValidationConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ValidationConfigReader for ConfigManager {
    async fn get_validity_policy(&self) -> ConfigResult<ValidityPolicy> {
        self.get_parsed(
            config_keys::VALIDITY_POLICY,
            ValidityPolicy::default(),
            ValidityPolicy::from_str,
        )
    }

    async fn get_duplicate_key_policy(&self) -> ConfigResult<DuplicateKeyPolicy> {
        self.get_parsed(
            config_keys::DUPLICATE_KEY_POLICY,
            DuplicateKeyPolicy::default(),
            DuplicateKeyPolicy::from_str,
        )
    }

    async fn get_dwell_cap_seconds(&self) -> ConfigResult<i64> {
        self.get_seconds(config_keys::DWELL_CAP_SECONDS, DEFAULT_DWELL_CAP_SECONDS)
    }

    async fn get_per_diem_thresholds(&self) -> ConfigResult<PerDiemThresholds> {
        Ok(PerDiemThresholds {
            checkin_before_seconds: self.get_seconds(
                config_keys::PER_DIEM_CHECKIN_BEFORE,
                DEFAULT_CHECKIN_BEFORE_SECONDS,
            )?,
            checkout_after_seconds: self.get_seconds(
                config_keys::PER_DIEM_CHECKOUT_AFTER,
                DEFAULT_CHECKOUT_AFTER_SECONDS,
            )?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 工时统计口径: VALID_ONLY / ALL_ROWS
    pub const VALIDITY_POLICY: &str = "hours_validity_policy";

    // 排班主键冲突: LAST_WRITE_WINS / REJECT
    pub const DUPLICATE_KEY_POLICY: &str = "duplicate_key_policy";

    // 停留时长上限（秒）
    pub const DWELL_CAP_SECONDS: &str = "dwell_cap_seconds";

    // 补贴阈值（午夜起秒数）
    pub const PER_DIEM_CHECKIN_BEFORE: &str = "per_diem_checkin_before_seconds";
    pub const PER_DIEM_CHECKOUT_AFTER: &str = "per_diem_checkout_after_seconds";
}
