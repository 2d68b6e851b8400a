// ==========================================
// 巡店路线校验系统 - 补贴标准仓储
// ==========================================
// 职责: per_diem_rate 表的查询与更新
// ==========================================

use crate::domain::report::PerDiemRate;
use crate::domain::types::PerDiemZone;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{format_datetime, get_datetime, get_zone};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

fn map_rate(row: &Row<'_>) -> rusqlite::Result<PerDiemRate> {
    Ok(PerDiemRate {
        zone: get_zone(row, 0)?,
        amount: row.get(1)?,
        updated_at: get_datetime(row, 2)?,
    })
}

pub struct PerDiemRateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PerDiemRateRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 全部区域标准
    pub fn list(&self) -> RepositoryResult<Vec<PerDiemRate>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT zone, amount, updated_at FROM per_diem_rate ORDER BY zone ASC")?;
        let rates = stmt
            .query_map([], map_rate)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rates)
    }

    pub fn get(&self, zone: PerDiemZone) -> RepositoryResult<Option<PerDiemRate>> {
        let conn = self.get_conn()?;
        let rate = conn
            .query_row(
                "SELECT zone, amount, updated_at FROM per_diem_rate WHERE zone = ?1",
                params![zone.to_db_str()],
                map_rate,
            )
            .optional()?;
        Ok(rate)
    }

    /// 区域 → 金额
    pub fn rates_map(&self) -> RepositoryResult<HashMap<PerDiemZone, f64>> {
        Ok(self
            .list()?
            .into_iter()
            .map(|r| (r.zone, r.amount))
            .collect())
    }

    /// 更新区域标准
    ///
    /// # 返回
    /// 区域未知时返回 false
    pub fn update(&self, zone_text: &str, amount: f64) -> RepositoryResult<bool> {
        let zone = match PerDiemZone::from_str(zone_text) {
            Some(z) => z,
            None => return Ok(false),
        };

        let conn = self.get_conn()?;
        let affected = conn.execute(
            "INSERT INTO per_diem_rate (zone, amount, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(zone) DO UPDATE SET amount = excluded.amount, updated_at = excluded.updated_at",
            params![zone.to_db_str(), amount, format_datetime(Utc::now().naive_utc())],
        )?;

        info!(zone = %zone, amount, "补贴标准已更新");
        Ok(affected > 0)
    }
}
