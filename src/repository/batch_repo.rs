// ==========================================
// 巡店路线校验系统 - 校验批次仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 批次头、匹配拜访、停留时长合计、工时汇总与明细的存取
// ==========================================

use crate::domain::hours::{DailyHoursRecord, VendorHoursSummary};
use crate::domain::report::{
    AgentDwellSummary, AgentDwellTotal, BatchDetails, BatchHeader, BatchHours,
    HoursSummaryWithAllowance, StoredVisit, ValidationWindow,
};
use crate::domain::visit::MatchedVisit;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{
    format_date, format_datetime, get_date, get_datetime, get_day, get_hms, get_opt_datetime,
    get_status, get_week, get_zone,
};
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

const VISIT_COLUMNS: &str = "id, batch_id, agent_id, client_id, checkin_at, checkout_at, dwell_raw, dwell, \
     weekday, week, planned_raw_text, block, origin_line, status";

fn map_header(row: &Row<'_>) -> rusqlite::Result<BatchHeader> {
    Ok(BatchHeader {
        batch_id: row.get(0)?,
        date_from: get_date(row, 1)?,
        date_to: get_date(row, 2)?,
        start_week: get_week(row, 3)?,
        created_at: get_datetime(row, 4)?,
    })
}

fn map_visit(row: &Row<'_>) -> rusqlite::Result<StoredVisit> {
    Ok(StoredVisit {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        visit: MatchedVisit {
            agent_id: row.get(2)?,
            client_id: row.get(3)?,
            checkin_at: get_datetime(row, 4)?,
            checkout_at: get_opt_datetime(row, 5)?,
            dwell_raw: row.get(6)?,
            dwell: row.get(7)?,
            weekday: get_day(row, 8)?,
            week: get_week(row, 9)?,
            planned_raw_text: row.get(10)?,
            block: row.get(11)?,
            origin_line: row.get(12)?,
            status: get_status(row, 13)?,
        },
    })
}

fn map_dwell(row: &Row<'_>) -> rusqlite::Result<AgentDwellSummary> {
    Ok(AgentDwellSummary {
        batch_id: row.get(0)?,
        total: AgentDwellTotal {
            agent_id: row.get(1)?,
            visits: row.get::<_, i64>(2)? as usize,
            total_dwell: get_hms(row, 3)?,
        },
    })
}

fn map_summary(row: &Row<'_>) -> rusqlite::Result<HoursSummaryWithAllowance> {
    Ok(HoursSummaryWithAllowance {
        summary: VendorHoursSummary {
            agent_id: row.get(0)?,
            total_worked: get_hms(row, 1)?,
            days_worked: row.get::<_, i64>(2)? as usize,
            average_daily: get_hms(row, 3)?,
            average_checkin: get_hms(row, 4)?,
            average_checkout: get_hms(row, 5)?,
            per_diem_eligible: row.get(6)?,
            line: row.get(7)?,
        },
        zone: get_zone(row, 8)?,
        per_diem_amount: row.get(9)?,
    })
}

fn map_detail(row: &Row<'_>) -> rusqlite::Result<DailyHoursRecord> {
    Ok(DailyHoursRecord {
        agent_id: row.get(0)?,
        date: get_date(row, 1)?,
        first_checkin: get_datetime(row, 2)?,
        last_checkout: get_datetime(row, 3)?,
        span: get_hms(row, 4)?,
        first_client: row.get(5)?,
    })
}

/// 生成批次号: `YYYYMMDD_HHMMSS_<uuid 前 8 位>`
pub fn generate_batch_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &uuid[..8])
}

// ==========================================
// 保存批次的输入
// ==========================================
pub struct NewBatch<'a> {
    pub window: &'a ValidationWindow,
    pub matched: &'a [MatchedVisit],
    pub dwell_totals: &'a [AgentDwellTotal],
    pub hours_summary: &'a [HoursSummaryWithAllowance],
    pub hours_detail: &'a [DailyHoursRecord],
}

// ==========================================
// VisitQuery - 近期拜访查询条件
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitQuery {
    pub agent: Option<String>,    // 子串匹配
    pub client: Option<String>,   // 子串匹配
    pub batch_id: Option<String>, // 精确匹配
}

fn text_filter(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ==========================================
// ValidationBatchRepository
// ==========================================
pub struct ValidationBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ValidationBatchRepository {
    /// 创建新的 ValidationBatchRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存一个批次（单事务）
    ///
    /// # 返回
    /// 新批次号
    pub fn save_batch(&self, batch: &NewBatch<'_>) -> RepositoryResult<String> {
        let batch_id = generate_batch_id();
        let created_at = format_datetime(Utc::now().naive_utc());

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        // 1. 批次头
        tx.execute(
            "INSERT INTO validation_batch (batch_id, date_from, date_to, start_week, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                batch_id,
                format_date(batch.window.start),
                format_date(batch.window.end),
                batch.window.start_parity.number(),
                created_at,
            ],
        )?;

        // 2. 匹配拜访
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO matched_visit (
                    batch_id, agent_id, client_id, checkin_at, checkout_at, dwell_raw, dwell,
                    weekday, week, planned_raw_text, block, origin_line, status
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )?;
            for v in batch.matched {
                stmt.execute(params![
                    batch_id,
                    v.agent_id,
                    v.client_id,
                    format_datetime(v.checkin_at),
                    v.checkout_at.map(format_datetime),
                    v.dwell_raw,
                    v.dwell,
                    v.weekday.canonical(),
                    v.week.number(),
                    v.planned_raw_text,
                    v.block,
                    v.origin_line,
                    v.status.to_db_str(),
                ])?;
            }
        }

        // 3. 停留时长合计
        {
            let mut stmt = tx.prepare(
                "INSERT INTO agent_dwell_summary (batch_id, agent_id, visits, total_dwell_seconds)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for d in batch.dwell_totals {
                stmt.execute(params![batch_id, d.agent_id, d.visits as i64, d.total_dwell.seconds()])?;
            }
        }

        // 4. 工时汇总
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO hours_summary (
                    batch_id, agent_id, total_seconds, days_worked, average_daily_seconds,
                    average_checkin_seconds, average_checkout_seconds, per_diem_eligible,
                    line, zone, per_diem_amount
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )?;
            for h in batch.hours_summary {
                let s = &h.summary;
                stmt.execute(params![
                    batch_id,
                    s.agent_id,
                    s.total_worked.seconds(),
                    s.days_worked as i64,
                    s.average_daily.seconds(),
                    s.average_checkin.seconds(),
                    s.average_checkout.seconds(),
                    s.per_diem_eligible,
                    s.line,
                    h.zone.to_db_str(),
                    h.per_diem_amount,
                ])?;
            }
        }

        // 5. 工时明细
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO hours_detail (
                    batch_id, agent_id, work_date, first_checkin, last_checkout, span_seconds, first_client
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for d in batch.hours_detail {
                stmt.execute(params![
                    batch_id,
                    d.agent_id,
                    format_date(d.date),
                    format_datetime(d.first_checkin),
                    format_datetime(d.last_checkout),
                    d.span.seconds(),
                    d.first_client,
                ])?;
            }
        }

        tx.commit()?;

        info!(
            batch_id = %batch_id,
            visits = batch.matched.len(),
            agents = batch.hours_summary.len(),
            days = batch.hours_detail.len(),
            "校验批次已保存"
        );
        Ok(batch_id)
    }

    /// 批次历史（新在前）
    pub fn history(&self) -> RepositoryResult<Vec<BatchHeader>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT batch_id, date_from, date_to, start_week, created_at
             FROM validation_batch ORDER BY created_at DESC, batch_id DESC",
        )?;
        let headers = stmt
            .query_map([], map_header)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(headers)
    }

    /// 查询批次头
    pub fn find_header(&self, batch_id: &str) -> RepositoryResult<Option<BatchHeader>> {
        let conn = self.get_conn()?;
        let header = conn
            .query_row(
                "SELECT batch_id, date_from, date_to, start_week, created_at
                 FROM validation_batch WHERE batch_id = ?1",
                params![batch_id],
                map_header,
            )
            .optional()?;
        Ok(header)
    }

    /// 批次详情: 头 + 匹配拜访 + 停留时长合计
    pub fn batch_details(&self, batch_id: &str) -> RepositoryResult<Option<BatchDetails>> {
        let header = match self.find_header(batch_id)? {
            Some(h) => h,
            None => return Ok(None),
        };

        let visits = self.recent_visits(
            &VisitQuery {
                batch_id: Some(batch_id.to_string()),
                ..Default::default()
            },
            i64::MAX,
        )?;
        let dwell_summary = self.dwell_summary(None, Some(batch_id))?;

        Ok(Some(BatchDetails {
            header,
            visits,
            dwell_summary,
        }))
    }

    /// 批次工时: 头 + 汇总 + 明细
    pub fn batch_hours(&self, batch_id: &str) -> RepositoryResult<Option<BatchHours>> {
        let header = match self.find_header(batch_id)? {
            Some(h) => h,
            None => return Ok(None),
        };

        let conn = self.get_conn()?;
        let summary = conn
            .prepare(
                r#"
                SELECT agent_id, total_seconds, days_worked, average_daily_seconds,
                       average_checkin_seconds, average_checkout_seconds, per_diem_eligible,
                       line, zone, per_diem_amount
                FROM hours_summary WHERE batch_id = ?1 ORDER BY agent_id ASC
                "#,
            )?
            .query_map(params![batch_id], map_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let detail = conn
            .prepare(
                r#"
                SELECT agent_id, work_date, first_checkin, last_checkout, span_seconds, first_client
                FROM hours_detail WHERE batch_id = ?1 ORDER BY agent_id ASC, work_date ASC, id ASC
                "#,
            )?
            .query_map(params![batch_id], map_detail)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(BatchHours {
            header,
            summary,
            detail,
        }))
    }

    /// 近期匹配拜访（签到时间倒序）
    pub fn recent_visits(&self, query: &VisitQuery, limit: i64) -> RepositoryResult<Vec<StoredVisit>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(agent) = text_filter(&query.agent) {
            clauses.push("agent_id LIKE ?");
            values.push(Value::Text(format!("%{}%", agent)));
        }
        if let Some(client) = text_filter(&query.client) {
            clauses.push("client_id LIKE ?");
            values.push(Value::Text(format!("%{}%", client)));
        }
        if let Some(batch_id) = text_filter(&query.batch_id) {
            clauses.push("batch_id = ?");
            values.push(Value::Text(batch_id.to_string()));
        }
        values.push(Value::Integer(limit));

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM matched_visit {} ORDER BY checkin_at DESC, id DESC LIMIT ?",
            VISIT_COLUMNS, where_sql
        ))?;
        let visits = stmt
            .query_map(params_from_iter(values.iter()), map_visit)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(visits)
    }

    /// 停留时长合计（业务员子串 / 批次号过滤）
    pub fn dwell_summary(
        &self,
        agent: Option<&str>,
        batch_id: Option<&str>,
    ) -> RepositoryResult<Vec<AgentDwellSummary>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(agent) = agent.map(str::trim).filter(|a| !a.is_empty()) {
            clauses.push("agent_id LIKE ?");
            values.push(Value::Text(format!("%{}%", agent)));
        }
        if let Some(batch_id) = batch_id.map(str::trim).filter(|b| !b.is_empty()) {
            clauses.push("batch_id = ?");
            values.push(Value::Text(batch_id.to_string()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT batch_id, agent_id, visits, total_dwell_seconds FROM agent_dwell_summary {}
             ORDER BY batch_id DESC, agent_id ASC",
            where_sql
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), map_dwell)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
