// ==========================================
// 巡店路线校验系统 - 排班数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: planned_visit 表的整表替换、分页查询与单条 CRUD
// ==========================================

use crate::domain::schedule::{PlannedSchedule, PlannedVisit};
use crate::domain::types::DayName;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{get_day, get_week};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

const SELECT_COLUMNS: &str = "id, visit_key, agent_id, client_id, day_name, week_parity, block, origin_line, raw_text";

fn map_row(row: &Row<'_>) -> rusqlite::Result<PlannedVisit> {
    Ok(PlannedVisit {
        id: Some(row.get(0)?),
        key: row.get(1)?,
        agent_id: row.get(2)?,
        client_id: row.get(3)?,
        day_name: get_day(row, 4)?,
        week_parity: get_week(row, 5)?,
        block: row.get(6)?,
        origin_line: row.get(7)?,
        raw_text: row.get(8)?,
    })
}

// ==========================================
// ScheduleFilter - 查询条件
// ==========================================
// "all" 与 0 视为不过滤
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleFilter {
    pub agent: Option<String>,  // 子串匹配
    pub client: Option<String>, // 子串匹配
    pub line: Option<String>,   // 子串匹配
    pub block: Option<String>,  // 子串匹配
    pub week: Option<i64>,      // 精确匹配
    pub day: Option<String>,    // 精确匹配（忽略大小写与重音）
}

impl ScheduleFilter {
    fn active_text(value: &Option<String>) -> Option<&str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
    }

    /// 生成 WHERE 子句与参数
    fn to_where(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        for (column, value) in [
            ("agent_id", &self.agent),
            ("client_id", &self.client),
            ("origin_line", &self.line),
            ("block", &self.block),
        ] {
            if let Some(v) = Self::active_text(value) {
                clauses.push(format!("{} LIKE ?", column));
                values.push(Value::Text(format!("%{}%", v)));
            }
        }

        if let Some(week) = self.week.filter(|w| *w != 0) {
            clauses.push("week_parity = ?".to_string());
            values.push(Value::Integer(week));
        }

        if let Some(day) = Self::active_text(&self.day) {
            let canonical = DayName::from_text(day)
                .map(|d| d.canonical().to_string())
                .unwrap_or_else(|| day.to_string());
            clauses.push("day_name = ? COLLATE NOCASE".to_string());
            values.push(Value::Text(canonical));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        (where_sql, values)
    }
}

// ==========================================
// ScheduleRepository - 排班仓储
// ==========================================
pub struct ScheduleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleRepository {
    /// 创建新的 ScheduleRepository 实例
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

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 整表替换（单事务）
    ///
    /// # 返回
    /// 写入的记录数
    pub fn replace_all(&self, schedule: &PlannedSchedule) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let removed = tx.execute("DELETE FROM planned_visit", [])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO planned_visit (
                    visit_key, agent_id, client_id, day_name, week_parity,
                    block, origin_line, raw_text
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;
            for visit in schedule.records() {
                stmt.execute(params![
                    visit.key,
                    visit.agent_id,
                    visit.client_id,
                    visit.day_name.canonical(),
                    visit.week_parity.number(),
                    visit.block,
                    visit.origin_line,
                    visit.raw_text,
                ])?;
            }
        }
        tx.commit()?;

        let inserted = schedule.records().len();
        info!(removed, inserted, "排班已整表替换");
        Ok(inserted)
    }

    /// 加载全部排班为查找表（按写入顺序）
    pub fn load_schedule(&self) -> RepositoryResult<PlannedSchedule> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM planned_visit ORDER BY id ASC",
            SELECT_COLUMNS
        ))?;

        let visits = stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(visits.into_iter().collect())
    }

    /// 条件分页查询
    ///
    /// # 返回
    /// (当前页记录, 满足条件的总数)，按 id 倒序
    pub fn list(
        &self,
        filter: &ScheduleFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<PlannedVisit>, i64)> {
        let conn = self.get_conn()?;
        let (where_sql, values) = filter.to_where();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM planned_visit {}", where_sql),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let mut page_values = values;
        page_values.push(Value::Integer(limit));
        page_values.push(Value::Integer(offset));

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM planned_visit {} ORDER BY id DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, where_sql
        ))?;
        let items = stmt
            .query_map(params_from_iter(page_values.iter()), map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((items, total))
    }

    /// 按 id 查询
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<PlannedVisit>> {
        let conn = self.get_conn()?;
        let visit = conn
            .query_row(
                &format!("SELECT {} FROM planned_visit WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                map_row,
            )
            .optional()?;
        Ok(visit)
    }

    /// 新增一条（key 按字段重算）
    pub fn create(&self, visit: &PlannedVisit) -> RepositoryResult<PlannedVisit> {
        let mut stored = visit.clone();
        stored.refresh_key();

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO planned_visit (
                visit_key, agent_id, client_id, day_name, week_parity,
                block, origin_line, raw_text
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                stored.key,
                stored.agent_id,
                stored.client_id,
                stored.day_name.canonical(),
                stored.week_parity.number(),
                stored.block,
                stored.origin_line,
                stored.raw_text,
            ],
        )?;
        stored.id = Some(conn.last_insert_rowid());
        Ok(stored)
    }

    /// 更新一条（key 按字段重算）
    ///
    /// # 返回
    /// - Ok(Some): 更新后的记录
    /// - Ok(None): id 不存在
    pub fn update(&self, id: i64, visit: &PlannedVisit) -> RepositoryResult<Option<PlannedVisit>> {
        let mut stored = visit.clone();
        stored.id = Some(id);
        stored.refresh_key();

        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE planned_visit SET
                visit_key = ?1, agent_id = ?2, client_id = ?3, day_name = ?4,
                week_parity = ?5, block = ?6, origin_line = ?7, raw_text = ?8
            WHERE id = ?9
            "#,
            params![
                stored.key,
                stored.agent_id,
                stored.client_id,
                stored.day_name.canonical(),
                stored.week_parity.number(),
                stored.block,
                stored.origin_line,
                stored.raw_text,
                id,
            ],
        )?;

        Ok(if affected == 0 { None } else { Some(stored) })
    }

    /// 删除一条，返回是否存在
    pub fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM planned_visit WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// 记录总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let total = conn.query_row("SELECT COUNT(*) FROM planned_visit", [], |row| row.get(0))?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;
    use crate::domain::schedule::DEFAULT_BLOCK;
    use crate::domain::types::WeekParity;

    fn repo() -> ScheduleRepository {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ScheduleRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn visit(agent: &str, client: &str, day: DayName, week: WeekParity, line: &str) -> PlannedVisit {
        PlannedVisit::new(agent, client, day, week, DEFAULT_BLOCK, line, format!("{} {}", day, week))
    }

    fn sample() -> PlannedSchedule {
        vec![
            visit("101", "C1", DayName::Lunes, WeekParity::First, "Linea 1"),
            visit("102", "C1", DayName::Martes, WeekParity::Second, "Linea 2"),
            visit("101", "C2", DayName::Miercoles, WeekParity::First, "Linea 1"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_replace_all_and_load() {
        let repo = repo();
        assert_eq!(repo.replace_all(&sample()).unwrap(), 3);
        assert_eq!(repo.replace_all(&sample()).unwrap(), 3);
        assert_eq!(repo.count().unwrap(), 3);

        let loaded = repo.load_schedule().unwrap();
        assert_eq!(loaded.records().len(), 3);
        assert!(loaded.contains_key("C2_101_Miercoles_1"));
        assert_eq!(loaded.records()[0].agent_id, "101");
    }

    #[test]
    fn test_list_filters() {
        let repo = repo();
        repo.replace_all(&sample()).unwrap();

        let (items, total) = repo.list(&ScheduleFilter::default(), 2, 0).unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 2);
        // 按 id 倒序
        assert_eq!(items[0].client_id, "C2");

        let filter = ScheduleFilter {
            agent: Some("101".to_string()),
            line: Some("all".to_string()),
            week: Some(0),
            ..Default::default()
        };
        assert_eq!(repo.list(&filter, 100, 0).unwrap().1, 2);

        let filter = ScheduleFilter {
            day: Some("miércoles".to_string()),
            ..Default::default()
        };
        let (items, total) = repo.list(&filter, 100, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].day_name, DayName::Miercoles);

        let filter = ScheduleFilter {
            week: Some(2),
            ..Default::default()
        };
        assert_eq!(repo.list(&filter, 100, 0).unwrap().1, 1);
    }

    #[test]
    fn test_crud_recomputes_key() {
        let repo = repo();
        let created = repo
            .create(&visit("7", "C9", DayName::Jueves, WeekParity::Second, "Linea 3"))
            .unwrap();
        let id = created.id.unwrap();
        assert_eq!(created.key, "C9_7_Jueves_2");

        let mut changed = created.clone();
        changed.day_name = DayName::Viernes;
        let updated = repo.update(id, &changed).unwrap().unwrap();
        assert_eq!(updated.key, "C9_7_Viernes_2");
        assert_eq!(repo.find_by_id(id).unwrap().unwrap().key, "C9_7_Viernes_2");

        assert!(repo.update(id + 100, &changed).unwrap().is_none());
        assert!(repo.delete(id).unwrap());
        assert!(!repo.delete(id).unwrap());
        assert!(repo.find_by_id(id).unwrap().is_none());
    }
}
