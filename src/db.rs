// ==========================================
// 巡店路线校验系统 - SQLite 连接与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表，并写入默认补贴区域
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;
use tracing::{info, warn};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 建表语句（全部 IF NOT EXISTS，可重复执行）
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_scope (
    scope_id TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(scope_type, scope_key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS planned_visit (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    visit_key TEXT NOT NULL,
    agent_id TEXT NOT NULL,
    client_id TEXT NOT NULL,
    day_name TEXT NOT NULL,
    week_parity INTEGER NOT NULL CHECK (week_parity IN (1, 2)),
    block TEXT NOT NULL,
    origin_line TEXT NOT NULL,
    raw_text TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_planned_visit_key ON planned_visit(visit_key);

CREATE TABLE IF NOT EXISTS validation_batch (
    batch_id TEXT PRIMARY KEY,
    date_from TEXT NOT NULL,
    date_to TEXT NOT NULL,
    start_week INTEGER NOT NULL CHECK (start_week IN (1, 2)),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS matched_visit (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_id TEXT NOT NULL REFERENCES validation_batch(batch_id) ON DELETE CASCADE,
    agent_id TEXT NOT NULL,
    client_id TEXT NOT NULL,
    checkin_at TEXT NOT NULL,
    checkout_at TEXT,
    dwell_raw TEXT NOT NULL,
    dwell TEXT NOT NULL,
    weekday TEXT NOT NULL,
    week INTEGER NOT NULL,
    planned_raw_text TEXT NOT NULL,
    block TEXT NOT NULL,
    origin_line TEXT NOT NULL,
    status TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_matched_visit_batch ON matched_visit(batch_id);

CREATE TABLE IF NOT EXISTS agent_dwell_summary (
    batch_id TEXT NOT NULL REFERENCES validation_batch(batch_id) ON DELETE CASCADE,
    agent_id TEXT NOT NULL,
    visits INTEGER NOT NULL,
    total_dwell_seconds INTEGER NOT NULL,
    PRIMARY KEY (batch_id, agent_id)
);

CREATE TABLE IF NOT EXISTS hours_summary (
    batch_id TEXT NOT NULL REFERENCES validation_batch(batch_id) ON DELETE CASCADE,
    agent_id TEXT NOT NULL,
    total_seconds INTEGER NOT NULL,
    days_worked INTEGER NOT NULL,
    average_daily_seconds INTEGER NOT NULL,
    average_checkin_seconds INTEGER NOT NULL,
    average_checkout_seconds INTEGER NOT NULL,
    per_diem_eligible INTEGER NOT NULL,
    line TEXT NOT NULL,
    zone TEXT NOT NULL,
    per_diem_amount REAL NOT NULL,
    PRIMARY KEY (batch_id, agent_id)
);

CREATE TABLE IF NOT EXISTS hours_detail (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_id TEXT NOT NULL REFERENCES validation_batch(batch_id) ON DELETE CASCADE,
    agent_id TEXT NOT NULL,
    work_date TEXT NOT NULL,
    first_checkin TEXT NOT NULL,
    last_checkout TEXT NOT NULL,
    span_seconds INTEGER NOT NULL,
    first_client TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_hours_detail_batch ON hours_detail(batch_id);

CREATE TABLE IF NOT EXISTS per_diem_rate (
    zone TEXT PRIMARY KEY,
    amount REAL NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

INSERT OR IGNORE INTO per_diem_rate (zone, amount) VALUES ('CABA_GBA', 0);
INSERT OR IGNORE INTO per_diem_rate (zone, amount) VALUES ('INTERIOR', 0);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// foreign_keys 与 busy_timeout 都需要每个连接单独设置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等建表并登记 schema_version
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    match read_schema_version(conn)? {
        None => {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [CURRENT_SCHEMA_VERSION],
            )?;
            info!(version = CURRENT_SCHEMA_VERSION, "数据库初始化完成");
        }
        Some(v) if v < CURRENT_SCHEMA_VERSION => {
            conn.execute(
                "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
                [CURRENT_SCHEMA_VERSION],
            )?;
            info!(from = v, to = CURRENT_SCHEMA_VERSION, "schema_version 已更新");
        }
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            warn!(db_version = v, code_version = CURRENT_SCHEMA_VERSION, "数据库版本高于当前程序");
        }
        Some(_) => {}
    }

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
