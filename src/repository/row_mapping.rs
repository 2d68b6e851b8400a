// ==========================================
// 巡店路线校验系统 - 行映射辅助
// ==========================================
// 职责: SQLite 文本列 ↔ 领域类型的统一转换
// ==========================================

use crate::domain::hours::Hms;
use crate::domain::types::{DayName, PerDiemZone, VisitStatus, WeekParity};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::Row;

pub const DATE_FMT: &str = "%Y-%m-%d";
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_FMT).to_string()
}

pub fn format_date(value: NaiveDate) -> String {
    value.format(DATE_FMT).to_string()
}

pub fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&text, DATETIME_FMT)
        .map_err(|e| conversion_error(idx, format!("无效时间 {}: {}", text, e)))
}

pub fn get_opt_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => get_datetime(row, idx).map(Some),
        None => Ok(None),
    }
}

pub fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FMT)
        .map_err(|e| conversion_error(idx, format!("无效日期 {}: {}", text, e)))
}

pub fn get_day(row: &Row<'_>, idx: usize) -> rusqlite::Result<DayName> {
    let text: String = row.get(idx)?;
    DayName::from_text(&text).ok_or_else(|| conversion_error(idx, format!("无效星期: {}", text)))
}

pub fn get_week(row: &Row<'_>, idx: usize) -> rusqlite::Result<WeekParity> {
    let value: i64 = row.get(idx)?;
    WeekParity::from_number(value)
        .ok_or_else(|| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

pub fn get_status(row: &Row<'_>, idx: usize) -> rusqlite::Result<VisitStatus> {
    let text: String = row.get(idx)?;
    VisitStatus::from_str(&text).ok_or_else(|| conversion_error(idx, format!("无效状态: {}", text)))
}

pub fn get_zone(row: &Row<'_>, idx: usize) -> rusqlite::Result<PerDiemZone> {
    let text: String = row.get(idx)?;
    PerDiemZone::from_str(&text).ok_or_else(|| conversion_error(idx, format!("无效区域: {}", text)))
}

pub fn get_hms(row: &Row<'_>, idx: usize) -> rusqlite::Result<Hms> {
    row.get::<_, i64>(idx).map(Hms)
}
