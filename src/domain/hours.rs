// ==========================================
// 巡店路线校验系统 - 工时领域模型
// ==========================================
// 职责: 每日工时明细、业务员工时汇总、HH:MM:SS 时长值
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ==========================================
// Hms - 以秒存储、以 HH:MM:SS 序列化的时长
// ==========================================
// 小时位不封顶（"123:04:05"），负值前缀 "-"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Hms(pub i64);

impl Hms {
    pub fn seconds(&self) -> i64 {
        self.0
    }

    /// 解析 `[-]H+:MM:SS`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let mut parts = body.split(':');
        let hours: i64 = parts.next()?.parse().ok()?;
        let minutes: i64 = parts.next()?.parse().ok()?;
        let seconds: i64 = parts.next()?.parse().ok()?;
        if parts.next().is_some() || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
            return None;
        }

        let total = hours * 3600 + minutes * 60 + seconds;
        Some(Hms(if negative { -total } else { total }))
    }
}

impl fmt::Display for Hms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let total = self.0.abs();
        write!(
            f,
            "{}{:02}:{:02}:{:02}",
            sign,
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

impl Serialize for Hms {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hms {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Hms::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("无效的时长格式: {}", text)))
    }
}

// ==========================================
// DailyHoursRecord - 某业务员某日的工时
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyHoursRecord {
    pub agent_id: String,
    pub date: NaiveDate,
    pub first_checkin: NaiveDateTime,
    pub last_checkout: NaiveDateTime,
    pub span: Hms,            // 可能为零或负
    pub first_client: String, // 当日首个客户（无则为空）
}

// ==========================================
// VendorHoursSummary - 业务员工时汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorHoursSummary {
    pub agent_id: String,
    pub total_worked: Hms,     // 正时长之和
    pub days_worked: usize,    // 每日明细条数
    pub average_daily: Hms,    // total ÷ days（向下取整）
    pub average_checkin: Hms,  // 平均上班时刻（午夜起秒数）
    pub average_checkout: Hms, // 平均下班时刻
    pub per_diem_eligible: bool,
    pub line: String, // 排班线路，无排班为 "Sin Línea"
}
