// ==========================================
// 巡店路线校验系统 - 领域类型定义
// ==========================================
// 职责: 周次奇偶、星期名称、匹配状态、策略枚举
// ==========================================

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 周次 (Week Parity)
// ==========================================
// 红线: 两周循环，取值只能是 1 或 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum WeekParity {
    First,  // 第 1 周
    Second, // 第 2 周
}

impl WeekParity {
    /// 从整数解析周次（仅接受 1 / 2）
    pub fn from_number(value: i64) -> Option<Self> {
        match value {
            1 => Some(WeekParity::First),
            2 => Some(WeekParity::Second),
            _ => None,
        }
    }

    /// 周次数字
    pub fn number(&self) -> u8 {
        match self {
            WeekParity::First => 1,
            WeekParity::Second => 2,
        }
    }

    /// 另一个周次
    pub fn other(&self) -> Self {
        match self {
            WeekParity::First => WeekParity::Second,
            WeekParity::Second => WeekParity::First,
        }
    }
}

impl From<WeekParity> for u8 {
    fn from(value: WeekParity) -> Self {
        value.number()
    }
}

impl TryFrom<u8> for WeekParity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        WeekParity::from_number(value as i64).ok_or_else(|| format!("周次只能是 1 或 2，实际 {}", value))
    }
}

impl fmt::Display for WeekParity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

// ==========================================
// 星期名称 (Day Name)
// ==========================================
// 规范形式: 西班牙语、无重音、首字母大写
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayName {
    Lunes,
    Martes,
    Miercoles,
    Jueves,
    Viernes,
    Sabado,
    Domingo,
}

impl DayName {
    /// 由 chrono 星期换算
    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayName::Lunes,
            Weekday::Tue => DayName::Martes,
            Weekday::Wed => DayName::Miercoles,
            Weekday::Thu => DayName::Jueves,
            Weekday::Fri => DayName::Viernes,
            Weekday::Sat => DayName::Sabado,
            Weekday::Sun => DayName::Domingo,
        }
    }

    /// 规范名称（无重音），用于主键
    pub fn canonical(&self) -> &'static str {
        match self {
            DayName::Lunes => "Lunes",
            DayName::Martes => "Martes",
            DayName::Miercoles => "Miercoles",
            DayName::Jueves => "Jueves",
            DayName::Viernes => "Viernes",
            DayName::Sabado => "Sabado",
            DayName::Domingo => "Domingo",
        }
    }

    /// 带重音的书写形式（排班表手工录入时可能使用）
    pub fn accented(&self) -> &'static str {
        match self {
            DayName::Miercoles => "Miércoles",
            DayName::Sabado => "Sábado",
            other => other.canonical(),
        }
    }

    /// 从任意书写形式解析（忽略大小写与重音）
    pub fn from_text(text: &str) -> Option<Self> {
        match normalize_day_text(text).as_str() {
            "Lunes" => Some(DayName::Lunes),
            "Martes" => Some(DayName::Martes),
            "Miercoles" => Some(DayName::Miercoles),
            "Jueves" => Some(DayName::Jueves),
            "Viernes" => Some(DayName::Viernes),
            "Sabado" => Some(DayName::Sabado),
            "Domingo" => Some(DayName::Domingo),
            _ => None,
        }
    }

    pub fn is_sunday(&self) -> bool {
        matches!(self, DayName::Domingo)
    }
}

impl fmt::Display for DayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// 去除重音并首字母大写（"miércoles" → "Miercoles"）
pub fn normalize_day_text(text: &str) -> String {
    let stripped: String = text
        .trim()
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect();

    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ==========================================
// 匹配状态 (Visit Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    Coincide, // 实际拜访与排班一致
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitStatus::Coincide => write!(f, "COINCIDE"),
        }
    }
}

impl VisitStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "COINCIDE" => Some(VisitStatus::Coincide),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            VisitStatus::Coincide => "COINCIDE",
        }
    }
}

// ==========================================
// 工时统计口径 (Validity Policy)
// ==========================================
// 工时是否只统计 "Es Valido = SI" 的记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidityPolicy {
    #[default]
    ValidOnly, // 仅有效记录
    AllRows,   // 全部记录
}

impl fmt::Display for ValidityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ValidityPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "VALID_ONLY" => Some(ValidityPolicy::ValidOnly),
            "ALL_ROWS" => Some(ValidityPolicy::AllRows),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ValidityPolicy::ValidOnly => "VALID_ONLY",
            ValidityPolicy::AllRows => "ALL_ROWS",
        }
    }

    /// 该记录是否参与工时统计
    pub fn admits(&self, is_valid: bool) -> bool {
        match self {
            ValidityPolicy::ValidOnly => is_valid,
            ValidityPolicy::AllRows => true,
        }
    }
}

// ==========================================
// 排班主键冲突策略 (Duplicate Key Policy)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuplicateKeyPolicy {
    #[default]
    LastWriteWins, // 后写覆盖
    Reject,        // 拒绝整个排班表
}

impl fmt::Display for DuplicateKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl DuplicateKeyPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LAST_WRITE_WINS" => Some(DuplicateKeyPolicy::LastWriteWins),
            "REJECT" => Some(DuplicateKeyPolicy::Reject),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DuplicateKeyPolicy::LastWriteWins => "LAST_WRITE_WINS",
            DuplicateKeyPolicy::Reject => "REJECT",
        }
    }
}

// ==========================================
// 差旅补贴区域 (Per-Diem Zone)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerDiemZone {
    CabaGba,  // 首都及大布宜诺斯艾利斯
    Interior, // 内陆
}

impl fmt::Display for PerDiemZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl PerDiemZone {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CABA_GBA" => Some(PerDiemZone::CabaGba),
            "INTERIOR" => Some(PerDiemZone::Interior),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            PerDiemZone::CabaGba => "CABA_GBA",
            PerDiemZone::Interior => "INTERIOR",
        }
    }

    /// 由排班线路推断区域：线路文本含 INTERIOR 即为内陆，其余为 CABA_GBA
    pub fn from_line(line: &str) -> Self {
        if line.to_uppercase().contains("INTERIOR") {
            PerDiemZone::Interior
        } else {
            PerDiemZone::CabaGba
        }
    }
}
