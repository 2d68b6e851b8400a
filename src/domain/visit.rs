// ==========================================
// 巡店路线校验系统 - 拜访领域模型
// ==========================================
// 职责: 实际拜访 (ActualVisit) 与匹配结果 (MatchedVisit)
// ==========================================

use crate::domain::types::{DayName, VisitStatus, WeekParity};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ActualVisit - 一条打卡记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualVisit {
    pub row_number: usize, // 数据行号（从 1 开始，仅用于诊断）

    // ===== 身份 =====
    pub agent_id: Option<String>,  // 业务员（缺失则不参与匹配与工时）
    pub client_id: Option<String>, // 客户（缺失则无法匹配）

    // ===== 时间 =====
    pub checkin_at: Option<NaiveDateTime>,
    pub checkout_at: Option<NaiveDateTime>,

    // ===== 停留时长 =====
    pub dwell_raw: String,          // 原始 "Tiempo en PDV" 文本
    pub dwell_seconds: Option<i64>, // 封顶后的秒数（无法解析为空）

    pub is_valid: bool, // Es Valido == "SI"
}

impl ActualVisit {
    pub fn agent(&self) -> Option<&str> {
        self.agent_id.as_deref().filter(|a| !a.is_empty())
    }

    pub fn client(&self) -> Option<&str> {
        self.client_id.as_deref().filter(|c| !c.is_empty())
    }
}

// ==========================================
// MatchedVisit - 与排班一致的拜访
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedVisit {
    pub agent_id: String,
    pub client_id: String,
    pub checkin_at: NaiveDateTime,
    pub checkout_at: Option<NaiveDateTime>,

    // ===== 停留时长 =====
    pub dwell_raw: String, // 原始文本
    pub dwell: String,     // 封顶后 HH:MM:SS

    // ===== 周期信息 =====
    pub weekday: DayName, // 实际星期
    pub week: WeekParity, // 计算所得周次

    // ===== 排班来源 =====
    pub planned_raw_text: String,
    pub block: String,
    pub origin_line: String,

    pub status: VisitStatus,
}
