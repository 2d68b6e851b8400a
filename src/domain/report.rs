// ==========================================
// 巡店路线校验系统 - 校验报告与批次模型
// ==========================================
// 职责: 校验窗口、校验报告、已保存批次及其查询视图
// ==========================================

use crate::domain::hours::{DailyHoursRecord, Hms, VendorHoursSummary};
use crate::domain::types::{PerDiemZone, WeekParity};
use crate::domain::visit::MatchedVisit;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ValidationWindow - 校验窗口
// ==========================================
// 红线: start <= end；起始日 00:00:00 至结束日 23:59:59（含）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub start_parity: WeekParity, // 起始日所在周的周次
}

impl ValidationWindow {
    pub fn start_at(&self) -> NaiveDateTime {
        self.start.and_time(chrono::NaiveTime::MIN)
    }

    pub fn end_at(&self) -> NaiveDateTime {
        let last_second = chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(chrono::NaiveTime::MIN);
        self.end.and_time(last_second)
    }

    /// 时间点是否落在窗口内（两端含）
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start_at() && at <= self.end_at()
    }
}

// ==========================================
// ValidationTotals - 汇总计数
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationTotals {
    pub rows_read: usize,      // 读入的拜访记录
    pub rows_in_window: usize, // 窗口内记录
    pub matched_visits: usize, // 匹配成功
    pub agents: usize,         // 有工时汇总的业务员
}

// ==========================================
// ValidationReport - 一次校验的完整结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub window: ValidationWindow,
    pub matched: Vec<MatchedVisit>,
    pub hours_summary: Vec<VendorHoursSummary>,
    pub hours_detail: Vec<DailyHoursRecord>,
    pub totals: ValidationTotals,
}

// ==========================================
// 批次持久化视图
// ==========================================

/// 批次头
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchHeader {
    pub batch_id: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub start_week: WeekParity,
    pub created_at: NaiveDateTime,
}

/// 已保存的匹配拜访（近期拜访查询）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVisit {
    pub id: i64,
    pub batch_id: String,
    #[serde(flatten)]
    pub visit: MatchedVisit,
}

/// 业务员停留时长合计（按原始停留时长累加，不封顶）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDwellTotal {
    pub agent_id: String,
    pub visits: usize,
    pub total_dwell: Hms,
}

/// 已保存批次中的停留时长合计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDwellSummary {
    pub batch_id: String,
    #[serde(flatten)]
    pub total: AgentDwellTotal,
}

/// 带补贴金额的工时汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursSummaryWithAllowance {
    #[serde(flatten)]
    pub summary: VendorHoursSummary,
    pub zone: PerDiemZone,
    pub per_diem_amount: f64, // 不符合条件为 0
}

/// 批次详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDetails {
    pub header: BatchHeader,
    pub visits: Vec<StoredVisit>,
    pub dwell_summary: Vec<AgentDwellSummary>,
}

/// 批次工时
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchHours {
    pub header: BatchHeader,
    pub summary: Vec<HoursSummaryWithAllowance>,
    pub detail: Vec<DailyHoursRecord>,
}

// ==========================================
// PerDiemRate - 区域补贴标准
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerDiemRate {
    pub zone: PerDiemZone,
    pub amount: f64,
    pub updated_at: NaiveDateTime,
}
