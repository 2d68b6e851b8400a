// ==========================================
// 巡店路线校验系统 - 双周周期判定
// ==========================================
// 职责: 判定任意日期属于两周循环中的第几周
// 红线: 纯日历整数运算，与时刻无关
// ==========================================

use crate::domain::types::WeekParity;
use chrono::{Datelike, Duration, NaiveDate};

/// 日期所在周的周一
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

// ==========================================
// CycleResolver
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct CycleResolver {
    reference_monday: NaiveDate,
    start_parity: WeekParity,
}

impl CycleResolver {
    /// # 参数
    /// - `reference`: 窗口起始日（取其所在周的周一）
    /// - `start_parity`: 起始周的周次
    pub fn new(reference: NaiveDate, start_parity: WeekParity) -> Self {
        Self {
            reference_monday: monday_of(reference),
            start_parity,
        }
    }

    /// 相对起始周的周差（向下取整，可为负）
    pub fn weeks_between(&self, target: NaiveDate) -> i64 {
        let days = (monday_of(target) - self.reference_monday).num_days();
        days.div_euclid(7)
    }

    /// 目标日期的周次: 周差为偶数同起始周，奇数取另一周
    pub fn resolve(&self, target: NaiveDate) -> WeekParity {
        if self.weeks_between(target).rem_euclid(2) == 0 {
            self.start_parity
        } else {
            self.start_parity.other()
        }
    }
}
