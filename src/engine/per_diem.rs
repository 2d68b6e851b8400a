// ==========================================
// 巡店路线校验系统 - 差旅补贴判定
// ==========================================
// 职责: 由平均上下班时刻判定补贴资格，并按线路区域折算金额
// 红线: 比较使用精确均值（总和 vs 阈值 × 天数），不受截断影响
// ==========================================

use crate::domain::hours::{Hms, VendorHoursSummary};
use crate::domain::types::PerDiemZone;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 默认上班阈值 09:00:00
pub const DEFAULT_CHECKIN_BEFORE_SECONDS: i64 = 9 * 3600;

/// 默认下班阈值 13:00:00
pub const DEFAULT_CHECKOUT_AFTER_SECONDS: i64 = 13 * 3600;

// ==========================================
// PerDiemThresholds - 判定阈值
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerDiemThresholds {
    pub checkin_before_seconds: i64,  // 平均上班须严格早于
    pub checkout_after_seconds: i64,  // 平均下班须严格晚于
}

impl Default for PerDiemThresholds {
    fn default() -> Self {
        Self {
            checkin_before_seconds: DEFAULT_CHECKIN_BEFORE_SECONDS,
            checkout_after_seconds: DEFAULT_CHECKOUT_AFTER_SECONDS,
        }
    }
}

// ==========================================
// TimeOfDayStats - 时刻累计
// ==========================================
// 无样本时均值视为 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeOfDayStats {
    pub sum_seconds: i64,
    pub count: i64,
}

impl TimeOfDayStats {
    pub fn push(&mut self, seconds_since_midnight: i64) {
        self.sum_seconds += seconds_since_midnight;
        self.count += 1;
    }

    /// 截断到整秒的均值
    pub fn mean_truncated(&self) -> Hms {
        if self.count == 0 {
            Hms(0)
        } else {
            Hms(self.sum_seconds.div_euclid(self.count))
        }
    }

    /// 均值 < threshold
    pub fn mean_before(&self, threshold: i64) -> bool {
        if self.count == 0 {
            0 < threshold
        } else {
            self.sum_seconds < threshold * self.count
        }
    }

    /// 均值 > threshold
    pub fn mean_after(&self, threshold: i64) -> bool {
        if self.count == 0 {
            0 > threshold
        } else {
            self.sum_seconds > threshold * self.count
        }
    }
}

// ==========================================
// PerDiemEvaluator
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct PerDiemEvaluator {
    thresholds: PerDiemThresholds,
}

impl PerDiemEvaluator {
    pub fn new(thresholds: PerDiemThresholds) -> Self {
        Self { thresholds }
    }

    /// 是否符合补贴条件
    ///
    /// # 参数
    /// - `checkin`: 每日首次签到时刻累计
    /// - `checkout`: 每日末次签退时刻累计
    pub fn is_eligible(&self, checkin: &TimeOfDayStats, checkout: &TimeOfDayStats) -> bool {
        checkin.mean_before(self.thresholds.checkin_before_seconds)
            && checkout.mean_after(self.thresholds.checkout_after_seconds)
    }

    /// 折算补贴金额: 不符合条件为 0，区域由线路推断
    pub fn resolve_amount(
        summary: &VendorHoursSummary,
        rates: &HashMap<PerDiemZone, f64>,
    ) -> (PerDiemZone, f64) {
        let zone = PerDiemZone::from_line(&summary.line);
        let amount = if summary.per_diem_eligible {
            rates.get(&zone).copied().unwrap_or(0.0)
        } else {
            0.0
        };
        (zone, amount)
    }
}
