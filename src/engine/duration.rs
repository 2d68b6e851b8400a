// ==========================================
// 巡店路线校验系统 - 停留时长封顶
// ==========================================
// 职责: 解析 "Tiempo en PDV" 并按上限封顶
// 红线: 无法解析不报错（按 00:00:00 输出），原始文本始终保留
// ==========================================

use crate::domain::hours::Hms;
use crate::domain::report::AgentDwellTotal;
use crate::domain::visit::{ActualVisit, MatchedVisit};
use std::collections::BTreeMap;
use tracing::debug;

/// 默认上限 59:59
pub const DEFAULT_DWELL_CAP_SECONDS: i64 = 59 * 60 + 59;

/// 解析时分秒部分 `H:MM:SS[.fff]`（小数秒截断）
fn parse_clock(text: &str) -> Option<i64> {
    let mut parts = text.trim().split(':');
    let hours: i64 = parts.next()?.trim().parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds_text = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let whole = match seconds_text.split_once('.') {
        Some((whole, frac)) => {
            if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            whole
        }
        None => seconds_text,
    };
    let seconds: i64 = whole.parse().ok()?;

    if hours < 0 || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
        return None;
    }
    hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)
}

/// 解析经过时间
///
/// 支持 `H:MM:SS`、`HH:MM:SS.fff`、`N day(s) HH:MM:SS`；
/// 负值、溢出或无法解析返回 None
pub fn parse_elapsed(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('-') {
        return None;
    }

    if let Some((count, rest)) = text.split_once(' ') {
        let days: i64 = count.trim().parse().ok()?;
        let rest = rest.trim_start();
        let clock = rest
            .strip_prefix("days")
            .or_else(|| rest.strip_prefix("day"))?
            .trim_start_matches(',')
            .trim();
        if days < 0 {
            return None;
        }
        let clock_seconds = if clock.is_empty() { 0 } else { parse_clock(clock)? };
        return days.checked_mul(86_400)?.checked_add(clock_seconds);
    }

    parse_clock(text)
}

// ==========================================
// DurationCapper
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct DurationCapper {
    cap_seconds: i64,
}

impl Default for DurationCapper {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL_CAP_SECONDS)
    }
}

impl DurationCapper {
    pub fn new(cap_seconds: i64) -> Self {
        Self { cap_seconds }
    }

    pub fn cap_seconds(&self) -> i64 {
        self.cap_seconds
    }

    /// 封顶（幂等）
    pub fn cap(&self, seconds: i64) -> i64 {
        seconds.min(self.cap_seconds)
    }

    /// 解析并封顶原始文本
    pub fn cap_text(&self, raw: &str) -> Option<i64> {
        parse_elapsed(raw).map(|s| self.cap(s))
    }

    /// 封顶后的 HH:MM:SS（空值为 00:00:00）
    pub fn format(seconds: Option<i64>) -> String {
        Hms(seconds.unwrap_or(0)).to_string()
    }

    /// 对全部打卡记录填充封顶后的停留时长
    pub fn apply(&self, visits: &mut [ActualVisit]) {
        let mut capped = 0usize;
        for visit in visits.iter_mut() {
            let parsed = parse_elapsed(&visit.dwell_raw);
            if parsed.is_none() && !visit.dwell_raw.trim().is_empty() {
                debug!(row = visit.row_number, raw = %visit.dwell_raw, "停留时长无法解析");
            }
            if parsed.is_some_and(|s| s > self.cap_seconds) {
                capped += 1;
            }
            visit.dwell_seconds = parsed.map(|s| self.cap(s));
        }
        debug!(capped, cap_seconds = self.cap_seconds, "停留时长封顶完成");
    }
}

/// 按业务员累加匹配拜访的原始停留时长（不封顶，无法解析计 0）
pub fn summarize_original_dwell(matched: &[MatchedVisit]) -> Vec<AgentDwellTotal> {
    let mut totals: BTreeMap<&str, (usize, i64)> = BTreeMap::new();
    for visit in matched {
        let entry = totals.entry(visit.agent_id.as_str()).or_default();
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(parse_elapsed(&visit.dwell_raw).unwrap_or(0));
    }

    totals
        .into_iter()
        .map(|(agent, (visits, seconds))| AgentDwellTotal {
            agent_id: agent.to_string(),
            visits,
            total_dwell: Hms(seconds),
        })
        .collect()
}
