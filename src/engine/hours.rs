// ==========================================
// 巡店路线校验系统 - 工时汇总引擎
// ==========================================
// 职责: 按 业务员 → 签到日期 分组，计算每日工时与汇总统计
// 输入: 窗口内打卡记录（非匹配子集）+ 业务员线路表
// 输出: VendorHoursSummary 列表 + DailyHoursRecord 明细
// 红线: 非正时长不计入总工时，但计入出勤天数
// ==========================================

use crate::domain::hours::{DailyHoursRecord, Hms, VendorHoursSummary};
use crate::domain::schedule::NO_LINE;
use crate::domain::types::ValidityPolicy;
use crate::domain::visit::ActualVisit;
use crate::engine::per_diem::{PerDiemEvaluator, TimeOfDayStats};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// 某业务员某日的累计
#[derive(Debug, Default)]
struct DayAccumulator {
    first_checkin: Option<NaiveDateTime>,
    last_checkout: Option<NaiveDateTime>,
    first_client: Option<String>,
}

impl DayAccumulator {
    fn absorb(&mut self, visit: &ActualVisit) {
        if let Some(checkin) = visit.checkin_at {
            self.first_checkin = Some(self.first_checkin.map_or(checkin, |c| c.min(checkin)));
        }
        if let Some(checkout) = visit.checkout_at {
            self.last_checkout = Some(self.last_checkout.map_or(checkout, |c| c.max(checkout)));
        }
        if self.first_client.is_none() {
            self.first_client = visit.client().map(str::to_string);
        }
    }
}

fn seconds_since_midnight(at: NaiveDateTime) -> i64 {
    at.time().num_seconds_from_midnight() as i64
}

/// 汇总输出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoursOutcome {
    pub summary: Vec<VendorHoursSummary>,
    pub detail: Vec<DailyHoursRecord>,
}

// ==========================================
// HoursAggregator
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct HoursAggregator {
    policy: ValidityPolicy,
    per_diem: PerDiemEvaluator,
}

impl HoursAggregator {
    pub fn new(policy: ValidityPolicy, per_diem: PerDiemEvaluator) -> Self {
        Self { policy, per_diem }
    }

    /// 计算工时
    ///
    /// # 参数
    /// - `visits`: 窗口内全部打卡记录
    /// - `agent_lines`: 业务员 → 排班线路
    ///
    /// # 返回
    /// 业务员升序的汇总；明细按 业务员、日期 升序
    #[instrument(skip_all, fields(rows = visits.len(), policy = %self.policy))]
    pub fn aggregate(
        &self,
        visits: &[ActualVisit],
        agent_lines: &HashMap<String, String>,
    ) -> HoursOutcome {
        // 1. 分组: 业务员 → 签到日期 → 累计
        let mut groups: BTreeMap<String, BTreeMap<NaiveDate, DayAccumulator>> = BTreeMap::new();
        for visit in visits {
            if !self.policy.admits(visit.is_valid) {
                continue;
            }
            let (agent, checkin) = match (visit.agent(), visit.checkin_at) {
                (Some(agent), Some(checkin)) => (agent, checkin),
                _ => {
                    debug!(row = visit.row_number, "缺少业务员或签到时间，不计工时");
                    continue;
                }
            };

            groups
                .entry(agent.to_string())
                .or_default()
                .entry(checkin.date())
                .or_default()
                .absorb(visit);
        }

        // 2. 逐业务员汇总
        let mut outcome = HoursOutcome::default();
        for (agent, days) in groups {
            let mut total = 0i64;
            let mut records = 0usize;
            let mut checkin_stats = TimeOfDayStats::default();
            let mut checkout_stats = TimeOfDayStats::default();

            for (date, day) in days {
                if let Some(checkin) = day.first_checkin {
                    checkin_stats.push(seconds_since_midnight(checkin));
                }
                if let Some(checkout) = day.last_checkout {
                    checkout_stats.push(seconds_since_midnight(checkout));
                }

                if let (Some(first), Some(last)) = (day.first_checkin, day.last_checkout) {
                    let span = (last - first).num_seconds();
                    if span > 0 {
                        total += span;
                    }
                    records += 1;
                    outcome.detail.push(DailyHoursRecord {
                        agent_id: agent.clone(),
                        date,
                        first_checkin: first,
                        last_checkout: last,
                        span: Hms(span),
                        first_client: day.first_client.unwrap_or_default(),
                    });
                }
            }

            let average = if records > 0 { total / records as i64 } else { 0 };
            let line = agent_lines
                .get(&agent)
                .cloned()
                .unwrap_or_else(|| NO_LINE.to_string());

            outcome.summary.push(VendorHoursSummary {
                per_diem_eligible: self.per_diem.is_eligible(&checkin_stats, &checkout_stats),
                total_worked: Hms(total),
                days_worked: records,
                average_daily: Hms(average),
                average_checkin: checkin_stats.mean_truncated(),
                average_checkout: checkout_stats.mean_truncated(),
                line,
                agent_id: agent,
            });
        }

        debug!(
            agents = outcome.summary.len(),
            days = outcome.detail.len(),
            "工时汇总完成"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn row(
        agent: Option<&str>,
        client: &str,
        checkin: Option<NaiveDateTime>,
        checkout: Option<NaiveDateTime>,
        valid: bool,
    ) -> ActualVisit {
        ActualVisit {
            row_number: 1,
            agent_id: agent.map(str::to_string),
            client_id: Some(client.to_string()),
            checkin_at: checkin,
            checkout_at: checkout,
            dwell_raw: String::new(),
            dwell_seconds: None,
            is_valid: valid,
        }
    }

    #[test]
    fn test_daily_first_and_last() {
        let rows = vec![
            row(Some("A"), "C2", Some(at(1, 10, 0)), Some(at(1, 11, 0)), true),
            row(Some("A"), "C1", Some(at(1, 8, 0)), Some(at(1, 9, 0)), true),
            row(Some("A"), "C3", Some(at(1, 15, 0)), Some(at(1, 17, 30)), true),
        ];
        let outcome = HoursAggregator::default().aggregate(&rows, &HashMap::new());

        assert_eq!(outcome.detail.len(), 1);
        let day = &outcome.detail[0];
        assert_eq!(day.first_checkin, at(1, 8, 0));
        assert_eq!(day.last_checkout, at(1, 17, 30));
        assert_eq!(day.span, Hms(9 * 3600 + 1800));
        // 行顺序中的首个客户
        assert_eq!(day.first_client, "C2");

        let summary = &outcome.summary[0];
        assert_eq!(summary.line, NO_LINE);
        assert_eq!(summary.days_worked, 1);
        assert!(summary.per_diem_eligible);
    }

    #[test]
    fn test_total_excludes_non_positive_spans() {
        let rows = vec![
            row(Some("A"), "C", Some(at(1, 8, 0)), Some(at(1, 16, 0)), true),
            // 签退早于签到: 负时长
            row(Some("A"), "C", Some(at(2, 12, 0)), Some(at(2, 11, 0)), true),
            // 零时长
            row(Some("A"), "C", Some(at(3, 9, 0)), Some(at(3, 9, 0)), true),
            // 无签退: 无明细
            row(Some("A"), "C", Some(at(4, 9, 0)), None, true),
        ];
        let outcome = HoursAggregator::default().aggregate(&rows, &HashMap::new());

        let positive: i64 = outcome
            .detail
            .iter()
            .map(|d| d.span.seconds())
            .filter(|s| *s > 0)
            .sum();
        let summary = &outcome.summary[0];
        assert_eq!(summary.total_worked, Hms(positive));
        assert_eq!(summary.total_worked, Hms(8 * 3600));
        assert_eq!(summary.days_worked, outcome.detail.len());
        assert_eq!(summary.days_worked, 3);
        assert_eq!(summary.average_daily, Hms(8 * 3600 / 3));
    }

    #[test]
    fn test_average_times_use_available_dates() {
        let rows = vec![
            row(Some("A"), "C", Some(at(1, 8, 0)), Some(at(1, 14, 0)), true),
            row(Some("A"), "C", Some(at(2, 9, 0)), None, true),
        ];
        let outcome = HoursAggregator::default().aggregate(&rows, &HashMap::new());
        let summary = &outcome.summary[0];

        assert_eq!(summary.average_checkin, Hms(8 * 3600 + 1800));
        assert_eq!(summary.average_checkout, Hms(14 * 3600));
        assert!(summary.per_diem_eligible);
    }

    #[test]
    fn test_validity_policy_and_missing_agent() {
        let rows = vec![
            row(Some("A"), "C", Some(at(1, 8, 0)), Some(at(1, 12, 0)), true),
            row(Some("A"), "C", Some(at(2, 8, 0)), Some(at(2, 12, 0)), false),
            row(None, "C", Some(at(3, 8, 0)), Some(at(3, 12, 0)), true),
        ];
        let lines: HashMap<String, String> = [("A".to_string(), "Linea 2".to_string())].into();

        let valid_only = HoursAggregator::default().aggregate(&rows, &lines);
        assert_eq!(valid_only.summary.len(), 1);
        assert_eq!(valid_only.summary[0].days_worked, 1);
        assert_eq!(valid_only.summary[0].line, "Linea 2");

        let all_rows = HoursAggregator::new(ValidityPolicy::AllRows, PerDiemEvaluator::default())
            .aggregate(&rows, &lines);
        assert_eq!(all_rows.summary[0].days_worked, 2);
    }

    #[test]
    fn test_agents_sorted_ascending() {
        let rows = vec![
            row(Some("B"), "C", Some(at(1, 8, 0)), Some(at(1, 9, 0)), true),
            row(Some("A"), "C", Some(at(1, 8, 0)), Some(at(1, 9, 0)), true),
        ];
        let outcome = HoursAggregator::default().aggregate(&rows, &HashMap::new());
        let agents: Vec<&str> = outcome.summary.iter().map(|s| s.agent_id.as_str()).collect();
        assert_eq!(agents, vec!["A", "B"]);
    }
}
