// ==========================================
// 巡店路线校验系统 - 拜访匹配引擎
// ==========================================
// 职责: 按 客户_业务员_星期_周次 将实际拜访与排班对齐
// 输入: 窗口内打卡记录 + 排班查找表 + 周期判定器
// 输出: MatchedVisit 列表（按签到时间升序，稳定）
// ==========================================

use crate::domain::schedule::{PlannedSchedule, PlannedVisit};
use crate::domain::types::{DayName, VisitStatus, WeekParity};
use crate::domain::visit::{ActualVisit, MatchedVisit};
use crate::engine::cycle::CycleResolver;
use crate::engine::duration::DurationCapper;
use chrono::{Datelike, NaiveDateTime};
use tracing::{debug, instrument};

pub struct VisitMatcher<'a> {
    schedule: &'a PlannedSchedule,
    cycle: CycleResolver,
}

impl<'a> VisitMatcher<'a> {
    pub fn new(schedule: &'a PlannedSchedule, cycle: CycleResolver) -> Self {
        Self { schedule, cycle }
    }

    /// 查找计划: 先用规范星期名，未命中再用带重音写法
    ///
    /// # 返回
    /// 命中的排班、实际星期与周次
    fn lookup(
        &self,
        client: &str,
        agent: &str,
        checkin: NaiveDateTime,
    ) -> Option<(&'a PlannedVisit, DayName, WeekParity)> {
        let day = DayName::from_weekday(checkin.weekday());
        let week = self.cycle.resolve(checkin.date());

        let primary = PlannedVisit::make_key(client, agent, day.canonical(), week);
        if let Some(planned) = self.schedule.get(&primary) {
            return Some((planned, day, week));
        }

        if day.accented() != day.canonical() {
            let fallback = PlannedVisit::make_key(client, agent, day.accented(), week);
            if let Some(planned) = self.schedule.get(&fallback) {
                return Some((planned, day, week));
            }
        }

        None
    }

    /// 匹配一批打卡记录
    #[instrument(skip(self, visits), fields(rows = visits.len()))]
    pub fn match_visits(&self, visits: &[ActualVisit]) -> Vec<MatchedVisit> {
        let mut matched = Vec::new();

        for visit in visits {
            if !visit.is_valid {
                continue;
            }
            let (agent, checkin) = match (visit.agent(), visit.checkin_at) {
                (Some(agent), Some(checkin)) => (agent, checkin),
                _ => continue,
            };
            if DayName::from_weekday(checkin.weekday()).is_sunday() {
                debug!(row = visit.row_number, "周日拜访不参与匹配");
                continue;
            }
            let client = match visit.client() {
                Some(client) => client,
                None => {
                    debug!(row = visit.row_number, "缺少客户，无法匹配");
                    continue;
                }
            };

            match self.lookup(client, agent, checkin) {
                Some((planned, day, week)) => matched.push(MatchedVisit {
                    agent_id: agent.to_string(),
                    client_id: client.to_string(),
                    checkin_at: checkin,
                    checkout_at: visit.checkout_at,
                    dwell_raw: visit.dwell_raw.clone(),
                    dwell: DurationCapper::format(visit.dwell_seconds),
                    weekday: day,
                    week,
                    planned_raw_text: planned.raw_text.clone(),
                    block: planned.block.clone(),
                    origin_line: planned.origin_line.clone(),
                    status: VisitStatus::Coincide,
                }),
                None => debug!(row = visit.row_number, agent, client, "未找到对应排班"),
            }
        }

        // sort_by_key 为稳定排序
        matched.sort_by_key(|m| m.checkin_at);
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::DEFAULT_BLOCK;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn actual(row: usize, agent: &str, client: &str, checkin: NaiveDateTime) -> ActualVisit {
        ActualVisit {
            row_number: row,
            agent_id: Some(agent.to_string()),
            client_id: Some(client.to_string()),
            checkin_at: Some(checkin),
            checkout_at: Some(checkin + chrono::Duration::minutes(30)),
            dwell_raw: "0:30:00".to_string(),
            dwell_seconds: Some(1800),
            is_valid: true,
        }
    }

    fn schedule(entries: &[(&str, &str, DayName, WeekParity)]) -> PlannedSchedule {
        entries
            .iter()
            .map(|(a, c, d, w)| PlannedVisit::new(*a, *c, *d, *w, DEFAULT_BLOCK, "Linea 1", format!("{} {}", d, w)))
            .collect()
    }

    fn resolver() -> CycleResolver {
        // 2024-01-01 周一，第 1 周
        CycleResolver::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), WeekParity::First)
    }

    #[test]
    fn test_match_week_one_monday() {
        let plan = schedule(&[("A", "C", DayName::Lunes, WeekParity::First)]);
        let matcher = VisitMatcher::new(&plan, resolver());

        let result = matcher.match_visits(&[actual(1, "A", "C", at(1, 9, 0))]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].status, VisitStatus::Coincide);
        assert_eq!(result[0].weekday, DayName::Lunes);
        assert_eq!(result[0].week, WeekParity::First);
        assert_eq!(result[0].dwell, "00:30:00");
    }

    #[test]
    fn test_wrong_week_does_not_match() {
        let plan = schedule(&[("A", "C", DayName::Lunes, WeekParity::First)]);
        let matcher = VisitMatcher::new(&plan, resolver());

        // 2024-01-08 属于第 2 周
        assert!(matcher.match_visits(&[actual(1, "A", "C", at(8, 9, 0))]).is_empty());
        // 2024-01-15 回到第 1 周
        assert_eq!(matcher.match_visits(&[actual(1, "A", "C", at(15, 9, 0))]).len(), 1);
    }

    #[test]
    fn test_second_week_match_reports_resolved_week() {
        let plan = schedule(&[
            ("A", "C", DayName::Jueves, WeekParity::Second),
            ("A", "C", DayName::Jueves, WeekParity::First),
        ]);
        let matcher = VisitMatcher::new(&plan, resolver());

        // 2024-01-11 为第 2 周周四，2024-01-18 回到第 1 周
        let result = matcher.match_visits(&[
            actual(1, "A", "C", at(11, 9, 0)),
            actual(2, "A", "C", at(18, 9, 0)),
        ]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].week, WeekParity::Second);
        assert_eq!(result[0].planned_raw_text, "Jueves 2");
        assert_eq!(result[1].week, WeekParity::First);
        assert_eq!(result[1].planned_raw_text, "Jueves 1");
    }

    #[test]
    fn test_accented_fallback_key() {
        let mut plan = PlannedSchedule::new();
        let mut visit = PlannedVisit::new("A", "C", DayName::Miercoles, WeekParity::First, DEFAULT_BLOCK, "Linea 1", "Miércoles 1");
        visit.key = PlannedVisit::make_key("C", "A", "Miércoles", WeekParity::First);
        plan.insert(visit);

        let matcher = VisitMatcher::new(&plan, resolver());
        let result = matcher.match_visits(&[actual(1, "A", "C", at(3, 10, 0))]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].weekday, DayName::Miercoles);
    }

    #[test]
    fn test_sunday_invalid_and_missing_ids_never_match() {
        let plan = schedule(&[
            ("A", "C", DayName::Domingo, WeekParity::First),
            ("A", "C", DayName::Lunes, WeekParity::First),
        ]);
        let matcher = VisitMatcher::new(&plan, resolver());

        let mut invalid = actual(2, "A", "C", at(1, 9, 0));
        invalid.is_valid = false;
        let mut no_agent = actual(3, "A", "C", at(1, 9, 0));
        no_agent.agent_id = None;
        let mut no_client = actual(4, "A", "C", at(1, 9, 0));
        no_client.client_id = None;

        let rows = vec![actual(1, "A", "C", at(7, 9, 0)), invalid, no_agent, no_client];
        assert!(matcher.match_visits(&rows).is_empty());
    }

    #[test]
    fn test_output_sorted_by_checkin_stable() {
        let plan = schedule(&[
            ("A", "C1", DayName::Martes, WeekParity::First),
            ("A", "C2", DayName::Martes, WeekParity::First),
            ("A", "C1", DayName::Lunes, WeekParity::First),
        ]);
        let matcher = VisitMatcher::new(&plan, resolver());

        let rows = vec![
            actual(1, "A", "C1", at(2, 11, 0)),
            actual(2, "A", "C2", at(2, 11, 0)),
            actual(3, "A", "C1", at(1, 8, 0)),
        ];
        let result = matcher.match_visits(&rows);
        let clients: Vec<&str> = result.iter().map(|m| m.client_id.as_str()).collect();
        assert_eq!(clients, vec!["C1", "C1", "C2"]);
        assert_eq!(result[1].checkin_at, at(2, 11, 0));
    }
}
