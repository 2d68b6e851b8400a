// ==========================================
// 巡店路线校验系统 - 校验编排器
// ==========================================
// 用途: 协调各引擎的单向执行顺序
// 流程: 窗口解析 → 拜访解析 → 时长封顶 → 窗口过滤 → 匹配 → 工时汇总
// 红线: 纯函数式，无共享可变状态，不读系统时钟
// ==========================================

use crate::config::ValidationConfig;
use crate::domain::report::{ValidationReport, ValidationTotals, ValidationWindow};
use crate::domain::schedule::PlannedSchedule;
use crate::domain::types::WeekParity;
use crate::domain::visit::ActualVisit;
use crate::engine::cycle::CycleResolver;
use crate::engine::duration::DurationCapper;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::hours::HoursAggregator;
use crate::engine::matcher::VisitMatcher;
use crate::engine::per_diem::PerDiemEvaluator;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::file_parser::RawTable;
use crate::importer::schedule_parser::ScheduleParser;
use crate::importer::visit_parser::VisitParser;
use tracing::{debug, info};

// ==========================================
// ValidationOrchestrator - 校验编排器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOrchestrator {
    config: ValidationConfig,
}

impl ValidationOrchestrator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// 解析校验窗口
    ///
    /// # 参数
    /// - `from` / `to`: `DD/MM/YYYY`
    /// - `start_week`: 起始日所在周的周次（1 或 2）
    pub fn parse_window(from: &str, to: &str, start_week: i64) -> EngineResult<ValidationWindow> {
        let cleaner = DataCleaner;
        let start = cleaner
            .parse_window_date(from)
            .ok_or_else(|| EngineError::InvalidDate(from.to_string()))?;
        let end = cleaner
            .parse_window_date(to)
            .ok_or_else(|| EngineError::InvalidDate(to.to_string()))?;

        if end < start {
            return Err(EngineError::InvalidWindow { start, end });
        }

        let start_parity =
            WeekParity::from_number(start_week).ok_or(EngineError::InvalidStartWeek(start_week))?;

        Ok(ValidationWindow {
            start,
            end,
            start_parity,
        })
    }

    /// 解析排班表（使用配置中的主键冲突策略）
    pub fn parse_schedule(&self, table: &RawTable) -> EngineResult<PlannedSchedule> {
        Ok(ScheduleParser::new().parse(table, self.config.duplicate_key_policy)?)
    }

    /// 使用原始排班表执行完整校验
    pub fn run(
        &self,
        schedule_table: &RawTable,
        visits_table: &RawTable,
        window: &ValidationWindow,
    ) -> EngineResult<ValidationReport> {
        let schedule = self.parse_schedule(schedule_table)?;
        self.run_with_schedule(&schedule, visits_table, window)
    }

    /// 使用已构建的排班查找表执行完整校验
    ///
    /// # 返回
    /// 匹配结果、工时汇总、工时明细与计数；空结果不是错误
    pub fn run_with_schedule(
        &self,
        schedule: &PlannedSchedule,
        visits_table: &RawTable,
        window: &ValidationWindow,
    ) -> EngineResult<ValidationReport> {
        info!(
            from = %window.start,
            to = %window.end,
            start_week = %window.start_parity,
            planned_keys = schedule.key_count(),
            "开始执行校验流程"
        );

        // ==========================================
        // 步骤1: 解析拜访记录
        // ==========================================
        let mut visits = VisitParser::new().parse(visits_table)?;
        let rows_read = visits.len();

        // ==========================================
        // 步骤2: 停留时长封顶（全部记录）
        // ==========================================
        DurationCapper::new(self.config.dwell_cap_seconds).apply(&mut visits);

        // ==========================================
        // 步骤3: 按签到时间过滤窗口
        // ==========================================
        let in_window: Vec<ActualVisit> = visits
            .into_iter()
            .filter(|v| v.checkin_at.is_some_and(|at| window.contains(at)))
            .collect();
        debug!(rows_read, rows_in_window = in_window.len(), "窗口过滤完成");

        // ==========================================
        // 步骤4: 匹配
        // ==========================================
        let cycle = CycleResolver::new(window.start, window.start_parity);
        let matched = VisitMatcher::new(schedule, cycle).match_visits(&in_window);

        // ==========================================
        // 步骤5: 工时汇总与补贴判定
        // ==========================================
        let aggregator = HoursAggregator::new(
            self.config.validity_policy,
            PerDiemEvaluator::new(self.config.per_diem),
        );
        let outcome = aggregator.aggregate(&in_window, &schedule.agent_lines());

        let totals = ValidationTotals {
            rows_read,
            rows_in_window: in_window.len(),
            matched_visits: matched.len(),
            agents: outcome.summary.len(),
        };

        info!(
            rows_read = totals.rows_read,
            rows_in_window = totals.rows_in_window,
            matched = totals.matched_visits,
            agents = totals.agents,
            "校验流程完成"
        );

        Ok(ValidationReport {
            window: *window,
            matched,
            hours_summary: outcome.summary,
            hours_detail: outcome.detail,
            totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::file_parser::RawRow;
    use chrono::NaiveDate;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|values| {
                headers
                    .iter()
                    .cloned()
                    .zip(values.iter().map(|v| v.to_string()))
                    .collect::<RawRow>()
            })
            .collect();
        RawTable::new(headers, rows)
    }

    fn visits_table(rows: &[&[&str]]) -> RawTable {
        table(
            &["Es Valido", "Fecha Checkin", "Fecha Checkout", "Tiempo en PDV", "Codigo", "Vendedor"],
            rows,
        )
    }

    #[test]
    fn test_parse_window_ok() {
        let window = ValidationOrchestrator::parse_window("01/01/2024", "14/01/2024", 2).unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_eq!(window.start_parity, WeekParity::Second);
    }

    #[test]
    fn test_parse_window_errors() {
        assert!(matches!(
            ValidationOrchestrator::parse_window("2024-01-01", "14/01/2024", 1),
            Err(EngineError::InvalidDate(_))
        ));
        assert!(matches!(
            ValidationOrchestrator::parse_window("14/01/2024", "01/01/2024", 1),
            Err(EngineError::InvalidWindow { .. })
        ));
        assert!(matches!(
            ValidationOrchestrator::parse_window("01/01/2024", "14/01/2024", 3),
            Err(EngineError::InvalidStartWeek(3))
        ));
    }

    #[test]
    fn test_monday_and_thursday_scenario() {
        let schedule = table(
            &["Vendedores", "Cliente", "Bloque", "Linea 1"],
            &[&["A", "C", "B1", "Lunes 1, Jueves 1"]],
        );
        // 2024-01-01 周一，2024-01-04 周四
        let visits = visits_table(&[
            &["SI", "01/01/2024 09:00:00", "01/01/2024 10:00:00", "1:10:00", "C.A", ""],
            &["SI", "04/01/2024 08:30:00", "04/01/2024 09:00:00", "0:30:00", "C.A", ""],
        ]);
        let window = ValidationOrchestrator::parse_window("01/01/2024", "07/01/2024", 1).unwrap();

        let report = ValidationOrchestrator::default()
            .run(&schedule, &visits, &window)
            .unwrap();

        assert_eq!(report.matched.len(), 2);
        assert_eq!(report.matched[0].dwell, "00:59:59");
        assert_eq!(report.matched[0].dwell_raw, "1:10:00");
        assert_eq!(report.hours_summary.len(), 1);
        assert_eq!(report.hours_summary[0].days_worked, 2);
        assert_eq!(report.totals.rows_read, 2);
        assert_eq!(report.totals.matched_visits, 2);
    }

    #[test]
    fn test_out_of_window_rows_are_dropped() {
        let schedule = table(&["Vendedores", "Cliente", "Linea 1"], &[&["A", "C", "Lunes 1"]]);
        let visits = visits_table(&[
            &["SI", "08/01/2024 09:00:00", "08/01/2024 10:00:00", "0:10:00", "C.A", ""],
            &["SI", "", "", "0:10:00", "C.A", ""],
        ]);
        let window = ValidationOrchestrator::parse_window("01/01/2024", "07/01/2024", 1).unwrap();

        let report = ValidationOrchestrator::default()
            .run(&schedule, &visits, &window)
            .unwrap();
        assert_eq!(report.totals.rows_read, 2);
        assert_eq!(report.totals.rows_in_window, 0);
        assert!(report.matched.is_empty());
        assert!(report.hours_summary.is_empty());
    }

    #[test]
    fn test_missing_visit_columns_fails_whole_request() {
        let schedule = table(&["Vendedores", "Cliente", "Linea 1"], &[&["A", "C", "Lunes 1"]]);
        let visits = table(&["Es Valido", "Fecha Checkin"], &[&["SI", "01/01/2024 09:00:00"]]);
        let window = ValidationOrchestrator::parse_window("01/01/2024", "07/01/2024", 1).unwrap();

        let result = ValidationOrchestrator::default().run(&schedule, &visits, &window);
        assert!(matches!(result, Err(EngineError::Import(_))));
    }
}
