// ==========================================
// 巡店路线校验系统 - 路线校验 API
// ==========================================
// 职责: 执行校验、保存批次、查询历史与补贴标准
// 流程: 读取配置 → 编排器执行 → （可选）补贴折算并落库
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ValidationConfigReader};
use crate::domain::report::{
    AgentDwellSummary, BatchDetails, BatchHeader, BatchHours, HoursSummaryWithAllowance,
    PerDiemRate, StoredVisit, ValidationReport,
};
use crate::domain::schedule::PlannedSchedule;
use crate::engine::{summarize_original_dwell, PerDiemEvaluator, ValidationOrchestrator};
use crate::importer::{RawTable, UniversalFileParser};
use crate::repository::{
    NewBatch, PerDiemRateRepository, ScheduleRepository, ValidationBatchRepository, VisitQuery,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// 近期拜访默认条数
pub const DEFAULT_RECENT_LIMIT: i64 = 100;

/// 校验请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub date_from: String, // DD/MM/YYYY
    pub date_to: String,   // DD/MM/YYYY
    pub start_week: i64,   // 1 或 2
}

/// 保存批次的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveBatchResponse {
    pub batch_id: String,
    pub matched_visits: usize,
    pub agents: usize,
}

// ==========================================
// ValidationApi - 路线校验 API
// ==========================================
pub struct ValidationApi {
    schedule_repo: Arc<ScheduleRepository>,
    batch_repo: Arc<ValidationBatchRepository>,
    rate_repo: Arc<PerDiemRateRepository>,
    config_manager: Arc<ConfigManager>,
}

impl ValidationApi {
    pub fn new(
        schedule_repo: Arc<ScheduleRepository>,
        batch_repo: Arc<ValidationBatchRepository>,
        rate_repo: Arc<PerDiemRateRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            schedule_repo,
            batch_repo,
            rate_repo,
            config_manager,
        }
    }

    async fn orchestrator(&self) -> ApiResult<ValidationOrchestrator> {
        let config = self.config_manager.load_validation_config().await?;
        Ok(ValidationOrchestrator::new(config))
    }

    /// 执行校验
    ///
    /// # 参数
    /// - `schedule_table`: 显式提供的排班表；None 时使用已存储的排班
    /// - `visits_table`: 拜访记录表
    ///
    /// # 返回
    /// - Err(InvalidInput): 窗口参数错误，或未提供排班且存储排班为空
    #[instrument(skip(self, schedule_table, visits_table), fields(from = %request.date_from, to = %request.date_to))]
    pub async fn validate(
        &self,
        schedule_table: Option<&RawTable>,
        visits_table: &RawTable,
        request: &ValidationRequest,
    ) -> ApiResult<ValidationReport> {
        let window = ValidationOrchestrator::parse_window(
            &request.date_from,
            &request.date_to,
            request.start_week,
        )?;
        let orchestrator = self.orchestrator().await?;

        let schedule: PlannedSchedule = match schedule_table {
            Some(table) => orchestrator.parse_schedule(table)?,
            None => {
                let stored = self.schedule_repo.load_schedule()?;
                if stored.is_empty() {
                    return Err(ApiError::InvalidInput(
                        "尚未上传排班表，请先上传或随请求提供排班表".to_string(),
                    ));
                }
                stored
            }
        };

        Ok(orchestrator.run_with_schedule(&schedule, visits_table, &window)?)
    }

    /// 从文件执行校验
    pub async fn validate_files(
        &self,
        schedule_path: Option<&str>,
        visits_path: &str,
        request: &ValidationRequest,
    ) -> ApiResult<ValidationReport> {
        let parser = UniversalFileParser;
        let schedule_table = schedule_path.map(|p| parser.parse(p)).transpose()?;
        let visits_table = parser.parse(visits_path)?;
        self.validate(schedule_table.as_ref(), &visits_table, request).await
    }

    /// 折算补贴金额
    pub fn resolve_allowances(&self, report: &ValidationReport) -> ApiResult<Vec<HoursSummaryWithAllowance>> {
        let rates = self.rate_repo.rates_map()?;
        Ok(report
            .hours_summary
            .iter()
            .map(|summary| {
                let (zone, per_diem_amount) = PerDiemEvaluator::resolve_amount(summary, &rates);
                HoursSummaryWithAllowance {
                    summary: summary.clone(),
                    zone,
                    per_diem_amount,
                }
            })
            .collect())
    }

    /// 保存校验结果为批次
    pub fn save_batch(&self, report: &ValidationReport) -> ApiResult<SaveBatchResponse> {
        let hours_summary = self.resolve_allowances(report)?;
        let dwell_totals = summarize_original_dwell(&report.matched);

        let batch_id = self.batch_repo.save_batch(&NewBatch {
            window: &report.window,
            matched: &report.matched,
            dwell_totals: &dwell_totals,
            hours_summary: &hours_summary,
            hours_detail: &report.hours_detail,
        })?;

        info!(batch_id = %batch_id, "校验结果已保存");
        Ok(SaveBatchResponse {
            batch_id,
            matched_visits: report.matched.len(),
            agents: hours_summary.len(),
        })
    }

    /// 批次历史（新在前）
    pub fn history(&self) -> ApiResult<Vec<BatchHeader>> {
        Ok(self.batch_repo.history()?)
    }

    pub fn batch_details(&self, batch_id: &str) -> ApiResult<BatchDetails> {
        self.batch_repo
            .batch_details(batch_id)?
            .ok_or_else(|| ApiError::NotFound(format!("校验批次(id={})不存在", batch_id)))
    }

    pub fn batch_hours(&self, batch_id: &str) -> ApiResult<BatchHours> {
        self.batch_repo
            .batch_hours(batch_id)?
            .ok_or_else(|| ApiError::NotFound(format!("校验批次(id={})不存在", batch_id)))
    }

    /// 近期匹配拜访
    pub fn recent_visits(&self, query: &VisitQuery, limit: Option<i64>) -> ApiResult<Vec<StoredVisit>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        if limit <= 0 {
            return Err(ApiError::InvalidInput(format!("limit 必须为正数: {}", limit)));
        }
        Ok(self.batch_repo.recent_visits(query, limit)?)
    }

    pub fn dwell_summary(
        &self,
        agent: Option<&str>,
        batch_id: Option<&str>,
    ) -> ApiResult<Vec<AgentDwellSummary>> {
        Ok(self.batch_repo.dwell_summary(agent, batch_id)?)
    }

    // ===== 补贴标准 =====

    pub fn list_per_diem_rates(&self) -> ApiResult<Vec<PerDiemRate>> {
        Ok(self.rate_repo.list()?)
    }

    pub fn update_per_diem_rate(&self, zone: &str, amount: f64) -> ApiResult<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ApiError::InvalidInput(format!("补贴金额无效: {}", amount)));
        }
        if self.rate_repo.update(zone, amount)? {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("补贴区域不存在: {}", zone)))
        }
    }
}
