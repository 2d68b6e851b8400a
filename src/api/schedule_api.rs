// ==========================================
// 巡店路线校验系统 - 排班管理 API
// ==========================================
// 职责: 排班表上传（整表替换）与单条维护
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ValidationConfigReader};
use crate::domain::schedule::{PlannedVisit, DEFAULT_BLOCK, NO_LINE};
use crate::domain::types::{DayName, WeekParity};
use crate::importer::{RawTable, ScheduleParser, UniversalFileParser};
use crate::repository::{ScheduleFilter, ScheduleRepository};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// 上传结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleUploadResponse {
    /// 写入的计划拜访条数
    pub records: usize,
    /// 去重后的查找键数量
    pub keys: usize,
    /// 读入的排班行数
    pub source_rows: usize,
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleListResponse {
    pub items: Vec<PlannedVisit>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// 单条新增/修改请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedVisitInput {
    pub agent_id: String,
    pub client_id: String,
    pub day_name: String,
    pub week_parity: i64,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub origin_line: Option<String>,
    #[serde(default)]
    pub raw_text: Option<String>,
}

impl PlannedVisitInput {
    /// 校验并转换为领域对象
    fn into_visit(self) -> ApiResult<PlannedVisit> {
        let agent_id = self.agent_id.trim().to_string();
        let client_id = self.client_id.trim().to_string();
        if agent_id.is_empty() || client_id.is_empty() {
            return Err(ApiError::InvalidInput("业务员与客户不能为空".to_string()));
        }

        let day = DayName::from_text(&self.day_name)
            .ok_or_else(|| ApiError::InvalidInput(format!("无效的星期名称: {}", self.day_name)))?;
        let week = WeekParity::from_number(self.week_parity).ok_or_else(|| {
            ApiError::InvalidInput(format!("周次只能是 1 或 2，实际 {}", self.week_parity))
        })?;

        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let raw_text = non_empty(self.raw_text).unwrap_or_else(|| format!("{} {}", day, week));

        Ok(PlannedVisit::new(
            agent_id,
            client_id,
            day,
            week,
            non_empty(self.block).unwrap_or_else(|| DEFAULT_BLOCK.to_string()),
            non_empty(self.origin_line).unwrap_or_else(|| NO_LINE.to_string()),
            raw_text,
        ))
    }
}

// ==========================================
// ScheduleApi - 排班管理 API
// ==========================================
pub struct ScheduleApi {
    schedule_repo: Arc<ScheduleRepository>,
    config_manager: Arc<ConfigManager>,
}

impl ScheduleApi {
    pub fn new(schedule_repo: Arc<ScheduleRepository>, config_manager: Arc<ConfigManager>) -> Self {
        Self {
            schedule_repo,
            config_manager,
        }
    }

    /// 从文件上传排班表
    pub async fn upload_schedule_file(&self, file_path: &str) -> ApiResult<ScheduleUploadResponse> {
        if !Path::new(file_path).exists() {
            return Err(ApiError::NotFound(format!("文件不存在: {}", file_path)));
        }
        let table = UniversalFileParser.parse(file_path)?;
        self.upload_table(&table).await
    }

    /// 从上传字节流导入排班表（按文件名判断格式）
    pub async fn upload_schedule_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> ApiResult<ScheduleUploadResponse> {
        let table = UniversalFileParser.parse_bytes(file_name, bytes)?;
        self.upload_table(&table).await
    }

    /// 解析并整表替换
    ///
    /// # 返回
    /// - Err(InvalidInput): 解析结果为 0 条（原排班保持不变）
    pub async fn upload_table(&self, table: &RawTable) -> ApiResult<ScheduleUploadResponse> {
        let policy = self.config_manager.get_duplicate_key_policy().await?;
        let schedule = ScheduleParser::new().parse(table, policy)?;

        if schedule.is_empty() {
            warn!(rows = table.len(), "排班表未产生任何计划拜访");
            return Err(ApiError::InvalidInput(
                "排班表未解析出任何计划拜访，请检查 Linea 列内容".to_string(),
            ));
        }

        let records = self.schedule_repo.replace_all(&schedule)?;
        info!(records, keys = schedule.key_count(), "排班表已替换");

        Ok(ScheduleUploadResponse {
            records,
            keys: schedule.key_count(),
            source_rows: table.len(),
        })
    }

    /// 条件分页查询
    pub fn list_schedule(
        &self,
        filter: &ScheduleFilter,
        limit: i64,
        offset: i64,
    ) -> ApiResult<ScheduleListResponse> {
        if limit <= 0 || offset < 0 {
            return Err(ApiError::InvalidInput(format!(
                "分页参数无效: limit={}, offset={}",
                limit, offset
            )));
        }
        let (items, total) = self.schedule_repo.list(filter, limit, offset)?;
        Ok(ScheduleListResponse {
            items,
            total,
            limit,
            offset,
        })
    }

    pub fn get_planned_visit(&self, id: i64) -> ApiResult<PlannedVisit> {
        self.schedule_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("计划拜访(id={})不存在", id)))
    }

    pub fn create_planned_visit(&self, input: PlannedVisitInput) -> ApiResult<PlannedVisit> {
        let visit = input.into_visit()?;
        let stored = self.schedule_repo.create(&visit)?;
        info!(id = ?stored.id, key = %stored.key, "新增计划拜访");
        Ok(stored)
    }

    pub fn update_planned_visit(&self, id: i64, input: PlannedVisitInput) -> ApiResult<PlannedVisit> {
        let visit = input.into_visit()?;
        self.schedule_repo
            .update(id, &visit)?
            .ok_or_else(|| ApiError::NotFound(format!("计划拜访(id={})不存在", id)))
    }

    pub fn delete_planned_visit(&self, id: i64) -> ApiResult<()> {
        if self.schedule_repo.delete(id)? {
            info!(id, "删除计划拜访");
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("计划拜访(id={})不存在", id)))
        }
    }
}
