// ==========================================
// 巡店路线校验系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供命令行与上层应用调用
// ==========================================

pub mod error;
pub mod report_export;
pub mod schedule_api;
pub mod validation_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use report_export::{export_report, ExportedReport};
pub use schedule_api::{PlannedVisitInput, ScheduleApi, ScheduleListResponse, ScheduleUploadResponse};
pub use validation_api::{SaveBatchResponse, ValidationApi, ValidationRequest};
