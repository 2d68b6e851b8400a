// ==========================================
// 巡店路线校验系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::importer::error::ImportError;
use chrono::NaiveDate;
use thiserror::Error;

/// 校验流程错误（整次请求失败，不产出部分结果）
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 窗口参数错误 =====
    #[error("日期格式无效: {0}（应为 DD/MM/YYYY）")]
    InvalidDate(String),

    #[error("结束日期 {end} 早于开始日期 {start}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("起始周次只能是 1 或 2，实际 {0}")]
    InvalidStartWeek(i64),

    // ===== 下层错误 =====
    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
