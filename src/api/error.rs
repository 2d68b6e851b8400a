// ==========================================
// 巡店路线校验系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，将下层技术错误转换为用户可读的错误消息
// ==========================================

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 文件错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("报表导出失败: {0}")]
    ExportError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
// 缺列、重复主键属于用户输入问题；文件读取失败归为导入失败
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MissingColumns { .. }
            | ImportError::MissingAnyColumn { .. }
            | ImportError::DuplicateScheduleKey { .. }
            | ImportError::UnsupportedFormat(_) => ApiError::InvalidInput(err.to_string()),
            ImportError::FileNotFound(_) => ApiError::NotFound(err.to_string()),
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Import(inner) => inner.into(),
            other => ApiError::InvalidInput(other.to_string()),
        }
    }
}

// ==========================================
// 从 ConfigError 转换
// ==========================================
impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidValue { .. } => ApiError::InvalidInput(err.to_string()),
            other => ApiError::ConfigError(other.to_string()),
        }
    }
}

impl From<csv::Error> for ApiError {
    fn from(err: csv::Error) -> Self {
        ApiError::ExportError(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::ExportError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "PlannedVisit".to_string(),
            id: "42".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("PlannedVisit"));
                assert!(msg.contains("42"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseConnectionError(_)));
    }

    #[test]
    fn test_import_error_conversion() {
        let api_err: ApiError = ImportError::MissingColumns {
            table: "排班表".to_string(),
            columns: vec!["Cliente".to_string()],
        }
        .into();
        match api_err {
            ApiError::InvalidInput(msg) => assert!(msg.contains("Cliente")),
            _ => panic!("Expected InvalidInput"),
        }

        let api_err: ApiError = ImportError::ExcelParseError("bad zip".to_string()).into();
        assert!(matches!(api_err, ApiError::ImportError(_)));
    }

    #[test]
    fn test_engine_error_conversion() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let api_err: ApiError = EngineError::InvalidWindow { start, end }.into();
        assert!(matches!(api_err, ApiError::InvalidInput(_)));

        let api_err: ApiError =
            EngineError::Import(ImportError::FileNotFound("x.csv".to_string())).into();
        assert!(matches!(api_err, ApiError::NotFound(_)));
    }
}
