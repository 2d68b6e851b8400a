// ==========================================
// 巡店路线校验系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ScheduleApi, ValidationApi};
use crate::config::config_manager::ConfigManager;
use crate::repository::{
    PerDiemRateRepository, ScheduleRepository, ValidationBatchRepository,
};

/// 应用状态
///
/// 所有仓储共享同一个数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 排班管理API
    pub schedule_api: Arc<ScheduleApi>,

    /// 路线校验API
    pub validation_api: Arc<ValidationApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（":memory:" 可用于测试）
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开连接并幂等建表
    /// 2. 初始化所有Repository
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::ensure_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let schedule_repo = Arc::new(ScheduleRepository::from_connection(conn.clone()));
        let batch_repo = Arc::new(ValidationBatchRepository::from_connection(conn.clone()));
        let rate_repo = Arc::new(PerDiemRateRepository::from_connection(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化API层
        // ==========================================
        let schedule_api = Arc::new(ScheduleApi::new(schedule_repo.clone(), config_manager.clone()));
        let validation_api = Arc::new(ValidationApi::new(
            schedule_repo,
            batch_repo,
            rate_repo,
            config_manager.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            schedule_api,
            validation_api,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 ROUTE_VALIDATOR_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("ROUTE_VALIDATOR_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./route_validator.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("route-validator");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("route_validator.db");
        }
    }

    path.to_string_lossy().to_string()
}
