// ==========================================
// 巡店路线校验系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 排班与实际拜访核对、工时与差旅补贴统计
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 校验规则
pub mod engine;

// 导入层 - 表格读取
pub mod importer;

// 配置层 - 校验参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    DayName, DuplicateKeyPolicy, PerDiemZone, ValidityPolicy, VisitStatus, WeekParity,
};

// 领域实体
pub use domain::{
    ActualVisit, DailyHoursRecord, MatchedVisit, PlannedSchedule, PlannedVisit, ValidationReport,
    ValidationWindow, VendorHoursSummary,
};

// 引擎
pub use engine::{
    CycleResolver, DurationCapper, HoursAggregator, PerDiemEvaluator, ValidationOrchestrator,
    VisitMatcher,
};

// 导入
pub use importer::{ScheduleParser, UniversalFileParser, VisitParser};

// API
pub use api::{ScheduleApi, ValidationApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "巡店路线校验系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
