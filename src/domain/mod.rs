// ==========================================
// 巡店路线校验系统 - 领域模型层
// ==========================================
// 职责: 定义排班、拜访、工时、批次等领域实体
// 红线: 不含数据访问逻辑，不含引擎逻辑
// ==========================================

pub mod hours;
pub mod report;
pub mod schedule;
pub mod types;
pub mod visit;

// 重导出核心类型
pub use hours::{DailyHoursRecord, Hms, VendorHoursSummary};
pub use report::{
    AgentDwellSummary, AgentDwellTotal, BatchDetails, BatchHeader, BatchHours,
    HoursSummaryWithAllowance, PerDiemRate, StoredVisit, ValidationReport, ValidationTotals,
    ValidationWindow,
};
pub use schedule::{PlannedSchedule, PlannedVisit};
pub use types::{DayName, DuplicateKeyPolicy, PerDiemZone, ValidityPolicy, VisitStatus, WeekParity};
pub use visit::{ActualVisit, MatchedVisit};
