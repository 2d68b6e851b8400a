// ==========================================
// 巡店路线校验系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 所有查询使用参数化
// ==========================================

pub mod batch_repo;
pub mod error;
pub mod per_diem_repo;
pub mod row_mapping;
pub mod schedule_repo;

// 重导出核心仓储
pub use batch_repo::{NewBatch, ValidationBatchRepository, VisitQuery};
pub use error::{RepositoryError, RepositoryResult};
pub use per_diem_repo::PerDiemRateRepository;
pub use schedule_repo::{ScheduleFilter, ScheduleRepository};
