// ==========================================
// 巡店路线校验系统 - 引擎层
// ==========================================
// 职责: 周期判定、拜访匹配、时长封顶、工时汇总、补贴判定
// 红线: Engine 不拼 SQL，不读系统时钟
// ==========================================

pub mod cycle;
pub mod duration;
pub mod error;
pub mod hours;
pub mod matcher;
pub mod orchestrator;
pub mod per_diem;

// 重导出核心引擎
pub use cycle::CycleResolver;
pub use duration::{parse_elapsed, summarize_original_dwell, DurationCapper};
pub use error::{EngineError, EngineResult};
pub use hours::{HoursAggregator, HoursOutcome};
pub use matcher::VisitMatcher;
pub use orchestrator::ValidationOrchestrator;
pub use per_diem::{PerDiemEvaluator, PerDiemThresholds};
