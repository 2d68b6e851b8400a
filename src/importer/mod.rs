// ==========================================
// 巡店路线校验系统 - 导入层
// ==========================================
// 职责: 读取排班表与拜访记录表，生成领域记录
// 支持: Excel, CSV（路径或内存字节）
// ==========================================

pub mod data_cleaner;
pub mod error;
pub mod file_parser;
pub mod schedule_parser;
pub mod visit_parser;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRow, RawTable, UniversalFileParser};
pub use schedule_parser::ScheduleParser;
pub use visit_parser::VisitParser;
