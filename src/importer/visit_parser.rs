// ==========================================
// 巡店路线校验系统 - 拜访记录解析器
// ==========================================
// 职责: 将打卡表逐行转为 ActualVisit，解析业务员/客户身份与时间
// 红线: 单行缺陷只影响该行，不中断整表
// ==========================================

use crate::domain::visit::ActualVisit;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawRow, RawTable};
use tracing::{debug, info};

pub const COL_VALID: &str = "Es Valido";
pub const COL_CHECKIN: &str = "Fecha Checkin";
pub const COL_CHECKOUT: &str = "Fecha Checkout";
pub const COL_DWELL: &str = "Tiempo en PDV";
pub const COL_CODE: &str = "Codigo";
pub const COL_AGENT: &str = "Vendedor";

/// 解析出的身份
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisitIdentity {
    pub client_id: Option<String>,
    pub agent_id: Option<String>,
}

pub struct VisitParser {
    cleaner: DataCleaner,
}

impl Default for VisitParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VisitParser {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 校验拜访表结构
    pub fn check_columns(&self, table: &RawTable) -> ImportResult<()> {
        let missing = table.missing_columns(&[COL_VALID, COL_CHECKIN, COL_CHECKOUT, COL_DWELL]);
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns {
                table: "拜访记录表".to_string(),
                columns: missing,
            });
        }

        if !table.has_column(COL_CODE) && !table.has_column(COL_AGENT) {
            return Err(ImportError::MissingAnyColumn {
                table: "拜访记录表".to_string(),
                columns: vec![COL_CODE.to_string(), COL_AGENT.to_string()],
            });
        }

        Ok(())
    }

    /// 解析身份
    ///
    /// 优先级: `Vendedor` 列 > `Codigo` ("客户.业务员") 的第二段；
    /// 客户取 `Codigo` 第一段，解析失败不影响后续处理
    pub fn extract_identity(&self, row: &RawRow) -> VisitIdentity {
        let mut agent_id = self
            .cleaner
            .normalize_null(row.get(COL_AGENT).map(String::as_str))
            .map(|v| self.cleaner.clean_identifier(&v))
            .filter(|v| !v.is_empty());

        let mut client_id = None;
        if let Some(code) = self.cleaner.normalize_null(row.get(COL_CODE).map(String::as_str)) {
            let mut parts = code.split('.');
            client_id = parts
                .next()
                .map(|c| self.cleaner.clean_identifier(c))
                .filter(|c| !c.is_empty());

            if agent_id.is_none() {
                agent_id = parts
                    .next()
                    .map(|a| self.cleaner.clean_identifier(a))
                    .filter(|a| !a.is_empty());
            }
        }

        VisitIdentity {
            client_id,
            agent_id,
        }
    }

    /// 解析整张拜访表
    ///
    /// # 返回
    /// 每个数据行一条 ActualVisit（dwell_seconds 由时长封顶步骤填充）
    pub fn parse(&self, table: &RawTable) -> ImportResult<Vec<ActualVisit>> {
        self.check_columns(table)?;

        let visits: Vec<ActualVisit> = table
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| self.parse_row(idx + 1, row))
            .collect();

        info!(rows = visits.len(), "拜访记录解析完成");
        Ok(visits)
    }

    fn parse_row(&self, row_number: usize, row: &RawRow) -> ActualVisit {
        let identity = self.extract_identity(row);
        if identity.agent_id.is_none() {
            debug!(row = row_number, "无法解析业务员");
        }

        let checkin_at = row
            .get(COL_CHECKIN)
            .and_then(|v| self.cleaner.parse_datetime(v));
        let checkout_at = row
            .get(COL_CHECKOUT)
            .and_then(|v| self.cleaner.parse_datetime(v));

        ActualVisit {
            row_number,
            agent_id: identity.agent_id,
            client_id: identity.client_id,
            checkin_at,
            checkout_at,
            dwell_raw: row.get(COL_DWELL).cloned().unwrap_or_default(),
            dwell_seconds: None,
            is_valid: self.cleaner.is_valid_flag(row.get(COL_VALID).map(String::as_str)),
        }
    }
}
