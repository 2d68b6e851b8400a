// ==========================================
// 巡店路线校验系统 - 排班表解析器
// ==========================================
// 职责: 将排班模板展开为逐条 PlannedVisit，并建立查找表
// 输入: Vendedores / Cliente / Bloque(可选) / Linea 1..3
// ==========================================

use crate::domain::schedule::{PlannedSchedule, PlannedVisit, DEFAULT_BLOCK};
use crate::domain::types::{DayName, DuplicateKeyPolicy, WeekParity};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawTable;
use tracing::{debug, info};

pub const COL_AGENTS: &str = "Vendedores";
pub const COL_CLIENT: &str = "Cliente";
pub const COL_BLOCK: &str = "Bloque";

/// 每行最多读取的业务员数（对应 Linea 1..3）
pub const MAX_AGENTS_PER_ROW: usize = 3;

// ==========================================
// 排班条目分词
// ==========================================

/// 单个排班条目的分词结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleToken {
    /// 合法条目
    Matched {
        day: DayName,
        week: WeekParity,
        raw: String,
    },
    /// 跳过（附原因）
    Skip(String),
}

/// 分词: `<字母串><空白><数字串>`，其后内容忽略
///
/// 星期名未知或周次不在 {1,2} 时返回 Skip
pub fn tokenize_entry(entry: &str) -> ScheduleToken {
    let raw = entry.trim();
    let mut chars = raw.char_indices().peekable();

    // 1. 字母串
    let mut word_end = 0;
    while let Some(&(idx, c)) = chars.peek() {
        if c.is_alphabetic() {
            word_end = idx + c.len_utf8();
            chars.next();
        } else {
            break;
        }
    }
    if word_end == 0 {
        return ScheduleToken::Skip(format!("条目不以星期名开头: {:?}", raw));
    }
    let word = &raw[..word_end];

    // 2. 至少一个空白
    let mut saw_space = false;
    while let Some(&(_, c)) = chars.peek() {
        if c.is_whitespace() {
            saw_space = true;
            chars.next();
        } else {
            break;
        }
    }
    if !saw_space {
        return ScheduleToken::Skip(format!("星期名后缺少空白: {:?}", raw));
    }

    // 3. 数字串
    let mut digits = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if digits.is_empty() {
        return ScheduleToken::Skip(format!("缺少周次数字: {:?}", raw));
    }

    let day = match DayName::from_text(word) {
        Some(day) => day,
        None => return ScheduleToken::Skip(format!("未知星期名: {}", word)),
    };

    let week = match digits.parse::<i64>().ok().and_then(WeekParity::from_number) {
        Some(week) => week,
        None => return ScheduleToken::Skip(format!("周次超出范围: {}", digits)),
    };

    ScheduleToken::Matched {
        day,
        week,
        raw: raw.to_string(),
    }
}

// ==========================================
// ScheduleParser
// ==========================================
pub struct ScheduleParser {
    cleaner: DataCleaner,
}

impl Default for ScheduleParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleParser {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 解析排班表
    ///
    /// # 参数
    /// - `table`: 原始表格
    /// - `duplicate_policy`: 主键重复时的处理方式
    ///
    /// # 返回
    /// - `Ok(PlannedSchedule)`: 查找表 + 输入顺序的全部记录（可为空）
    /// - `Err(MissingColumns)`: 缺少 Vendedores / Cliente
    /// - `Err(DuplicateScheduleKey)`: REJECT 策略下出现重复主键
    pub fn parse(
        &self,
        table: &RawTable,
        duplicate_policy: DuplicateKeyPolicy,
    ) -> ImportResult<PlannedSchedule> {
        let missing = table.missing_columns(&[COL_AGENTS, COL_CLIENT]);
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns {
                table: "排班表".to_string(),
                columns: missing,
            });
        }

        let mut schedule = PlannedSchedule::new();

        for (idx, row) in table.rows.iter().enumerate() {
            let row_number = idx + 1;

            let agents_raw = match self.cleaner.normalize_null(row.get(COL_AGENTS).map(String::as_str)) {
                Some(v) => v,
                None => {
                    debug!(row = row_number, "排班行缺少业务员，跳过");
                    continue;
                }
            };

            let client_id = self
                .cleaner
                .clean_identifier(row.get(COL_CLIENT).map(String::as_str).unwrap_or(""));
            let block = self
                .cleaner
                .normalize_null(row.get(COL_BLOCK).map(String::as_str))
                .unwrap_or_else(|| DEFAULT_BLOCK.to_string());

            let agents: Vec<&str> = agents_raw
                .split('-')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .collect();
            if agents.len() > MAX_AGENTS_PER_ROW {
                debug!(
                    row = row_number,
                    agents = agents.len(),
                    "业务员超过 {} 个，多余部分忽略",
                    MAX_AGENTS_PER_ROW
                );
            }

            for (position, agent_raw) in agents.iter().take(MAX_AGENTS_PER_ROW).enumerate() {
                let line_column = format!("Linea {}", position + 1);
                let content = match self
                    .cleaner
                    .normalize_null(row.get(&line_column).map(String::as_str))
                {
                    Some(c) => c,
                    None => continue,
                };

                let agent_id = self.cleaner.clean_identifier(agent_raw);

                for entry in content.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                    match tokenize_entry(entry) {
                        ScheduleToken::Matched { day, week, raw } => {
                            let visit = PlannedVisit::new(
                                agent_id.clone(),
                                client_id.clone(),
                                day,
                                week,
                                block.clone(),
                                line_column.clone(),
                                raw,
                            );

                            if schedule.contains_key(&visit.key) {
                                if duplicate_policy == DuplicateKeyPolicy::Reject {
                                    return Err(ImportError::DuplicateScheduleKey {
                                        row: row_number,
                                        key: visit.key,
                                    });
                                }
                                debug!(row = row_number, key = %visit.key, "排班主键重复，后写覆盖");
                            }

                            schedule.insert(visit);
                        }
                        ScheduleToken::Skip(reason) => {
                            debug!(row = row_number, column = %line_column, reason = %reason, "排班条目跳过");
                        }
                    }
                }
            }
        }

        info!(
            records = schedule.records().len(),
            keys = schedule.key_count(),
            "排班表解析完成"
        );

        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|r| {
                headers
                    .iter()
                    .cloned()
                    .zip(r.iter().map(|v| v.to_string()))
                    .collect::<HashMap<_, _>>()
            })
            .collect();
        RawTable::new(headers, rows)
    }

    #[test]
    fn test_tokenize_entry_variants() {
        assert_eq!(
            tokenize_entry("Lunes 1"),
            ScheduleToken::Matched {
                day: DayName::Lunes,
                week: WeekParity::First,
                raw: "Lunes 1".to_string()
            }
        );
        assert!(matches!(
            tokenize_entry("Miércoles  2"),
            ScheduleToken::Matched { day: DayName::Miercoles, week: WeekParity::Second, .. }
        ));
        assert!(matches!(tokenize_entry("Lunes1"), ScheduleToken::Skip(_)));
        assert!(matches!(tokenize_entry("1 Lunes"), ScheduleToken::Skip(_)));
        assert!(matches!(tokenize_entry("Lunes 3"), ScheduleToken::Skip(_)));
        assert!(matches!(tokenize_entry("Feriado 1"), ScheduleToken::Skip(_)));
        assert!(matches!(tokenize_entry("Lunes x"), ScheduleToken::Skip(_)));
    }

    #[test]
    fn test_parse_single_row_key() {
        let t = table(&["Vendedores", "Cliente", "Linea 1"], &[&["A", "C", "Lunes 1"]]);
        let schedule = ScheduleParser::new().parse(&t, DuplicateKeyPolicy::LastWriteWins).unwrap();

        let visit = schedule.get("C_A_Lunes_1").unwrap();
        assert_eq!(visit.block, "Sin Bloque");
        assert_eq!(visit.origin_line, "Linea 1");
        assert_eq!(visit.raw_text, "Lunes 1");
    }

    #[test]
    fn test_parse_agents_read_their_own_line() {
        let t = table(
            &["Vendedores", "Cliente", "Bloque", "Linea 1", "Linea 2", "Linea 3"],
            &[&[
                "101.0 - 102 - 103 - 104",
                "555.0",
                "Norte",
                "Lunes 1, Jueves 2",
                "Martes 2",
                "nan",
            ]],
        );
        let schedule = ScheduleParser::new().parse(&t, DuplicateKeyPolicy::LastWriteWins).unwrap();

        let keys: Vec<&str> = schedule.records().iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, vec!["555_101_Lunes_1", "555_101_Jueves_2", "555_102_Martes_2"]);
        assert!(schedule.records().iter().all(|v| v.block == "Norte"));
    }

    #[test]
    fn test_parse_skips_blank_agents_and_bad_entries() {
        let t = table(
            &["Vendedores", "Cliente", "Linea 1"],
            &[
                &["nan", "C1", "Lunes 1"],
                &["", "C2", "Lunes 1"],
                &["A", "C3", "Lunes 5, basura, Sabado 2"],
            ],
        );
        let schedule = ScheduleParser::new().parse(&t, DuplicateKeyPolicy::LastWriteWins).unwrap();

        assert_eq!(schedule.records().len(), 1);
        assert!(schedule.contains_key("C3_A_Sabado_2"));
    }

    #[test]
    fn test_parse_missing_columns() {
        let t = table(&["Vendedor", "Linea 1"], &[&["A", "Lunes 1"]]);
        let err = ScheduleParser::new()
            .parse(&t, DuplicateKeyPolicy::LastWriteWins)
            .unwrap_err();

        match err {
            ImportError::MissingColumns { columns, .. } => {
                assert_eq!(columns, vec!["Vendedores", "Cliente"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_duplicate_key_policies() {
        let t = table(
            &["Vendedores", "Cliente", "Linea 1"],
            &[&["A", "C", "Lunes 1"], &["A", "C", "lunes 1"]],
        );

        let schedule = ScheduleParser::new().parse(&t, DuplicateKeyPolicy::LastWriteWins).unwrap();
        assert_eq!(schedule.records().len(), 2);
        assert_eq!(schedule.get("C_A_Lunes_1").unwrap().raw_text, "lunes 1");

        let err = ScheduleParser::new().parse(&t, DuplicateKeyPolicy::Reject).unwrap_err();
        assert!(matches!(err, ImportError::DuplicateScheduleKey { row: 2, .. }));
    }

    #[test]
    fn test_parse_empty_table_is_ok() {
        let t = table(&["Vendedores", "Cliente"], &[]);
        let schedule = ScheduleParser::new().parse(&t, DuplicateKeyPolicy::LastWriteWins).unwrap();
        assert!(schedule.is_empty());
    }
}
