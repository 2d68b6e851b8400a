// ==========================================
// 巡店路线校验系统 - 文件解析器实现
// ==========================================
// 职责: 将排班表 / 拜访记录文件读为统一的 RawTable
// 支持: Excel (.xlsx/.xls) / CSV (.csv)，文件路径或内存字节
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// 一行原始数据（列名 → 单元格文本）
pub type RawRow = HashMap<String, String>;

/// 原始表格：表头顺序 + 行数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { headers, rows }
    }

    /// 是否包含指定列
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// 返回缺失的列名（按传入顺序）
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser {
    /// 从文件路径解析
    fn parse_path(&self, file_path: &Path) -> ImportResult<RawTable>;

    /// 从内存字节解析（上传场景）
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawTable>;
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    fn parse_reader<R: Read>(&self, source: R) -> ImportResult<RawTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(source);

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row_map = HashMap::new();

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            rows.push(row_map);
        }

        Ok(RawTable::new(headers, rows))
    }
}

impl FileParser for CsvParser {
    fn parse_path(&self, file_path: &Path) -> ImportResult<RawTable> {
        // 检查文件存在
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        // 检查扩展名
        if let Some(ext) = file_path.extension() {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let file = std::fs::File::open(file_path)?;
        self.parse_reader(file)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawTable> {
        self.parse_reader(bytes)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    fn range_to_table(&self, range: Range<Data>) -> ImportResult<RawTable> {
        // 提取表头（第一行）
        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell_to_text(cell).trim().to_string())
            .collect();

        let mut records = Vec::new();
        for data_row in rows {
            let mut row_map = HashMap::new();

            for (col_idx, cell) in data_row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if header.is_empty() {
                        continue;
                    }
                    row_map.insert(header.clone(), cell_to_text(cell).trim().to_string());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            records.push(row_map);
        }

        Ok(RawTable::new(headers, records))
    }

    fn first_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>) -> ImportResult<Range<Data>> {
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        Ok(workbook.worksheet_range(&sheet_name)?)
    }
}

impl FileParser for ExcelParser {
    fn parse_path(&self, file_path: &Path) -> ImportResult<RawTable> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let range = Self::first_sheet(&mut workbook)?;
        self.range_to_table(range)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawTable> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = Self::first_sheet(&mut workbook)?;
        self.range_to_table(range)
    }
}

// ==========================================
// 单元格文本化
// ==========================================

/// Excel 序列日期基准（1900 日期系统）
fn excel_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// 将 Excel 单元格转为文本
///
/// 日期时间 → `YYYY-MM-DD HH:MM:SS`，时长 → `HH:MM:SS`，
/// 整数值的数字（如编码 23453）不带小数，其余保持原样
pub fn cell_to_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                format_serial_duration(dt.as_f64())
            } else {
                format_serial_datetime(dt.as_f64()).unwrap_or_else(|| dt.as_f64().to_string())
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

/// 序列日期 → `YYYY-MM-DD HH:MM:SS`；不足一天的纯时刻 → `HH:MM:SS`
pub fn format_serial_datetime(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    if serial < 1.0 {
        return Some(format_serial_duration(serial));
    }
    let total_seconds = (serial * 86_400.0).round() as i64;
    let base = excel_epoch()?.and_hms_opt(0, 0, 0)?;
    let value = base.checked_add_signed(Duration::seconds(total_seconds))?;
    Some(value.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// 序列时长（天的小数）→ `HH:MM:SS`
pub fn format_serial_duration(serial: f64) -> String {
    if !serial.is_finite() || serial < 0.0 {
        return String::new();
    }
    let total = (serial * 86_400.0).round() as i64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    fn extension_of(path: &Path) -> String {
        path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }

    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<RawTable> {
        let path = file_path.as_ref();
        match Self::extension_of(path).as_str() {
            "csv" => CsvParser.parse_path(path),
            "xlsx" | "xls" => ExcelParser.parse_path(path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }

    /// 解析上传内容（按原始文件名的扩展名分派）
    pub fn parse_bytes(&self, file_name: &str, bytes: &[u8]) -> ImportResult<RawTable> {
        match Self::extension_of(Path::new(file_name)).as_str() {
            "csv" => CsvParser.parse_bytes(bytes),
            "xlsx" | "xls" => ExcelParser.parse_bytes(bytes),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&[
            "Vendedores,Cliente,Linea 1",
            "23453,C100,\"Lunes 1, Jueves 2\"",
            "23454,C101,Martes 1",
        ]);

        let table = CsvParser.parse_path(temp_file.path()).unwrap();

        assert_eq!(table.headers, vec!["Vendedores", "Cliente", "Linea 1"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].get("Linea 1"), Some(&"Lunes 1, Jueves 2".to_string()));
        assert_eq!(table.rows[1].get("Cliente"), Some(&"C101".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_path(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = csv_file(&["Cliente,Vendedor", "C1,A1", ",", "C2,A2"]);

        let table = CsvParser.parse_path(temp_file.path()).unwrap();

        // 应跳过空行
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_csv_parse_bytes_strips_bom() {
        let bytes = "\u{feff}Cliente,Vendedor\nC1,A1\n".as_bytes();
        let table = UniversalFileParser.parse_bytes("upload.CSV", bytes).unwrap();
        assert!(table.has_column("Cliente"));
        assert_eq!(table.missing_columns(&["Cliente", "Codigo"]), vec!["Codigo"]);
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let result = UniversalFileParser.parse_bytes("notes.txt", b"a,b");
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(ext)) if ext == "txt"));
    }

    #[test]
    fn test_excel_parse_bytes_renders_cells() {
        let bytes = include_bytes!("../../tests/fixtures/visitas.xlsx");
        let table = ExcelParser.parse_bytes(bytes).unwrap();

        assert_eq!(
            table.headers,
            vec![
                "Es Valido",
                "Fecha Checkin",
                "Fecha Checkout",
                "Tiempo en PDV",
                "Codigo",
                "Vendedor"
            ]
        );
        // 空白行被跳过
        assert_eq!(table.len(), 3);

        let first = &table.rows[0];
        assert_eq!(first["Fecha Checkin"], "2024-01-01 09:00:00");
        assert_eq!(first["Fecha Checkout"], "2024-01-01 12:00:00");
        assert_eq!(first["Tiempo en PDV"], "00:45:00"); // [h]:mm:ss 时长格式
        assert_eq!(first["Codigo"], "23450.23453");
        assert_eq!(first["Vendedor"], "23453");

        // h:mm:ss 时刻格式的时长
        assert_eq!(table.rows[1]["Tiempo en PDV"], "01:12:00");
        assert_eq!(table.rows[1]["Fecha Checkin"], "2024-01-04 08:15:00");
    }

    #[test]
    fn test_excel_numeric_identifiers_have_no_decimals() {
        let bytes = include_bytes!("../../tests/fixtures/frecuencia.xlsx");
        let table = UniversalFileParser.parse_bytes("Frecuencia.XLSX", bytes).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0]["Vendedores"], "23453");
        assert_eq!(table.rows[0]["Cliente"], "23450");
        assert_eq!(table.rows[0]["Linea 1"], "Lunes 1, Jueves 1");
        assert_eq!(cell_to_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_to_text(&Data::Int(7)), "7");
    }

    #[test]
    fn test_format_serial_values() {
        // 45292 = 2024-01-01，0.375 天 = 09:00
        assert_eq!(
            format_serial_datetime(45292.375),
            Some("2024-01-01 09:00:00".to_string())
        );
        assert_eq!(format_serial_datetime(0.03125), Some("00:45:00".to_string()));
        assert_eq!(format_serial_duration(0.5), "12:00:00");
        assert_eq!(format_serial_duration(1.0 / 24.0 + 30.0 / 86_400.0), "01:00:30");
    }
}
