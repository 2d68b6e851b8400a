// ==========================================
// 巡店路线校验系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 标识符清洗 / 日期时间解析
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};

/// 表格导出工具常见的空值占位
const NULL_MARKERS: [&str; 4] = ["nan", "none", "nat", "null"];

/// 日期时间格式（日在前优先）
const DATETIME_FORMATS: [&str; 12] = [
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %I:%M:%S %p",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// 纯日期格式（时间取 00:00:00）
const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

pub struct DataCleaner;

impl DataCleaner {
    /// TRIM，可选转大写
    pub fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    /// 空白与 "nan" 一类占位统一视为 None
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() || NULL_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 清洗标识符: 去空白，去掉小数后缀（"23453.0" → "23453"）
    ///
    /// 空值返回空串
    pub fn clean_identifier(&self, value: &str) -> String {
        match self.normalize_null(Some(value)) {
            Some(v) => match v.split_once('.') {
                Some((head, _)) => head.trim().to_string(),
                None => v,
            },
            None => String::new(),
        }
    }

    /// "Es Valido" 标志: TRIM + UPPER 后等于 "SI"
    pub fn is_valid_flag(&self, value: Option<&str>) -> bool {
        value
            .map(|v| self.clean_text(v, true) == "SI")
            .unwrap_or(false)
    }

    /// 日在前的日期时间解析，无法解析返回 None
    pub fn parse_datetime(&self, value: &str) -> Option<NaiveDateTime> {
        let text = self.normalize_null(Some(value))?;

        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(&text, format) {
                return Some(dt);
            }
        }

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
                return date.and_hms_opt(0, 0, 0);
            }
        }

        None
    }

    /// 严格解析 `DD/MM/YYYY`
    pub fn parse_window_date(&self, value: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), "%d/%m/%Y").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_basic() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_text("  hello  ", false), "hello");
        assert_eq!(cleaner.clean_text("  si  ", true), "SI");
    }

    #[test]
    fn test_normalize_null() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.normalize_null(Some("  ")), None);
        assert_eq!(cleaner.normalize_null(Some("nan")), None);
        assert_eq!(cleaner.normalize_null(Some("NaN")), None);
        assert_eq!(cleaner.normalize_null(Some("  value  ")), Some("value".to_string()));
        assert_eq!(cleaner.normalize_null(None), None);
    }

    #[test]
    fn test_clean_identifier() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_identifier("23453.0"), "23453");
        assert_eq!(cleaner.clean_identifier(" 23453 "), "23453");
        assert_eq!(cleaner.clean_identifier("nan"), "");
        assert_eq!(cleaner.clean_identifier("C100.A7"), "C100");
    }

    #[test]
    fn test_is_valid_flag() {
        let cleaner = DataCleaner;
        assert!(cleaner.is_valid_flag(Some(" si ")));
        assert!(cleaner.is_valid_flag(Some("SI")));
        assert!(!cleaner.is_valid_flag(Some("NO")));
        assert!(!cleaner.is_valid_flag(None));
    }

    #[test]
    fn test_parse_datetime_day_first() {
        let cleaner = DataCleaner;
        let dt = cleaner.parse_datetime("02/01/2024 08:30:00").unwrap();
        assert_eq!(dt.to_string(), "2024-01-02 08:30:00");

        let dt = cleaner.parse_datetime("02/01/2024 08:30").unwrap();
        assert_eq!(dt.to_string(), "2024-01-02 08:30:00");

        let dt = cleaner.parse_datetime("2024-01-02 17:05:09").unwrap();
        assert_eq!(dt.to_string(), "2024-01-02 17:05:09");

        let dt = cleaner.parse_datetime("02/01/2024").unwrap();
        assert_eq!(dt.to_string(), "2024-01-02 00:00:00");
    }

    #[test]
    fn test_parse_datetime_invalid() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_datetime("mañana"), None);
        assert_eq!(cleaner.parse_datetime(""), None);
        assert_eq!(cleaner.parse_datetime("NaT"), None);
    }

    #[test]
    fn test_parse_window_date() {
        let cleaner = DataCleaner;
        assert_eq!(
            cleaner.parse_window_date("01/01/2024"),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(cleaner.parse_window_date("2024-01-01"), None);
        assert_eq!(cleaner.parse_window_date("31/02/2024"), None);
    }
}
