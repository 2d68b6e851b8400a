// ==========================================
// 巡店路线校验系统 - 排班领域模型
// ==========================================
// 职责: 计划拜访 (PlannedVisit) 与排班查找表 (PlannedSchedule)
// ==========================================

use crate::domain::types::{DayName, WeekParity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 默认区块
pub const DEFAULT_BLOCK: &str = "Sin Bloque";

/// 无排班的业务员线路
pub const NO_LINE: &str = "Sin Línea";

// ==========================================
// PlannedVisit - 计划拜访
// ==========================================
// 红线: key = 客户_业务员_星期_周次，星期已规范化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedVisit {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<i64>, // 持久化主键（未入库时为空）

    // ===== 查找键 =====
    pub key: String,
    pub agent_id: String,
    pub client_id: String,
    pub day_name: DayName,
    pub week_parity: WeekParity,

    // ===== 来源信息 =====
    pub block: String,       // 区块，默认 "Sin Bloque"
    pub origin_line: String, // "Linea N"
    pub raw_text: String,    // 原始条目，如 "Lunes 1"
}

impl PlannedVisit {
    pub fn new(
        agent_id: impl Into<String>,
        client_id: impl Into<String>,
        day_name: DayName,
        week_parity: WeekParity,
        block: impl Into<String>,
        origin_line: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        let agent_id = agent_id.into();
        let client_id = client_id.into();
        let key = Self::make_key(&client_id, &agent_id, day_name.canonical(), week_parity);
        Self {
            id: None,
            key,
            agent_id,
            client_id,
            day_name,
            week_parity,
            block: block.into(),
            origin_line: origin_line.into(),
            raw_text: raw_text.into(),
        }
    }

    /// 组合查找键
    ///
    /// # 参数
    /// - `day_text`: 星期文本（规范名或带重音写法）
    pub fn make_key(client_id: &str, agent_id: &str, day_text: &str, week: WeekParity) -> String {
        format!("{}_{}_{}_{}", client_id, agent_id, day_text, week.number())
    }

    /// 字段变化后重算 key
    pub fn refresh_key(&mut self) {
        self.key = Self::make_key(
            &self.client_id,
            &self.agent_id,
            self.day_name.canonical(),
            self.week_parity,
        );
    }
}

// ==========================================
// PlannedSchedule - 排班查找表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PlannedSchedule {
    by_key: HashMap<String, PlannedVisit>,
    records: Vec<PlannedVisit>,
}

impl PlannedSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条计划拜访（同键后写覆盖查找表，记录列表保留全部）
    pub fn insert(&mut self, visit: PlannedVisit) {
        self.by_key.insert(visit.key.clone(), visit.clone());
        self.records.push(visit);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&PlannedVisit> {
        self.by_key.get(key)
    }

    /// 全部记录（输入顺序）
    pub fn records(&self) -> &[PlannedVisit] {
        &self.records
    }

    /// 去重后的查找键数量
    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 业务员 → 线路（按输入顺序后出现者覆盖）
    pub fn agent_lines(&self) -> HashMap<String, String> {
        let mut lines = HashMap::new();
        for visit in &self.records {
            lines.insert(visit.agent_id.clone(), visit.origin_line.clone());
        }
        lines
    }
}

impl FromIterator<PlannedVisit> for PlannedSchedule {
    fn from_iter<T: IntoIterator<Item = PlannedVisit>>(iter: T) -> Self {
        let mut schedule = PlannedSchedule::new();
        for visit in iter {
            schedule.insert(visit);
        }
        schedule
    }
}
