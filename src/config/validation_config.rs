// ==========================================
// 巡店路线校验系统 - 校验配置
// ==========================================
// 职责: 校验流程可调参数及其读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::error::ConfigResult;
use crate::domain::types::{DuplicateKeyPolicy, ValidityPolicy};
use crate::engine::duration::DEFAULT_DWELL_CAP_SECONDS;
use crate::engine::per_diem::{
    PerDiemThresholds, DEFAULT_CHECKIN_BEFORE_SECONDS, DEFAULT_CHECKOUT_AFTER_SECONDS,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// ValidationConfig - 一次校验使用的参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub validity_policy: ValidityPolicy,          // 工时统计口径
    pub duplicate_key_policy: DuplicateKeyPolicy, // 排班主键冲突
    pub dwell_cap_seconds: i64,                   // 停留时长上限
    pub per_diem: PerDiemThresholds,              // 补贴阈值
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            validity_policy: ValidityPolicy::ValidOnly,
            duplicate_key_policy: DuplicateKeyPolicy::LastWriteWins,
            dwell_cap_seconds: DEFAULT_DWELL_CAP_SECONDS,
            per_diem: PerDiemThresholds {
                checkin_before_seconds: DEFAULT_CHECKIN_BEFORE_SECONDS,
                checkout_after_seconds: DEFAULT_CHECKOUT_AFTER_SECONDS,
            },
        }
    }
}

// ==========================================
// ValidationConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ValidationConfigReader: Send + Sync {
    /// 工时统计口径
    ///
    /// # 默认值
    /// - VALID_ONLY
    async fn get_validity_policy(&self) -> ConfigResult<ValidityPolicy>;

    /// 排班主键冲突策略
    ///
    /// # 默认值
    /// - LAST_WRITE_WINS
    async fn get_duplicate_key_policy(&self) -> ConfigResult<DuplicateKeyPolicy>;

    /// 停留时长上限（秒）
    ///
    /// # 默认值
    /// - 3599 (59:59)
    async fn get_dwell_cap_seconds(&self) -> ConfigResult<i64>;

    /// 补贴判定阈值
    ///
    /// # 默认值
    /// - 上班早于 32400 (09:00:00)，下班晚于 46800 (13:00:00)
    async fn get_per_diem_thresholds(&self) -> ConfigResult<PerDiemThresholds>;

    /// 一次读取全部校验参数
    async fn load_validation_config(&self) -> ConfigResult<ValidationConfig> {
        Ok(ValidationConfig {
            validity_policy: self.get_validity_policy().await?,
            duplicate_key_policy: self.get_duplicate_key_policy().await?,
            dwell_cap_seconds: self.get_dwell_cap_seconds().await?,
            per_diem: self.get_per_diem_thresholds().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = ValidationConfig::default();
        assert_eq!(config.validity_policy, ValidityPolicy::ValidOnly);
        assert_eq!(config.duplicate_key_policy, DuplicateKeyPolicy::LastWriteWins);
        assert_eq!(config.dwell_cap_seconds, 3599);
        assert_eq!(config.per_diem.checkin_before_seconds, 32_400);
        assert_eq!(config.per_diem.checkout_after_seconds, 46_800);
    }

    #[test]
    fn test_serde_uses_db_strings() {
        let json = serde_json::to_value(ValidationConfig::default()).unwrap();
        assert_eq!(json["validity_policy"], "VALID_ONLY");
        assert_eq!(json["duplicate_key_policy"], "LAST_WRITE_WINS");
    }
}
