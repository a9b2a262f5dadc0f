// ==========================================
// 表格导入处理核心 - 导入调优配置
// ==========================================
// 优先级(低→高): 默认值 → config_kv(import.<field>) → 环境变量 TABULAR_IMPORT_<FIELD>
// 所有来源合并后统一校验
// ==========================================

use crate::repository::MAX_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 配置键（config_kv.key）
pub mod config_keys {
    pub const WORKER_COUNT: &str = "import.worker_count";
    pub const MAX_RETRIES: &str = "import.max_retries";
    pub const RETRY_BACKOFF_MS: &str = "import.retry_backoff_ms";
    pub const BATCH_MAX_STATEMENTS: &str = "import.batch_max_statements";
    pub const MAX_MUTATION_SIZE: &str = "import.max_mutation_size";
    pub const PAGE_SIZE: &str = "import.page_size";
    pub const SAMPLE_SIZE: &str = "import.sample_size";

    pub const ALL: [&str; 7] = [
        WORKER_COUNT,
        MAX_RETRIES,
        RETRY_BACKOFF_MS,
        BATCH_MAX_STATEMENTS,
        MAX_MUTATION_SIZE,
        PAGE_SIZE,
        SAMPLE_SIZE,
    ];
}

/// 环境变量前缀
pub const ENV_PREFIX: &str = "TABULAR_IMPORT_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("未知配置项: {0}")]
    UnknownKey(String),

    #[error("配置值无效 ({key}={value}): {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("配置读取失败: {0}")]
    Repository(#[from] crate::repository::RepositoryError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// 写入工作者数量
    pub worker_count: usize,
    /// 每批最多写入尝试次数
    pub max_retries: u32,
    /// 重试间隔基数（线性退避）
    pub retry_backoff_ms: u64,
    /// 每批语句数上限
    pub batch_max_statements: usize,
    /// 单次写入字节上限，达到 0.75 倍即提前落批
    pub max_mutation_size: usize,
    pub page_size: usize,
    pub sample_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            worker_count: 8,
            max_retries: 2,
            retry_backoff_ms: 50,
            batch_max_statements: 30,
            max_mutation_size: 16 * 1024 * 1024,
            page_size: 1000,
            sample_size: 3,
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> ConfigResult<T> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: "无法解析为非负整数".to_string(),
    })
}

impl ImportConfig {
    /// 字节阈值: max_mutation_size 的 75%
    pub fn flush_byte_threshold(&self) -> usize {
        self.max_mutation_size / 4 * 3
    }

    /// 按配置键覆盖单个字段
    pub fn apply_override(&mut self, key: &str, raw: &str) -> ConfigResult<()> {
        match key {
            config_keys::WORKER_COUNT => self.worker_count = parse_value(key, raw)?,
            config_keys::MAX_RETRIES => self.max_retries = parse_value(key, raw)?,
            config_keys::RETRY_BACKOFF_MS => self.retry_backoff_ms = parse_value(key, raw)?,
            config_keys::BATCH_MAX_STATEMENTS => self.batch_max_statements = parse_value(key, raw)?,
            config_keys::MAX_MUTATION_SIZE => self.max_mutation_size = parse_value(key, raw)?,
            config_keys::PAGE_SIZE => self.page_size = parse_value(key, raw)?,
            config_keys::SAMPLE_SIZE => self.sample_size = parse_value(key, raw)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// 从环境变量覆盖（import.worker_count -> TABULAR_IMPORT_WORKER_COUNT）
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in config_keys::ALL {
            let env_name = env_var_name(key);
            if let Some(raw) = lookup(&env_name) {
                tracing::debug!(env = %env_name, value = %raw, "环境变量覆盖导入配置");
                self.apply_override(key, &raw)?;
            }
        }
        Ok(())
    }

    /// 合并后的取值范围校验
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |key: &str, value: String, reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
            reason: reason.to_string(),
        };

        if self.worker_count == 0 {
            return Err(invalid(config_keys::WORKER_COUNT, "0".to_string(), "至少 1 个工作者"));
        }
        if self.max_retries == 0 {
            return Err(invalid(config_keys::MAX_RETRIES, "0".to_string(), "至少尝试 1 次"));
        }
        if self.batch_max_statements == 0 {
            return Err(invalid(config_keys::BATCH_MAX_STATEMENTS, "0".to_string(), "至少 1 条语句"));
        }
        if self.max_mutation_size == 0 {
            return Err(invalid(config_keys::MAX_MUTATION_SIZE, "0".to_string(), "必须大于 0"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(invalid(
                config_keys::PAGE_SIZE,
                self.page_size.to_string(),
                "取值范围 1..=10000",
            ));
        }
        Ok(())
    }
}

/// 配置键对应的环境变量名
pub fn env_var_name(key: &str) -> String {
    let field = key.strip_prefix("import.").unwrap_or(key);
    format!("{}{}", ENV_PREFIX, field.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = ImportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.flush_byte_threshold(), 12 * 1024 * 1024);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<String, String> = [
            ("TABULAR_IMPORT_WORKER_COUNT", "2"),
            ("TABULAR_IMPORT_PAGE_SIZE", " 250 "),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut config = ImportConfig::default();
        config.apply_env_from(|name| env.get(name).cloned()).unwrap();

        assert_eq!(config.worker_count, 2);
        assert_eq!(config.page_size, 250);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ImportConfig::default();
        assert!(matches!(
            config.apply_override(config_keys::WORKER_COUNT, "many"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.apply_override("import.unknown", "1"),
            Err(ConfigError::UnknownKey(_))
        ));

        config.page_size = MAX_PAGE_SIZE + 1;
        assert!(config.validate().is_err());

        let config = ImportConfig {
            worker_count: 0,
            ..ImportConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name(config_keys::MAX_MUTATION_SIZE), "TABULAR_IMPORT_MAX_MUTATION_SIZE");
    }
}
