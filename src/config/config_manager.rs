// ==========================================
// 表格导入处理核心 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config::{config_keys, ConfigResult, ImportConfig};
use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_shared_connection;
use crate::repository::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 全局作用域
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_shared_connection(db_path).map_err(RepositoryError::connection)?;
        Ok(Self { conn })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 获取所有 import.* 配置的快照
    pub fn get_import_overrides(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = ?1 AND key LIKE 'import.%' ORDER BY key",
        )?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            out.insert(key, value);
        }
        Ok(out)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn load_import_config(&self) -> ConfigResult<ImportConfig> {
        let mut config = ImportConfig::default();

        for key in config_keys::ALL {
            if let Some(raw) = self.get_global_config_value(key)? {
                config.apply_override(key, &raw)?;
            }
        }
        config.apply_env()?;
        config.validate()?;

        tracing::info!(?config, "导入配置已加载");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use tempfile::NamedTempFile;

    fn setup_manager() -> (NamedTempFile, ConfigManager) {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_str().expect("Invalid path").to_string();
        let manager = ConfigManager::new(&db_path).expect("Failed to open config");
        (temp_file, manager)
    }

    #[test]
    fn test_set_and_get_value() {
        let (_tmp, manager) = setup_manager();
        assert_eq!(manager.get_global_config_value(config_keys::PAGE_SIZE).unwrap(), None);

        manager.set_global_config_value(config_keys::PAGE_SIZE, "500").unwrap();
        manager.set_global_config_value(config_keys::PAGE_SIZE, "600").unwrap();
        manager.set_global_config_value("ui.theme", "dark").unwrap();

        assert_eq!(
            manager.get_global_config_value(config_keys::PAGE_SIZE).unwrap(),
            Some("600".to_string())
        );
        let overrides = manager.get_import_overrides().unwrap();
        assert_eq!(overrides.len(), 1);
    }

    #[tokio::test]
    async fn test_load_import_config_applies_table_overrides() {
        let (_tmp, manager) = setup_manager();
        manager.set_global_config_value(config_keys::SAMPLE_SIZE, "5").unwrap();

        let config = manager.load_import_config().await.unwrap();
        assert_eq!(config.sample_size, 5);
    }

    #[tokio::test]
    async fn test_load_import_config_rejects_invalid_table_value() {
        let (_tmp, manager) = setup_manager();
        manager.set_global_config_value(config_keys::PAGE_SIZE, "20000").unwrap();

        let result = manager.load_import_config().await;
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
