// ==========================================
// 表格导入处理核心 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 初始化顺序: 打开数据库并建表 → 加载导入配置 → 创建 API
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{ImportApi, TemplateApi, UploadApi};
use crate::config::{ConfigManager, ImportConfig, ImportConfigReader};
use crate::db::open_shared_connection;
use crate::repository::{MetadataStore, RowStore, SqliteMetadataStore, SqliteRowStore};

/// 应用状态
///
/// 三个 API 共享同一个数据库连接与同一份导入配置
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生效的导入配置（启动时加载，运行期间不变）
    pub config: ImportConfig,

    /// 模板与规则API
    pub template_api: Arc<TemplateApi>,

    /// 上传处理API
    pub upload_api: Arc<UploadApi>,

    /// 映射与导入API
    pub import_api: Arc<ImportApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时创建）
    ///
    /// # 返回
    /// - Ok(AppState): 成功创建
    /// - Err(String): 初始化错误
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_shared_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;

        let config_manager = ConfigManager::from_connection(conn.clone());
        let config = config_manager
            .load_import_config()
            .await
            .map_err(|e| format!("导入配置无效: {}", e))?;

        let metadata: Arc<dyn MetadataStore> = Arc::new(SqliteMetadataStore::from_connection(conn.clone()));
        let rows: Arc<dyn RowStore> = Arc::new(SqliteRowStore::from_connection(conn));

        let template_api = Arc::new(TemplateApi::new(metadata.clone()));
        let upload_api = Arc::new(UploadApi::new(metadata.clone(), rows.clone(), config.clone()));
        let import_api = Arc::new(ImportApi::new(metadata, rows, config.clone()));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            config,
            template_api,
            upload_api,
            import_api,
        })
    }
}

/// 默认数据库路径
///
/// 优先使用环境变量 TABULAR_IMPORT_DB，其次为用户本地数据目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("TABULAR_IMPORT_DB") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from(".");
    if let Some(data_dir) = dirs::data_local_dir() {
        path = data_dir.join("tabular-import");
    }

    // 目录创建失败时由打开数据库报错
    std::fs::create_dir_all(&path).ok();
    path.join("tabular_import.db").to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[tokio::test]
    async fn test_app_state_wires_apis_on_fresh_db() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();

        let state = AppState::new(db_path).await.unwrap();
        assert!(state.config.validate().is_ok());

        let template = state.template_api.create_template("contacts", "Contacts").await.unwrap();
        let loaded = state.template_api.get_template("contacts").await.unwrap();
        assert_eq!(loaded.id, template.id);
    }
}
