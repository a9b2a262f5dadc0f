// ==========================================
// 表格导入处理核心 - 配置层
// ==========================================
// 职责: 导入调优参数管理,支持多级覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::ConfigManager;
pub use import_config::{config_keys, ConfigError, ConfigResult, ImportConfig};
pub use import_config_trait::ImportConfigReader;
