// ==========================================
// 表格导入处理核心 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::import_config::{ConfigResult, ImportConfig};
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 加载合并后的导入配置
    ///
    /// # 逻辑
    /// 1. 默认值
    /// 2. config_kv 中的 import.* 覆盖
    /// 3. 环境变量 TABULAR_IMPORT_* 覆盖
    /// 4. 校验取值范围
    async fn load_import_config(&self) -> ConfigResult<ImportConfig>;
}
