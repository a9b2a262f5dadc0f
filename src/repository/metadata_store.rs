// ==========================================
// 表格导入处理核心 - 元数据存储 Trait
// ==========================================
// 职责: 模板/校验规则/上传/导入记录的持久化接口
// 红线: 只做数据 CRUD，不含业务规则
// ==========================================

use crate::domain::{Import, Template, TemplateColumn, Upload, UploadColumn, Validation, ValidationId};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// MetadataStore Trait
// ==========================================
// 实现者: SqliteMetadataStore（使用 rusqlite）
#[async_trait]
pub trait MetadataStore: Send + Sync {
    // ===== 模板 =====

    /// 创建模板（不含列）
    async fn create_template(&self, template: &Template) -> RepositoryResult<()>;

    /// 新增模板列（不含校验规则）
    async fn create_template_column(&self, column: &TemplateColumn) -> RepositoryResult<()>;

    /// 新增校验规则
    ///
    /// # 返回
    /// - Ok(ValidationId): 存储分配的规则 ID（忽略入参中的 id）
    async fn create_validation(&self, validation: &Validation) -> RepositoryResult<ValidationId>;

    /// 软删除校验规则
    async fn soft_delete_validation(&self, id: ValidationId) -> RepositoryResult<()>;

    /// 按导入器加载模板，列按创建顺序，规则按挂载顺序（不含已软删除的规则）
    async fn get_template_by_importer(&self, importer_id: &str) -> RepositoryResult<Template>;

    // ===== 上传 =====

    async fn create_upload(&self, upload: &Upload) -> RepositoryResult<()>;

    /// 更新上传的计数/状态字段（不含列）
    async fn save_upload(&self, upload: &Upload) -> RepositoryResult<()>;

    async fn create_upload_columns(&self, columns: &[UploadColumn]) -> RepositoryResult<()>;

    /// 加载上传及其列（按源列序号升序）
    async fn get_upload(&self, upload_id: &str) -> RepositoryResult<Upload>;

    /// 设置或清除上传列的映射目标
    async fn set_column_mapping(
        &self,
        upload_column_id: &str,
        template_column_id: Option<&str>,
    ) -> RepositoryResult<()>;

    // ===== 导入 =====

    async fn create_import(&self, import: &Import) -> RepositoryResult<()>;

    /// 持久化导入的状态与计数
    async fn save_import(&self, import: &Import) -> RepositoryResult<()>;

    async fn get_import(&self, import_id: &str) -> RepositoryResult<Import>;
}
