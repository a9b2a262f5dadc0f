// ==========================================
// 表格导入处理核心 - 映射与导入 API
// ==========================================
// 职责: 设置/清除列映射、映射建议、映射前置检查、触发导入、结果分页
// 红线: 导入处理器假定映射已通过检查，检查只在这里做
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ImportConfig;
use crate::domain::{Import, StoredImportRow};
use crate::engine::ImportProcessor;
use crate::importer::{check_mapping, validate_mapping, MappingError};
use crate::matcher::{ColumnMatcher, ColumnSuggestion};
use crate::repository::{MetadataStore, RowStore, MAX_PAGE_SIZE};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ImportApi {
    metadata: Arc<dyn MetadataStore>,
    rows: Arc<dyn RowStore>,
    processor: ImportProcessor,
}

impl ImportApi {
    pub fn new(metadata: Arc<dyn MetadataStore>, rows: Arc<dyn RowStore>, config: ImportConfig) -> Self {
        let processor = ImportProcessor::new(Arc::clone(&metadata), Arc::clone(&rows), config);
        Self {
            metadata,
            rows,
            processor,
        }
    }

    // ==========================================
    // 列映射
    // ==========================================

    /// 将上传列映射到模板列
    ///
    /// 目标列必须属于该上传所属导入器的模板
    pub async fn set_mapping(
        &self,
        upload_id: &str,
        upload_column_id: &str,
        template_column_id: &str,
    ) -> ApiResult<()> {
        let upload = self.metadata.get_upload(upload_id).await?;
        if !upload.columns.iter().any(|c| c.id == upload_column_id) {
            return Err(ApiError::NotFound(format!("UploadColumn(id={})", upload_column_id)));
        }

        let template = self.metadata.get_template_by_importer(&upload.importer_id).await?;
        if template.column(template_column_id).is_none() {
            return Err(ApiError::InvalidMapping(MappingError::UnknownTemplateColumn {
                upload_column: upload_column_id.to_string(),
                template_column_id: template_column_id.to_string(),
            }));
        }

        self.metadata
            .set_column_mapping(upload_column_id, Some(template_column_id))
            .await?;
        Ok(())
    }

    /// 清除上传列的映射（该列不参与导入）
    pub async fn clear_mapping(&self, upload_column_id: &str) -> ApiResult<()> {
        self.metadata.set_column_mapping(upload_column_id, None).await?;
        Ok(())
    }

    /// 为每个上传列给出映射建议（不写入）
    pub async fn suggest_mapping(&self, upload_id: &str) -> ApiResult<Vec<ColumnSuggestion>> {
        let upload = self.metadata.get_upload(upload_id).await?;
        let template = self.metadata.get_template_by_importer(&upload.importer_id).await?;
        let matcher = ColumnMatcher::new(&template.columns);
        Ok(matcher.suggest_all(&upload.columns))
    }

    /// 检查映射，返回全部问题（空表示可以导入）
    pub async fn check_mapping(&self, upload_id: &str) -> ApiResult<Vec<MappingError>> {
        let upload = self.metadata.get_upload(upload_id).await?;
        let template = self.metadata.get_template_by_importer(&upload.importer_id).await?;
        Ok(check_mapping(&upload, &template))
    }

    /// 检查映射，遇到第一个问题返回 InvalidMapping
    pub async fn validate_mapping(&self, upload_id: &str) -> ApiResult<()> {
        let upload = self.metadata.get_upload(upload_id).await?;
        let template = self.metadata.get_template_by_importer(&upload.importer_id).await?;
        validate_mapping(&upload, &template)?;
        Ok(())
    }

    // ==========================================
    // 导入
    // ==========================================

    /// 检查映射后执行导入
    pub async fn start_import(&self, upload_id: &str) -> ApiResult<Import> {
        if let Err(e) = self.validate_mapping(upload_id).await {
            warn!(upload_id, error = %e, "映射检查未通过，拒绝导入");
            return Err(e);
        }

        let import = self.processor.process(upload_id).await?;
        info!(
            upload_id,
            import_id = %import.id,
            status = %import.status,
            degraded = import.degraded,
            "导入已结束"
        );
        Ok(import)
    }

    pub async fn get_import(&self, import_id: &str) -> ApiResult<Import> {
        Ok(self.metadata.get_import(import_id).await?)
    }

    /// 分页读取导入结果（有效行与错误行合并，按 row_index 升序）
    pub async fn page_import_rows(
        &self,
        import_id: &str,
        start: i64,
        limit: usize,
    ) -> ApiResult<Vec<StoredImportRow>> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(ApiError::InvalidInput(format!(
                "分页大小必须在 1..={} 之间: {}",
                MAX_PAGE_SIZE, limit
            )));
        }
        Ok(self.rows.page_import_rows(import_id, start, limit).await?)
    }
}
