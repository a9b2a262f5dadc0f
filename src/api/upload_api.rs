// ==========================================
// 表格导入处理核心 - 上传处理 API
// ==========================================
// 流程: 创建 Upload → 打开行读取器 → 扫描并写入上传行 → 回填列与计数
// 终止状态（无行/只有表头/无列/格式不支持）写入 upload.error，返回 Ok
// 无论成功与否，暂存文件都会被删除
// ==========================================

use crate::api::error::ApiResult;
use crate::config::ImportConfig;
use crate::domain::Upload;
use crate::importer::{open_row_reader, ImportError, ScannedUpload, UploadParser};
use crate::repository::{MetadataStore, RowStore};
use crate::writer::RowSink;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct UploadApi {
    metadata: Arc<dyn MetadataStore>,
    rows: Arc<dyn RowStore>,
    config: ImportConfig,
}

impl UploadApi {
    pub fn new(metadata: Arc<dyn MetadataStore>, rows: Arc<dyn RowStore>, config: ImportConfig) -> Self {
        Self { metadata, rows, config }
    }

    /// 处理一个已暂存的上传文件
    ///
    /// # 参数
    /// - importer_id: 导入器 ID
    /// - file_name: 用户上传的原始文件名
    /// - file_type: 声明的 MIME 类型
    /// - path: 暂存文件路径（处理结束后删除）
    ///
    /// # 返回
    /// - Ok(Upload): parsed=true；成功时 stored=true，终止失败时 error 有值
    /// - Err: 元数据存储失败或写入器异常
    #[instrument(skip(self, path), fields(upload_id = tracing::field::Empty))]
    pub async fn process_upload(
        &self,
        importer_id: &str,
        file_name: &str,
        file_type: &str,
        path: &Path,
    ) -> ApiResult<Upload> {
        let mut upload = Upload::new(importer_id, file_name, file_type);
        tracing::Span::current().record("upload_id", upload.id.as_str());
        self.metadata.create_upload(&upload).await?;

        let scanned = self.scan_file(&upload.id, file_type, path).await;
        remove_staged_file(path).await;

        match scanned {
            Ok(scanned) => {
                upload.num_rows = scanned.num_rows;
                upload.num_columns = scanned.columns.len() as i64;
                upload.parsed = true;
                upload.stored = true;
                self.metadata.create_upload_columns(&scanned.columns).await?;
                upload.columns = scanned.columns;
                self.metadata.save_upload(&upload).await?;
                info!(
                    num_rows = upload.num_rows,
                    num_columns = upload.num_columns,
                    skipped_rows = scanned.skipped_rows,
                    "上传处理完成"
                );
                Ok(upload)
            }
            Err(e) if e.is_terminal() => {
                warn!(error = %e, "上传无法导入");
                upload.parsed = true;
                upload.error = Some(e.to_string());
                self.metadata.save_upload(&upload).await?;
                Ok(upload)
            }
            Err(e) => {
                upload.parsed = true;
                upload.error = Some(e.to_string());
                if let Err(save_err) = self.metadata.save_upload(&upload).await {
                    warn!(error = %save_err, "上传失败状态保存失败");
                }
                Err(e.into())
            }
        }
    }

    pub async fn get_upload(&self, upload_id: &str) -> ApiResult<Upload> {
        Ok(self.metadata.get_upload(upload_id).await?)
    }

    async fn scan_file(&self, upload_id: &str, file_type: &str, path: &Path) -> Result<ScannedUpload, ImportError> {
        let mut reader = open_row_reader(path, file_type)?;
        let parser = UploadParser::new(self.config.sample_size);

        let mut sink = RowSink::start(Arc::clone(&self.rows), &self.config);
        let scanned = parser.scan(upload_id, reader.as_mut(), &mut sink).await;
        let report = sink.finish().await?;

        if report.is_degraded() {
            warn!(
                upload_id,
                mutations_dropped = report.mutations_dropped,
                "部分上传行写入失败"
            );
        }
        scanned
    }
}

async fn remove_staged_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "暂存文件删除失败");
        }
    }
}
