// ==========================================
// 表格导入处理核心 - 导入处理器
// ==========================================
// 流程:
// 1. 加载上传与模板，解析映射并初始化全部规则（失败即返回错误）
// 2. 创建 Import 记录，状态 CREATED → PROCESSING
// 3. 从表头之后分页读取上传行，逐行求值、分类、写入
// 4. 等待写入完成，回填计数，状态 → STORED
// 红线: 行级失败不是错误；只有准备阶段失败会向上抛出
// ==========================================

use crate::config::ImportConfig;
use crate::domain::{Import, ImportCounts, ImportStatus, Upload};
use crate::engine::column_mapping::ColumnMapping;
use crate::engine::error::{ProcessError, ProcessResult};
use crate::engine::row_evaluator::evaluate_row;
use crate::repository::{MetadataStore, RowStore};
use crate::writer::{RowSink, WriterReport};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// 状态迁移（只允许前进）
pub fn transition(import: &mut Import, next: ImportStatus) -> ProcessResult<()> {
    if !import.status.can_transition_to(next) {
        return Err(ProcessError::InvalidStateTransition {
            from: import.status,
            to: next,
        });
    }
    import.status = next;
    import.updated_at = Utc::now();
    Ok(())
}

// ==========================================
// ImportProcessor
// ==========================================
pub struct ImportProcessor {
    metadata: Arc<dyn MetadataStore>,
    rows: Arc<dyn RowStore>,
    config: ImportConfig,
}

impl ImportProcessor {
    pub fn new(metadata: Arc<dyn MetadataStore>, rows: Arc<dyn RowStore>, config: ImportConfig) -> Self {
        Self { metadata, rows, config }
    }

    /// 对一个已存储的上传执行导入
    ///
    /// # 返回
    /// - Ok(Import): 最终状态的导入记录（含计数与 degraded 标记）
    /// - Err: 准备阶段失败（上传不存在/未就绪、模板缺失、规则配置无效、Import 记录创建失败）
    #[instrument(skip(self), fields(import_id = tracing::field::Empty))]
    pub async fn process(&self, upload_id: &str) -> ProcessResult<Import> {
        let upload = self.metadata.get_upload(upload_id).await?;
        ensure_ready(&upload)?;

        let template = self.metadata.get_template_by_importer(&upload.importer_id).await?;
        let mapping = ColumnMapping::resolve(&upload, &template)?;
        if mapping.is_empty() {
            warn!(upload_id, "上传没有任何已映射的列，导入结果将为空行");
        }

        let mut import = Import::new(&upload.id, &template.id, &upload.importer_id);
        tracing::Span::current().record("import_id", import.id.as_str());
        self.metadata.create_import(&import).await?;

        transition(&mut import, ImportStatus::Processing)?;
        if let Err(e) = self.metadata.save_import(&import).await {
            warn!(error = %e, "导入状态保存失败，继续处理");
        }

        let mut sink = RowSink::start(Arc::clone(&self.rows), &self.config);
        let scanned = self.scan_rows(&upload, &mapping, &import.id, &mut sink).await;
        let report = sink.finish().await;

        let (mut counts, report) = match (scanned, report) {
            (Ok(counts), Ok(report)) => (counts, report),
            (Err(e), _) => return self.fail(import, e).await,
            (_, Err(e)) => return self.fail(import, e.into()).await,
        };
        counts.num_columns = mapping.len() as i64;

        self.finalize(&mut import, counts, report).await?;
        Ok(import)
    }

    /// 分页扫描上传行
    async fn scan_rows(
        &self,
        upload: &Upload,
        mapping: &ColumnMapping,
        import_id: &str,
        sink: &mut RowSink,
    ) -> ProcessResult<ImportCounts> {
        let mut counts = ImportCounts::default();
        let last_index = upload.header_row_index + upload.num_rows;
        let mut offset = upload.header_row_index + 1;
        let mut next_row_index: i64 = 0;

        while offset <= last_index {
            let page = self
                .rows
                .page_upload_rows(&upload.id, offset, self.config.page_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            offset = last.row_index + 1;

            for row in &page {
                if row.row_index > last_index {
                    break;
                }
                let evaluated = evaluate_row(mapping, row, next_row_index);
                next_row_index += 1;

                counts.num_rows += 1;
                counts.num_processed_values += evaluated.processed_values;
                if evaluated.is_valid() {
                    counts.num_valid_rows += 1;
                } else {
                    counts.num_error_rows += 1;
                }
                sink.push(evaluated.into_mutation(import_id)).await?;
            }
            debug!(offset, rows = counts.num_rows, "分页处理完成");
        }

        Ok(counts)
    }

    async fn finalize(&self, import: &mut Import, counts: ImportCounts, report: WriterReport) -> ProcessResult<()> {
        counts.apply_to(import);
        import.dropped_rows = report.mutations_dropped as i64;
        import.degraded = report.is_degraded();
        transition(import, ImportStatus::Stored)?;

        if import.degraded {
            warn!(
                dropped_rows = import.dropped_rows,
                batches_dropped = report.batches_dropped,
                "部分批次写入失败，导入结果不完整"
            );
        }

        // 最终保存失败只记录日志
        if let Err(e) = self.metadata.save_import(import).await {
            error!(error = %e, "导入完成但状态保存失败");
        }

        info!(
            num_rows = import.num_rows,
            num_valid_rows = import.num_valid_rows,
            num_error_rows = import.num_error_rows,
            num_processed_values = import.num_processed_values,
            "导入完成"
        );
        Ok(())
    }

    /// 中途失败: 标记 FAILED 并返回错误
    async fn fail(&self, mut import: Import, err: ProcessError) -> ProcessResult<Import> {
        error!(error = %err, "导入处理中断");
        import.error = Some(err.to_string());
        transition(&mut import, ImportStatus::Failed)?;
        if let Err(e) = self.metadata.save_import(&import).await {
            error!(error = %e, "导入失败状态保存失败");
        }
        Err(err)
    }
}

fn ensure_ready(upload: &Upload) -> ProcessResult<()> {
    let reason = if let Some(error) = &upload.error {
        Some(format!("上传解析失败: {}", error))
    } else if !upload.stored {
        Some("上传行尚未写入".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ProcessError::UploadNotReady {
            upload_id: upload.id.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_only_move_forward() {
        let mut import = Import::new("u1", "t1", "imp1");
        transition(&mut import, ImportStatus::Processing).unwrap();
        transition(&mut import, ImportStatus::Stored).unwrap();

        let result = transition(&mut import, ImportStatus::Processing);
        assert!(matches!(
            result,
            Err(ProcessError::InvalidStateTransition {
                from: ImportStatus::Stored,
                to: ImportStatus::Processing
            })
        ));
    }

    #[test]
    fn test_upload_with_error_is_not_ready() {
        let mut upload = Upload::new("imp1", "a.csv", "text/csv");
        upload.stored = true;
        upload.error = Some("只有表头".to_string());
        assert!(matches!(ensure_ready(&upload), Err(ProcessError::UploadNotReady { .. })));

        upload.error = None;
        assert!(ensure_ready(&upload).is_ok());
    }
}
