// ==========================================
// 表格导入处理核心 - 行写入入口
// ==========================================
// 生产者逐条 push，阈值触发时提交到工作池；
// finish 提交剩余批次并等待全部写入结束
// ==========================================

use crate::config::ImportConfig;
use crate::domain::RowMutation;
use crate::repository::RowStore;
use crate::writer::batch::{BatchBuilder, FlushReason};
use crate::writer::pool::{BatchWriter, WriterError, WriterOptions, WriterReport};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RowSink {
    builder: BatchBuilder,
    writer: BatchWriter,
    max_mutation_size: usize,
    pushed: u64,
}

impl RowSink {
    pub fn start(store: Arc<dyn RowStore>, config: &ImportConfig) -> Self {
        Self {
            builder: BatchBuilder::from_config(config),
            writer: BatchWriter::start(store, WriterOptions::from_config(config)),
            max_mutation_size: config.max_mutation_size,
            pushed: 0,
        }
    }

    pub async fn push(&mut self, mutation: RowMutation) -> Result<(), WriterError> {
        self.pushed += 1;
        if let Some((batch, reason)) = self.builder.push(mutation) {
            match reason {
                FlushReason::Count => {
                    debug!(statements = batch.len(), "批次达到语句数上限，提交写入");
                }
                FlushReason::Size => {
                    warn!(
                        statements = batch.len(),
                        approx_bytes = batch.approx_bytes,
                        max_mutation_size = self.max_mutation_size,
                        "批次接近单次写入字节上限，提前提交"
                    );
                }
            }
            self.writer.submit(batch).await?;
        }
        Ok(())
    }

    /// 已接收的语句数
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    pub async fn finish(mut self) -> Result<WriterReport, WriterError> {
        let flushed = match self.builder.take_remaining() {
            Some(batch) => self.writer.submit(batch).await,
            None => Ok(()),
        };
        // 提交失败时仍需回收工作者
        let report = self.writer.finish().await;
        flushed.map(|_| report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SqliteRowStore;
    use crate::domain::UploadRow;
    use std::collections::BTreeMap;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_sink_writes_every_pushed_row() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = Arc::new(SqliteRowStore::new(temp_file.path().to_str().unwrap()).unwrap());
        let config = ImportConfig {
            worker_count: 3,
            batch_max_statements: 4,
            ..ImportConfig::default()
        };

        let mut sink = RowSink::start(store.clone(), &config);
        for i in 0..10 {
            let mut values = BTreeMap::new();
            values.insert(0, format!("row{}", i));
            sink.push(RowMutation::Upload(UploadRow {
                upload_id: "u1".to_string(),
                row_index: i,
                values,
            }))
            .await
            .unwrap();
        }
        assert_eq!(sink.pushed(), 10);
        let report = sink.finish().await.unwrap();

        // 4 + 4 + 2
        assert_eq!(report.batches_written, 3);
        assert_eq!(report.mutations_written, 10);

        let rows = store.page_upload_rows("u1", 0, 100).await.unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[9].cell(0), "row9");
    }
}
