// ==========================================
// 表格导入处理核心 - 写入工作池
// ==========================================
// 结构: W 个 tokio 任务共享一个容量为 1 的 mpsc 接收端
// 背压: submit 在通道满时等待，生产者不会领先工作者超过一个批次
// 重试: 每批最多 max_retries 次，线性退避；全部失败则记录并丢弃
// 顺序: 批次之间不保证写入顺序
// ==========================================

use crate::config::ImportConfig;
use crate::repository::RowStore;
use crate::writer::batch::RowBatch;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("写入工作池已关闭，无法提交批次")]
    Closed,
}

/// 工作池参数
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub worker_count: usize,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl WriterOptions {
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            worker_count: config.worker_count.max(1),
            max_retries: config.max_retries.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// 写入结果汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterReport {
    pub batches_written: u64,
    pub batches_dropped: u64,
    pub mutations_written: u64,
    pub mutations_dropped: u64,
}

impl WriterReport {
    pub fn is_degraded(&self) -> bool {
        self.batches_dropped > 0
    }

    fn merge(&mut self, other: WriterReport) {
        self.batches_written += other.batches_written;
        self.batches_dropped += other.batches_dropped;
        self.mutations_written += other.mutations_written;
        self.mutations_dropped += other.mutations_dropped;
    }
}

// ==========================================
// BatchWriter
// ==========================================
pub struct BatchWriter {
    sender: mpsc::Sender<RowBatch>,
    workers: Vec<JoinHandle<WriterReport>>,
}

impl BatchWriter {
    /// 启动工作池（需在 tokio 运行时内调用）
    pub fn start(store: Arc<dyn RowStore>, options: WriterOptions) -> Self {
        let (sender, receiver) = mpsc::channel::<RowBatch>(1);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..options.worker_count.max(1))
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let store = Arc::clone(&store);
                let options = options.clone();
                tokio::spawn(run_worker(worker_id, receiver, store, options))
            })
            .collect();

        Self { sender, workers }
    }

    /// 提交批次；通道满时等待空位
    pub async fn submit(&self, batch: RowBatch) -> Result<(), WriterError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.sender.send(batch).await.map_err(|_| WriterError::Closed)
    }

    /// 关闭通道并等待全部工作者退出
    pub async fn finish(self) -> WriterReport {
        let BatchWriter { sender, workers } = self;
        drop(sender);

        let mut report = WriterReport::default();
        for joined in join_all(workers).await {
            match joined {
                Ok(worker_report) => report.merge(worker_report),
                Err(e) => error!(error = %e, "写入工作者异常退出"),
            }
        }
        report
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<RowBatch>>>,
    store: Arc<dyn RowStore>,
    options: WriterOptions,
) -> WriterReport {
    let mut report = WriterReport::default();

    loop {
        let next = {
            let mut guard = receiver.lock().await;
            guard.recv().await
        };
        let batch = match next {
            Some(batch) => batch,
            None => break,
        };

        let size = batch.len() as u64;
        if write_with_retry(worker_id, store.as_ref(), &batch, &options).await {
            report.batches_written += 1;
            report.mutations_written += size;
        } else {
            report.batches_dropped += 1;
            report.mutations_dropped += size;
        }
    }

    debug!(worker_id, ?report, "写入工作者退出");
    report
}

/// 写入一批，返回是否成功
async fn write_with_retry(
    worker_id: usize,
    store: &dyn RowStore,
    batch: &RowBatch,
    options: &WriterOptions,
) -> bool {
    for attempt in 1..=options.max_retries {
        match store.write_batch(&batch.mutations).await {
            Ok(()) => {
                debug!(worker_id, attempt, mutations = batch.len(), "批次写入成功");
                return true;
            }
            Err(e) => {
                warn!(worker_id, attempt, max_retries = options.max_retries, error = %e, "批次写入失败");
                if attempt < options.max_retries {
                    tokio::time::sleep(options.retry_backoff * attempt).await;
                }
            }
        }
    }

    error!(
        worker_id,
        lost_mutations = batch.len(),
        approx_bytes = batch.approx_bytes,
        "批次重试耗尽，已丢弃"
    );
    false
}
