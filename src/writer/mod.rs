// ==========================================
// 表格导入处理核心 - 批量行写入层
// ==========================================
// 职责: 将逐行语句聚合为批次，交由工作池并发写入行存储
// 红线: 单批原子；批次间无顺序保证；失败批次重试后丢弃不阻塞生产者
// ==========================================

pub mod batch;
pub mod pool;
pub mod sink;

pub use batch::{BatchBuilder, FlushReason, RowBatch};
pub use pool::{BatchWriter, WriterError, WriterOptions, WriterReport};
pub use sink::RowSink;
