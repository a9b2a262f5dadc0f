// ==========================================
// 表格导入处理核心 - 批次构建
// ==========================================
// 落批条件(每次追加后检查):
// 1. 语句数达到上限
// 2. 累计近似字节数超过 0.75 × max_mutation_size
// ==========================================

use crate::config::ImportConfig;
use crate::domain::RowMutation;

/// 一批待原子写入的语句
#[derive(Debug, Clone, Default)]
pub struct RowBatch {
    pub mutations: Vec<RowMutation>,
    pub approx_bytes: usize,
}

impl RowBatch {
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    fn push(&mut self, mutation: RowMutation) {
        self.approx_bytes += mutation.approx_size();
        self.mutations.push(mutation);
    }
}

/// 落批原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Count,
    Size,
}

#[derive(Debug)]
pub struct BatchBuilder {
    max_statements: usize,
    byte_threshold: usize,
    current: RowBatch,
}

impl BatchBuilder {
    pub fn new(max_statements: usize, byte_threshold: usize) -> Self {
        Self {
            max_statements: max_statements.max(1),
            byte_threshold,
            current: RowBatch::default(),
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.batch_max_statements, config.flush_byte_threshold())
    }

    /// 追加一条语句；达到阈值时交出已满的批次
    pub fn push(&mut self, mutation: RowMutation) -> Option<(RowBatch, FlushReason)> {
        self.current.push(mutation);

        if self.current.len() >= self.max_statements {
            return Some((std::mem::take(&mut self.current), FlushReason::Count));
        }
        if self.current.approx_bytes > self.byte_threshold {
            return Some((std::mem::take(&mut self.current), FlushReason::Size));
        }
        None
    }

    /// 取出剩余的非空批次
    pub fn take_remaining(&mut self) -> Option<RowBatch> {
        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }

    pub fn pending(&self) -> usize {
        self.current.len()
    }
}
