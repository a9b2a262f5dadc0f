// ==========================================
// 表格导入处理核心 - 导入处理错误类型
// ==========================================
// 只有准备阶段与持久化失败会向上抛出；
// 行级规则失败记录在结果行中，不作为错误
// ==========================================

use crate::domain::{ImportStatus, ValidationId};
use crate::evaluator::EvaluatorError;
use crate::repository::RepositoryError;
use crate::writer::WriterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("上传尚未就绪: upload_id={upload_id}, reason={reason}")]
    UploadNotReady { upload_id: String, reason: String },

    #[error("校验规则初始化失败 (validation_id={validation_id}): {source}")]
    InvalidRule {
        validation_id: ValidationId,
        #[source]
        source: EvaluatorError,
    },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: ImportStatus, to: ImportStatus },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Writer(#[from] WriterError),
}

pub type ProcessResult<T> = Result<T, ProcessError>;
