// ==========================================
// 表格导入处理核心 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换下层错误为用户友好的错误消息
// ==========================================

use crate::engine::ProcessError;
use crate::evaluator::EvaluatorError;
use crate::importer::{ImportError, MappingError};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("校验规则配置无效: {0}")]
    InvalidRule(#[from] EvaluatorError),

    #[error("列映射无效: {0}")]
    InvalidMapping(#[from] MappingError),

    // ==========================================
    // 处理错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("导入处理失败: {0}")]
    ProcessError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})", entity, id))
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("数据重复: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("关联数据不存在: {}", msg))
            }
            RepositoryError::PageSizeExceeded { requested, max } => {
                ApiError::InvalidInput(format!("分页大小 {} 超出上限 {}", requested, max))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(e) => e.into(),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<ProcessError> for ApiError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Repository(e) => e.into(),
            ProcessError::InvalidRule { source, .. } => ApiError::InvalidRule(source),
            other => ApiError::ProcessError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_become_user_facing() {
        let err: ApiError = RepositoryError::not_found("Upload", "u1").into();
        assert!(matches!(err, ApiError::NotFound(ref m) if m.contains("u1")));

        let err: ApiError = RepositoryError::UniqueConstraintViolation("UNIQUE".to_string()).into();
        assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
    }

    #[test]
    fn test_process_rule_error_keeps_source() {
        let err: ApiError = ProcessError::InvalidRule {
            validation_id: 3,
            source: EvaluatorError::EmptyList,
        }
        .into();
        assert!(matches!(err, ApiError::InvalidRule(EvaluatorError::EmptyList)));
    }
}
