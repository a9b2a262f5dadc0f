// ==========================================
// 表格导入处理核心 - 校验求值器错误类型
// ==========================================
// 配置错误: 规则定义时快速失败，导入过程中不会出现
// 求值错误: 单元格级别的异常，记录告警后跳过该规则
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluatorError {
    // ===== 配置错误 =====
    #[error("未知的校验类型: {0}")]
    UnknownType(String),

    #[error("校验参数格式错误 (type={rule_type}): {message}")]
    InvalidOptions { rule_type: String, message: String },

    #[error("正则表达式无效: {0}")]
    InvalidPattern(String),

    #[error("列表校验至少需要一个非空选项")]
    EmptyList,

    #[error("至少需要设置 min 或 max 其中之一 (type={0})")]
    MissingBound(String),

    #[error("取值范围无效: min={min} 大于 max={max}")]
    InvertedBounds { min: String, max: String },

    // ===== 求值错误 =====
    #[error("单元格求值失败 (type={rule_type}): {message}")]
    EvaluationFailed { rule_type: String, message: String },
}

impl EvaluatorError {
    pub fn invalid_options(rule_type: &str, message: impl Into<String>) -> Self {
        EvaluatorError::InvalidOptions {
            rule_type: rule_type.to_string(),
            message: message.into(),
        }
    }

    /// 是否为配置阶段错误
    pub fn is_config_error(&self) -> bool {
        !matches!(self, EvaluatorError::EvaluationFailed { .. })
    }
}

/// Result 类型别名
pub type EvaluatorResult<T> = Result<T, EvaluatorError>;
