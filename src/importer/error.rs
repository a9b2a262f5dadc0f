// ==========================================
// 表格导入处理核心 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 终止状态(NoRows/OnlyOneRow/NoColumns/UnsupportedFormat/NoSheets)
// 的文案直接写入 Upload.error 展示给用户
// ==========================================

use crate::repository::RepositoryError;
use crate::writer::WriterError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 终止状态 =====
    #[error("文件中没有任何数据行")]
    NoRows,

    #[error("文件只有一行（表头），没有数据行")]
    OnlyOneRow,

    #[error("表头中没有任何列")]
    NoColumns,

    #[error("Excel 文件无工作表")]
    NoSheets,

    // ===== 存储错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Writer(#[from] WriterError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ImportError {
    /// 是否为面向用户的终止状态（写入 Upload.error 而非向上抛出）
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportError::NoRows
                | ImportError::OnlyOneRow
                | ImportError::NoColumns
                | ImportError::NoSheets
                | ImportError::UnsupportedFormat(_)
                | ImportError::FileNotFound(_)
                | ImportError::FileReadError(_)
                | ImportError::ExcelParseError(_)
                | ImportError::CsvParseError(_)
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(ImportError::OnlyOneRow.is_terminal());
        assert!(ImportError::UnsupportedFormat("pdf".to_string()).is_terminal());
        assert!(!ImportError::Writer(WriterError::Closed).is_terminal());
        assert!(!ImportError::Repository(RepositoryError::LockError("x".to_string())).is_terminal());
    }
}
