// ==========================================
// 表格导入处理核心 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod import;
pub mod row;
pub mod template;
pub mod types;
pub mod upload;

// 重导出核心类型
pub use import::{Import, ImportCounts};
pub use row::{ImportRow, ImportRowWithErrors, RowMutation, StoredImportRow, UploadRow};
pub use template::{Template, TemplateColumn, Validation};
pub use types::{DataType, FileFormat, ImportStatus, Severity, ValidationId};
pub use upload::{Upload, UploadColumn};
