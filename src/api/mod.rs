// ==========================================
// 表格导入处理核心 - API 层
// ==========================================
// 职责: 提供服务级入口，供宿主程序（HTTP 层、命令行等）调用
// ==========================================

pub mod error;
pub mod import_api;
pub mod template_api;
pub mod upload_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::ImportApi;
pub use template_api::{NewColumn, NewValidation, RuleTypeInfo, TemplateApi};
pub use upload_api::UploadApi;
