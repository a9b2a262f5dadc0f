// ==========================================
// 表格导入处理核心 - 核心库
// ==========================================
// 职责: CSV/XLSX 上传解析、列映射、逐单元格规则校验、批量行写入
// 技术栈: Rust + tokio + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 校验求值器 - 规则类型注册与单元格校验
pub mod evaluator;

// 列匹配 - 映射建议
pub mod matcher;

// 数据仓储层 - 元数据与行存储
pub mod repository;

// 批量行写入 - 工作池与重试
pub mod writer;

// 导入层 - 上传文件解析
pub mod importer;

// 引擎层 - 导入处理
pub mod engine;

// 配置层 - 导入调优参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 服务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    DataType, Import, ImportStatus, Severity, StoredImportRow, Template, TemplateColumn, Upload,
    UploadColumn, Validation,
};

// 引擎与配置
pub use config::ImportConfig;
pub use engine::ImportProcessor;
pub use evaluator::{Evaluator, EvaluatorKind};
pub use matcher::ColumnMatcher;

// API
pub use api::{ApiError, ApiResult, ImportApi, TemplateApi, UploadApi};
pub use app::AppState;

// ==========================================
// 系统常量
// ==========================================

/// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
