// ==========================================
// 表格导入处理核心 - 引擎层
// ==========================================
// 职责: 映射解析、逐行规则求值、行分类与导入收尾
// 红线: Engine 不拼 SQL，数据访问全部经由 repository trait
// ==========================================

pub mod column_mapping;
pub mod error;
pub mod import_processor;
pub mod row_evaluator;

// 重导出核心引擎
pub use column_mapping::{BoundRule, ColumnMapping, MappedColumn};
pub use error::{ProcessError, ProcessResult};
pub use import_processor::{transition, ImportProcessor};
pub use row_evaluator::{evaluate_row, EvaluatedRow};
