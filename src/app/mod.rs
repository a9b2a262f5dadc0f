// ==========================================
// 表格导入处理核心 - 应用层
// ==========================================
// 职责: 按固定顺序装配存储、配置与 API 实例，供宿主程序持有
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
