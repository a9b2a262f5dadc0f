// ==========================================
// 表格导入处理核心 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供元数据存储与行存储接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod metadata_store;
pub mod metadata_store_impl;
pub mod row_store;
pub mod row_store_impl;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use metadata_store::MetadataStore;
pub use metadata_store_impl::SqliteMetadataStore;
pub use row_store::{RowStore, MAX_PAGE_SIZE};
pub use row_store_impl::SqliteRowStore;
