// ==========================================
// 表格导入处理核心 - 行存储 Trait
// ==========================================
// 职责: 行数据的批量写入与按 row_index 范围读取
// 约束: 一批语句要么全部生效，要么全部不生效
// ==========================================

use crate::domain::{RowMutation, StoredImportRow, UploadRow};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;

/// 单次范围读取的行数上限
pub const MAX_PAGE_SIZE: usize = 10_000;

/// 校验分页大小
pub fn check_page_size(limit: usize) -> RepositoryResult<()> {
    if limit > MAX_PAGE_SIZE {
        return Err(RepositoryError::PageSizeExceeded {
            requested: limit,
            max: MAX_PAGE_SIZE,
        });
    }
    Ok(())
}

// ==========================================
// RowStore Trait
// ==========================================
// 实现者: SqliteRowStore（使用 rusqlite）
#[async_trait]
pub trait RowStore: Send + Sync {
    /// 原子写入一批语句
    async fn write_batch(&self, mutations: &[RowMutation]) -> RepositoryResult<()>;

    /// 读取 row_index >= start 的上传行，按 row_index 升序，最多 limit 行
    async fn page_upload_rows(
        &self,
        upload_id: &str,
        start: i64,
        limit: usize,
    ) -> RepositoryResult<Vec<UploadRow>>;

    /// 读取导入结果行（有效行与错误行合并，按 row_index 升序）
    async fn page_import_rows(
        &self,
        import_id: &str,
        start: i64,
        limit: usize,
    ) -> RepositoryResult<Vec<StoredImportRow>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_limit() {
        assert!(check_page_size(MAX_PAGE_SIZE).is_ok());
        assert!(matches!(
            check_page_size(MAX_PAGE_SIZE + 1),
            Err(RepositoryError::PageSizeExceeded { requested: 10_001, .. })
        ));
    }
}
