// ==========================================
// 表格导入处理核心 - 行存储 SQLite 实现
// ==========================================
// 写入: 一批语句在同一事务内执行（阻塞线程池）
// 读取: row_index >= start ORDER BY row_index LIMIT n
// 行值以 JSON 对象存储
// ==========================================

use crate::db::open_shared_connection;
use crate::domain::{ImportRow, ImportRowWithErrors, RowMutation, StoredImportRow, UploadRow};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_store::{check_page_size, RowStore};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

/// 序列化后的待写入行
struct PreparedRow {
    sql: &'static str,
    owner_id: String,
    row_index: i64,
    values_json: String,
    errors_json: Option<String>,
}

const INSERT_UPLOAD_ROW: &str =
    "INSERT OR REPLACE INTO upload_rows (upload_id, row_index, values_json) VALUES (?1, ?2, ?3)";
const INSERT_IMPORT_ROW: &str =
    "INSERT OR REPLACE INTO import_rows (import_id, row_index, values_json) VALUES (?1, ?2, ?3)";
const INSERT_IMPORT_ROW_ERROR: &str = r#"
    INSERT OR REPLACE INTO import_row_errors (import_id, row_index, values_json, errors_json)
    VALUES (?1, ?2, ?3, ?4)
"#;

fn prepare(mutation: &RowMutation) -> RepositoryResult<PreparedRow> {
    let prepared = match mutation {
        RowMutation::Upload(row) => PreparedRow {
            sql: INSERT_UPLOAD_ROW,
            owner_id: row.upload_id.clone(),
            row_index: row.row_index,
            values_json: serde_json::to_string(&row.values)?,
            errors_json: None,
        },
        RowMutation::Import(row) => PreparedRow {
            sql: INSERT_IMPORT_ROW,
            owner_id: row.import_id.clone(),
            row_index: row.row_index,
            values_json: serde_json::to_string(&row.values)?,
            errors_json: None,
        },
        RowMutation::ImportWithErrors(row) => PreparedRow {
            sql: INSERT_IMPORT_ROW_ERROR,
            owner_id: row.import_id.clone(),
            row_index: row.row_index,
            values_json: serde_json::to_string(&row.values)?,
            errors_json: Some(serde_json::to_string(&row.errors)?),
        },
    };
    Ok(prepared)
}

// ==========================================
// SqliteRowStore
// ==========================================
pub struct SqliteRowStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRowStore {
    /// 打开数据库并建表
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_shared_connection(db_path).map_err(RepositoryError::connection)?;
        Ok(Self { conn })
    }

    /// 从已有连接创建（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn write_prepared(conn: &Arc<Mutex<Connection>>, rows: &[PreparedRow]) -> RepositoryResult<()> {
        let mut conn = conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn.transaction()?;
        for row in rows {
            match &row.errors_json {
                Some(errors_json) => {
                    tx.execute(row.sql, params![row.owner_id, row.row_index, row.values_json, errors_json])?
                }
                None => tx.execute(row.sql, params![row.owner_id, row.row_index, row.values_json])?,
            };
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }
}

#[async_trait]
impl RowStore for SqliteRowStore {
    async fn write_batch(&self, mutations: &[RowMutation]) -> RepositoryResult<()> {
        if mutations.is_empty() {
            return Ok(());
        }
        let rows = mutations.iter().map(prepare).collect::<RepositoryResult<Vec<_>>>()?;
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || Self::write_prepared(&conn, &rows))
            .await
            .map_err(|e| RepositoryError::InternalError(format!("批量写入任务异常: {}", e)))?
    }

    async fn page_upload_rows(
        &self,
        upload_id: &str,
        start: i64,
        limit: usize,
    ) -> RepositoryResult<Vec<UploadRow>> {
        check_page_size(limit)?;
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT row_index, values_json FROM upload_rows
            WHERE upload_id = ?1 AND row_index >= ?2
            ORDER BY row_index
            LIMIT ?3
            "#,
        )?;
        let rows = stmt.query_map(params![upload_id, start, limit as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (row_index, values_json) = row?;
            out.push(UploadRow {
                upload_id: upload_id.to_string(),
                row_index,
                values: serde_json::from_str(&values_json)?,
            });
        }
        Ok(out)
    }

    async fn page_import_rows(
        &self,
        import_id: &str,
        start: i64,
        limit: usize,
    ) -> RepositoryResult<Vec<StoredImportRow>> {
        check_page_size(limit)?;
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT row_index, values_json, NULL AS errors_json FROM import_rows
            WHERE import_id = ?1 AND row_index >= ?2
            UNION ALL
            SELECT row_index, values_json, errors_json FROM import_row_errors
            WHERE import_id = ?1 AND row_index >= ?2
            ORDER BY row_index
            LIMIT ?3
            "#,
        )?;
        let rows = stmt.query_map(params![import_id, start, limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (row_index, values_json, errors_json) = row?;
            let values = serde_json::from_str(&values_json)?;
            let stored = match errors_json {
                None => StoredImportRow::Valid(ImportRow {
                    import_id: import_id.to_string(),
                    row_index,
                    values,
                }),
                Some(errors_json) => StoredImportRow::Invalid(ImportRowWithErrors {
                    import_id: import_id.to_string(),
                    row_index,
                    values,
                    errors: serde_json::from_str(&errors_json)?,
                }),
            };
            out.push(stored);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::NamedTempFile;

    fn setup_store() -> (NamedTempFile, SqliteRowStore) {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_str().expect("Invalid path").to_string();
        let store = SqliteRowStore::new(&db_path).expect("Failed to open store");
        (temp_file, store)
    }

    fn upload_row(row_index: i64, cells: &[&str]) -> RowMutation {
        let values = cells
            .iter()
            .enumerate()
            .map(|(i, v)| (i as u32, v.to_string()))
            .collect();
        RowMutation::Upload(UploadRow {
            upload_id: "u1".to_string(),
            row_index,
            values,
        })
    }

    #[tokio::test]
    async fn test_upload_rows_paged_in_order() {
        let (_tmp, store) = setup_store();
        let batch: Vec<RowMutation> = (0..5)
            .rev()
            .map(|i| {
                let v = i.to_string();
                upload_row(i, &["a", v.as_str()])
            })
            .collect();
        store.write_batch(&batch).await.unwrap();

        let page = store.page_upload_rows("u1", 1, 3).await.unwrap();
        let indices: Vec<i64> = page.iter().map(|r| r.row_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(page[0].cell(1), "1");

        let rest = store.page_upload_rows("u1", 4, 1000).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert!(store.page_upload_rows("other", 0, 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_open_failure_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing").join("rows.db");

        let result = SqliteRowStore::new(missing.to_str().unwrap());
        assert!(matches!(result, Err(RepositoryError::DatabaseConnectionError(_))));
    }

    #[tokio::test]
    async fn test_page_size_over_limit_rejected() {
        let (_tmp, store) = setup_store();
        let result = store.page_upload_rows("u1", 0, 10_001).await;
        assert!(matches!(result, Err(RepositoryError::PageSizeExceeded { .. })));
    }

    #[tokio::test]
    async fn test_import_rows_merge_both_kinds() {
        let (_tmp, store) = setup_store();

        let mut values = BTreeMap::new();
        values.insert("email".to_string(), "amy@x.com".to_string());
        let mut bad_values = BTreeMap::new();
        bad_values.insert("email".to_string(), "nope".to_string());
        let mut errors = BTreeMap::new();
        errors.insert("email".to_string(), vec![7]);

        store
            .write_batch(&[
                RowMutation::ImportWithErrors(ImportRowWithErrors {
                    import_id: "i1".to_string(),
                    row_index: 1,
                    values: bad_values,
                    errors,
                }),
                RowMutation::Import(ImportRow {
                    import_id: "i1".to_string(),
                    row_index: 0,
                    values,
                }),
            ])
            .await
            .unwrap();

        let rows = store.page_import_rows("i1", 0, 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_valid());
        assert_eq!(rows[0].row_index(), 0);
        match &rows[1] {
            StoredImportRow::Invalid(r) => assert_eq!(r.errors["email"], vec![7]),
            other => panic!("unexpected row: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rewriting_same_batch_is_idempotent() {
        let (_tmp, store) = setup_store();
        let batch = vec![upload_row(0, &["Name"]), upload_row(1, &["Amy"])];
        store.write_batch(&batch).await.unwrap();
        store.write_batch(&batch).await.unwrap();

        let page = store.page_upload_rows("u1", 0, 10).await.unwrap();
        assert_eq!(page.len(), 2);
    }
}
