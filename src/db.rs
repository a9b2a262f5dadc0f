// ==========================================
// 表格导入处理核心 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表幂等，启动时显式调用（不依赖全局"已初始化"标记）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开连接、建表，并包装为各存储共享的连接
pub fn open_shared_connection(db_path: &str) -> rusqlite::Result<Arc<Mutex<Connection>>> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// 创建全部表（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        -- ===== 模板与校验规则 =====
        CREATE TABLE IF NOT EXISTS templates (
            id TEXT PRIMARY KEY,
            importer_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS template_columns (
            id TEXT PRIMARY KEY,
            template_id TEXT NOT NULL REFERENCES templates(id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            name TEXT NOT NULL,
            required INTEGER NOT NULL DEFAULT 0,
            data_type TEXT NOT NULL,
            UNIQUE(template_id, key)
        );

        CREATE TABLE IF NOT EXISTS validations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            template_column_id TEXT NOT NULL REFERENCES template_columns(id) ON DELETE CASCADE,
            rule_type TEXT NOT NULL,
            options_json TEXT NOT NULL,
            message TEXT NOT NULL,
            severity TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_validations_column
          ON validations(template_column_id);

        -- ===== 上传 =====
        CREATE TABLE IF NOT EXISTS uploads (
            id TEXT PRIMARY KEY,
            importer_id TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_type TEXT NOT NULL,
            header_row_index INTEGER NOT NULL DEFAULT 0,
            num_rows INTEGER NOT NULL DEFAULT 0,
            num_columns INTEGER NOT NULL DEFAULT 0,
            parsed INTEGER NOT NULL DEFAULT 0,
            stored INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS upload_columns (
            id TEXT PRIMARY KEY,
            upload_id TEXT NOT NULL REFERENCES uploads(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            col_index INTEGER NOT NULL,
            sample_json TEXT NOT NULL DEFAULT '[]',
            template_column_id TEXT REFERENCES template_columns(id) ON DELETE SET NULL,
            UNIQUE(upload_id, col_index)
        );

        -- ===== 导入 =====
        CREATE TABLE IF NOT EXISTS imports (
            id TEXT PRIMARY KEY,
            upload_id TEXT NOT NULL REFERENCES uploads(id),
            template_id TEXT NOT NULL,
            importer_id TEXT NOT NULL,
            status TEXT NOT NULL,
            num_rows INTEGER NOT NULL DEFAULT 0,
            num_columns INTEGER NOT NULL DEFAULT 0,
            num_processed_values INTEGER NOT NULL DEFAULT 0,
            num_valid_rows INTEGER NOT NULL DEFAULT 0,
            num_error_rows INTEGER NOT NULL DEFAULT 0,
            dropped_rows INTEGER NOT NULL DEFAULT 0,
            degraded INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- ===== 行存储 =====
        CREATE TABLE IF NOT EXISTS upload_rows (
            upload_id TEXT NOT NULL,
            row_index INTEGER NOT NULL,
            values_json TEXT NOT NULL,
            PRIMARY KEY (upload_id, row_index)
        );

        CREATE TABLE IF NOT EXISTS import_rows (
            import_id TEXT NOT NULL,
            row_index INTEGER NOT NULL,
            values_json TEXT NOT NULL,
            PRIMARY KEY (import_id, row_index)
        );

        CREATE TABLE IF NOT EXISTS import_row_errors (
            import_id TEXT NOT NULL,
            row_index INTEGER NOT NULL,
            values_json TEXT NOT NULL,
            errors_json TEXT NOT NULL,
            PRIMARY KEY (import_id, row_index)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
