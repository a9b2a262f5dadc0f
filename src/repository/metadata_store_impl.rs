// ==========================================
// 表格导入处理核心 - 元数据存储 SQLite 实现
// ==========================================
// 职责: 实现 MetadataStore（使用 rusqlite）
// 红线: 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_shared_connection;
use crate::domain::{
    DataType, Import, ImportStatus, Severity, Template, TemplateColumn, Upload, UploadColumn,
    Validation, ValidationId,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::metadata_store::MetadataStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// SqliteMetadataStore
// ==========================================
pub struct SqliteMetadataStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMetadataStore {
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

    fn load_columns(conn: &Connection, template_id: &str) -> RepositoryResult<Vec<TemplateColumn>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, template_id, key, name, required, data_type
            FROM template_columns
            WHERE template_id = ?1
            ORDER BY rowid
            "#,
        )?;
        let rows = stmt.query_map(params![template_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut columns = Vec::new();
        for row in rows {
            let (id, template_id, key, name, required, data_type) = row?;
            let data_type = DataType::from_str(&data_type).map_err(|message| {
                RepositoryError::FieldValueError {
                    field: "data_type".to_string(),
                    message,
                }
            })?;
            let validations = Self::load_validations(conn, &id)?;
            columns.push(TemplateColumn {
                id,
                template_id,
                key,
                name,
                required,
                data_type,
                validations,
            });
        }
        Ok(columns)
    }

    fn load_validations(conn: &Connection, column_id: &str) -> RepositoryResult<Vec<Validation>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, template_column_id, rule_type, options_json, message, severity
            FROM validations
            WHERE template_column_id = ?1 AND deleted_at IS NULL
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![column_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut validations = Vec::new();
        for row in rows {
            let (id, template_column_id, rule_type, options_json, message, severity) = row?;
            let severity = Severity::from_str(&severity).map_err(|message| {
                RepositoryError::FieldValueError {
                    field: "severity".to_string(),
                    message,
                }
            })?;
            validations.push(Validation {
                id,
                template_column_id,
                rule_type,
                options: serde_json::from_str(&options_json)?,
                message,
                severity,
                deleted: false,
            });
        }
        Ok(validations)
    }

    fn load_upload_columns(conn: &Connection, upload_id: &str) -> RepositoryResult<Vec<UploadColumn>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, upload_id, name, col_index, sample_json, template_column_id
            FROM upload_columns
            WHERE upload_id = ?1
            ORDER BY col_index
            "#,
        )?;
        let rows = stmt.query_map(params![upload_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut columns = Vec::new();
        for row in rows {
            let (id, upload_id, name, index, sample_json, template_column_id) = row?;
            columns.push(UploadColumn {
                id,
                upload_id,
                name,
                index,
                sample_data: serde_json::from_str(&sample_json)?,
                template_column_id,
            });
        }
        Ok(columns)
    }
}

fn map_upload_row(row: &Row) -> rusqlite::Result<Upload> {
    Ok(Upload {
        id: row.get(0)?,
        importer_id: row.get(1)?,
        file_name: row.get(2)?,
        file_type: row.get(3)?,
        header_row_index: row.get(4)?,
        num_rows: row.get(5)?,
        num_columns: row.get(6)?,
        parsed: row.get(7)?,
        stored: row.get(8)?,
        error: row.get(9)?,
        created_at: row.get::<_, DateTime<Utc>>(10)?,
        columns: Vec::new(),
    })
}

fn map_import_row(row: &Row) -> rusqlite::Result<(Import, String)> {
    let status: String = row.get(4)?;
    let import = Import {
        id: row.get(0)?,
        upload_id: row.get(1)?,
        template_id: row.get(2)?,
        importer_id: row.get(3)?,
        status: ImportStatus::Created,
        num_rows: row.get(5)?,
        num_columns: row.get(6)?,
        num_processed_values: row.get(7)?,
        num_valid_rows: row.get(8)?,
        num_error_rows: row.get(9)?,
        dropped_rows: row.get(10)?,
        degraded: row.get(11)?,
        error: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    };
    Ok((import, status))
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn create_template(&self, template: &Template) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO templates (id, importer_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![template.id, template.importer_id, template.name, template.created_at],
        )?;
        Ok(())
    }

    async fn create_template_column(&self, column: &TemplateColumn) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO template_columns (id, template_id, key, name, required, data_type)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                column.id,
                column.template_id,
                column.key,
                column.name,
                column.required,
                column.data_type.as_str(),
            ],
        )?;
        Ok(())
    }

    async fn create_validation(&self, validation: &Validation) -> RepositoryResult<ValidationId> {
        let options_json = serde_json::to_string(&validation.options)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO validations (template_column_id, rule_type, options_json, message, severity)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                validation.template_column_id,
                validation.rule_type,
                options_json,
                validation.message,
                validation.severity.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn soft_delete_validation(&self, id: ValidationId) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE validations SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![Utc::now(), id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Validation", &id.to_string()));
        }
        Ok(())
    }

    async fn get_template_by_importer(&self, importer_id: &str) -> RepositoryResult<Template> {
        let conn = self.get_conn()?;
        let header = conn
            .query_row(
                "SELECT id, importer_id, name, created_at FROM templates WHERE importer_id = ?1",
                params![importer_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, DateTime<Utc>>(3)?,
                    ))
                },
            )
            .optional()?;

        let (id, importer_id, name, created_at) =
            header.ok_or_else(|| RepositoryError::not_found("Template", importer_id))?;
        let columns = Self::load_columns(&conn, &id)?;

        Ok(Template {
            id,
            importer_id,
            name,
            columns,
            created_at,
        })
    }

    async fn create_upload(&self, upload: &Upload) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO uploads (
                id, importer_id, file_name, file_type, header_row_index,
                num_rows, num_columns, parsed, stored, error, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                upload.id,
                upload.importer_id,
                upload.file_name,
                upload.file_type,
                upload.header_row_index,
                upload.num_rows,
                upload.num_columns,
                upload.parsed,
                upload.stored,
                upload.error,
                upload.created_at,
            ],
        )?;
        Ok(())
    }

    async fn save_upload(&self, upload: &Upload) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE uploads SET
                header_row_index = ?2, num_rows = ?3, num_columns = ?4,
                parsed = ?5, stored = ?6, error = ?7
            WHERE id = ?1
            "#,
            params![
                upload.id,
                upload.header_row_index,
                upload.num_rows,
                upload.num_columns,
                upload.parsed,
                upload.stored,
                upload.error,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Upload", &upload.id));
        }
        Ok(())
    }

    async fn create_upload_columns(&self, columns: &[UploadColumn]) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO upload_columns (id, upload_id, name, col_index, sample_json, template_column_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for column in columns {
                stmt.execute(params![
                    column.id,
                    column.upload_id,
                    column.name,
                    column.index,
                    serde_json::to_string(&column.sample_data)?,
                    column.template_column_id,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn get_upload(&self, upload_id: &str) -> RepositoryResult<Upload> {
        let conn = self.get_conn()?;
        let upload = conn
            .query_row(
                r#"
                SELECT id, importer_id, file_name, file_type, header_row_index,
                       num_rows, num_columns, parsed, stored, error, created_at
                FROM uploads WHERE id = ?1
                "#,
                params![upload_id],
                map_upload_row,
            )
            .optional()?;

        let mut upload = upload.ok_or_else(|| RepositoryError::not_found("Upload", upload_id))?;
        upload.columns = Self::load_upload_columns(&conn, upload_id)?;
        Ok(upload)
    }

    async fn set_column_mapping(
        &self,
        upload_column_id: &str,
        template_column_id: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE upload_columns SET template_column_id = ?2 WHERE id = ?1",
            params![upload_column_id, template_column_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("UploadColumn", upload_column_id));
        }
        Ok(())
    }

    async fn create_import(&self, import: &Import) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO imports (
                id, upload_id, template_id, importer_id, status,
                num_rows, num_columns, num_processed_values, num_valid_rows, num_error_rows,
                dropped_rows, degraded, error, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                import.id,
                import.upload_id,
                import.template_id,
                import.importer_id,
                import.status.as_str(),
                import.num_rows,
                import.num_columns,
                import.num_processed_values,
                import.num_valid_rows,
                import.num_error_rows,
                import.dropped_rows,
                import.degraded,
                import.error,
                import.created_at,
                import.updated_at,
            ],
        )?;
        Ok(())
    }

    async fn save_import(&self, import: &Import) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE imports SET
                status = ?2, num_rows = ?3, num_columns = ?4, num_processed_values = ?5,
                num_valid_rows = ?6, num_error_rows = ?7, dropped_rows = ?8,
                degraded = ?9, error = ?10, updated_at = ?11
            WHERE id = ?1
            "#,
            params![
                import.id,
                import.status.as_str(),
                import.num_rows,
                import.num_columns,
                import.num_processed_values,
                import.num_valid_rows,
                import.num_error_rows,
                import.dropped_rows,
                import.degraded,
                import.error,
                import.updated_at,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Import", &import.id));
        }
        Ok(())
    }

    async fn get_import(&self, import_id: &str) -> RepositoryResult<Import> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                r#"
                SELECT id, upload_id, template_id, importer_id, status,
                       num_rows, num_columns, num_processed_values, num_valid_rows, num_error_rows,
                       dropped_rows, degraded, error, created_at, updated_at
                FROM imports WHERE id = ?1
                "#,
                params![import_id],
                map_import_row,
            )
            .optional()?;

        let (mut import, status) = found.ok_or_else(|| RepositoryError::not_found("Import", import_id))?;
        import.status = ImportStatus::from_str(&status).map_err(|message| {
            RepositoryError::FieldValueError {
                field: "status".to_string(),
                message,
            }
        })?;
        Ok(import)
    }
}
