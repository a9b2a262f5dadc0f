// ==========================================
// 表格导入处理核心 - 行存储记录
// ==========================================
// upload_rows(upload_id, row_index)       -> map<列序号, 值>
// import_rows(import_id, row_index)       -> map<schema key, 值>
// import_row_errors(import_id, row_index) -> map<schema key, 值> + map<schema key, [校验 ID]>
// ==========================================

use crate::domain::types::ValidationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 上传行（按源列序号寻址）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRow {
    pub upload_id: String,
    pub row_index: i64,
    pub values: BTreeMap<u32, String>,
}

impl UploadRow {
    /// 按源列序号取值，缺失的尾部空单元格视为空串
    pub fn cell(&self, index: u32) -> &str {
        self.values.get(&index).map(String::as_str).unwrap_or("")
    }
}

/// 校验通过的导入行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    pub import_id: String,
    pub row_index: i64,
    pub values: BTreeMap<String, String>,
}

/// 带错误信息的导入行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRowWithErrors {
    pub import_id: String,
    pub row_index: i64,
    pub values: BTreeMap<String, String>,
    pub errors: BTreeMap<String, Vec<ValidationId>>,
}

/// 读取导入结果时的行（两种记录二选一）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredImportRow {
    Valid(ImportRow),
    Invalid(ImportRowWithErrors),
}

impl StoredImportRow {
    pub fn row_index(&self) -> i64 {
        match self {
            StoredImportRow::Valid(r) => r.row_index,
            StoredImportRow::Invalid(r) => r.row_index,
        }
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        match self {
            StoredImportRow::Valid(r) => &r.values,
            StoredImportRow::Invalid(r) => &r.values,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, StoredImportRow::Valid(_))
    }
}

// ==========================================
// RowMutation - 行存储写入语句
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowMutation {
    Upload(UploadRow),
    Import(ImportRow),
    ImportWithErrors(ImportRowWithErrors),
}

impl RowMutation {
    /// 近似字节数: 写入的字符串值长度之和（非精确的线上大小）
    pub fn approx_size(&self) -> usize {
        match self {
            RowMutation::Upload(r) => r.values.values().map(String::len).sum(),
            RowMutation::Import(r) => r.values.values().map(String::len).sum(),
            RowMutation::ImportWithErrors(r) => r.values.values().map(String::len).sum(),
        }
    }

    pub fn row_index(&self) -> i64 {
        match self {
            RowMutation::Upload(r) => r.row_index,
            RowMutation::Import(r) => r.row_index,
            RowMutation::ImportWithErrors(r) => r.row_index,
        }
    }
}
