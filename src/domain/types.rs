// ==========================================
// 表格导入处理核心 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 校验规则 ID（validations 表自增主键）
pub type ValidationId = i64;

// ==========================================
// 校验严重级别 (Severity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warn,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warn" | "warning" => Ok(Severity::Warn),
            "info" => Ok(Severity::Info),
            other => Err(format!("未知的严重级别: {}", other)),
        }
    }
}

// ==========================================
// 目标列数据类型 (Data Type)
// ==========================================
// 用途: 前端规则兼容性检查（规则类型 → 允许的数据类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
}

impl DataType {
    pub const ALL: [DataType; 4] = [
        DataType::String,
        DataType::Number,
        DataType::Boolean,
        DataType::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" => Ok(DataType::String),
            "number" => Ok(DataType::Number),
            "boolean" => Ok(DataType::Boolean),
            "date" => Ok(DataType::Date),
            other => Err(format!("未知的数据类型: {}", other)),
        }
    }
}

// ==========================================
// 导入状态 (Import Status)
// ==========================================
// 状态机: CREATED → PROCESSING → STORED
//                             ↘ FAILED
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    Created,    // 已创建
    Processing, // 处理中
    Stored,     // 已落库
    Failed,     // 失败
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Created => "CREATED",
            ImportStatus::Processing => "PROCESSING",
            ImportStatus::Stored => "STORED",
            ImportStatus::Failed => "FAILED",
        }
    }

    /// 是否允许从当前状态迁移到目标状态
    pub fn can_transition_to(&self, next: ImportStatus) -> bool {
        matches!(
            (self, next),
            (ImportStatus::Created, ImportStatus::Processing)
                | (ImportStatus::Created, ImportStatus::Failed)
                | (ImportStatus::Processing, ImportStatus::Stored)
                | (ImportStatus::Processing, ImportStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Stored | ImportStatus::Failed)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(ImportStatus::Created),
            "PROCESSING" => Ok(ImportStatus::Processing),
            "STORED" => Ok(ImportStatus::Stored),
            "FAILED" => Ok(ImportStatus::Failed),
            other => Err(format!("未知的导入状态: {}", other)),
        }
    }
}

// ==========================================
// 上传文件格式 (File Format)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// 依据 MIME 类型判定格式，无法判定时返回 None
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "text/csv" | "application/csv" | "text/plain" => Some(FileFormat::Csv),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel" => Some(FileFormat::Xlsx),
            _ => None,
        }
    }

    /// 依据扩展名判定格式（MIME 无法判定时的兜底）
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "xlsx" | "xls" => Some(FileFormat::Xlsx),
            _ => None,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "csv"),
            FileFormat::Xlsx => write!(f, "xlsx"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_status_transitions() {
        assert!(ImportStatus::Created.can_transition_to(ImportStatus::Processing));
        assert!(ImportStatus::Processing.can_transition_to(ImportStatus::Stored));
        assert!(ImportStatus::Processing.can_transition_to(ImportStatus::Failed));
        assert!(!ImportStatus::Stored.can_transition_to(ImportStatus::Processing));
        assert!(!ImportStatus::Created.can_transition_to(ImportStatus::Stored));
    }

    #[test]
    fn test_file_format_detection() {
        assert_eq!(FileFormat::from_mime("text/csv; charset=utf-8"), Some(FileFormat::Csv));
        assert_eq!(
            FileFormat::from_mime("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            Some(FileFormat::Xlsx)
        );
        assert_eq!(FileFormat::from_mime("application/octet-stream"), None);
        assert_eq!(FileFormat::from_extension("XLSX"), Some(FileFormat::Xlsx));
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("warning".parse::<Severity>(), Ok(Severity::Warn));
        assert!("fatal".parse::<Severity>().is_err());
    }
}
