// ==========================================
// 表格导入处理核心 - 上传领域模型
// ==========================================
// 用途: 上传文件元数据 + 列发现结果
// 行数据单独存放在行存储中（按列序号寻址，此时映射尚未确定）
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Upload - 上传记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub id: String,
    pub importer_id: String,
    pub file_name: String,
    pub file_type: String, // 声明的 MIME 类型
    pub header_row_index: i64,
    pub num_rows: i64,    // 数据行数（不含表头）
    pub num_columns: i64, // 发现的列数
    pub parsed: bool,     // 扫描已结束（无论成功与否）
    pub stored: bool,     // 行数据已写入行存储
    pub error: Option<String>, // 终止失败原因（面向用户）
    pub created_at: DateTime<Utc>,
    pub columns: Vec<UploadColumn>,
}

impl Upload {
    /// 创建待解析的上传记录
    pub fn new(importer_id: &str, file_name: &str, file_type: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            importer_id: importer_id.to_string(),
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            header_row_index: 0,
            num_rows: 0,
            num_columns: 0,
            parsed: false,
            stored: false,
            error: None,
            created_at: Utc::now(),
            columns: Vec::new(),
        }
    }

    /// 已映射到模板列的上传列
    pub fn mapped_columns(&self) -> impl Iterator<Item = &UploadColumn> {
        self.columns
            .iter()
            .filter(|c| c.template_column_id.is_some())
    }
}

// ==========================================
// UploadColumn - 源文件列
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadColumn {
    pub id: String,
    pub upload_id: String,
    pub name: String,             // 表头单元格
    pub index: u32,               // 源文件中的位置（从 0 开始）
    pub sample_data: Vec<String>, // 前 N 行样例
    pub template_column_id: Option<String>, // 映射目标（由映射步骤设置）
}

impl UploadColumn {
    pub fn new(upload_id: &str, name: &str, index: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            upload_id: upload_id.to_string(),
            name: name.to_string(),
            index,
            sample_data: Vec::new(),
            template_column_id: None,
        }
    }
}
