// ==========================================
// 表格导入处理核心 - 导入领域模型
// ==========================================
// 用途: 一次（上传 × 映射）导入的汇总记录
// 生命周期: CREATED → PROCESSING → STORED / FAILED，落库后不可变
// ==========================================

use crate::domain::types::ImportStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    pub id: String,
    pub upload_id: String,
    pub template_id: String,
    pub importer_id: String,
    pub status: ImportStatus,

    // ===== 汇总计数 =====
    pub num_rows: i64,
    pub num_columns: i64,
    pub num_processed_values: i64,
    pub num_valid_rows: i64,
    pub num_error_rows: i64,

    // ===== 写入降级信息 =====
    // 重试耗尽被丢弃的批次仍计入上面的汇总计数
    pub dropped_rows: i64,
    pub degraded: bool,

    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Import {
    pub fn new(upload_id: &str, template_id: &str, importer_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            upload_id: upload_id.to_string(),
            template_id: template_id.to_string(),
            importer_id: importer_id.to_string(),
            status: ImportStatus::Created,
            num_rows: 0,
            num_columns: 0,
            num_processed_values: 0,
            num_valid_rows: 0,
            num_error_rows: 0,
            dropped_rows: 0,
            degraded: false,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.status == ImportStatus::Stored
    }
}

// ==========================================
// ImportCounts - 导入过程中累计的计数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    pub num_rows: i64,
    pub num_columns: i64,
    pub num_processed_values: i64,
    pub num_valid_rows: i64,
    pub num_error_rows: i64,
}

impl ImportCounts {
    /// 写回导入记录
    pub fn apply_to(&self, import: &mut Import) {
        import.num_rows = self.num_rows;
        import.num_columns = self.num_columns;
        import.num_processed_values = self.num_processed_values;
        import.num_valid_rows = self.num_valid_rows;
        import.num_error_rows = self.num_error_rows;
    }
}
