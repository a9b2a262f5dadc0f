// ==========================================
// 表格导入处理核心 - 模板领域模型
// ==========================================
// 用途: 目标 schema（模板 / 模板列 / 校验规则）
// 约束: 被进行中的导入引用后不可修改，只允许软删除
// ==========================================

use crate::domain::types::{DataType, Severity, ValidationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Template - 导入模板
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub importer_id: String, // 所属导入器（一个导入器对应一个模板）
    pub name: String,
    pub columns: Vec<TemplateColumn>,
    pub created_at: DateTime<Utc>,
}

impl Template {
    /// 按 ID 查找模板列
    pub fn column(&self, id: &str) -> Option<&TemplateColumn> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// 按 schema key 查找模板列
    pub fn column_by_key(&self, key: &str) -> Option<&TemplateColumn> {
        self.columns.iter().find(|c| c.key == key)
    }
}

// ==========================================
// TemplateColumn - 目标 schema 列
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateColumn {
    pub id: String,
    pub template_id: String,
    pub key: String,  // schema key（小写字母/数字/下划线，模板内唯一）
    pub name: String, // 展示名称
    pub required: bool,
    pub data_type: DataType,
    pub validations: Vec<Validation>, // 按挂载顺序
}

impl TemplateColumn {
    /// schema key 格式检查: 非空，仅含小写字母、数字、下划线
    pub fn is_valid_key(key: &str) -> bool {
        !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }
}

// ==========================================
// Validation - 单条校验规则
// ==========================================
// rule_type 选择求值器；options 在定义时解析一次，之后复用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    pub id: ValidationId,
    pub template_column_id: String,
    pub rule_type: String,
    pub options: serde_json::Value,
    pub message: String,
    pub severity: Severity,
    pub deleted: bool, // 软删除标记（进行中的导入仍可使用）
}
